use feedback_common::dedup::dedupe_by_id;
use feedback_common::page::Record;
use feedback_common::signature::Secret;
use feedback_common::time::TimeSource;
use tracing::info;
use url::Url;

use crate::error::ExportError;
use crate::fetcher::PageFetcher;
use crate::walker::{Accumulator, PaginationWalker, WalkOptions};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Origin of the upstream API, or of a relay forwarding to it. A path on it is kept as a
    /// prefix of the listing URL and of every `next_page_url`.
    pub base_url: Url,
    pub page_size: u32,
    pub walk: WalkOptions,
}

impl ExportOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
            walk: WalkOptions::default(),
        }
    }
}

/// The outcome of one export run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Flattened feedback items, deduplicated by `id`.
    pub feedback: Vec<Record>,
    /// Flattened replies, deduplicated by `id`.
    pub replies: Vec<Record>,
    /// Every item exactly as fetched. Not deduplicated.
    pub raw_feedback: Vec<Record>,
    pub pages: usize,
}

impl ResultSet {
    fn from_accumulator(accumulator: Accumulator) -> Self {
        Self {
            feedback: dedupe_by_id(accumulator.flat_feedback),
            replies: dedupe_by_id(accumulator.flat_replies),
            raw_feedback: accumulator.raw_feedback,
            pages: accumulator.pages,
        }
    }

    /// Number of raw items fetched across all pages.
    pub fn fetched(&self) -> usize {
        self.raw_feedback.len()
    }
}

/// Exports every feedback item of a product. Each call to `export` is an independent run.
pub struct Exporter<F, T> {
    fetcher: F,
    time_source: T,
    options: ExportOptions,
}

impl<F, T> Exporter<F, T>
where
    F: PageFetcher,
    T: TimeSource + Sync,
{
    pub fn new(fetcher: F, time_source: T, options: ExportOptions) -> Self {
        Self {
            fetcher,
            time_source,
            options,
        }
    }

    /// `{base_url}/api/v1/{product_id}/posts`
    pub fn listing_url(&self, product_id: &str) -> Result<Url, ExportError> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(ExportError::InvalidArgument(
                "product id must not be empty".to_owned(),
            ));
        }

        let mut url = self.options.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| {
                ExportError::InvalidArgument(format!(
                    "{} cannot be used as a base url",
                    self.options.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", product_id, "posts"]);

        Ok(url)
    }

    /// Fetch every page, flatten, and deduplicate.
    ///
    /// Either every page is fetched and processed, or the first error is returned and nothing
    /// else is.
    pub async fn export<P>(
        &self,
        product_id: &str,
        secret: &Secret,
        on_progress: P,
    ) -> Result<ResultSet, ExportError>
    where
        P: FnMut(usize),
    {
        if self.options.page_size == 0 {
            return Err(ExportError::InvalidArgument(
                "page size must be greater than zero".to_owned(),
            ));
        }
        if self.options.walk.max_pages == 0 {
            return Err(ExportError::InvalidArgument(
                "max pages must be greater than zero".to_owned(),
            ));
        }
        if secret.is_empty() {
            return Err(ExportError::InvalidArgument(
                "secret must not be empty".to_owned(),
            ));
        }

        let listing_url = self.listing_url(product_id)?;
        info!(url = %listing_url, page_size = self.options.page_size, "starting feedback export");

        let walker = PaginationWalker::new(&self.fetcher, &self.time_source, self.options.walk);
        let accumulator = walker
            .walk_all(
                &self.options.base_url,
                &listing_url,
                self.options.page_size,
                secret,
                on_progress,
            )
            .await?;

        let result = ResultSet::from_accumulator(accumulator);
        info!(
            pages = result.pages,
            fetched = result.fetched(),
            feedback = result.feedback.len(),
            replies = result.replies.len(),
            "feedback export finished"
        );

        Ok(result)
    }
}
