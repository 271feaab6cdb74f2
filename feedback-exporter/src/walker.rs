use std::time;

use feedback_common::flatten::{flatten, FlattenError, Flattened};
use feedback_common::page::Record;
use feedback_common::signature::{Secret, SignedHeaders};
use feedback_common::time::TimeSource;
use tracing::{debug, info};
use url::Url;

use crate::error::ExportError;
use crate::fetcher::PageFetcher;

pub const DEFAULT_PAGE_DELAY: time::Duration = time::Duration::from_millis(600);
pub const DEFAULT_MAX_PAGES: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Pause before every page after the first. The upstream rate limits clients that go faster.
    pub page_delay: time::Duration,
    /// Abort when the listing still has a next page after this many pages.
    pub max_pages: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Everything collected so far by one walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub flat_feedback: Vec<Record>,
    pub flat_replies: Vec<Record>,
    pub raw_feedback: Vec<Record>,
    pub pages: usize,
}

impl Accumulator {
    /// Fold one page of items into the accumulator.
    ///
    /// Consumes the accumulator so a failing page cannot leave it half updated.
    pub fn fold_page(mut self, items: Vec<Record>) -> Result<Self, FlattenError> {
        for item in items {
            let Flattened { feedback, replies } = flatten(&item)?;
            self.flat_feedback.push(feedback);
            self.flat_replies.extend(replies);
            self.raw_feedback.push(item);
        }
        self.pages += 1;

        Ok(self)
    }

    /// Number of raw feedback items fetched so far.
    pub fn fetched(&self) -> usize {
        self.raw_feedback.len()
    }
}

/// Drives a `PageFetcher` across every page of the listing, one page at a time.
pub struct PaginationWalker<'a, F: ?Sized, T: ?Sized> {
    fetcher: &'a F,
    time_source: &'a T,
    options: WalkOptions,
}

impl<'a, F, T> PaginationWalker<'a, F, T>
where
    F: PageFetcher + ?Sized,
    T: TimeSource + Sync + ?Sized,
{
    pub fn new(fetcher: &'a F, time_source: &'a T, options: WalkOptions) -> Self {
        Self {
            fetcher,
            time_source,
            options,
        }
    }

    /// Walk the listing at `listing_url` until the upstream stops handing out a next page.
    ///
    /// Each request is signed with a fresh timestamp. `on_progress` receives the cumulative
    /// number of items fetched after every page. The first failure aborts the walk and nothing
    /// collected up to that point is returned.
    ///
    /// # Arguments
    ///
    /// * `base_url`: The configured API base. Every `next_page_url` is resolved against it.
    /// * `listing_url`: The first page. A `count` query parameter is set on it.
    /// * `page_size`: Items requested per page.
    /// * `secret`: Private key used to sign every request.
    /// * `on_progress`: Progress callback, for reporting only.
    pub async fn walk_all<P>(
        &self,
        base_url: &Url,
        listing_url: &Url,
        page_size: u32,
        secret: &Secret,
        mut on_progress: P,
    ) -> Result<Accumulator, ExportError>
    where
        P: FnMut(usize),
    {
        let mut accumulator = Accumulator::default();
        let mut url = first_page_url(listing_url, page_size);

        loop {
            let headers = SignedHeaders::now(self.time_source, secret)?;

            debug!(url = %url, page = accumulator.pages + 1, "fetching feedback page");
            let page = self.fetcher.fetch_page(&url, &headers).await?;
            let next_page_url = page.next_page_url.clone();

            accumulator = accumulator.fold_page(page.into_items())?;
            on_progress(accumulator.fetched());

            info!(
                pages = accumulator.pages,
                fetched = accumulator.fetched(),
                replies = accumulator.flat_replies.len(),
                "fetched feedback page"
            );

            let Some(next_page_url) = next_page_url else {
                break;
            };

            if accumulator.pages >= self.options.max_pages {
                return Err(ExportError::PageLimitExceeded(accumulator.pages));
            }

            url = resolve_next_page_url(base_url, &next_page_url).map_err(|error| {
                ExportError::MalformedResponse(format!(
                    "invalid next_page_url {:?}: {}",
                    next_page_url, error
                ))
            })?;

            tokio::time::sleep(self.options.page_delay).await;
        }

        Ok(accumulator)
    }
}

/// Resolve a `next_page_url` cursor against the configured base.
///
/// A path-absolute cursor is appended to the base path, so a base mounted under a prefix keeps
/// it on every page. Anything else follows normal URL resolution.
pub fn resolve_next_page_url(base_url: &Url, next_page_url: &str) -> Result<Url, url::ParseError> {
    if !next_page_url.starts_with('/') || next_page_url.starts_with("//") {
        return base_url.join(next_page_url);
    }

    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    let prefix = url.path().trim_end_matches('/').to_owned();

    url.join(&format!("{}{}", prefix, next_page_url))
}

/// The listing URL with its `count` query parameter set to `page_size`.
fn first_page_url(listing_url: &Url, page_size: u32) -> Url {
    let retained: Vec<(String, String)> = listing_url
        .query_pairs()
        .filter(|(key, _)| key != "count")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = listing_url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("count", &page_size.to_string());

    url
}
