use std::time;

use async_trait::async_trait;
use feedback_common::page::Page;
use feedback_common::signature::SignedHeaders;
use reqwest::header;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Fetch and validate a single page of the feedback listing.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url, headers: &SignedHeaders) -> Result<Page, FetchError>;
}

/// A `PageFetcher` that talks to the upstream (or a relay in front of it) over HTTP.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(request_timeout: time::Duration) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("feedback-exporter/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|error| FetchError::Transport(Box::new(error)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &Url, headers: &SignedHeaders) -> Result<Page, FetchError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|error| FetchError::Transport(Box::new(error)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("Unknown Status")
                    .to_owned(),
            });
        }

        let body: Value = response.json().await.map_err(|error| {
            if error.is_decode() {
                FetchError::Malformed(error.to_string())
            } else {
                FetchError::Transport(Box::new(error))
            }
        })?;

        let page = Page::from_value(body)?;
        debug!(
            url = %url,
            items = page.items().len(),
            last = page.is_last(),
            "decoded feedback page"
        );

        Ok(page)
    }
}
