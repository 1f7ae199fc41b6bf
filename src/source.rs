use crate::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A fetched page. Non-success statuses are not errors at this level; the
/// caller decides what a 404 means.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn get(&self, url: &str) -> Result<Page> {
        let fetch_error = |source| ScrapeError::Fetch {
            url: url.to_owned(),
            source,
        };

        let res = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = res.status();
        let body = res.text().await.map_err(fetch_error)?;
        tracing::debug!(target: "fetch", "GET {url} -> {status}");

        Ok(Page { status, body })
    }
}
