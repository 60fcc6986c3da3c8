use reqwest::{Client, header};
use std::time::Duration;
use url::Url;

use super::{FetchResponse, SiteSource, SourceError, clean_relative};

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Cache-bust parameter appended to every request.
pub const CACHE_BUST_PARAM: &str = "v";

/// A static site served over HTTP.
///
/// Every request carries a `v` query parameter and `no-cache` headers so that
/// intermediaries never hand back a stale manifest. With no fixed token, each
/// request gets a fresh random nonce.
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    base: Url,
    cache_token: Option<String>,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, SourceError> {
        Self::builder(base).build()
    }

    pub fn builder(base: &str) -> HttpSourceBuilder {
        HttpSourceBuilder {
            base: base.to_string(),
            cache_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Replaces the configured cache-bust token, e.g. with a page's `v` value.
    pub fn with_cache_token(mut self, token: &str) -> Self {
        let token = token.trim();
        if !token.is_empty() {
            self.cache_token = Some(token.to_string());
        }
        self
    }

    /// Absolute URL for `path`, including the cache-bust parameter.
    pub fn url_for(&self, path: &str) -> Result<Url, SourceError> {
        let relative = clean_relative(path)?;
        let mut url = self.base.join(relative)?;
        let token = self
            .cache_token
            .clone()
            .unwrap_or_else(|| format!("{:016x}", rand::random::<u64>()));
        url.query_pairs_mut().append_pair(CACHE_BUST_PARAM, &token);
        Ok(url)
    }
}

impl SiteSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError> {
        let url = self.url_for(path)?;
        tracing::trace!(%url, "fetching");
        let response = self
            .client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

pub struct HttpSourceBuilder {
    base: String,
    cache_token: Option<String>,
    timeout: Duration,
    user_agent: String,
}

impl HttpSourceBuilder {
    pub fn cache_token(mut self, token: Option<String>) -> Self {
        self.cache_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpSource, SourceError> {
        let mut base = Url::parse(self.base.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()?;
        Ok(HttpSource {
            client,
            base,
            cache_token: self.cache_token,
        })
    }
}
