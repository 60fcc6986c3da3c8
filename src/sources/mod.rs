use serde::de::DeserializeOwned;
use thiserror::Error;

pub mod directory;
pub mod http;

pub use directory::DirectorySource;
pub use http::HttpSource;

/// Failure to obtain any response for a path.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid site URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("path '{0}' escapes the site root")]
    InvalidPath(String),
}

/// Status and body of one fetched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure of a whole-document load (catalogue, schedule, flags).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("{path} could not be read: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the static site lives.
pub trait SiteSource {
    /// Fetches `path` (relative to the site root) bypassing any cache.
    async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError>;
}

/// Fetches `path` and parses it as JSON, treating non-2xx responses as errors.
pub async fn fetch_json<T, S>(source: &S, path: &str) -> Result<T, LoadError>
where
    T: DeserializeOwned,
    S: SiteSource + ?Sized,
{
    let response = source.fetch(path).await?;
    if !response.is_success() {
        return Err(LoadError::Status {
            path: path.to_string(),
            status: response.status,
        });
    }
    serde_json::from_str(&response.body).map_err(|source| LoadError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Either kind of site, picked from the configured location.
#[derive(Debug)]
pub enum Site {
    Http(HttpSource),
    Directory(DirectorySource),
}

impl Site {
    /// Uses `token` as the cache-bust value when present. A local mirror has no
    /// cache to bust and is returned unchanged.
    pub fn with_cache_token(self, token: Option<&str>) -> Self {
        match (self, token) {
            (Site::Http(source), Some(token)) => Site::Http(source.with_cache_token(token)),
            (site, _) => site,
        }
    }
}

impl SiteSource for Site {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError> {
        match self {
            Site::Http(source) => source.fetch(path).await,
            Site::Directory(source) => source.fetch(path).await,
        }
    }
}

impl<S: SiteSource + ?Sized> SiteSource for &S {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError> {
        (**self).fetch(path).await
    }
}

/// Normalizes a site-relative path: strips leading slashes and rejects `..`.
pub(crate) fn clean_relative(path: &str) -> Result<&str, SourceError> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(SourceError::InvalidPath(path.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{FetchResponse, SiteSource, SourceError};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory site that records every requested path.
    #[derive(Default)]
    pub struct MemorySite {
        files: HashMap<String, FetchResponse>,
        offline: Vec<String>,
        pub requests: RefCell<Vec<String>>,
    }

    impl MemorySite {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(mut self, path: &str, body: &str) -> Self {
            self.files.insert(
                path.to_string(),
                FetchResponse {
                    status: 200,
                    body: body.to_string(),
                },
            );
            self
        }

        pub fn with_status(mut self, path: &str, status: u16, body: &str) -> Self {
            self.files.insert(
                path.to_string(),
                FetchResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }

        /// Makes `path` fail at the transport level.
        pub fn with_offline(mut self, path: &str) -> Self {
            self.offline.push(path.to_string());
            self
        }
    }

    impl SiteSource for MemorySite {
        async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError> {
            self.requests.borrow_mut().push(path.to_string());
            if self.offline.iter().any(|p| p == path) {
                return Err(SourceError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }
            Ok(self.files.get(path).cloned().unwrap_or(FetchResponse {
                status: 404,
                body: String::from("Not Found"),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemorySite;
    use super::*;

    #[test]
    fn clean_relative_strips_and_rejects() {
        assert_eq!(clean_relative("/series.json").unwrap(), "series.json");
        assert_eq!(
            clean_relative("episode-data/foo-s1.json").unwrap(),
            "episode-data/foo-s1.json"
        );
        assert!(clean_relative("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn fetch_json_distinguishes_status_and_parse_errors() {
        let site = MemorySite::new()
            .with_file("good.json", "[1, 2]")
            .with_file("bad.json", "[1, ")
            .with_status("gone.json", 410, "");

        let good: Vec<u8> = fetch_json(&site, "good.json").await.unwrap();
        assert_eq!(good, vec![1, 2]);

        let bad = fetch_json::<Vec<u8>, _>(&site, "bad.json").await.unwrap_err();
        assert!(matches!(bad, LoadError::Parse { .. }));

        let gone = fetch_json::<Vec<u8>, _>(&site, "gone.json").await.unwrap_err();
        assert!(matches!(gone, LoadError::Status { status: 410, .. }));
    }
}
