use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{FetchResponse, SiteSource, SourceError, clean_relative};

/// A local mirror of the static site.
///
/// Missing files answer with status 404 so the resolver treats them exactly
/// like a missing file on the web server.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SiteSource for DirectorySource {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, SourceError> {
        let file = self.root.join(clean_relative(path)?);
        match tokio::fs::read_to_string(&file).await {
            Ok(body) => Ok(FetchResponse { status: 200, body }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(FetchResponse {
                status: 404,
                body: String::new(),
            }),
            Err(err) => Err(SourceError::Io(err)),
        }
    }
}
