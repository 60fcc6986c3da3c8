use thiserror::Error;

use crate::request::RequestError;
use crate::resolver::{FailureCategory, ResolutionFailure};
use crate::sources::LoadError;

/// Everything that can keep a page from rendering its content.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("missing required parameter '{0}'")]
    NotFound(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] RequestError),
    #[error("catalogue unavailable: {0}")]
    CatalogueUnavailable(#[source] LoadError),
    #[error("series '{0}' is not in the catalogue")]
    SeriesNotInCatalogue(String),
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),
    #[error("episode {episode} not found in {manifest}")]
    EpisodeNotInManifest { episode: String, manifest: String },
}

/// What the diagnostic panel shows in place of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub headline: String,
    pub detail: Option<String>,
}

impl PageError {
    pub fn failure_category(&self) -> Option<FailureCategory> {
        match self {
            PageError::Resolution(failure) => Some(failure.category()),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            PageError::NotFound(param) => Diagnostic {
                headline: String::from("Page not found"),
                detail: Some(format!("Missing '{param}' in the page address")),
            },
            PageError::InvalidParameter(err) => Diagnostic {
                headline: String::from("Page not found"),
                detail: Some(err.to_string()),
            },
            PageError::CatalogueUnavailable(err) => Diagnostic {
                headline: String::from("Series list unavailable"),
                detail: Some(err.to_string()),
            },
            PageError::SeriesNotInCatalogue(slug) => Diagnostic {
                headline: String::from("Series not found"),
                detail: Some(format!("No catalogue entry for '{slug}'")),
            },
            PageError::Resolution(failure) => {
                let category = failure.category();
                let detail = failure.last_attempt().map(|last| match category {
                    FailureCategory::MalformedManifest => format!("Check file: {}", last.path),
                    FailureCategory::ManifestMissing => format!("Looking for: {}", last.path),
                });
                Diagnostic {
                    headline: category.headline().to_string(),
                    detail,
                }
            }
            PageError::EpisodeNotInManifest { episode, manifest } => Diagnostic {
                headline: format!("Episode not found (ep={episode})"),
                detail: Some(format!("Checked: {manifest}")),
            },
        }
    }
}
