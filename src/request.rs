use std::fmt;
use thiserror::Error;

use crate::types::Language;

/// Errors raised while building an [`EpisodeManifestRequest`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("series slug must not be empty")]
    EmptySlug,
    #[error("season '{0}' is not a positive integer")]
    InvalidSeason(String),
    #[error("source '{0}' is not a positive integer")]
    InvalidSource(String),
}

/// What to resolve: one season of one series, optionally narrowed by language
/// and alternate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeManifestRequest {
    slug: String,
    season: u32,
    language: Option<Language>,
    source: u8,
}

impl EpisodeManifestRequest {
    pub fn new(slug: impl Into<String>, season: u32) -> Result<Self, RequestError> {
        let slug = slug.into().trim().to_string();
        if slug.is_empty() {
            return Err(RequestError::EmptySlug);
        }
        if season == 0 {
            return Err(RequestError::InvalidSeason(season.to_string()));
        }
        Ok(Self {
            slug,
            season,
            language: None,
            source: 1,
        })
    }

    /// Builds a request from raw query-string values.
    pub fn from_params(
        slug: &str,
        season: &str,
        language: Option<Language>,
        source: Option<&str>,
    ) -> Result<Self, RequestError> {
        let season = parse_positive(season).ok_or_else(|| RequestError::InvalidSeason(season.to_string()))?;
        let mut request = Self::new(slug, season)?.with_language(language);
        if let Some(raw) = source {
            let source = parse_positive(raw)
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| RequestError::InvalidSource(raw.to_string()))?;
            request = request.with_source(source);
        }
        Ok(request)
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    /// Values below 1 clamp to the default source.
    pub fn with_source(mut self, source: u8) -> Self {
        self.source = source.max(1);
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn season(&self) -> u32 {
        self.season
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn source(&self) -> u8 {
        self.source
    }
}

impl fmt::Display for EpisodeManifestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} season {}", self.slug, self.season)?;
        if let Some(language) = self.language {
            write!(f, " [{language}]")?;
        }
        if self.source != 1 {
            write!(f, " source {}", self.source)?;
        }
        Ok(())
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_slug_and_zero_season() {
        assert_eq!(EpisodeManifestRequest::new("  ", 1), Err(RequestError::EmptySlug));
        assert!(matches!(
            EpisodeManifestRequest::new("foo", 0),
            Err(RequestError::InvalidSeason(_))
        ));
    }

    #[test]
    fn parses_query_values() {
        let request =
            EpisodeManifestRequest::from_params("foo", "2", Some(Language::Hi), Some("2")).unwrap();
        assert_eq!(request.slug(), "foo");
        assert_eq!(request.season(), 2);
        assert_eq!(request.language(), Some(Language::Hi));
        assert_eq!(request.source(), 2);

        let request = EpisodeManifestRequest::from_params("foo", " 3 ", None, None).unwrap();
        assert_eq!(request.source(), 1);

        assert!(matches!(
            EpisodeManifestRequest::from_params("foo", "abc", None, None),
            Err(RequestError::InvalidSeason(_))
        ));
        assert!(matches!(
            EpisodeManifestRequest::from_params("foo", "1", None, Some("x")),
            Err(RequestError::InvalidSource(_))
        ));
    }
}
