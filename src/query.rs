//! Page query parameters and the links between pages.

use url::Url;
use url::form_urlencoded;

use crate::types::{Language, Track};

pub const SERIES_PAGE: &str = "series.html";
pub const EPISODE_PAGE: &str = "episode.html";

/// Query parameters a page reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub series: Option<String>,
    pub season: Option<String>,
    pub ep: Option<String>,
    pub lang: Option<String>,
    pub source: Option<String>,
    pub track: Option<String>,
    pub v: Option<String>,
}

impl PageQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = value.trim().to_string();
            let slot = match key.as_ref() {
                "series" => &mut parsed.series,
                "season" => &mut parsed.season,
                "ep" => &mut parsed.ep,
                "lang" => &mut parsed.lang,
                "source" => &mut parsed.source,
                "track" => &mut parsed.track,
                "v" => &mut parsed.v,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value);
            }
        }
        parsed
    }

    /// The page's cache-bust token, which wins over the configured one.
    pub fn cache_token(&self) -> Option<&str> {
        self.v.as_deref()
    }

    pub fn from_url(url: &Url) -> Self {
        Self::parse(url.query().unwrap_or_default())
    }

    /// Season, defaulting to "1".
    pub fn season(&self) -> &str {
        self.season.as_deref().unwrap_or("1")
    }

    /// Known language, or `None` for absent or unrecognized values.
    pub fn language(&self) -> Option<Language> {
        let raw = self.lang.as_deref()?;
        match raw.parse() {
            Ok(language) => Some(language),
            Err(err) => {
                tracing::warn!("ignoring lang parameter: {err}");
                None
            }
        }
    }

    pub fn track(&self) -> Option<Track> {
        self.track.as_deref().and_then(|raw| raw.parse().ok())
    }
}

/// Which page a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Index,
    Series,
    Episode,
}

/// Classifies a page URL by its file name.
pub fn page_kind(url: &Url) -> PageKind {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    match name {
        SERIES_PAGE => PageKind::Series,
        EPISODE_PAGE => PageKind::Episode,
        _ => PageKind::Index,
    }
}

/// Link to the in-app episode page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLink {
    pub series: String,
    pub season: String,
    pub episode: String,
    pub lang: Option<String>,
    pub source: Option<u8>,
}

impl EpisodeLink {
    pub fn href(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("series", &self.series)
            .append_pair("season", &self.season)
            .append_pair("ep", &self.episode);
        if let Some(lang) = self.lang.as_deref().filter(|l| !l.is_empty()) {
            query.append_pair("lang", lang);
        }
        if let Some(source) = self.source {
            query.append_pair("source", &source.to_string());
        }
        format!("{EPISODE_PAGE}?{}", query.finish())
    }
}

/// Link back to a series page on a given season.
pub fn series_href(slug: &str, season: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("series", slug);
    if let Some(season) = season {
        query.append_pair("season", season);
    }
    format!("{SERIES_PAGE}?{}", query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_query_with_defaults() {
        let query = PageQuery::parse("?series=foo&lang=HI&source=2&utm=x");
        assert_eq!(query.series.as_deref(), Some("foo"));
        assert_eq!(query.season(), "1");
        assert_eq!(query.language(), Some(Language::Hi));
        assert_eq!(query.source.as_deref(), Some("2"));
        assert_eq!(query.ep, None);

        let query = PageQuery::parse("series=foo&lang=fr&track=sub&season=");
        assert_eq!(query.language(), None);
        assert_eq!(query.track(), Some(Track::Sub));
        assert_eq!(query.season(), "1");
    }

    #[test]
    fn classifies_page_urls() {
        let url = Url::parse("https://site.example/series.html?series=foo").unwrap();
        assert_eq!(page_kind(&url), PageKind::Series);
        let url = Url::parse("https://site.example/a/episode.html?series=foo&ep=1").unwrap();
        assert_eq!(page_kind(&url), PageKind::Episode);
        let url = Url::parse("https://site.example/").unwrap();
        assert_eq!(page_kind(&url), PageKind::Index);
    }

    #[test]
    fn builds_episode_and_series_links() {
        let link = EpisodeLink {
            series: String::from("barbarossa"),
            season: String::from("1"),
            episode: String::from("4"),
            lang: None,
            source: Some(2),
        };
        assert_eq!(
            link.href(),
            "episode.html?series=barbarossa&season=1&ep=4&source=2"
        );
        assert_eq!(series_href("foo bar", Some("2")), "series.html?series=foo+bar&season=2");
    }
}
