//! Candidate manifest locations for a season.
//!
//! Manifests are hand-authored and their names drifted over time: some seasons
//! carry a language suffix, some a `-sub` marker, and a few series publish an
//! alternate `-source2` list for their first season. [`CandidatePolicy`] turns a
//! request into the ordered list of file stems worth probing.

use std::fmt;

use crate::request::EpisodeManifestRequest;
use crate::types::Language;

/// Directory under the site root that holds the season manifests.
pub const EPISODE_DATA_DIR: &str = "episode-data";

/// Series that publish alternate sources for season 1.
pub const DEFAULT_MULTI_SOURCE_SERIES: &[&str] = &["barbarossa"];

/// One location the resolver may probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePath {
    stem: String,
}

impl CandidatePath {
    fn new(stem: String) -> Self {
        Self { stem }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Path relative to the site root, e.g. `episode-data/foo-s2.json`.
    pub fn relative_path(&self) -> String {
        format!("{EPISODE_DATA_DIR}/{}.json", self.stem)
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePolicy {
    multi_source_series: Vec<String>,
    language_fallbacks: Vec<Language>,
    extended_fallbacks: bool,
}

impl Default for CandidatePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MULTI_SOURCE_SERIES.iter().map(|s| s.to_string()),
            Language::ALL,
            true,
        )
    }
}

impl CandidatePolicy {
    pub fn new(
        multi_source_series: impl IntoIterator<Item = String>,
        language_fallbacks: impl IntoIterator<Item = Language>,
        extended_fallbacks: bool,
    ) -> Self {
        Self {
            multi_source_series: multi_source_series
                .into_iter()
                .map(|slug| slug.trim().to_string())
                .filter(|slug| !slug.is_empty())
                .collect(),
            language_fallbacks: language_fallbacks.into_iter().collect(),
            extended_fallbacks,
        }
    }

    pub fn is_multi_source(&self, slug: &str) -> bool {
        self.multi_source_series.iter().any(|s| s == slug)
    }

    /// Whether the source selector applies to this series and season.
    pub fn has_source_variants(&self, slug: &str, season: u32) -> bool {
        season == 1 && self.is_multi_source(slug)
    }

    pub fn candidates(&self, request: &EpisodeManifestRequest) -> Vec<CandidatePath> {
        let slug = request.slug();
        let season = request.season();

        if self.has_source_variants(slug, season) {
            let stem = if request.source() == 2 {
                format!("{slug}-s{season}-source2")
            } else {
                format!("{slug}-s{season}")
            };
            return vec![CandidatePath::new(stem)];
        }

        let mut stems = Vec::new();
        if let Some(lang) = request.language() {
            stems.push(format!("{slug}-{lang}-sub-s{season}"));
        }
        stems.push(format!("{slug}-s{season}"));
        if let Some(lang) = request.language() {
            stems.push(format!("{slug}-s{season}-{lang}"));
        }
        for lang in &self.language_fallbacks {
            stems.push(format!("{slug}-s{season}-{lang}"));
        }
        if self.extended_fallbacks {
            stems.push(format!("{slug}-s{season}-sub"));
            stems.push(format!("{slug}-s{season}-en-sub"));
        }

        let mut candidates: Vec<CandidatePath> = Vec::with_capacity(stems.len());
        for stem in stems {
            if !candidates.iter().any(|c| c.stem == stem) {
                candidates.push(CandidatePath::new(stem));
            }
        }
        candidates
    }
}
