use serde::Deserialize;

use crate::query::EpisodeLink;
use crate::sources::{SiteSource, fetch_json};
use crate::types::{EpisodeRecord, FeatureFlags, find_episode};

pub const FLAGS_PATH: &str = "config.json";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlagsFile {
    redirection_features: FeatureFlags,
}

/// Loads the remote flags, falling back to sponsor-popup mode when they
/// cannot be fetched or parsed.
pub async fn load_flags<S: SiteSource>(source: &S) -> FeatureFlags {
    match fetch_json::<FlagsFile, _>(source, FLAGS_PATH).await {
        Ok(file) => {
            tracing::debug!(flags = ?file.redirection_features, "loaded feature flags");
            file.redirection_features
        }
        Err(err) => {
            tracing::warn!(error = %err, "feature flags unavailable, defaulting to sponsor popup");
            FeatureFlags::default()
        }
    }
}

/// Where an episode-card click leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Straight to the episode's external short link.
    Shortlink(String),
    /// The in-app episode page.
    EpisodePage(String),
}

impl ClickTarget {
    pub fn href(&self) -> &str {
        match self {
            ClickTarget::Shortlink(url) | ClickTarget::EpisodePage(url) => url,
        }
    }
}

/// Banner shown on the episode view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Premium,
    Sponsor,
}

impl FeatureFlags {
    pub fn shortlink_mode(&self) -> bool {
        self.shortlink && !self.sponsor_popup
    }

    pub fn banner(&self) -> Option<Banner> {
        match (self.shortlink, self.sponsor_popup) {
            (true, false) => Some(Banner::Premium),
            (false, true) => Some(Banner::Sponsor),
            _ => None,
        }
    }

    /// Decides the target of a click on `link`, looking the episode up in the
    /// currently loaded season.
    pub fn dispatch(&self, link: &EpisodeLink, episodes: &[EpisodeRecord]) -> ClickTarget {
        if self.shortlink_mode() {
            if let Some(url) = find_episode(episodes, &link.episode).and_then(EpisodeRecord::shortlink) {
                return ClickTarget::Shortlink(url.to_string());
            }
        }
        ClickTarget::EpisodePage(link.href())
    }
}
