use anyhow::{Result, anyhow};
use dirs_next::data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalogue::CatalogueFilter;
use crate::json_file;
use crate::query::PageQuery;
use crate::types::Track;

/// Listing choices that survive across runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub track: Option<Track>,
    #[serde(default, rename = "subLang")]
    pub sub_lang: Option<String>,
}

impl Preferences {
    pub fn load(path: &Path) -> Result<Self> {
        json_file::load_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        json_file::save(path, self)
    }

    /// Query values win over stored ones; then `dubbed` / `en`.
    pub fn filter_for(&self, query: &PageQuery, search: &str) -> CatalogueFilter {
        let track = query.track().or(self.track).unwrap_or_default();
        let language = query
            .lang
            .clone()
            .or_else(|| self.sub_lang.clone())
            .unwrap_or_else(|| String::from("en"))
            .to_lowercase();
        CatalogueFilter {
            track,
            language,
            search: search.to_string(),
        }
    }

    /// Remembers the pills the user picked.
    pub fn remember(&mut self, filter: &CatalogueFilter) {
        self.track = Some(filter.track);
        if filter.track == Track::Sub {
            self.sub_lang = Some(filter.language.clone());
        }
    }
}

pub fn preferences_path(data_dir_override: Option<&Path>) -> Result<PathBuf> {
    let base = match data_dir_override {
        Some(dir) => dir.to_path_buf(),
        None => data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?,
    };
    Ok(base.join("smtv").join("preferences.json"))
}
