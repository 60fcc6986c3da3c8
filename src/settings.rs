use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::candidates::{CandidatePolicy, DEFAULT_MULTI_SOURCE_SERIES};
use crate::sources::{DirectorySource, HttpSource, Site, http::USER_AGENT};
use crate::types::Language;

pub const ENV_PREFIX: &str = "SMTV";

/// Effective configuration: defaults, then the TOML file, then `SMTV_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the site, or a local directory holding a mirror of it.
    pub site: String,
    /// Fixed cache-bust token; a random nonce per request when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_token: Option<String>,
    pub multi_source_series: Vec<String>,
    pub extended_fallbacks: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Command used to open player URLs; the system opener when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site: String::from("http://localhost:8080/"),
            cache_token: None,
            multi_source_series: DEFAULT_MULTI_SOURCE_SERIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extended_fallbacks: true,
            timeout_secs: 15,
            user_agent: USER_AGENT.to_string(),
            player: None,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or the default location) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("site", defaults.site.clone())?
            .set_default("multi_source_series", defaults.multi_source_series.clone())?
            .set_default("extended_fallbacks", defaults.extended_fallbacks)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("user_agent", defaults.user_agent.clone())?;

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("multi_source_series"),
            )
            .build()
            .context("failed to read configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize settings")
    }

    pub fn policy(&self) -> CandidatePolicy {
        CandidatePolicy::new(
            self.multi_source_series.iter().cloned(),
            Language::ALL,
            self.extended_fallbacks,
        )
    }

    /// Builds the HTTP or directory source the `site` setting points at.
    pub fn site(&self) -> Result<Site> {
        let location = self.site.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            let source = HttpSource::builder(location)
                .cache_token(self.cache_token.clone())
                .timeout(Duration::from_secs(self.timeout_secs))
                .user_agent(self.user_agent.clone())
                .build()
                .with_context(|| format!("invalid site URL {location}"))?;
            return Ok(Site::Http(source));
        }
        let root = PathBuf::from(location);
        if !root.is_dir() {
            return Err(anyhow!(
                "site '{location}' is neither an http(s) URL nor a directory"
            ));
        }
        Ok(Site::Directory(DirectorySource::new(root)))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("smtv").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "site = \"https://stream.example/\"\nmulti_source_series = [\"barbarossa\", \"osman\"]\nextended_fallbacks = false\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.site, "https://stream.example/");
        assert_eq!(settings.multi_source_series, vec!["barbarossa", "osman"]);
        assert!(!settings.extended_fallbacks);
        assert_eq!(settings.timeout_secs, 15);
        assert!(settings.policy().is_multi_source("osman"));
        assert!(matches!(settings.site().unwrap(), Site::Http(_)));
    }

    #[test]
    fn defaults_serialize_to_loadable_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, Settings::default().to_toml().unwrap()).unwrap();
        let loaded = Settings::load(Some(&path)).unwrap();
        assert_eq!(loaded.multi_source_series, Settings::default().multi_source_series);
        assert_eq!(loaded.user_agent, USER_AGENT);
    }

    #[test]
    fn directory_site_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            site: dir.path().display().to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.site().unwrap(), Site::Directory(_)));

        let settings = Settings {
            site: dir.path().join("missing").display().to_string(),
            ..Settings::default()
        };
        assert!(settings.site().is_err());
    }
}
