use serde::Deserialize;
use serde_json::Value;

use crate::sources::{LoadError, SiteSource, fetch_json};
use crate::types::{SeriesMeta, Track};

pub const CATALOGUE_PATH: &str = "series.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogueFile {
    List(Vec<Value>),
    Wrapped { series: Vec<Value> },
}

/// The full series catalogue, loaded once per page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    series: Vec<SeriesMeta>,
}

impl Catalogue {
    pub fn new(series: Vec<SeriesMeta>) -> Self {
        Self { series }
    }

    pub async fn load<S: SiteSource>(source: &S) -> Result<Self, LoadError> {
        let file: CatalogueFile = fetch_json(source, CATALOGUE_PATH).await?;
        let entries = match file {
            CatalogueFile::List(entries) | CatalogueFile::Wrapped { series: entries } => entries,
        };
        let total = entries.len();
        let series: Vec<SeriesMeta> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match SeriesMeta::deserialize(entry) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    tracing::warn!(index, error = %err, "skipping catalogue entry");
                    None
                }
            })
            .collect();
        tracing::debug!(series = series.len(), skipped = total - series.len(), "loaded catalogue");
        Ok(Self { series })
    }

    pub fn series(&self) -> &[SeriesMeta] {
        &self.series
    }

    pub fn find(&self, slug: &str) -> Option<&SeriesMeta> {
        self.series.iter().find(|s| s.slug == slug)
    }

    /// Entries shown on the home grid for the given filter.
    pub fn listing(&self, filter: &CatalogueFilter) -> Vec<&SeriesMeta> {
        let query = filter.search.trim().to_lowercase();
        self.series
            .iter()
            .filter(|s| match filter.track {
                Track::Dubbed => s.track == Some(Track::Dubbed),
                Track::Sub => {
                    s.track == Some(Track::Sub)
                        && s.sub_lang.as_deref() == Some(filter.language.as_str())
                }
            })
            .filter(|s| query.is_empty() || s.title.to_lowercase().contains(&query))
            .collect()
    }
}

/// Home grid filter: track pill, subtitle language pill and search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueFilter {
    pub track: Track,
    pub language: String,
    pub search: String,
}

impl Default for CatalogueFilter {
    fn default() -> Self {
        Self {
            track: Track::Dubbed,
            language: String::from("en"),
            search: String::new(),
        }
    }
}
