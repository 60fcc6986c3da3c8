use chrono::{DateTime, Utc};

use crate::sources::{LoadError, SiteSource, fetch_json};
use crate::types::{EpisodeRecord, Manifest, non_empty};

pub const LATEST_INDEX_PATH: &str = "episode-data/index.json";
pub const LATEST_LIMIT: usize = 5;

/// A recently published episode and the manifest it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestEpisode {
    pub record: EpisodeRecord,
    pub manifest: String,
    pub published_at: DateTime<Utc>,
}

impl LatestEpisode {
    pub fn watch_link(&self) -> Option<&str> {
        self.record
            .shortlink()
            .or_else(|| non_empty(self.record.download.as_deref()))
    }
}

/// Newest episodes across every manifest listed in the index.
///
/// The index itself must load; individual manifests that fail count as empty.
pub async fn load_latest<S: SiteSource>(
    source: &S,
    limit: usize,
) -> Result<Vec<LatestEpisode>, LoadError> {
    let manifests: Vec<String> = fetch_json(source, LATEST_INDEX_PATH).await?;

    let mut latest = Vec::new();
    for manifest in manifests {
        let records = match fetch_json::<Manifest, _>(source, &manifest).await {
            Ok(Manifest(records)) => records,
            Err(err) => {
                tracing::debug!(%manifest, error = %err, "skipping manifest");
                continue;
            }
        };
        latest.extend(records.into_iter().filter_map(|record| {
            let published_at = record.published_at()?;
            Some(LatestEpisode {
                record,
                manifest: manifest.clone(),
                published_at,
            })
        }));
    }

    latest.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    latest.truncate(limit);
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::MemorySite;

    #[tokio::test]
    async fn picks_newest_timestamped_records() {
        let site = MemorySite::new()
            .with_file(
                LATEST_INDEX_PATH,
                r#"["episode-data/a-s1.json", "episode-data/b-s1.json", "episode-data/gone.json"]"#,
            )
            .with_file(
                "episode-data/a-s1.json",
                r#"[{"ep":1,"timestamp":"2025-01-01T00:00:00Z","download":"https://dl/a1"},
                    {"ep":2,"timestamp":"2025-01-03T00:00:00Z","shortlink":"https://s/a2"},
                    {"ep":3}]"#,
            )
            .with_file(
                "episode-data/b-s1.json",
                r#"[{"ep":1,"timestamp":"2025-01-02T00:00:00Z"}]"#,
            );

        let latest = load_latest(&site, 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].manifest, "episode-data/a-s1.json");
        assert_eq!(latest[0].record.ep, "2");
        assert_eq!(latest[0].watch_link(), Some("https://s/a2"));
        assert_eq!(latest[1].manifest, "episode-data/b-s1.json");
        assert_eq!(latest[1].watch_link(), None);
    }
}
