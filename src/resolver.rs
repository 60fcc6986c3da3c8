//! Season manifest resolution.
//!
//! [`ManifestResolver::resolve`] probes the candidates produced by a
//! [`CandidatePolicy`] one after another. The first candidate that answers
//! with a success status *and* parses as an episode list wins. Every probe is
//! recorded in the trace, so a failure can name the exact file to fix.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::candidates::{CandidatePath, CandidatePolicy};
use crate::request::EpisodeManifestRequest;
use crate::sources::SiteSource;
use crate::types::{EpisodeRecord, Manifest};

/// Outcome of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchAttempt {
    pub path: String,
    pub succeeded_http: bool,
    pub http_status: Option<u16>,
    pub parse_error: Option<String>,
    pub transport_error: Option<String>,
}

impl FetchAttempt {
    pub fn is_parse_failure(&self) -> bool {
        self.parse_error.is_some()
    }
}

impl fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.path)?;
        match (
            &self.transport_error,
            self.http_status,
            &self.parse_error,
        ) {
            (Some(err), _, _) => write!(f, "no response ({err})"),
            (None, Some(status), Some(err)) => write!(f, "HTTP {status}, json-parse: {err}"),
            (None, Some(status), None) if self.succeeded_http => write!(f, "HTTP {status}, ok"),
            (None, Some(status), None) => write!(f, "HTTP {status}"),
            (None, None, _) => f.write_str("not attempted"),
        }
    }
}

/// Why a resolution failed, judged by its last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCategory {
    /// The last candidate answered but its body was not a valid manifest.
    MalformedManifest,
    /// The last candidate could not be fetched.
    ManifestMissing,
}

impl FailureCategory {
    pub fn headline(self) -> &'static str {
        match self {
            FailureCategory::MalformedManifest => "JSON file has syntax error",
            FailureCategory::ManifestMissing => "Episode file not found",
        }
    }
}

/// No candidate produced a manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub trace: Vec<FetchAttempt>,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = self.category();
        match self.last_attempt() {
            Some(last) if category == FailureCategory::MalformedManifest => {
                write!(f, "{} (check file: {})", category.headline(), last.path)
            }
            Some(last) => write!(f, "{} (looking for: {})", category.headline(), last.path),
            None => f.write_str(category.headline()),
        }
    }
}

impl ResolutionFailure {
    pub fn last_attempt(&self) -> Option<&FetchAttempt> {
        self.trace.last()
    }

    pub fn category(&self) -> FailureCategory {
        match self.last_attempt() {
            Some(attempt) if attempt.is_parse_failure() => FailureCategory::MalformedManifest,
            _ => FailureCategory::ManifestMissing,
        }
    }
}

/// A successfully resolved season.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub episodes: Vec<EpisodeRecord>,
    pub trace: Vec<FetchAttempt>,
}

impl Resolution {
    /// Path of the manifest that was used.
    pub fn manifest_path(&self) -> &str {
        self.trace.last().map(|a| a.path.as_str()).unwrap_or_default()
    }
}

pub struct ManifestResolver<S> {
    source: S,
    policy: CandidatePolicy,
}

impl<S: SiteSource> ManifestResolver<S> {
    pub fn new(source: S, policy: CandidatePolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &CandidatePolicy {
        &self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn candidates(&self, request: &EpisodeManifestRequest) -> Vec<CandidatePath> {
        self.policy.candidates(request)
    }

    pub async fn resolve(
        &self,
        request: &EpisodeManifestRequest,
    ) -> Result<Resolution, ResolutionFailure> {
        let mut trace = Vec::new();

        for candidate in self.candidates(request) {
            let path = candidate.relative_path();
            let response = match self.source.fetch(&path).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(%path, error = %err, "candidate unreachable");
                    trace.push(FetchAttempt {
                        path,
                        succeeded_http: false,
                        http_status: None,
                        parse_error: None,
                        transport_error: Some(err.to_string()),
                    });
                    continue;
                }
            };

            let mut attempt = FetchAttempt {
                path,
                succeeded_http: response.is_success(),
                http_status: Some(response.status),
                parse_error: None,
                transport_error: None,
            };
            if !attempt.succeeded_http {
                tracing::debug!(path = %attempt.path, status = response.status, "candidate missing");
                trace.push(attempt);
                continue;
            }

            match serde_json::from_str::<Manifest>(&response.body) {
                Ok(Manifest(episodes)) => {
                    tracing::info!(
                        %request,
                        path = %attempt.path,
                        episodes = episodes.len(),
                        attempts = trace.len() + 1,
                        "resolved manifest"
                    );
                    trace.push(attempt);
                    return Ok(Resolution { episodes, trace });
                }
                Err(err) => {
                    tracing::debug!(path = %attempt.path, error = %err, "candidate is not a manifest");
                    attempt.parse_error = Some(err.to_string());
                    trace.push(attempt);
                }
            }
        }

        let failure = ResolutionFailure { trace };
        tracing::warn!(%request, attempts = failure.trace.len(), "{failure}");
        Err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::MemorySite;
    use crate::types::Language;

    fn resolver(site: MemorySite) -> ManifestResolver<MemorySite> {
        ManifestResolver::new(site, CandidatePolicy::default())
    }

    #[tokio::test]
    async fn language_request_falls_back_to_base_path() {
        let site = MemorySite::new()
            .with_file("episode-data/foo-s2.json", r#"[{"ep":1,"title":"One"}]"#)
            .with_file("episode-data/foo-s2-hi.json", r#"[{"ep":1,"title":"Ek"}]"#);
        let resolver = resolver(site);
        let request = EpisodeManifestRequest::new("foo", 2)
            .unwrap()
            .with_language(Some(Language::Hi));

        let resolution = resolver.resolve(&request).await.unwrap();
        assert_eq!(resolution.trace.len(), 2);
        assert_eq!(resolution.trace[0].path, "episode-data/foo-hi-sub-s2.json");
        assert_eq!(resolution.trace[0].http_status, Some(404));
        assert!(!resolution.trace[0].succeeded_http);
        assert_eq!(resolution.manifest_path(), "episode-data/foo-s2.json");
        assert_eq!(resolution.episodes[0].title.as_deref(), Some("One"));
        assert_eq!(resolver.source().requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn malformed_candidate_does_not_abort() {
        let site = MemorySite::new()
            .with_file("episode-data/foo-s1.json", "[{\"ep\": 1,")
            .with_file("episode-data/foo-s1-en.json", r#"[{"ep":"1"}]"#);
        let resolution = resolver(site)
            .resolve(&EpisodeManifestRequest::new("foo", 1).unwrap())
            .await
            .unwrap();

        assert_eq!(resolution.trace.len(), 2);
        let first = &resolution.trace[0];
        assert!(first.succeeded_http);
        assert!(first.parse_error.is_some());
        assert_eq!(resolution.manifest_path(), "episode-data/foo-s1-en.json");
    }

    #[tokio::test]
    async fn off_type_fields_do_not_reject_a_manifest() {
        let site = MemorySite::new()
            .with_file(
                "episode-data/foo-s1.json",
                r#"[{"ep":1,"title":"One"},{"ep":2,"title":2,"thumb":["x"],"shortlink":true},null]"#,
            )
            .with_file("episode-data/foo-s1-ur.json", r#"[{"ep":1,"title":"Urdu"}]"#);
        let resolution = resolver(site)
            .resolve(&EpisodeManifestRequest::new("foo", 1).unwrap())
            .await
            .unwrap();

        assert_eq!(resolution.manifest_path(), "episode-data/foo-s1.json");
        assert_eq!(resolution.trace.len(), 1);
        assert_eq!(resolution.episodes.len(), 2);
        let second = &resolution.episodes[1];
        assert_eq!(second.title.as_deref(), Some("2"));
        assert_eq!(second.thumb, None);
        assert_eq!(second.shortlink.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn non_array_body_is_a_parse_failure() {
        let site = MemorySite::new()
            .with_file("episode-data/foo-s1.json", r#"{"ep":1}"#)
            .with_file("episode-data/foo-s1-en.json", "[]");
        let resolution = resolver(site)
            .resolve(&EpisodeManifestRequest::new("foo", 1).unwrap())
            .await
            .unwrap();
        assert!(resolution.trace[0].is_parse_failure());
        assert_eq!(resolution.manifest_path(), "episode-data/foo-s1-en.json");
    }

    #[tokio::test]
    async fn exhausted_candidates_keep_full_trace_in_order() {
        let resolver = resolver(MemorySite::new());
        let request = EpisodeManifestRequest::new("foo", 3).unwrap();
        let expected: Vec<String> = resolver
            .candidates(&request)
            .iter()
            .map(CandidatePath::relative_path)
            .collect();

        let failure = resolver.resolve(&request).await.unwrap_err();
        let tried: Vec<String> = failure.trace.iter().map(|a| a.path.clone()).collect();
        assert_eq!(tried, expected);
        assert_eq!(failure.category(), FailureCategory::ManifestMissing);
        assert_eq!(*resolver.source().requests.borrow(), expected);
    }

    #[tokio::test]
    async fn multi_source_missing_variant_tries_once() {
        let site = MemorySite::new().with_file("episode-data/barbarossa-s1.json", "[]");
        let resolver = resolver(site);
        let request = EpisodeManifestRequest::new("barbarossa", 1)
            .unwrap()
            .with_source(2);

        let failure = resolver.resolve(&request).await.unwrap_err();
        assert_eq!(failure.trace.len(), 1);
        assert_eq!(failure.trace[0].path, "episode-data/barbarossa-s1-source2.json");
        assert_eq!(failure.category(), FailureCategory::ManifestMissing);
        assert_eq!(
            failure.to_string(),
            "Episode file not found (looking for: episode-data/barbarossa-s1-source2.json)"
        );
    }

    #[tokio::test]
    async fn last_parse_error_marks_malformed() {
        let site = MemorySite::new()
            .with_file("episode-data/barbarossa-s1.json", "{ not json");
        let failure = resolver(site)
            .resolve(&EpisodeManifestRequest::new("barbarossa", 1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(failure.category(), FailureCategory::MalformedManifest);
        assert!(failure.to_string().starts_with("JSON file has syntax error"));
    }

    #[tokio::test]
    async fn transport_errors_are_recorded_and_skipped() {
        let site = MemorySite::new()
            .with_offline("episode-data/foo-s1.json")
            .with_file("episode-data/foo-s1-en.json", "[]");
        let resolution = resolver(site)
            .resolve(&EpisodeManifestRequest::new("foo", 1).unwrap())
            .await
            .unwrap();
        let first = &resolution.trace[0];
        assert!(!first.succeeded_http);
        assert_eq!(first.http_status, None);
        assert!(first.transport_error.is_some());
        assert!(resolution.episodes.is_empty());
    }

    #[tokio::test]
    async fn error_status_body_is_never_parsed() {
        let site = MemorySite::new()
            .with_status("episode-data/foo-s1.json", 500, "[]")
            .with_file("episode-data/foo-s1-en.json", r#"[{"ep":2}]"#);
        let resolution = resolver(site)
            .resolve(&EpisodeManifestRequest::new("foo", 1).unwrap())
            .await
            .unwrap();
        assert_eq!(resolution.trace[0].http_status, Some(500));
        assert_eq!(resolution.episodes[0].ep, "2");
    }
}
