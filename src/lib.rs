//! smtv - browse a static video-streaming catalogue from the terminal.
//!
//! The site is a tree of hand-authored JSON files: `series.json`, one manifest
//! per season under `episode-data/`, `shedule.json` and `config.json`. The
//! interesting part is [`resolver::ManifestResolver`], which finds the right
//! season manifest across the site's historical naming schemes.

pub mod candidates;
pub mod catalogue;
pub mod controller;
pub mod error;
pub mod flags;
pub mod json_file;
pub mod latest;
pub mod player;
pub mod preferences;
pub mod query;
pub mod request;
pub mod resolver;
pub mod schedule;
pub mod settings;
pub mod sources;
pub mod types;

pub use candidates::{CandidatePath, CandidatePolicy};
pub use controller::PageController;
pub use error::{Diagnostic, PageError};
pub use request::EpisodeManifestRequest;
pub use resolver::{FailureCategory, FetchAttempt, ManifestResolver, Resolution, ResolutionFailure};
pub use sources::{DirectorySource, HttpSource, Site, SiteSource};
