//! Page controller: turns page queries into view models.
//!
//! The controller owns the only mutable view state. Renderers get read-only
//! snapshots. Each season load is stamped with a [`Ticket`]; a result is applied
//! only while its ticket is the newest one issued.

use crate::catalogue::Catalogue;
use crate::error::PageError;
use crate::flags::{Banner, ClickTarget};
use crate::query::{EpisodeLink, PageQuery, series_href};
use crate::request::EpisodeManifestRequest;
use crate::resolver::{ManifestResolver, Resolution, ResolutionFailure};
use crate::sources::SiteSource;
use crate::types::{EpisodeRecord, FeatureFlags, Language, SeriesMeta, find_episode, non_empty};

pub const DEFAULT_THUMB: &str = "default-thumb.jpg";

/// Sequence token of one season load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Whether a finished load made it into the view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    Stale,
}

/// Series and language the page is showing.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesContext {
    pub slug: String,
    pub language: Option<Language>,
    pub meta: Option<SeriesMeta>,
}

/// Last applied season load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeason {
    pub request: EpisodeManifestRequest,
    pub outcome: Result<Resolution, ResolutionFailure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub series: Option<SeriesContext>,
    pub season: Option<LoadedSeason>,
    pub loading: Option<Ticket>,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Episodes of the last successfully applied season.
    pub fn episodes(&self) -> &[EpisodeRecord] {
        match &self.season {
            Some(LoadedSeason {
                outcome: Ok(resolution),
                ..
            }) => &resolution.episodes,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHeader {
    pub slug: String,
    pub title: String,
    pub poster: String,
    pub description: String,
    pub seasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeCard {
    pub number: String,
    pub title: String,
    pub thumb: String,
    pub link: EpisodeLink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonView {
    pub season: String,
    pub source: u8,
    pub show_source_selector: bool,
    pub manifest: String,
    pub cards: Vec<EpisodeCard>,
}

/// Series page: the header always renders; the season area may hold a diagnostic.
#[derive(Debug)]
pub struct SeriesPage {
    pub header: SeriesHeader,
    pub season: Result<SeasonView, PageError>,
}

/// Third server: a direct link wins over embed markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThirdServer {
    Url(String),
    Embed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeView {
    pub series_title: String,
    pub title: String,
    pub episode: String,
    pub players: Vec<String>,
    pub third_server: Option<ThirdServer>,
    pub downloads: Vec<String>,
    pub back_href: String,
    pub banner: Option<Banner>,
    pub manifest: String,
}

pub struct PageController<S> {
    resolver: ManifestResolver<S>,
    flags: FeatureFlags,
    state: ViewState,
    issued: u64,
}

impl<S: SiteSource> PageController<S> {
    pub fn new(resolver: ManifestResolver<S>, flags: FeatureFlags) -> Self {
        Self {
            resolver,
            flags,
            state: ViewState::default(),
            issued: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn resolver(&self) -> &ManifestResolver<S> {
        &self.resolver
    }

    /// Starts a load and marks the page busy.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.state.loading = Some(ticket);
        ticket
    }

    /// Applies a finished load unless a newer one was issued meanwhile.
    pub fn apply(
        &mut self,
        ticket: Ticket,
        request: EpisodeManifestRequest,
        outcome: Result<Resolution, ResolutionFailure>,
    ) -> Applied {
        if ticket != Ticket(self.issued) {
            tracing::debug!(?ticket, latest = self.issued, %request, "discarding stale season load");
            return Applied::Stale;
        }
        self.state.loading = None;
        self.state.season = Some(LoadedSeason { request, outcome });
        Applied::Current
    }

    /// Loads the series page: catalogue entry plus the requested season.
    pub async fn open_series(&mut self, query: &PageQuery) -> Result<SeriesPage, PageError> {
        let slug = query.series.clone().ok_or(PageError::NotFound("series"))?;
        let catalogue = Catalogue::load(self.resolver.source())
            .await
            .map_err(PageError::CatalogueUnavailable)?;
        let meta = catalogue
            .find(&slug)
            .cloned()
            .ok_or_else(|| PageError::SeriesNotInCatalogue(slug.clone()))?;

        let header = SeriesHeader {
            slug: slug.clone(),
            title: meta.title.clone(),
            poster: meta.poster.clone(),
            description: meta.description().to_string(),
            seasons: meta.seasons(),
        };
        self.state.series = Some(SeriesContext {
            slug: slug.clone(),
            language: query.language(),
            meta: Some(meta),
        });

        let season = match EpisodeManifestRequest::from_params(
            &slug,
            query.season(),
            query.language(),
            query.source.as_deref(),
        ) {
            Ok(request) => self.load_season(request).await,
            Err(err) => Err(err.into()),
        };
        Ok(SeriesPage { header, season })
    }

    /// Switches the open series to another season, resetting the source.
    pub async fn switch_season(&mut self, season: &str) -> Result<SeasonView, PageError> {
        let context = self.state.series.clone().ok_or(PageError::NotFound("series"))?;
        let request =
            EpisodeManifestRequest::from_params(&context.slug, season, context.language, None)?;
        self.load_season(request).await
    }

    /// Reloads the current season from another source.
    pub async fn switch_source(&mut self, source: u8) -> Result<SeasonView, PageError> {
        let current = self
            .state
            .season
            .as_ref()
            .map(|loaded| loaded.request.clone())
            .ok_or(PageError::NotFound("season"))?;
        if !self
            .resolver
            .policy()
            .has_source_variants(current.slug(), current.season())
        {
            tracing::warn!(%current, "series has no alternate sources for this season");
        }
        self.load_season(current.with_source(source)).await
    }

    pub async fn load_season(
        &mut self,
        request: EpisodeManifestRequest,
    ) -> Result<SeasonView, PageError> {
        let ticket = self.issue();
        let outcome = self.resolver.resolve(&request).await;
        self.apply(ticket, request.clone(), outcome.clone());
        let resolution = outcome?;
        Ok(self.season_view(&request, &resolution))
    }

    fn season_view(&self, request: &EpisodeManifestRequest, resolution: &Resolution) -> SeasonView {
        let season = request.season().to_string();
        let has_variants = self
            .resolver
            .policy()
            .has_source_variants(request.slug(), request.season());
        let source_param = (has_variants && request.source() != 1).then_some(request.source());

        let cards = resolution
            .episodes
            .iter()
            .map(|record| EpisodeCard {
                number: record.ep.clone(),
                title: record.display_title(),
                thumb: non_empty(record.thumb.as_deref())
                    .unwrap_or(DEFAULT_THUMB)
                    .to_string(),
                link: EpisodeLink {
                    series: request.slug().to_string(),
                    season: season.clone(),
                    episode: record.ep.clone(),
                    lang: request.language().map(|l| l.as_str().to_string()),
                    source: source_param,
                },
            })
            .collect();

        SeasonView {
            season,
            source: request.source(),
            show_source_selector: has_variants,
            manifest: resolution.manifest_path().to_string(),
            cards,
        }
    }

    /// Where a click on an episode card leads.
    pub fn click(&self, link: &EpisodeLink) -> ClickTarget {
        self.flags.dispatch(link, self.state.episodes())
    }

    /// Loads the episode page. The catalogue only supplies the series title
    /// here, so its failure is not fatal.
    pub async fn open_episode(&mut self, query: &PageQuery) -> Result<EpisodeView, PageError> {
        let slug = query.series.clone().ok_or(PageError::NotFound("series"))?;
        let episode = query.ep.clone().ok_or(PageError::NotFound("ep"))?;
        let request = EpisodeManifestRequest::from_params(
            &slug,
            query.season(),
            query.language(),
            query.source.as_deref(),
        )?;

        let meta = match Catalogue::load(self.resolver.source()).await {
            Ok(catalogue) => catalogue.find(&slug).cloned(),
            Err(err) => {
                tracing::warn!(error = %err, "catalogue unavailable, using slug as title");
                None
            }
        };
        self.state.series = Some(SeriesContext {
            slug: slug.clone(),
            language: request.language(),
            meta: meta.clone(),
        });

        let ticket = self.issue();
        let outcome = self.resolver.resolve(&request).await;
        self.apply(ticket, request.clone(), outcome.clone());
        let resolution = outcome?;

        let record = find_episode(&resolution.episodes, &episode).ok_or_else(|| {
            PageError::EpisodeNotInManifest {
                episode: episode.clone(),
                manifest: resolution.manifest_path().to_string(),
            }
        })?;

        let series_title = meta
            .as_ref()
            .map(|m| m.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| slug.replace('-', " ").to_uppercase());
        let third_server = non_empty(record.watch3.as_deref())
            .map(|url| ThirdServer::Url(url.to_string()))
            .or_else(|| {
                non_empty(record.embed3.as_deref()).map(|markup| ThirdServer::Embed(markup.to_string()))
            });

        Ok(EpisodeView {
            series_title,
            title: record.display_title(),
            episode: record.ep.clone(),
            players: record.players().into_iter().map(str::to_string).collect(),
            third_server,
            downloads: record.downloads().into_iter().map(str::to_string).collect(),
            back_href: series_href(&slug, Some(&request.season().to_string())),
            banner: self.flags.banner(),
            manifest: resolution.manifest_path().to_string(),
        })
    }
}
