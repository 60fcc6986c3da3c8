use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dialoguer::{FuzzySelect, Select, theme::ColorfulTheme};
use url::Url;

use smtv::catalogue::{Catalogue, CatalogueFilter};
use smtv::controller::{EpisodeView, SeasonView, SeriesPage, ThirdServer};
use smtv::flags::{Banner, ClickTarget, load_flags};
use smtv::latest::{LATEST_LIMIT, load_latest};
use smtv::player::{choose_server, launch, server_options};
use smtv::preferences::{Preferences, preferences_path};
use smtv::query::{PageKind, PageQuery, page_kind};
use smtv::schedule::load_schedule;
use smtv::settings::{Settings, default_config_path};
use smtv::types::{Language, Track};
use smtv::{
    EpisodeManifestRequest, FetchAttempt, ManifestResolver, PageController, PageError, Site,
};

#[derive(Debug, Parser)]
#[command(
    name = "smtv",
    about = "Browse a static streaming catalogue and play its episodes.",
    version
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site base URL or local mirror directory
    #[arg(long, global = true, value_name = "URL_OR_DIR")]
    site: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the catalogue for a track and subtitle language
    Catalogue {
        #[arg(long)]
        track: Option<Track>,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show a series and the episodes of one season
    Series {
        slug: String,
        #[arg(short, long, default_value = "1")]
        season: String,
        #[arg(long)]
        lang: Option<Language>,
        #[arg(long)]
        source: Option<u8>,
    },
    /// Show one episode, optionally opening a server
    Episode {
        slug: String,
        #[arg(short = 'e', long, value_name = "EPISODE")]
        ep: String,
        #[arg(short, long, default_value = "1")]
        season: String,
        #[arg(long)]
        lang: Option<Language>,
        #[arg(long)]
        source: Option<u8>,
        #[arg(long)]
        play: bool,
    },
    /// Show which manifest a season resolves to, with every attempt
    Resolve {
        slug: String,
        #[arg(short, long, default_value = "1")]
        season: String,
        #[arg(long)]
        lang: Option<Language>,
        #[arg(long)]
        source: Option<u8>,
        /// Output the trace as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the broadcast schedule
    Schedule,
    /// Show the newest episodes across the site
    Latest {
        #[arg(long, default_value_t = LATEST_LIMIT)]
        limit: usize,
    },
    /// Open a site page URL (series.html?... or episode.html?...)
    Open {
        url: String,
        #[arg(long)]
        play: bool,
    },
    /// Pick a series, season and episode interactively
    Browse,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write the default settings to the config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let result = run().await;
    if let Err(err) = &result {
        eprintln!("error: {err:?}");
    }
    result
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(site) = &cli.site {
        settings.site = site.clone();
    }

    let command = cli.command.unwrap_or(Command::Browse);
    if let Command::Config { action } = &command {
        return run_config(action, &settings, cli.config);
    }

    let site = settings.site()?;
    tracing::debug!(site = %settings.site, "using site");

    match command {
        Command::Catalogue {
            track,
            lang,
            search,
        } => {
            let query = PageQuery {
                track: track.map(|t| t.as_str().to_string()),
                lang,
                ..PageQuery::default()
            };
            show_catalogue(&site, &settings, &query, &search).await
        }
        Command::Series {
            slug,
            season,
            lang,
            source,
        } => {
            let query = page_query(slug, season, None, lang, source);
            let mut controller = controller(site, &settings).await;
            match controller.open_series(&query).await {
                Ok(page) => render_series_page(&page),
                Err(err) => render_diagnostic(&err),
            }
            Ok(())
        }
        Command::Episode {
            slug,
            ep,
            season,
            lang,
            source,
            play,
        } => {
            let query = page_query(slug, season, Some(ep), lang, source);
            let mut controller = controller(site, &settings).await;
            show_episode(&mut controller, &query, play, &settings).await
        }
        Command::Resolve {
            slug,
            season,
            lang,
            source,
            json,
        } => {
            let mut request = EpisodeManifestRequest::from_params(&slug, &season, lang, None)?;
            if let Some(source) = source {
                request = request.with_source(source);
            }
            resolve_trace(site, &settings, &request, json).await
        }
        Command::Schedule => show_schedule(&site).await,
        Command::Latest { limit } => show_latest(&site, limit).await,
        Command::Open { url, play } => {
            let url = parse_page_url(&url)?;
            let query = PageQuery::from_url(&url);
            let site = site.with_cache_token(query.cache_token());
            match page_kind(&url) {
                PageKind::Index => show_catalogue(&site, &settings, &query, "").await,
                PageKind::Series => {
                    let mut controller = controller(site, &settings).await;
                    match controller.open_series(&query).await {
                        Ok(page) => render_series_page(&page),
                        Err(err) => render_diagnostic(&err),
                    }
                    Ok(())
                }
                PageKind::Episode => {
                    let mut controller = controller(site, &settings).await;
                    show_episode(&mut controller, &query, play, &settings).await
                }
            }
        }
        Command::Browse => browse(site, &settings).await,
        Command::Config { .. } => unreachable!("handled above"),
    }
}

fn init_logging(verbose: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "smtv=debug".to_string()
        } else {
            "smtv=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(action: &ConfigAction, settings: &Settings, path: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        ConfigAction::Init { force } => {
            let force = *force;
            let path = path
                .or_else(default_config_path)
                .context("Could not determine config directory")?;
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create config directory {}", parent.display())
                })?;
            }
            std::fs::write(&path, Settings::default().to_toml()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn page_query(
    slug: String,
    season: String,
    ep: Option<String>,
    lang: Option<Language>,
    source: Option<u8>,
) -> PageQuery {
    PageQuery {
        series: Some(slug),
        season: Some(season),
        ep,
        lang: lang.map(|l| l.as_str().to_string()),
        source: source.map(|s| s.to_string()),
        ..PageQuery::default()
    }
}

fn parse_page_url(raw: &str) -> Result<Url> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(_) => Url::parse("http://localhost/")?
            .join(raw)
            .with_context(|| format!("not a page URL: {raw}")),
    }
}

async fn controller(site: Site, settings: &Settings) -> PageController<Site> {
    let flags = load_flags(&site).await;
    PageController::new(ManifestResolver::new(site, settings.policy()), flags)
}

async fn show_catalogue(
    site: &Site,
    settings: &Settings,
    query: &PageQuery,
    search: &str,
) -> Result<()> {
    let path = preferences_path(settings.data_dir.as_deref())?;
    let mut preferences = Preferences::load(&path)?;
    let filter = preferences.filter_for(query, search);
    preferences.remember(&filter);
    preferences.save(&path)?;

    let catalogue = match Catalogue::load(site).await {
        Ok(catalogue) => catalogue,
        Err(err) => {
            render_diagnostic(&PageError::CatalogueUnavailable(err));
            return Ok(());
        }
    };
    render_listing(&catalogue, &filter);
    Ok(())
}

fn render_listing(catalogue: &Catalogue, filter: &CatalogueFilter) {
    let listing = catalogue.listing(filter);
    match filter.track {
        Track::Dubbed => println!("{} series", filter.track.label()),
        Track::Sub => println!("{} series [{}]", filter.track.label(), filter.language),
    }
    if listing.is_empty() {
        println!("  No series found.");
        return;
    }
    for series in listing {
        println!("  {:<28} {}", series.slug, series.title);
    }
}

async fn show_episode(
    controller: &mut PageController<Site>,
    query: &PageQuery,
    play: bool,
    settings: &Settings,
) -> Result<()> {
    let view = match controller.open_episode(query).await {
        Ok(view) => view,
        Err(err) => {
            render_diagnostic(&err);
            return Ok(());
        }
    };
    render_episode(&view);
    if play {
        play_episode(&view, settings).await?;
    }
    Ok(())
}

async fn play_episode(view: &EpisodeView, settings: &Settings) -> Result<()> {
    let Some(server) = choose_server(server_options(view))? else {
        println!("Cancelled.");
        return Ok(());
    };
    launch(&server.url, settings.player.as_deref()).await
}

async fn resolve_trace(
    site: Site,
    settings: &Settings,
    request: &EpisodeManifestRequest,
    json: bool,
) -> Result<()> {
    let resolver = ManifestResolver::new(site, settings.policy());
    let outcome = resolver.resolve(request).await;
    let (trace, episodes) = match &outcome {
        Ok(resolution) => (&resolution.trace, Some(resolution.episodes.len())),
        Err(failure) => (&failure.trace, None),
    };

    if json {
        let report = serde_json::json!({
            "request": request.to_string(),
            "resolved": episodes.is_some(),
            "episodes": episodes,
            "trace": trace,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Resolving {request}");
    render_trace(trace);
    match outcome {
        Ok(resolution) => println!(
            "Resolved {} ({} episodes)",
            resolution.manifest_path(),
            resolution.episodes.len()
        ),
        Err(failure) => render_diagnostic(&PageError::from(failure)),
    }
    Ok(())
}

fn render_trace(trace: &[FetchAttempt]) {
    for (idx, attempt) in trace.iter().enumerate() {
        println!("  {:>2}. {attempt}", idx + 1);
    }
}

fn render_diagnostic(err: &PageError) {
    let diagnostic = err.diagnostic();
    println!("\u{2716} {}", diagnostic.headline);
    if let Some(detail) = diagnostic.detail {
        println!("  {detail}");
    }
    tracing::debug!(error = ?err, "page failed");
}

fn render_series_page(page: &SeriesPage) {
    let header = &page.header;
    println!("{}", header.title);
    if !header.description.is_empty() {
        println!("{}", header.description);
    }
    println!("Seasons: {}", header.seasons.join(", "));
    println!();
    match &page.season {
        Ok(season) => render_season(season),
        Err(err) => render_diagnostic(err),
    }
}

fn render_season(season: &SeasonView) {
    print!("Season {}", season.season);
    if season.show_source_selector {
        print!(" \u{00b7} Source {} (of 2)", season.source);
    }
    println!();
    if season.cards.is_empty() {
        println!("  No episodes yet.");
        return;
    }
    for card in &season.cards {
        println!("  Ep {:<5} {}", card.number, card.title);
    }
}

fn render_episode(view: &EpisodeView) {
    println!("{} \u{00b7} {}", view.series_title, view.title);
    match view.banner {
        Some(Banner::Premium) => {
            println!("Want ad-free direct access? Join the Premium Channel.")
        }
        Some(Banner::Sponsor) => println!("This episode is sponsored."),
        None => {}
    }
    for (idx, player) in view.players.iter().enumerate() {
        println!("  Server {}: {}", idx + 1, summarize_payload(player));
    }
    match &view.third_server {
        Some(ThirdServer::Url(url)) => println!("  Server 3: {url}"),
        Some(ThirdServer::Embed(markup)) => println!("  Server 3: {}", summarize_payload(markup)),
        None => {}
    }
    for (idx, link) in view.downloads.iter().enumerate() {
        println!("  Download {}: {link}", idx + 1);
    }
    println!("  Back: {}", view.back_href);
}

fn summarize_payload(payload: &str) -> String {
    smtv::player::playable_url(payload).unwrap_or_else(|| String::from("(embedded player)"))
}

async fn show_schedule(site: &Site) -> Result<()> {
    let schedule = match load_schedule(site).await {
        Ok(schedule) => schedule,
        Err(err) => {
            tracing::warn!(error = %err, "schedule unavailable");
            println!("Could not load schedule.");
            return Ok(());
        }
    };
    if schedule.is_empty() {
        println!("No schedule yet.");
        return Ok(());
    }
    let now = Utc::now();
    for entry in schedule {
        let live = if entry.live { " [LIVE]" } else { "" };
        println!("{}{live}", entry.title);
        let when = entry.when_line();
        if !when.is_empty() {
            println!("  {when}");
        }
        if let Some(countdown) = entry.countdown_at(now) {
            println!("  {}", countdown.label());
        }
    }
    Ok(())
}

async fn show_latest(site: &Site, limit: usize) -> Result<()> {
    let latest = match load_latest(site, limit).await {
        Ok(latest) => latest,
        Err(err) => {
            tracing::warn!(error = %err, "latest episodes unavailable");
            return Ok(());
        }
    };
    if latest.is_empty() {
        println!("No new episodes.");
        return Ok(());
    }
    for item in latest {
        println!(
            "{}  {} [NEW]  ({})",
            item.published_at.format("%Y-%m-%d %H:%M"),
            item.record.display_title(),
            item.manifest
        );
        if let Some(link) = item.watch_link() {
            println!("  {link}");
        }
    }
    Ok(())
}

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

async fn browse(site: Site, settings: &Settings) -> Result<()> {
    let path = preferences_path(settings.data_dir.as_deref())?;
    let mut preferences = Preferences::load(&path)?;
    let mut filter = preferences.filter_for(&PageQuery::default(), "");

    let tracks = [Track::Dubbed, Track::Sub];
    let labels: Vec<&str> = tracks.iter().map(|t| t.label()).collect();
    let default_track = tracks.iter().position(|t| *t == filter.track).unwrap_or(0);
    let Some(idx) = Select::with_theme(&theme())
        .with_prompt("Track")
        .items(&labels)
        .default(default_track)
        .interact_opt()?
    else {
        println!("Cancelled.");
        return Ok(());
    };
    filter.track = tracks[idx];

    if filter.track == Track::Sub {
        let labels: Vec<&str> = Language::ALL.iter().map(|l| l.label()).collect();
        let default_lang = Language::ALL
            .iter()
            .position(|l| l.as_str() == filter.language)
            .unwrap_or(0);
        let Some(idx) = Select::with_theme(&theme())
            .with_prompt("Subtitle language")
            .items(&labels)
            .default(default_lang)
            .interact_opt()?
        else {
            println!("Cancelled.");
            return Ok(());
        };
        filter.language = Language::ALL[idx].as_str().to_string();
    }
    preferences.remember(&filter);
    preferences.save(&path)?;

    let catalogue = match Catalogue::load(&site).await {
        Ok(catalogue) => catalogue,
        Err(err) => {
            render_diagnostic(&PageError::CatalogueUnavailable(err));
            return Ok(());
        }
    };
    let listing: Vec<(String, String)> = catalogue
        .listing(&filter)
        .into_iter()
        .map(|s| (s.slug.clone(), s.title.clone()))
        .collect();
    if listing.is_empty() {
        bail!("No series for this track and language.");
    }
    let titles: Vec<&str> = listing.iter().map(|(_, title)| title.as_str()).collect();
    let Some(idx) = FuzzySelect::with_theme(&theme())
        .with_prompt("Select a series (Esc to cancel)")
        .items(&titles)
        .default(0)
        .interact_opt()?
    else {
        println!("Cancelled.");
        return Ok(());
    };
    let slug = listing[idx].0.clone();

    let mut controller = controller(site, settings).await;
    let query = PageQuery {
        series: Some(slug),
        lang: (filter.track == Track::Sub).then(|| filter.language.clone()),
        ..PageQuery::default()
    };
    let page = match controller.open_series(&query).await {
        Ok(page) => page,
        Err(err) => {
            render_diagnostic(&err);
            return Ok(());
        }
    };
    println!("{}", page.header.title);

    let mut season = page.season;
    if page.header.seasons.len() > 1 {
        let Some(idx) = Select::with_theme(&theme())
            .with_prompt("Season")
            .items(&page.header.seasons)
            .default(0)
            .interact_opt()?
        else {
            println!("Cancelled.");
            return Ok(());
        };
        if page.header.seasons[idx] != "1" {
            season = controller.switch_season(&page.header.seasons[idx]).await;
        }
    }

    if matches!(&season, Ok(view) if view.show_source_selector) {
        let Some(idx) = Select::with_theme(&theme())
            .with_prompt("Source")
            .items(&["Source 1", "Source 2"])
            .default(0)
            .interact_opt()?
        else {
            println!("Cancelled.");
            return Ok(());
        };
        if idx == 1 {
            println!("Loading Source 2...");
            season = controller.switch_source(2).await;
        }
    }

    let season = match season {
        Ok(season) => season,
        Err(err) => {
            render_diagnostic(&err);
            return Ok(());
        }
    };
    if season.cards.is_empty() {
        println!("No episodes yet.");
        return Ok(());
    }

    let labels: Vec<String> = season
        .cards
        .iter()
        .map(|card| format!("Ep {} \u{00b7} {}", card.number, card.title))
        .collect();
    let mut default_idx = 0;
    loop {
        let Some(idx) = Select::with_theme(&theme())
            .with_prompt("Episode (Enter to open, Esc to quit)")
            .items(&labels)
            .default(default_idx)
            .interact_opt()?
        else {
            println!("Exiting.");
            return Ok(());
        };
        default_idx = (idx + 1).min(labels.len() - 1);

        match controller.click(&season.cards[idx].link) {
            ClickTarget::Shortlink(url) => launch(&url, None).await?,
            ClickTarget::EpisodePage(href) => {
                let url = parse_page_url(&href)?;
                show_episode(&mut controller, &PageQuery::from_url(&url), true, settings).await?;
            }
        }
    }
}
