use anyhow::{Context, Result, anyhow, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use scraper::{Html, Selector};
use tokio::process::Command;
use url::Url;

use crate::controller::{EpisodeView, ThirdServer};

/// Something the user can open from the episode view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOption {
    pub label: String,
    pub url: String,
}

/// Pulls a playable URL out of a player payload: either a bare URL or the
/// first iframe (or lazy placeholder) in embed markup.
pub fn playable_url(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if let Some(url) = absolute_url(payload) {
        return Some(url);
    }

    let fragment = Html::parse_fragment(payload);
    let selector = Selector::parse("iframe[src], [data-embed-src]").expect("valid CSS selector");
    fragment.select(&selector).find_map(|el| {
        el.value()
            .attr("src")
            .or_else(|| el.value().attr("data-embed-src"))
            .and_then(absolute_url)
    })
}

fn absolute_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    let url = Url::parse(&candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Every server and download of an episode that resolves to a URL.
pub fn server_options(view: &EpisodeView) -> Vec<ServerOption> {
    let mut options = Vec::new();
    for (idx, payload) in view.players.iter().enumerate() {
        match playable_url(payload) {
            Some(url) => options.push(ServerOption {
                label: format!("Server {}", idx + 1),
                url,
            }),
            None => tracing::debug!(server = idx + 1, "player payload has no playable URL"),
        }
    }
    let third = match &view.third_server {
        Some(ThirdServer::Url(url)) => absolute_url(url),
        Some(ThirdServer::Embed(markup)) => playable_url(markup),
        None => None,
    };
    if let Some(url) = third {
        options.push(ServerOption {
            label: String::from("Server 3"),
            url,
        });
    }
    for (idx, link) in view.downloads.iter().enumerate() {
        if let Some(url) = absolute_url(link) {
            options.push(ServerOption {
                label: format!("Download {}", idx + 1),
                url,
            });
        }
    }
    options
}

pub fn choose_server(mut options: Vec<ServerOption>) -> Result<Option<ServerOption>> {
    if options.is_empty() {
        bail!("This episode has no playable servers.");
    }
    if options.len() == 1 {
        return Ok(Some(options.remove(0)));
    }
    let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a server (Esc to cancel)")
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|idx| options.remove(idx)))
}

/// Opens `url` with the configured player command, or the system opener.
pub async fn launch(url: &str, player: Option<&str>) -> Result<()> {
    let Some(command) = player.filter(|p| !p.trim().is_empty()) else {
        tracing::info!(%url, "opening with system handler");
        return open::that(url).with_context(|| format!("failed to open {url}"));
    };

    let mut parts = shlex::split(command)
        .ok_or_else(|| anyhow!("could not parse player command '{command}'"))?
        .into_iter();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("player command is empty"))?;
    let mut cmd = Command::new(&program);
    cmd.args(parts).arg(url);

    tracing::info!(%url, %program, "launching player");
    let status = match cmd.status().await {
        Ok(status) => status,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            bail!("Player '{program}' not found. Install it or change the `player` setting.");
        }
        Err(err) => {
            return Err(anyhow!(err).context(format!("failed to launch player '{program}'")));
        }
    };
    if !status.success() {
        bail!("player exited with status {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_from_payloads() {
        assert_eq!(
            playable_url("https://player.example/e/abc").as_deref(),
            Some("https://player.example/e/abc")
        );
        assert_eq!(
            playable_url(r#"<iframe width="640" src="//rumble.com/embed/v1/?pub=4" allowfullscreen></iframe>"#)
                .as_deref(),
            Some("https://rumble.com/embed/v1/?pub=4")
        );
        assert_eq!(
            playable_url(r#"<div data-embed-src="https://ok.example/v/9"></div>"#).as_deref(),
            Some("https://ok.example/v/9")
        );
        assert_eq!(playable_url("<p>coming soon</p>"), None);
        assert_eq!(playable_url("javascript:alert(1)"), None);
    }

    #[test]
    fn lists_servers_in_page_order() {
        let view = EpisodeView {
            series_title: String::from("Foo"),
            title: String::from("Episode 1"),
            episode: String::from("1"),
            players: vec![
                String::from(r#"<iframe src="https://p1.example/1"></iframe>"#),
                String::from("not a player"),
            ],
            third_server: Some(ThirdServer::Url(String::from("https://p3.example/1"))),
            downloads: vec![String::from("https://dl.example/1")],
            back_href: String::from("series.html?series=foo&season=1"),
            banner: None,
            manifest: String::from("episode-data/foo-s1.json"),
        };
        let labels: Vec<String> = server_options(&view).into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["Server 1", "Server 3", "Download 1"]);
    }
}
