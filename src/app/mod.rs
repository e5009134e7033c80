mod input;
mod state;
mod tui;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::catalog::{self, extract_result_list, extract_stream_options, sort_titles};
use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::db::Database;
use crate::history::{HistoryStore, RedundantHistory, SessionStore, SnapshotStore};
use crate::http::{Fetch, ProxyFetcher};
use crate::paths::{database_file_path, snapshot_file_path};
use crate::player::MpvPlayer;

use self::state::AppState;

pub fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let fetcher: Arc<dyn Fetch> = Arc::new(ProxyFetcher::from_config(&config));

    match cli.command {
        Some(Command::Search { query, page, json }) => {
            run_search(fetcher.as_ref(), &query, page, json)?
        }
        Some(Command::Streams { link, json }) => run_streams(fetcher.as_ref(), &link, json)?,
        Some(Command::History) => run_history(&config)?,
        Some(Command::Tui) | None => run_browser(&config, fetcher)?,
    }

    Ok(())
}

fn run_browser(config: &AppConfig, fetcher: Arc<dyn Fetch>) -> Result<()> {
    let (mut store, _) = open_history()?;
    let state = AppState::new(config, store.load());
    let mut player = MpvPlayer::new(config.player_bin.clone());
    tui::run_tui(state, &mut player, &mut store, fetcher)
}

fn run_search(fetcher: &dyn Fetch, query: &str, page: u32, json: bool) -> Result<()> {
    let html = fetcher
        .fetch_html(&catalog::search_url(query, page))
        .with_context(|| format!("search for {query:?} failed"))?;
    let mut result = match extract_result_list(&html, page) {
        Ok(result) => result,
        Err(err) => {
            println!("{}", err.user_message());
            return Ok(());
        }
    };
    sort_titles(&mut result.tiles);
    if json {
        println!("{}", serde_json::to_string_pretty(&result.tiles)?);
        return Ok(());
    }

    println!("{:<48} LINK", "TITLE");
    for record in &result.tiles {
        println!("{:<48} {}", truncate(&record.title, 48), record.link);
    }
    if result.has_more_pages {
        println!("\nMore results: dubview search {query:?} --page {}", page + 1);
    }
    Ok(())
}

fn run_streams(fetcher: &dyn Fetch, link: &str, json: bool) -> Result<()> {
    let html = fetcher
        .fetch_html(&catalog::detail_url(link))
        .with_context(|| format!("fetching {link} failed"))?;
    let options = extract_stream_options(&html);
    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }
    if options.is_empty() {
        println!("No video sources are available for this title.");
        return Ok(());
    }
    for option in options {
        println!("{:<8} {}", option.quality.label(), option.url);
    }
    Ok(())
}

fn run_history(config: &AppConfig) -> Result<()> {
    let (mut store, last_saved_at) = open_history()?;
    let entries = store.load();
    if entries.is_empty() {
        println!("Nothing watched yet. Run `dubview` to start browsing.");
        return Ok(());
    }

    println!("{:<40} {:<16} {:>5}", "TITLE", "POSITION", "DONE");
    for entry in entries.iter().take(config.history_limit) {
        println!(
            "{:<40} {:<16} {:>4.0}%",
            truncate(&entry.title, 40),
            entry.progress_label(),
            entry.progress_percent()
        );
    }
    if let Some(saved_at) = last_saved_at {
        println!("\nLast saved {}", format_saved_at(&saved_at));
    }
    Ok(())
}

/// Database first, then the in-process copy, then the snapshot file. Also
/// returns when the database last saved, if it ever did.
fn open_history() -> Result<(RedundantHistory, Option<String>)> {
    let snapshot = SnapshotStore::new(snapshot_file_path()?);
    let database = database_file_path().and_then(|path| open_database(&path));
    Ok(history_stores(database, snapshot))
}

fn open_database(path: &Path) -> Result<(Database, Option<String>)> {
    let db = Database::open(path)?;
    db.migrate()
        .with_context(|| format!("failed to migrate database at {}", path.display()))?;
    let last_saved_at = db.last_saved_at()?;
    info!(database = %path.display(), "history database ready");
    Ok((db, last_saved_at))
}

/// A database that failed to open is logged and left out; the session copy
/// and the snapshot still serve reads and writes.
fn history_stores(
    database: Result<(Database, Option<String>)>,
    snapshot: SnapshotStore,
) -> (RedundantHistory, Option<String>) {
    let mut stores: Vec<Box<dyn HistoryStore>> = Vec::new();
    let mut last_saved_at = None;
    match database {
        Ok((db, saved_at)) => {
            stores.push(Box::new(db));
            last_saved_at = saved_at;
        }
        Err(err) => {
            let detail = format!("{err:#}");
            warn!(error = %detail, "history database unavailable, using backups");
        }
    }
    info!(snapshot = %snapshot.path().display(), "history snapshot");
    stores.push(Box::new(SessionStore::default()));
    stores.push(Box::new(snapshot));
    (RedundantHistory::new(stores), last_saved_at)
}

fn format_saved_at(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
