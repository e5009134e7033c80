use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;

use super::input::InputKind;
use super::state::*;
use super::tui::{Browser, Widget};
use crate::catalog::{detail_url, search_url};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::history::{HistoryStore, RedundantHistory, SessionStore, SnapshotStore, WatchEntry};
use crate::http::Fetch;
use crate::nav::Direction;
use crate::player::{PlaybackElement, PlayerEvent};

#[derive(Default)]
struct FakePlayer {
    src: Option<String>,
    loaded: bool,
    paused: bool,
    ended: bool,
    time: f64,
    duration: f64,
    seeks: Vec<f64>,
    pending: Vec<PlayerEvent>,
    stops: usize,
    fail_load: bool,
}

impl PlaybackElement for FakePlayer {
    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
    }

    fn load(&mut self) -> Result<()> {
        if self.fail_load {
            return Err(Error::PlaybackFailure("codec not supported".to_string()));
        }
        self.loaded = true;
        self.paused = true;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if !self.loaded {
            return Err(Error::PlaybackFailure("nothing loaded".to_string()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, seconds: f64) {
        self.time = seconds;
        self.seeks.push(seconds);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn poll_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending)
    }

    fn stop(&mut self) {
        self.loaded = false;
        self.stops += 1;
    }
}

/// Serves canned pages keyed by the exact catalog URL.
#[derive(Default)]
struct FakeCatalog {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn with_page(mut self, url: String, html: String) -> Self {
        self.pages.insert(url, html);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

impl Fetch for FakeCatalog {
    fn fetch_html(&self, target_url: &str) -> Result<String> {
        self.requests
            .lock()
            .expect("request log")
            .push(target_url.to_string());
        self.pages
            .get(target_url)
            .cloned()
            .ok_or_else(|| Error::FetchFailure(format!("no page at {target_url}")))
    }
}

fn results_page(titles: &[&str], more: bool) -> String {
    let tiles: String = titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            format!(
                r#"<div class="video-latest-list"><a href="/watch/{index}"><img src="/p/{index}.jpg"><h4>{title}</h4></a></div>"#
            )
        })
        .collect();
    let pager = if more {
        r#"<div class="pagination"><a href="?page_id=2">2</a></div>"#
    } else {
        ""
    };
    format!("<html><body>{tiles}{pager}</body></html>")
}

fn detail_page(urls: &[&str]) -> String {
    let sources: String = urls
        .iter()
        .map(|url| format!(r#"<source src="{url}" type="video/mp4">"#))
        .collect();
    format!("<html><body><video>{sources}</video></body></html>")
}

fn catalog() -> FakeCatalog {
    FakeCatalog::default()
        .with_page(
            search_url("show", 1),
            results_page(&["Show Episode 10", "Show Episode 2"], true),
        )
        .with_page(search_url("show", 2), "<html><body></body></html>".to_string())
        .with_page(
            detail_url("/watch/1"),
            detail_page(&[
                "https://cdn.example.com/show-2_720p.mp4",
                "https://cdn.example.com/show-2_480p.mp4",
            ]),
        )
}

/// Accepts nothing, as a full disk would.
struct RejectingStore;

impl HistoryStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn save(&mut self, _entries: &[WatchEntry]) -> Result<()> {
        Err(Error::Store("disk full".to_string()))
    }

    fn load(&mut self) -> Result<Option<Vec<WatchEntry>>> {
        Ok(None)
    }
}

fn session_store() -> RedundantHistory {
    RedundantHistory::new(vec![Box::new(SessionStore::default())])
}

fn watched(title: &str, at: f64) -> WatchEntry {
    WatchEntry {
        current_time: at,
        duration: 1200.0,
        ..WatchEntry::new(&format!("https://cdn.example.com/{title}.mp4"), title, "p.jpg")
    }
}

fn searched(catalog: &FakeCatalog) -> AppState {
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    state.query_input = "  show ".to_string();
    let request = state.submit_search().expect("search should start");
    state.apply(request.run(catalog));
    state
}

fn at_detail(catalog: &FakeCatalog, history: Vec<WatchEntry>) -> AppState {
    let mut state = searched(catalog);
    state.history = crate::history::WatchHistory::from_entries(history, 20);
    let request = state.open_detail(0).expect("detail should start");
    state.apply(request.run(catalog));
    state
}

#[test]
fn search_sorts_results_and_trims_the_query() {
    let catalog = catalog();
    let state = searched(&catalog);

    assert_eq!(catalog.requests(), vec![search_url("show", 1)]);
    assert_eq!(state.section, Section::MovieList);
    assert_eq!(state.active_query, "show");
    let titles: Vec<&str> = state.results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Show Episode 2", "Show Episode 10"]);
    assert_eq!(
        state.pagination,
        Pagination {
            current: 1,
            total_estimate: 2
        }
    );
    assert!(!state.is_loading());
}

#[test]
fn blank_query_does_not_fetch() {
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    state.query_input = "   ".to_string();
    assert_eq!(state.submit_search(), None);
}

#[test]
fn only_one_fetch_runs_at_a_time() {
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    state.query_input = "show".to_string();
    assert!(state.submit_search().is_some());
    assert!(state.is_loading());
    assert_eq!(state.submit_search(), None);
}

#[test]
fn empty_result_keeps_the_current_section() {
    let catalog = FakeCatalog::default().with_page(
        search_url("nothing", 1),
        "<html><body><p>No results</p></body></html>".to_string(),
    );
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    state.query_input = "nothing".to_string();
    let request = state.submit_search().expect("search should start");
    state.apply(request.run(&catalog));

    assert_eq!(state.section, Section::Welcome);
    assert!(state.status.starts_with("ERROR:"));
    assert!(!state.is_loading());
}

#[test]
fn paging_past_the_last_page_lowers_the_estimate() {
    let catalog = catalog();
    let mut state = searched(&catalog);

    let request = state.next_page().expect("page 2 is believed to exist");
    assert_eq!(
        request,
        FetchRequest::Search {
            query: "show".to_string(),
            page: 2
        }
    );
    state.apply(request.run(&catalog));

    assert_eq!(state.section, Section::MovieList);
    assert_eq!(
        state.pagination,
        Pagination {
            current: 1,
            total_estimate: 1
        }
    );
    assert_eq!(state.next_page(), None);
    assert_eq!(state.results.len(), 2);
}

#[test]
fn a_new_query_starts_a_fresh_estimate() {
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    let page = |more| {
        Ok(crate::catalog::ResultPage {
            tiles: vec![crate::catalog::TitleRecord {
                title: "A".to_string(),
                link: "/a".to_string(),
                poster: String::new(),
            }],
            has_more_pages: more,
        })
    };
    state.apply_search_result("first", 3, page(true));
    assert_eq!(state.pagination.total_estimate, 4);

    state.apply_search_result("second", 1, page(false));
    assert_eq!(
        state.pagination,
        Pagination {
            current: 1,
            total_estimate: 1
        }
    );
}

#[test]
fn page_jumps_stay_within_the_estimate() {
    let catalog = catalog();
    let mut state = searched(&catalog);
    assert_eq!(state.jump_to_page(3), None);
    assert_eq!(state.jump_to_page(0), None);
    assert!(state.jump_to_page(1).is_some());
}

#[test]
fn detail_offers_resume_for_watched_titles() {
    let catalog = catalog();
    let state = at_detail(&catalog, vec![watched("Show Episode 2", 90.0)]);

    assert_eq!(state.section, Section::MovieDetail);
    let detail = state.detail.as_ref().expect("detail view");
    assert_eq!(detail.options.len(), 2);
    assert_eq!(detail.resume_from, Some(90.0));
    assert_eq!(
        detail.option_label(&detail.options[0]),
        "720p (resume from 01:30)"
    );
}

#[test]
fn detail_fetch_failure_stays_on_the_list() {
    let catalog = catalog();
    let mut state = searched(&catalog);
    let request = state.open_detail(1).expect("detail should start");
    state.apply(request.run(&catalog));

    assert_eq!(state.section, Section::MovieList);
    assert!(state.status.starts_with("ERROR:"));
}

#[test]
fn playing_resumes_once_metadata_arrives() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, vec![watched("Show Episode 2", 90.0)]);
    let mut player = FakePlayer::default();
    let mut store = session_store();

    state.play_option(&mut player, 0);
    assert_eq!(state.section, Section::Player);
    assert_eq!(
        player.src.as_deref(),
        Some("https://cdn.example.com/show-2_720p.mp4")
    );
    assert!(!player.is_paused());
    assert!(player.seeks.is_empty());

    state.on_player_event(PlayerEvent::MetadataReady(1200.0), &mut player, &mut store);
    assert_eq!(player.seeks, vec![90.0]);
    let now_playing = state.now_playing.as_ref().expect("now playing");
    assert_eq!(now_playing.position, 90.0);
    assert_eq!(now_playing.entry.duration, 1200.0);

    // Only the first metadata event seeks.
    state.on_player_event(PlayerEvent::MetadataReady(1200.0), &mut player, &mut store);
    assert_eq!(player.seeks, vec![90.0]);
}

#[test]
fn load_failure_is_reported_on_the_status_line() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer {
        fail_load: true,
        ..FakePlayer::default()
    };

    state.play_option(&mut player, 1);
    assert!(state.status.starts_with("ERROR:"));
    assert!(state.now_playing.as_ref().is_some_and(|now| !now.is_playing));
}

#[test]
fn pausing_saves_the_position() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);

    player.time = 125.0;
    player.duration = 1200.0;
    state.toggle_play_pause(&mut player, &mut store);

    assert!(player.is_paused());
    let stored = store.load();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Show Episode 2");
    assert_eq!(stored[0].current_time, 125.0);
    assert_eq!(stored[0].duration, 1200.0);

    state.toggle_play_pause(&mut player, &mut store);
    assert!(!player.is_paused());
    assert!(state.now_playing.as_ref().is_some_and(|now| now.is_playing));
}

#[test]
fn nothing_is_saved_at_the_very_start() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);

    assert!(!state.save_position(&player, &mut store));
    assert!(store.load().is_empty());
}

#[test]
fn periodic_save_waits_for_the_interval() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);
    player.time = 30.0;

    assert!(!state.tick(Instant::now(), &player, &mut store));
    assert!(state.tick(Instant::now() + Duration::from_secs(6), &player, &mut store));
    assert_eq!(store.load()[0].current_time, 30.0);

    player.paused = true;
    assert!(!state.tick(Instant::now() + Duration::from_secs(60), &player, &mut store));
}

#[test]
fn tick_without_a_video_is_a_no_op() {
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    let player = FakePlayer::default();
    let mut store = session_store();
    assert!(!state.tick(Instant::now(), &player, &mut store));
}

#[test]
fn seeking_clamps_to_the_video() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);
    player.duration = 600.0;

    player.time = 30.0;
    state.seek_backward(&mut player, &mut store);
    assert_eq!(player.time, 0.0);

    player.time = 100.0;
    state.seek_forward(&mut player, &mut store);
    assert_eq!(player.time, 160.0);

    player.time = 580.0;
    state.seek_forward(&mut player, &mut store);
    assert_eq!(player.time, 600.0);
    assert_eq!(store.load()[0].current_time, 600.0);
}

#[test]
fn ending_resets_the_saved_position() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, vec![watched("Show Episode 2", 90.0)]);
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);

    state.on_player_event(PlayerEvent::Ended, &mut player, &mut store);
    let entry = &state.history.entries()[0];
    assert_eq!(entry.url, "https://cdn.example.com/show-2_720p.mp4");
    assert_eq!(entry.current_time, 0.0);
    assert_eq!(store.load()[0].current_time, 0.0);
}

/// Plays to the end the way mpv's keep-open leaves it: the clock stays at the
/// last frame.
fn played_to_the_end(state: &mut AppState, player: &mut FakePlayer, store: &mut RedundantHistory) {
    state.play_option(player, 0);
    player.time = 1200.0;
    player.duration = 1200.0;
    player.ended = true;
    player.paused = true;
    state.on_player_event(PlayerEvent::Ended, player, store);
    assert_eq!(store.load()[0].current_time, 0.0);
}

#[test]
fn closing_after_the_end_keeps_the_reset_position() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, vec![watched("Show Episode 2", 90.0)]);
    let mut player = FakePlayer::default();
    let mut store = session_store();
    played_to_the_end(&mut state, &mut player, &mut store);

    state.close_player(&mut player, &mut store);
    assert_eq!(store.load()[0].current_time, 0.0);
    assert_eq!(state.history.entries()[0].current_time, 0.0);
    assert_eq!(
        state.detail.as_ref().and_then(|detail| detail.resume_from),
        Some(0.0)
    );
}

#[test]
fn quitting_after_the_end_keeps_the_reset_position() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    played_to_the_end(&mut state, &mut player, &mut store);

    state.shutdown(&mut player, &mut store);
    assert_eq!(player.stops, 1);
    assert_eq!(store.load()[0].current_time, 0.0);
}

#[test]
fn seeking_back_after_the_end_saves_again() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    played_to_the_end(&mut state, &mut player, &mut store);

    state.seek_backward(&mut player, &mut store);
    assert_eq!(store.load()[0].current_time, 1140.0);
}

#[test]
fn failed_save_at_the_end_is_reported() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = RedundantHistory::new(vec![Box::new(RejectingStore)]);
    state.play_option(&mut player, 0);

    state.on_player_event(PlayerEvent::Ended, &mut player, &mut store);
    assert!(state.status.starts_with("ERROR:"), "{}", state.status);
    assert_eq!(state.history.entries()[0].current_time, 0.0);
}

#[test]
fn broken_database_falls_back_to_the_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let snapshot_path = dir.path().join("history-snapshot.json");
    SnapshotStore::new(&snapshot_path)
        .save(&[watched("Movie", 42.0)])
        .expect("seed snapshot");
    // A directory where the database file should be cannot be opened.
    let db_path = dir.path().join("dubview.db");
    std::fs::create_dir_all(db_path.join("occupied")).expect("block the db path");

    let (mut store, last_saved_at) = super::history_stores(
        super::open_database(&db_path),
        SnapshotStore::new(&snapshot_path),
    );
    assert_eq!(last_saved_at, None);
    assert_eq!(store.load(), vec![watched("Movie", 42.0)]);
    assert!(store.save(&[watched("Movie", 50.0)]));
}

#[test]
fn closing_returns_to_the_detail_with_a_fresh_resume_point() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);
    player.time = 300.0;

    state.go_back(&mut player, &mut store);
    assert_eq!(state.section, Section::MovieDetail);
    assert!(state.now_playing.is_none());
    assert_eq!(player.stops, 1);
    assert_eq!(
        state.detail.as_ref().and_then(|detail| detail.resume_from),
        Some(300.0)
    );
}

#[test]
fn closing_a_history_video_returns_to_history() {
    let mut state = AppState::new(
        &AppConfig::default(),
        vec![watched("Movie", 42.0), watched("Other", 7.0)],
    );
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.show_history(&mut store);
    // The session store is empty, so the reload found nothing.
    assert!(state.history.is_empty());

    store.save(&[watched("Movie", 42.0)]);
    state.show_history(&mut store);
    state.play_history(&mut player, 0);
    state.on_player_event(PlayerEvent::MetadataReady(1200.0), &mut player, &mut store);
    assert_eq!(player.seeks, vec![42.0]);

    state.close_player(&mut player, &mut store);
    assert_eq!(state.section, Section::History);
}

#[test]
fn back_walks_up_the_sections() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();

    state.go_back(&mut player, &mut store);
    assert_eq!(state.section, Section::MovieList);
    state.go_back(&mut player, &mut store);
    assert_eq!(state.section, Section::Welcome);
    state.go_back(&mut player, &mut store);
    assert_eq!(state.section, Section::Welcome);
}

#[test]
fn shutdown_saves_and_stops_the_player() {
    let catalog = catalog();
    let mut state = at_detail(&catalog, Vec::new());
    let mut player = FakePlayer::default();
    let mut store = session_store();
    state.play_option(&mut player, 0);
    player.time = 12.0;

    state.shutdown(&mut player, &mut store);
    assert_eq!(player.stops, 1);
    assert_eq!(store.load()[0].current_time, 12.0);
}

fn settle(browser: &mut Browser<'_>, body: Rect) {
    for _ in 0..200 {
        browser.pump(Instant::now());
        browser.sync(body);
        if !browser.state.is_loading() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("fetch did not finish");
}

#[test]
fn browser_drives_search_to_detail_with_the_remote() {
    let catalog = Arc::new(catalog());
    let fetcher: Arc<dyn Fetch> = catalog.clone();
    let mut player = FakePlayer::default();
    let mut store = session_store();
    let state = AppState::new(&AppConfig::default(), Vec::new());
    let mut browser = Browser::new(state, &mut player, &mut store, fetcher);
    let body = Rect::new(0, 3, 90, 30);

    browser.sync(body);
    assert_eq!(browser.focused(), Some(Widget::SearchInput));
    for c in "show".chars() {
        assert!(browser.handle_input(InputKind::Char(c)));
    }
    assert!(browser.handle_input(InputKind::Enter));
    settle(&mut browser, body);

    assert_eq!(browser.state.section, Section::MovieList);
    assert_eq!(browser.focused(), Some(Widget::Tile(0)));

    assert!(browser.handle_input(InputKind::Arrow(Direction::Right)));
    assert_eq!(browser.focused(), Some(Widget::Tile(1)));
    assert!(browser.handle_input(InputKind::Arrow(Direction::Left)));
    assert!(browser.handle_input(InputKind::Enter));
    settle(&mut browser, body);

    assert_eq!(browser.state.section, Section::MovieDetail);
    assert_eq!(browser.focused(), Some(Widget::Quality(0)));
    assert!(browser.handle_input(InputKind::Back));
    browser.sync(body);
    assert_eq!(browser.state.section, Section::MovieList);
    // Outside the search box 'q' quits.
    assert!(!browser.handle_input(InputKind::Char('q')));
    assert_eq!(
        catalog.requests(),
        vec![search_url("show", 1), detail_url("/watch/1")]
    );
}

#[test]
fn browser_ignores_arrows_while_loading() {
    let catalog = Arc::new(catalog());
    let fetcher: Arc<dyn Fetch> = catalog;
    let mut player = FakePlayer::default();
    let mut store = session_store();
    let mut state = AppState::new(&AppConfig::default(), Vec::new());
    state.query_input = "show".to_string();
    let mut browser = Browser::new(state, &mut player, &mut store, fetcher);
    let body = Rect::new(0, 3, 90, 30);

    browser.sync(body);
    assert!(browser.handle_input(InputKind::Enter));
    // No pump yet, so the fetch is still in flight.
    browser.sync(body);
    assert!(!browser.focus_context().nav_enabled);
    assert!(browser.handle_input(InputKind::Arrow(Direction::Down)));
    assert_eq!(browser.focused(), Some(Widget::SearchInput));
}
