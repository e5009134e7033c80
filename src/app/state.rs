use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::{
    self, ResultPage, StreamOption, TitleRecord, extract_result_list, extract_stream_options,
    sort_titles,
};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::history::{RedundantHistory, WatchEntry, WatchHistory, format_time};
use crate::http::Fetch;
use crate::player::{PlaybackElement, PlayerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Welcome,
    MovieList,
    MovieDetail,
    History,
    Player,
}

/// Where the current video was started from; closing the player goes back there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VideoOrigin {
    Detail,
    History,
}

/// The site never reports a page count, so `total_estimate` is only a lower
/// bound built from "is there a next page" hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pagination {
    pub(crate) current: u32,
    pub(crate) total_estimate: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            total_estimate: 1,
        }
    }
}

impl Pagination {
    /// Pages already known to exist are kept; a page without a "more" hint
    /// is taken as the last one.
    fn settle(self, page: u32, has_more_pages: bool) -> Self {
        let total_estimate = if has_more_pages {
            (page + 1).max(self.total_estimate)
        } else {
            page
        };
        Self {
            current: page,
            total_estimate,
        }
    }

    pub(crate) fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub(crate) fn has_next(&self) -> bool {
        self.current < self.total_estimate
    }

    pub(crate) fn can_jump_to(&self, page: u32) -> bool {
        (1..=self.total_estimate).contains(&page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DetailView {
    pub(crate) record: TitleRecord,
    pub(crate) options: Vec<StreamOption>,
    /// Saved position when this title is already in the watch history.
    pub(crate) resume_from: Option<f64>,
}

impl DetailView {
    pub(crate) fn option_label(&self, option: &StreamOption) -> String {
        match self.resume_from {
            Some(at) => format!("{} (resume from {})", option.quality, format_time(at)),
            None => option.quality.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NowPlaying {
    pub(crate) entry: WatchEntry,
    pub(crate) origin: VideoOrigin,
    pub(crate) position: f64,
    pub(crate) is_playing: bool,
    /// Set once the video reached its end; the saved position stays at 0
    /// until the user seeks again.
    pub(crate) ended: bool,
    /// Applied once the player knows the duration.
    resume_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchRequest {
    Search { query: String, page: u32 },
    Detail { record: TitleRecord },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FetchOutcome {
    Search {
        query: String,
        page: u32,
        result: Result<ResultPage>,
    },
    Detail {
        record: TitleRecord,
        result: Result<Vec<StreamOption>>,
    },
}

impl FetchRequest {
    pub(crate) fn target_url(&self) -> String {
        match self {
            Self::Search { query, page } => catalog::search_url(query, *page),
            Self::Detail { record } => catalog::detail_url(&record.link),
        }
    }

    /// Runs on a worker thread; everything it needs is owned.
    pub(crate) fn run(self, fetcher: &dyn Fetch) -> FetchOutcome {
        let html = fetcher.fetch_html(&self.target_url());
        match self {
            Self::Search { query, page } => FetchOutcome::Search {
                result: html.and_then(|html| extract_result_list(&html, page)),
                query,
                page,
            },
            Self::Detail { record } => FetchOutcome::Detail {
                result: html.map(|html| extract_stream_options(&html)),
                record,
            },
        }
    }
}

pub(crate) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(crate) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(crate) struct AppState {
    pub(crate) section: Section,
    pub(crate) query_input: String,
    /// Query of the results currently listed.
    pub(crate) active_query: String,
    pub(crate) pagination: Pagination,
    pub(crate) results: Vec<TitleRecord>,
    pub(crate) detail: Option<DetailView>,
    pub(crate) history: WatchHistory,
    pub(crate) now_playing: Option<NowPlaying>,
    pub(crate) in_flight: Option<FetchRequest>,
    pub(crate) status: String,
    history_limit: usize,
    seek_step: f64,
    save_interval: Duration,
    last_save: Option<Instant>,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig, stored_history: Vec<WatchEntry>) -> Self {
        Self {
            section: Section::Welcome,
            query_input: String::new(),
            active_query: String::new(),
            pagination: Pagination::default(),
            results: Vec::new(),
            detail: None,
            history: WatchHistory::from_entries(stored_history, config.history_limit),
            now_playing: None,
            in_flight: None,
            status: status_info("Type a title and press Enter to search."),
            history_limit: config.history_limit,
            seek_step: config.seek_step_secs.max(1.0),
            save_interval: config.save_interval(),
            last_save: None,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn start_fetch(&mut self, request: FetchRequest) -> Option<FetchRequest> {
        if self.is_loading() {
            return None;
        }
        debug!(?request, "starting fetch");
        self.status = status_info("Loading...");
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Pages through the query whose results are on screen.
    fn search_page(&mut self, page: u32) -> Option<FetchRequest> {
        if self.active_query.is_empty() {
            return None;
        }
        self.start_fetch(FetchRequest::Search {
            query: self.active_query.clone(),
            page,
        })
    }

    pub(crate) fn submit_search(&mut self) -> Option<FetchRequest> {
        let query = self.query_input.trim().to_string();
        if query.is_empty() {
            return None;
        }
        self.start_fetch(FetchRequest::Search { query, page: 1 })
    }

    pub(crate) fn apply(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Search {
                query,
                page,
                result,
            } => self.apply_search_result(&query, page, result),
            FetchOutcome::Detail { record, result } => self.apply_detail_result(record, result),
        }
    }

    pub(crate) fn apply_search_result(
        &mut self,
        query: &str,
        page: u32,
        result: Result<ResultPage>,
    ) {
        self.in_flight = None;
        match result {
            Ok(ResultPage {
                mut tiles,
                has_more_pages,
            }) => {
                sort_titles(&mut tiles);
                let known = if query == self.active_query {
                    self.pagination
                } else {
                    Pagination::default()
                };
                self.pagination = known.settle(page, has_more_pages);
                self.active_query = query.to_string();
                info!(
                    query,
                    page,
                    tiles = tiles.len(),
                    total_estimate = self.pagination.total_estimate,
                    "search results"
                );
                self.status = status_info(&format!(
                    "Page {} of at least {}.",
                    self.pagination.current, self.pagination.total_estimate
                ));
                self.results = tiles;
                self.section = Section::MovieList;
            }
            Err(err) => {
                // Paging past the end: the estimate was too optimistic.
                if err == Error::EmptyResult
                    && query == self.active_query
                    && page > self.pagination.current
                    && self.section == Section::MovieList
                {
                    self.pagination.total_estimate = (page - 1).max(self.pagination.current);
                }
                warn!(query, page, error = %err, "search failed");
                self.status = status_error(&err.user_message());
            }
        }
    }

    pub(crate) fn open_detail(&mut self, index: usize) -> Option<FetchRequest> {
        let record = self.results.get(index)?.clone();
        self.start_fetch(FetchRequest::Detail { record })
    }

    pub(crate) fn apply_detail_result(
        &mut self,
        record: TitleRecord,
        result: Result<Vec<StreamOption>>,
    ) {
        self.in_flight = None;
        match result {
            Ok(options) => {
                let resume_from = self
                    .history
                    .find_by_title(&record.title)
                    .map(|entry| entry.current_time);
                info!(title = %record.title, options = options.len(), "stream options");
                self.status = if options.is_empty() {
                    status_info("No video sources are available for this title.")
                } else {
                    status_info(&record.title)
                };
                self.detail = Some(DetailView {
                    record,
                    options,
                    resume_from,
                });
                self.section = Section::MovieDetail;
            }
            Err(err) => {
                warn!(title = %record.title, error = %err, "detail fetch failed");
                self.status = status_error(&err.user_message());
            }
        }
    }

    pub(crate) fn play_option(&mut self, player: &mut dyn PlaybackElement, index: usize) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        let Some(option) = detail.options.get(index) else {
            return;
        };
        let entry = WatchEntry::new(&option.url, &detail.record.title, &detail.record.poster);
        let start_at = detail.resume_from.unwrap_or(0.0);
        self.play(player, entry, start_at, VideoOrigin::Detail);
    }

    pub(crate) fn play_history(&mut self, player: &mut dyn PlaybackElement, index: usize) {
        let Some(entry) = self.history.entries().get(index).cloned() else {
            return;
        };
        let start_at = entry.current_time;
        self.play(player, entry, start_at, VideoOrigin::History);
    }

    pub(crate) fn play(
        &mut self,
        player: &mut dyn PlaybackElement,
        mut entry: WatchEntry,
        start_at: f64,
        origin: VideoOrigin,
    ) {
        info!(title = %entry.title, start_at, ?origin, "playing");
        entry.current_time = start_at;
        player.set_src(&entry.url);
        self.now_playing = Some(NowPlaying {
            entry,
            origin,
            position: start_at,
            is_playing: false,
            ended: false,
            resume_at: (start_at > 0.0).then_some(start_at),
        });
        self.section = Section::Player;

        match player.load().and_then(|()| player.play()) {
            Ok(()) => {
                if let Some(now_playing) = self.now_playing.as_mut() {
                    now_playing.is_playing = true;
                }
                self.last_save = Some(Instant::now());
                self.status = status_info("Playing.");
            }
            Err(err) => {
                warn!(error = %err, "playback failed");
                self.status = status_error(&err.user_message());
            }
        }
    }

    /// Records the current position in the history and persists it. No-op
    /// when nothing is playing, the player is still at the very start, or the
    /// video already ended.
    pub(crate) fn save_position(
        &mut self,
        player: &dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) -> bool {
        let Some(now_playing) = self.now_playing.as_mut() else {
            return false;
        };
        if now_playing.ended {
            return false;
        }
        let position = player.current_time();
        if position <= 0.0 {
            return false;
        }
        now_playing.entry.current_time = position;
        let duration = player.duration();
        if duration > 0.0 {
            now_playing.entry.duration = duration;
        }
        self.history.record(now_playing.entry.clone());
        self.last_save = Some(Instant::now());
        debug!(position, "position saved");
        self.persist_history(store);
        true
    }

    fn persist_history(&mut self, store: &mut RedundantHistory) {
        if !store.save(self.history.entries()) {
            let err = Error::Store("not every store accepted the write".to_string());
            self.status = status_error(&err.user_message());
        }
    }

    pub(crate) fn tick(
        &mut self,
        now: Instant,
        player: &dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) -> bool {
        let Some(now_playing) = self.now_playing.as_ref() else {
            return false;
        };
        if !now_playing.is_playing || player.is_paused() || player.has_ended() {
            return false;
        }
        let due = self
            .last_save
            .is_none_or(|last| now.saturating_duration_since(last) >= self.save_interval);
        due && self.save_position(player, store)
    }

    pub(crate) fn on_player_event(
        &mut self,
        event: PlayerEvent,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        let Some(now_playing) = self.now_playing.as_mut() else {
            return;
        };
        match event {
            PlayerEvent::MetadataReady(duration) => {
                now_playing.entry.duration = duration;
                if let Some(at) = now_playing.resume_at.take() {
                    player.seek(at);
                    now_playing.position = at;
                }
            }
            PlayerEvent::TimeAdvanced(position) => now_playing.position = position,
            PlayerEvent::Play => now_playing.is_playing = true,
            PlayerEvent::Pause => {
                now_playing.is_playing = false;
                self.save_position(player, store);
            }
            PlayerEvent::Ended => {
                now_playing.is_playing = false;
                now_playing.ended = true;
                now_playing.position = 0.0;
                // Next time this title starts from the beginning.
                now_playing.entry.current_time = 0.0;
                self.history.record(now_playing.entry.clone());
                self.status = status_info("Finished.");
                self.persist_history(store);
            }
        }
    }

    pub(crate) fn toggle_play_pause(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        let Some(now_playing) = self.now_playing.as_mut() else {
            return;
        };
        if player.is_paused() {
            match player.play() {
                Ok(()) => {
                    now_playing.is_playing = true;
                    self.status = status_info("Playing.");
                }
                Err(err) => self.status = status_error(&err.user_message()),
            }
        } else {
            player.pause();
            now_playing.is_playing = false;
            self.status = status_info("Paused.");
            self.save_position(player, store);
        }
    }

    pub(crate) fn seek_backward(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        if self.now_playing.is_none() {
            return;
        }
        let position = player.current_time();
        let target = if position > self.seek_step {
            position - self.seek_step
        } else {
            0.0
        };
        self.seek_to(player, store, target);
    }

    pub(crate) fn seek_forward(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        if self.now_playing.is_none() {
            return;
        }
        let duration = player.duration();
        if duration <= 0.0 {
            return;
        }
        let position = player.current_time();
        let target = if position < duration - self.seek_step {
            position + self.seek_step
        } else {
            duration
        };
        self.seek_to(player, store, target);
    }

    fn seek_to(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
        target: f64,
    ) {
        player.seek(target);
        if let Some(now_playing) = self.now_playing.as_mut() {
            now_playing.position = target;
            now_playing.ended = false;
        }
        self.save_position(player, store);
    }

    pub(crate) fn close_player(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        self.save_position(player, store);
        player.pause();
        player.stop();
        let Some(now_playing) = self.now_playing.take() else {
            return;
        };
        self.section = match now_playing.origin {
            VideoOrigin::History => Section::History,
            VideoOrigin::Detail => Section::MovieDetail,
        };
        if now_playing.origin == VideoOrigin::Detail
            && let Some(detail) = self.detail.as_mut()
            && detail.record.title == now_playing.entry.title
        {
            detail.resume_from = self
                .history
                .find_by_title(&detail.record.title)
                .map(|entry| entry.current_time);
        }
        self.status = status_info("Player closed.");
    }

    pub(crate) fn go_back(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        match self.section {
            Section::Player => self.close_player(player, store),
            Section::MovieDetail => self.section = Section::MovieList,
            Section::MovieList => self.new_search(),
            Section::History => self.section = Section::Welcome,
            Section::Welcome => {}
        }
    }

    pub(crate) fn next_page(&mut self) -> Option<FetchRequest> {
        if !self.pagination.has_next() {
            return None;
        }
        self.search_page(self.pagination.current + 1)
    }

    pub(crate) fn prev_page(&mut self) -> Option<FetchRequest> {
        if !self.pagination.has_previous() {
            return None;
        }
        self.search_page(self.pagination.current - 1)
    }

    pub(crate) fn jump_to_page(&mut self, page: u32) -> Option<FetchRequest> {
        if self.section != Section::MovieList || !self.pagination.can_jump_to(page) {
            return None;
        }
        self.search_page(page)
    }

    /// Re-reads the stores so the list reflects what is actually persisted.
    pub(crate) fn show_history(&mut self, store: &mut RedundantHistory) {
        self.history = WatchHistory::from_entries(store.load(), self.history_limit);
        self.section = Section::History;
        self.status = if self.history.is_empty() {
            status_info("Nothing watched yet.")
        } else {
            status_info("Pick a video to resume.")
        };
    }

    pub(crate) fn new_search(&mut self) {
        self.section = Section::Welcome;
        self.status = status_info("Type a title and press Enter to search.");
    }

    /// Final save before the program exits.
    pub(crate) fn shutdown(
        &mut self,
        player: &mut dyn PlaybackElement,
        store: &mut RedundantHistory,
    ) {
        if self.now_playing.is_some() {
            self.save_position(player, store);
            player.stop();
        }
    }
}
