use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use ratatui::layout::Rect;
use tracing::{debug, warn};

use crate::app::input::{Command, FocusContext, InputKind, dispatch};
use crate::app::state::{AppState, FetchOutcome, FetchRequest, Section};
use crate::history::RedundantHistory;
use crate::http::Fetch;
use crate::nav::NavigationEngine;
use crate::player::PlaybackElement;

use super::layout::{Screen, ViewKey, Widget, cell_metrics};

/// Terminal-independent half of the browser: owns the state, the focus engine
/// and the widget geometry, and turns commands into state transitions.
pub(crate) struct Browser<'a> {
    pub(crate) state: AppState,
    screen: Screen,
    nav: NavigationEngine<Widget>,
    view: Option<ViewKey>,
    body: Rect,
    player: &'a mut dyn PlaybackElement,
    store: &'a mut RedundantHistory,
    fetcher: Arc<dyn Fetch>,
    outcome_tx: Sender<FetchOutcome>,
    outcome_rx: Receiver<FetchOutcome>,
}

impl<'a> Browser<'a> {
    pub(crate) fn new(
        state: AppState,
        player: &'a mut dyn PlaybackElement,
        store: &'a mut RedundantHistory,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            state,
            screen: Screen::default(),
            nav: NavigationEngine::new(cell_metrics()),
            view: None,
            body: Rect::default(),
            player,
            store,
            fetcher,
            outcome_tx,
            outcome_rx,
        }
    }

    pub(super) fn screen(&self) -> &Screen {
        &self.screen
    }

    pub(crate) fn focused(&self) -> Option<Widget> {
        self.nav.current()
    }

    /// Applies finished fetches and player events, then the periodic save.
    pub(crate) fn pump(&mut self, now: Instant) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.state.apply(outcome);
        }
        if self.state.now_playing.is_some() {
            for event in self.player.poll_events() {
                self.state.on_player_event(event, self.player, self.store);
            }
            self.state.tick(now, &*self.player, self.store);
        }
    }

    /// Lays the current section out in `body` and keeps the focus engine in
    /// step with it.
    pub(crate) fn sync(&mut self, body: Rect) {
        if self.state.is_loading() {
            self.nav.disable();
        } else {
            self.nav.enable();
        }

        let key = ViewKey::of(&self.state);
        if self.view.as_ref() != Some(&key) {
            self.screen.reset_scroll();
            self.screen.layout(&self.state, body);
            self.nav.invalidate();
            self.body = body;
            self.focus_default();
            self.view = Some(key);
        } else {
            self.screen.layout(&self.state, body);
            if self.body != body {
                self.body = body;
                self.nav.invalidate();
            }
        }
    }

    fn focus_default(&mut self) {
        let preferred = match self.state.section {
            Section::Welcome => Some(Widget::SearchInput),
            Section::MovieList => None,
            Section::MovieDetail => Some(Widget::Quality(0)),
            Section::History => Some(Widget::HistoryTile(0)),
            Section::Player => Some(Widget::PlayPause),
        };
        let focused =
            preferred.is_some_and(|widget| self.nav.focus_handle(&mut self.screen, widget));
        if !focused {
            self.nav.set_initial_focus(&mut self.screen);
        }
    }

    pub(crate) fn focus_context(&self) -> FocusContext {
        FocusContext {
            editing_text: self.state.section == Section::Welcome
                && self.nav.current() == Some(Widget::SearchInput),
            nav_enabled: self.nav.is_enabled(),
        }
    }

    /// Returns false once the user asked to quit.
    pub(crate) fn handle_input(&mut self, input: InputKind) -> bool {
        let commands = dispatch(input, self.state.section, self.focus_context());
        for command in commands {
            if !self.run(command) {
                return false;
            }
        }
        true
    }

    fn run(&mut self, command: Command) -> bool {
        debug!(?command, section = ?self.state.section, "command");
        match command {
            Command::Navigate(direction) => {
                self.nav.navigate(&mut self.screen, direction);
            }
            Command::Activate => {
                if self.nav.activate(&mut self.screen)
                    && let Some(widget) = self.screen.take_click()
                {
                    self.perform(widget);
                }
            }
            Command::Back => self.state.go_back(self.player, self.store),
            Command::TogglePlayPause => self.state.toggle_play_pause(self.player, self.store),
            Command::SeekBackward => self.state.seek_backward(self.player, self.store),
            Command::SeekForward => self.state.seek_forward(self.player, self.store),
            Command::NextPage => {
                let request = self.state.next_page();
                self.spawn(request);
            }
            Command::PrevPage => {
                let request = self.state.prev_page();
                self.spawn(request);
            }
            Command::JumpToPage(page) => {
                let request = self.state.jump_to_page(page);
                self.spawn(request);
            }
            Command::InsertChar(c) => self.state.query_input.push(c),
            Command::DeleteChar => {
                self.state.query_input.pop();
            }
            Command::Quit => {
                self.state.shutdown(self.player, self.store);
                return false;
            }
        }
        true
    }

    fn perform(&mut self, widget: Widget) {
        match widget {
            Widget::SearchInput | Widget::SearchButton => {
                let request = self.state.submit_search();
                self.spawn(request);
            }
            Widget::HistoryButton => self.state.show_history(self.store),
            Widget::NewSearch => self.state.new_search(),
            Widget::Tile(index) => {
                let request = self.state.open_detail(index);
                self.spawn(request);
            }
            Widget::PrevPage => {
                let request = self.state.prev_page();
                self.spawn(request);
            }
            Widget::NextPage => {
                let request = self.state.next_page();
                self.spawn(request);
            }
            Widget::Back | Widget::BackFromHistory => self.state.go_back(self.player, self.store),
            Widget::Quality(index) => self.state.play_option(self.player, index),
            Widget::HistoryTile(index) => self.state.play_history(self.player, index),
            Widget::Close => self.state.close_player(self.player, self.store),
            Widget::SeekBack => self.state.seek_backward(self.player, self.store),
            Widget::PlayPause => self.state.toggle_play_pause(self.player, self.store),
            Widget::SeekForward => self.state.seek_forward(self.player, self.store),
        }
    }

    fn spawn(&self, request: Option<FetchRequest>) {
        let Some(request) = request else {
            return;
        };
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.outcome_tx.clone();
        thread::spawn(move || {
            let outcome = request.run(fetcher.as_ref());
            if tx.send(outcome).is_err() {
                warn!("fetch finished after the browser closed");
            }
        });
    }
}
