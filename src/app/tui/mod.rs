mod actions;
mod layout;
mod render;
mod session;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tracing::info;

use crate::app::input::InputKind;
use crate::app::state::AppState;
use crate::history::RedundantHistory;
use crate::http::Fetch;
use crate::player::PlaybackElement;

pub(crate) use self::actions::Browser;
#[cfg(test)]
pub(crate) use self::layout::Widget;
use self::render::{draw, frame_areas};
use self::session::TerminalGuard;

/// Short enough that playback progress and finished fetches show up promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(150);

pub(crate) fn run_tui(
    state: AppState,
    player: &mut dyn PlaybackElement,
    store: &mut RedundantHistory,
    fetcher: Arc<dyn Fetch>,
) -> Result<()> {
    let mut guard = TerminalGuard::acquire()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut browser = Browser::new(state, player, store, fetcher);
    info!("browser started");

    loop {
        browser.pump(Instant::now());
        let size = terminal.size().context("failed to read terminal size")?;
        let [_, body, _, _] = frame_areas(Rect::new(0, 0, size.width, size.height));
        browser.sync(body);

        terminal.draw(|frame| draw(frame, &browser.state, browser.screen()))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(input) = InputKind::from_key(key) else {
            continue;
        };
        if !browser.handle_input(input) {
            break;
        }
    }

    info!("browser closed");
    guard.restore()?;
    Ok(())
}
