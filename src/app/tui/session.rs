use std::io;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};

/// Raw mode plus the alternate screen for as long as the browser runs. The
/// player opens its own window, so the terminal never has to be handed back
/// mid-session.
pub(super) struct TerminalGuard {
    restored: bool,
}

impl TerminalGuard {
    pub(super) fn acquire() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)
            .context("failed to enter alternate screen")?;
        Ok(Self { restored: false })
    }

    pub(super) fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(io::stdout(), Show, LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.restored {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        }
    }
}
