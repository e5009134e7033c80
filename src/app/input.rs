//! Key handling as a table: (input, section, focus) -> commands. Nothing here
//! touches the terminal, so every binding is unit-testable.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::state::Section;
use crate::nav::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputKind {
    Arrow(Direction),
    Enter,
    /// Escape, or the remote's Back key.
    Back,
    Space,
    /// Remote ChannelUp, mapped from PageUp.
    ChannelUp,
    /// Remote ChannelDown, mapped from PageDown.
    ChannelDown,
    Digit(u8),
    Char(char),
    Backspace,
    Interrupt,
}

impl InputKind {
    pub(crate) fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Self::Interrupt);
        }
        let kind = match key.code {
            KeyCode::Up => Self::Arrow(Direction::Up),
            KeyCode::Down => Self::Arrow(Direction::Down),
            KeyCode::Left => Self::Arrow(Direction::Left),
            KeyCode::Right => Self::Arrow(Direction::Right),
            KeyCode::Enter => Self::Enter,
            KeyCode::Esc => Self::Back,
            KeyCode::PageUp => Self::ChannelUp,
            KeyCode::PageDown => Self::ChannelDown,
            KeyCode::Backspace => Self::Backspace,
            KeyCode::Char(' ') => Self::Space,
            KeyCode::Char(c @ '1'..='9') => Self::Digit(c as u8 - b'0'),
            KeyCode::Char(c) => Self::Char(c),
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Navigate(Direction),
    Activate,
    Back,
    TogglePlayPause,
    SeekBackward,
    SeekForward,
    NextPage,
    PrevPage,
    JumpToPage(u32),
    InsertChar(char),
    DeleteChar,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FocusContext {
    /// The search box has focus, so printable keys are text.
    pub(crate) editing_text: bool,
    /// Mirrors the navigation engine; off while a fetch is in flight.
    pub(crate) nav_enabled: bool,
}

pub(crate) fn dispatch(input: InputKind, section: Section, focus: FocusContext) -> Vec<Command> {
    if input == InputKind::Interrupt {
        return vec![Command::Quit];
    }

    if focus.editing_text {
        match input {
            InputKind::Char(c) => return vec![Command::InsertChar(c)],
            InputKind::Digit(d) => return vec![Command::InsertChar(char::from(b'0' + d))],
            InputKind::Space => return vec![Command::InsertChar(' ')],
            InputKind::Backspace => return vec![Command::DeleteChar],
            _ => {}
        }
    }

    let navigation = |command: Command| {
        if focus.nav_enabled {
            vec![command]
        } else {
            Vec::new()
        }
    };

    match (input, section) {
        (InputKind::Arrow(Direction::Left), Section::Player) => vec![Command::SeekBackward],
        (InputKind::Arrow(Direction::Right), Section::Player) => vec![Command::SeekForward],
        (InputKind::Arrow(direction), _) => navigation(Command::Navigate(direction)),
        (InputKind::Enter, _) => navigation(Command::Activate),

        (InputKind::Space, Section::Player) => vec![Command::TogglePlayPause],

        (InputKind::Back, Section::Welcome) => Vec::new(),
        (InputKind::Back, _) => vec![Command::Back],
        (InputKind::Backspace, Section::Welcome) => Vec::new(),
        (InputKind::Backspace, _) => vec![Command::Back],

        (InputKind::ChannelUp, Section::MovieList) => navigation(Command::NextPage),
        (InputKind::ChannelDown, Section::MovieList) => navigation(Command::PrevPage),
        (InputKind::Digit(page), Section::MovieList) => {
            navigation(Command::JumpToPage(u32::from(page)))
        }

        (InputKind::Char('q'), _) => vec![Command::Quit],
        _ => Vec::new(),
    }
}
