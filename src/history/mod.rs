//! Watch history: the most-recently-watched videos with their last position.

mod store;

use serde::{Deserialize, Serialize};

pub(crate) use store::{HistoryStore, RedundantHistory, SessionStore, SnapshotStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WatchEntry {
    /// Stream URL; identity key within the history.
    pub(crate) url: String,
    pub(crate) title: String,
    pub(crate) poster: String,
    pub(crate) current_time: f64,
    pub(crate) duration: f64,
}

impl WatchEntry {
    pub(crate) fn new(url: &str, title: &str, poster: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            poster: poster.to_string(),
            current_time: 0.0,
            duration: 0.0,
        }
    }

    pub(crate) fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 && self.current_time.is_finite() {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub(crate) fn progress_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.current_time),
            format_time(self.duration)
        )
    }
}

/// Most-recently-updated first, unique by url, capped at `limit`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WatchHistory {
    entries: Vec<WatchEntry>,
    limit: usize,
}

impl WatchHistory {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Restores a stored list, dropping later duplicates and anything past the cap.
    pub(crate) fn from_entries(entries: Vec<WatchEntry>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for entry in entries {
            if history.entries.len() == history.limit {
                break;
            }
            if !history.entries.iter().any(|known| known.url == entry.url) {
                history.entries.push(entry);
            }
        }
        history
    }

    pub(crate) fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn record(&mut self, entry: WatchEntry) {
        self.entries.retain(|known| known.url != entry.url);
        self.entries.insert(0, entry);
        self.entries.truncate(self.limit);
    }

    pub(crate) fn find_by_title(&self, title: &str) -> Option<&WatchEntry> {
        self.entries.iter().find(|entry| entry.title == title)
    }
}

/// `mm:ss`; minutes keep counting past 59.
pub(crate) fn format_time(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
