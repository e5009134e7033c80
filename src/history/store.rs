use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::WatchEntry;
use crate::error::{Error, Result};

/// One place the watch history can be persisted to.
pub(crate) trait HistoryStore {
    fn name(&self) -> &'static str;

    fn save(&mut self, entries: &[WatchEntry]) -> Result<()>;

    /// `Ok(None)` means the store has never been written, which is different
    /// from a saved empty history.
    fn load(&mut self) -> Result<Option<Vec<WatchEntry>>>;
}

/// Lives only as long as the process; survives a broken primary store.
#[derive(Debug, Default)]
pub(crate) struct SessionStore {
    encoded: Option<String>,
}

impl HistoryStore for SessionStore {
    fn name(&self) -> &'static str {
        "session"
    }

    fn save(&mut self, entries: &[WatchEntry]) -> Result<()> {
        let encoded =
            serde_json::to_string(entries).map_err(|err| Error::Store(err.to_string()))?;
        self.encoded = Some(encoded);
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Vec<WatchEntry>>> {
        self.encoded
            .as_deref()
            .map(|raw| serde_json::from_str(raw).map_err(|err| Error::Store(err.to_string())))
            .transpose()
    }
}

/// JSON file in the cache directory, kept as a last-resort backup.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for SnapshotStore {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn save(&mut self, entries: &[WatchEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::Store(format!("failed to create {}: {err}", parent.display()))
            })?;
        }
        let encoded =
            serde_json::to_vec_pretty(entries).map_err(|err| Error::Store(err.to_string()))?;

        // Write-then-rename so a crash never leaves a truncated snapshot.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|err| {
                Error::Store(format!("failed to write {}: {err}", self.path.display()))
            })
    }

    fn load(&mut self) -> Result<Option<Vec<WatchEntry>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            Error::Store(format!("failed to read {}: {err}", self.path.display()))
        })?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| Error::Store(format!("corrupt snapshot {}: {err}", self.path.display())))
    }
}

/// Writes every store and reads from the first one that has data, in
/// priority order. A hit on a lower-priority store is written back to all
/// stores so the primary recovers on its own.
pub(crate) struct RedundantHistory {
    stores: Vec<Box<dyn HistoryStore>>,
}

impl RedundantHistory {
    pub(crate) fn new(stores: Vec<Box<dyn HistoryStore>>) -> Self {
        Self { stores }
    }

    /// True only if every store accepted the write.
    pub(crate) fn save(&mut self, entries: &[WatchEntry]) -> bool {
        let mut all_ok = true;
        for store in &mut self.stores {
            if let Err(err) = store.save(entries) {
                warn!(store = store.name(), error = %err, "failed to save watch history");
                all_ok = false;
            }
        }
        debug!(entries = entries.len(), all_ok, "saved watch history");
        all_ok
    }

    pub(crate) fn load(&mut self) -> Vec<WatchEntry> {
        let mut found = None;
        for (rank, store) in self.stores.iter_mut().enumerate() {
            match store.load() {
                Ok(Some(entries)) => {
                    found = Some((rank, store.name(), entries));
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(store = store.name(), error = %err, "failed to load watch history");
                }
            }
        }

        let Some((rank, source, entries)) = found else {
            info!("no stored watch history, starting fresh");
            return Vec::new();
        };
        info!(source, entries = entries.len(), "loaded watch history");
        if rank > 0 {
            self.save(&entries);
        }
        entries
    }
}
