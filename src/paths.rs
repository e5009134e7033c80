use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR: &str = "dubview";

pub fn database_file_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join(APP_DIR).join("dubview.db"))
}

/// Emergency copy of the watch history, outside the database.
pub fn snapshot_file_path() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("unable to resolve cache directory")?;
    Ok(base.join(APP_DIR).join("history-snapshot.json"))
}

/// `state_dir` is Linux-only; elsewhere logs sit next to the database.
pub fn log_dir_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .context("unable to resolve a directory for logs")?;
    Ok(base.join(APP_DIR))
}
