use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Error;
use crate::history::{HistoryStore, WatchEntry};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS watch_history (
                slot INTEGER PRIMARY KEY,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                poster TEXT NOT NULL,
                resume_secs REAL NOT NULL,
                duration_secs REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS history_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                saved_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Replaces the whole stored list; rows keep the list's order.
    pub(crate) fn replace_history(&mut self, entries: &[WatchEntry]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM watch_history", [])?;
        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO watch_history (slot, url, title, poster, resume_secs, duration_secs)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (slot, entry) in entries.iter().enumerate() {
                insert.execute(params![
                    slot as i64,
                    entry.url,
                    entry.title,
                    entry.poster,
                    entry.current_time,
                    entry.duration
                ])?;
            }
        }
        tx.execute(
            r#"
            INSERT INTO history_meta (id, saved_at) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at
            "#,
            params![now],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn last_saved_at(&self) -> Result<Option<String>> {
        let saved_at = self
            .conn
            .query_row("SELECT saved_at FROM history_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(saved_at)
    }

    pub(crate) fn list_history(&self) -> Result<Vec<WatchEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, poster, resume_secs, duration_secs FROM watch_history ORDER BY slot ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WatchEntry {
                url: row.get(0)?,
                title: row.get(1)?,
                poster: row.get(2)?,
                current_time: row.get(3)?,
                duration: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl HistoryStore for Database {
    fn name(&self) -> &'static str {
        "database"
    }

    fn save(&mut self, entries: &[WatchEntry]) -> crate::error::Result<()> {
        self.replace_history(entries)
            .map_err(|err| Error::Store(format!("{err:#}")))
    }

    fn load(&mut self) -> crate::error::Result<Option<Vec<WatchEntry>>> {
        let load = || -> Result<Option<Vec<WatchEntry>>> {
            if self.last_saved_at()?.is_none() {
                return Ok(None);
            }
            self.list_history().map(Some)
        };
        load().map_err(|err| Error::Store(format!("{err:#}")))
    }
}
