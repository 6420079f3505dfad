pub mod models;
pub mod schema;

mod clips;
mod evict;
mod notes;
mod semantic;
mod settings;
mod tags;

pub use settings::{EvictMode, SettingKey, SettingKind, SettingValue};

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Row};

use crate::embed::EmbedEngine;
use crate::errors::Result;
use models::{Clip, StatusSnapshot, StoreStats};

pub(crate) const CLIP_COLUMNS: &str =
    "id, created_at, source_app, window_title, content, hash, pinned, title, file_path, lang";

/// CLIP_COLUMNS with a table alias prefix, for joined queries.
pub(crate) fn clip_columns(prefix: &str) -> String {
    CLIP_COLUMNS
        .split(", ")
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The single owner of the embedded database file. Write paths (capture,
/// eviction) assume one process holds a Store at a time; concurrent readers
/// go through WAL.
pub struct Store {
    conn: Connection,
    db_path: Option<PathBuf>,
    engine: RefCell<EmbedEngine>,
}

pub(crate) fn row_to_clip(row: &Row) -> rusqlite::Result<Clip> {
    let pinned_int: i64 = row.get(6)?;
    Ok(Clip {
        id: row.get(0)?,
        created_at: row.get(1)?,
        source_app: row.get(2)?,
        window_title: row.get(3)?,
        content: row.get(4)?,
        hash: row.get(5)?,
        pinned: pinned_int != 0,
        title: row.get(7)?,
        file_path: row.get(8)?,
        lang: row.get(9)?,
    })
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?;
        }
        let conn = Connection::open(path)?;
        Self::from_conn(conn, Some(path.to_path_buf()))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_conn(conn, None)
    }

    fn from_conn(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        for stmt in schema::ALL {
            conn.execute_batch(stmt)?;
        }
        Ok(Self {
            conn,
            db_path,
            engine: RefCell::new(EmbedEngine::new()),
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn engine(&self) -> &RefCell<EmbedEngine> {
        &self.engine
    }

    /// On-disk size of the database file; 0 for in-memory stores.
    pub fn db_size_bytes(&self) -> u64 {
        self.db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let (count, latest) = self.conn.query_row(
            "SELECT COUNT(*), MAX(created_at) FROM clips",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            count,
            latest,
            db_size_bytes: self.db_size_bytes(),
        })
    }

    pub fn status_snapshot(&self) -> Result<StatusSnapshot> {
        let stats = self.stats()?;
        Ok(StatusSnapshot {
            paused: self.paused()?,
            allow_secrets: self.allow_secrets(None)?,
            notify: self.notify(None)?,
            embedder: self.embedder(None)?.as_str().to_string(),
            max_bytes: self.max_bytes(None)?,
            max_db_mb: self.max_db_mb(None)?,
            cap_by_app: self.cap_by_app()?,
            cap_by_tag: self.cap_by_tag()?,
            evict_mode: self.evict_mode()?.as_str().to_string(),
            count: stats.count,
            latest: stats.latest,
            db_size_mb: (stats.db_size_bytes as f64 / (1024.0 * 1024.0) * 1000.0).round() / 1000.0,
            blocklist_size: self.blocklist()?.len(),
        })
    }
}
