//! Retention enforcement. Three axes share the same shape: keep the newest
//! rows, drop the oldest, and where pins matter spend unpinned rows before
//! pinned ones.

use rusqlite::params;

use super::{EvictMode, Store};
use crate::errors::Result;

impl Store {
    /// Global row cap: keep the newest `cap` clips, delete the rest.
    pub fn prune(&self, cap: i64) -> Result<i64> {
        if cap <= 0 {
            return Ok(0);
        }
        let deleted = self.conn().execute(
            "DELETE FROM clips WHERE id NOT IN
             (SELECT id FROM clips ORDER BY created_at DESC, id DESC LIMIT ?)",
            params![cap],
        )?;
        Ok(deleted as i64)
    }

    /// Trim a scope (one bind parameter) down to `cap` rows, oldest first,
    /// unpinned before pinned. Pins soften eviction order; they do not grant
    /// immunity.
    fn cap_evict(&self, scope_sql: &str, scope_param: &str, cap: i64) -> Result<i64> {
        if cap <= 0 {
            return Ok(0);
        }
        let tx = self.conn().unchecked_transaction()?;
        let count: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM clips WHERE {scope_sql}"),
            params![scope_param],
            |row| row.get(0),
        )?;
        let excess = count - cap;
        if excess <= 0 {
            return Ok(0);
        }
        let mut deleted = tx.execute(
            &format!(
                "DELETE FROM clips WHERE id IN
                 (SELECT id FROM clips WHERE {scope_sql} AND pinned = 0
                  ORDER BY created_at ASC, id ASC LIMIT ?)"
            ),
            params![scope_param, excess],
        )? as i64;
        let remaining = excess - deleted;
        if remaining > 0 {
            deleted += tx.execute(
                &format!(
                    "DELETE FROM clips WHERE id IN
                     (SELECT id FROM clips WHERE {scope_sql}
                      ORDER BY created_at ASC, id ASC LIMIT ?)"
                ),
                params![scope_param, remaining],
            )? as i64;
        }
        tx.commit()?;
        Ok(deleted)
    }

    pub fn evict_app_cap(&self, app: &str, cap: i64) -> Result<i64> {
        self.cap_evict("LOWER(source_app) = LOWER(?)", app, cap)
    }

    pub fn evict_tag_cap(&self, tag: &str, cap: i64) -> Result<i64> {
        self.cap_evict(
            "id IN (SELECT clip_id FROM clip_tags ct JOIN tags t ON t.id = ct.tag_id
             WHERE LOWER(t.name) = LOWER(?))",
            tag,
            cap,
        )
    }

    /// Delete one eviction batch. Fifo takes the oldest rows outright;
    /// tiered spends unpinned rows first and only then reaches for pins.
    fn evict_batch(&self, batch: i64, mode: EvictMode) -> Result<i64> {
        if batch <= 0 {
            return Ok(0);
        }
        match mode {
            EvictMode::Fifo => {
                let deleted = self.conn().execute(
                    "DELETE FROM clips WHERE id IN
                     (SELECT id FROM clips ORDER BY created_at ASC, id ASC LIMIT ?)",
                    params![batch],
                )?;
                Ok(deleted as i64)
            }
            EvictMode::Tiered => {
                let tx = self.conn().unchecked_transaction()?;
                let mut deleted = tx.execute(
                    "DELETE FROM clips WHERE id IN
                     (SELECT id FROM clips WHERE pinned = 0
                      ORDER BY created_at ASC, id ASC LIMIT ?)",
                    params![batch],
                )? as i64;
                let remaining = batch - deleted;
                if remaining > 0 {
                    deleted += tx.execute(
                        "DELETE FROM clips WHERE id IN
                         (SELECT id FROM clips ORDER BY created_at ASC, id ASC LIMIT ?)",
                        params![remaining],
                    )? as i64;
                }
                tx.commit()?;
                Ok(deleted)
            }
        }
    }

    /// Size-based eviction: while the database file exceeds `max_mb`, delete
    /// a batch of roughly 5% of rows (at least one) per call and reclaim the
    /// space. One batch per call keeps the watch loop responsive.
    pub fn evict_if_needed(&self, max_mb: i64) -> Result<i64> {
        if max_mb <= 0 {
            return Ok(0);
        }
        let size_mb = self.db_size_bytes() as f64 / (1024.0 * 1024.0);
        if size_mb <= max_mb as f64 {
            return Ok(0);
        }
        let total: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM clips", [], |row| row.get(0))?;
        if total == 0 {
            return Ok(0);
        }
        let batch = (total / 20).max(1);
        let mode = self.evict_mode()?;
        let deleted = self.evict_batch(batch, mode)?;
        if deleted > 0 {
            // Shrink the file so the size check sees the reclaimed space.
            self.conn().execute_batch("VACUUM")?;
        }
        Ok(deleted)
    }
}
