use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Clip {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub source_app: String,
    pub window_title: String,
    pub content: String,
    pub hash: String,
    pub pinned: bool,
    pub title: Option<String>,
    pub file_path: Option<String>,
    pub lang: String,
}

/// Payload for a fresh capture. Dedup, timestamping, language detection and
/// embedding all happen inside the store.
#[derive(Debug, Clone, Default)]
pub struct NewClip {
    pub content: String,
    pub source_app: String,
    pub window_title: String,
    pub title: Option<String>,
    pub file_path: Option<String>,
    /// Digest of the trimmed content, when the caller already computed it
    /// for its own dedup check; derived from `content` otherwise.
    pub hash: Option<String>,
}

/// Payload for federated import: provenance fields are supplied by the
/// exporting side instead of being derived at insert time.
#[derive(Debug, Clone, Default)]
pub struct ImportClip {
    pub content: String,
    pub source_app: String,
    pub window_title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub title: Option<String>,
    pub file_path: Option<String>,
    pub lang: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredClip {
    pub score: f32,
    pub clip: Clip,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicGroup {
    pub name: String,
    pub kind: String,
    pub count: usize,
    pub latest: DateTime<Utc>,
    pub items: Vec<Clip>,
}

#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub count: i64,
    pub latest: Option<DateTime<Utc>>,
    pub db_size_bytes: u64,
}

pub type TagMap = HashMap<i64, Vec<String>>;

/// The shared filter vocabulary. Every retrieval surface (recency listing,
/// FTS search, semantic candidate pooling, topic grouping, export) compiles
/// the same fields to the same SQL predicates.
#[derive(Debug, Clone, Default)]
pub struct ClipFilter {
    pub app: Option<String>,
    pub contains: Option<String>,
    pub tag: Option<String>,
    pub pins_only: bool,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl ClipFilter {
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 { 50 } else { self.limit }
    }

    /// Compile the filter into WHERE clauses and bind parameters. `col` is a
    /// column prefix ("" or "c.") so the same predicates work on plain and
    /// joined queries.
    pub(crate) fn sql_clauses(&self, col: &str) -> (Vec<String>, Vec<Box<dyn ToSql>>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(ref app) = self.app {
            clauses.push(format!("LOWER({col}source_app) = LOWER(?)"));
            params.push(Box::new(app.clone()));
        }
        if let Some(ref needle) = self.contains {
            clauses.push(format!("{col}content LIKE ?"));
            params.push(Box::new(format!("%{needle}%")));
        }
        if let Some(ref tag) = self.tag {
            clauses.push(format!(
                "{col}id IN (SELECT clip_id FROM clip_tags ct JOIN tags t ON t.id = ct.tag_id WHERE LOWER(t.name) = LOWER(?))"
            ));
            params.push(Box::new(tag.clone()));
        }
        if self.pins_only {
            clauses.push(format!("{col}pinned = 1"));
        }
        if let Some(since) = self.since {
            clauses.push(format!("{col}created_at >= ?"));
            params.push(Box::new(since));
        }
        if let Some(until) = self.until {
            clauses.push(format!("{col}created_at <= ?"));
            params.push(Box::new(until));
        }
        (clauses, params)
    }
}

/// Selection for bulk purge; `all` wins over the other criteria.
#[derive(Debug, Clone, Default)]
pub struct PurgeFilter {
    pub older_than_days: Option<i64>,
    pub keep_last: Option<i64>,
    pub app: Option<String>,
    pub tag: Option<String>,
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub paused: bool,
    pub allow_secrets: bool,
    pub notify: bool,
    pub embedder: String,
    pub max_bytes: i64,
    pub max_db_mb: i64,
    pub cap_by_app: HashMap<String, i64>,
    pub cap_by_tag: HashMap<String, i64>,
    pub evict_mode: String,
    pub count: i64,
    pub latest: Option<DateTime<Utc>>,
    pub db_size_mb: f64,
    pub blocklist_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_default() {
        let filter = ClipFilter::default();
        assert_eq!(filter.effective_limit(), 50);
    }

    #[test]
    fn test_effective_limit_explicit() {
        let filter = ClipFilter { limit: 7, ..Default::default() };
        assert_eq!(filter.effective_limit(), 7);
    }

    #[test]
    fn test_sql_clauses_empty_filter() {
        let filter = ClipFilter::default();
        let (clauses, params) = filter.sql_clauses("");
        assert!(clauses.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_sql_clauses_prefix() {
        let filter = ClipFilter {
            app: Some("Terminal".into()),
            pins_only: true,
            ..Default::default()
        };
        let (clauses, _) = filter.sql_clauses("c.");
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0].contains("c.source_app"));
        assert!(clauses[1].contains("c.pinned"));
    }
}
