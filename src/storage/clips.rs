//! Capture, lookup and lifecycle of clip rows.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params, params_from_iter};

use super::models::{Clip, ClipFilter, ImportClip, NewClip, PurgeFilter, TagMap, TopicGroup};
use super::{CLIP_COLUMNS, Store, clip_columns, row_to_clip};
use crate::embed::ModelKind;
use crate::errors::{Result, VaultError};
use crate::hash::content_digest;
use crate::lang::detect_language;

const TITLE_MAX_CHARS: usize = 120;

/// Trim and cap a display title, keeping char boundaries intact.
pub(crate) fn truncate_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(TITLE_MAX_CHARS - 3).collect();
    format!("{cut}...")
}

impl Store {
    /// Insert a fresh capture. Content is trimmed first; empty content and
    /// exact duplicates (by content hash) are no-ops that return `None`.
    /// The row and its embedding land in one transaction.
    pub fn insert(&self, clip: &NewClip, model: Option<ModelKind>) -> Result<Option<i64>> {
        let content = clip.content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let hash = match clip.hash {
            Some(ref precomputed) => precomputed.clone(),
            None => content_digest(content),
        };
        if self.fetch_by_hash(&hash)?.is_some() {
            return Ok(None);
        }
        let lang = detect_language(content);
        let title = clip.title.as_deref().map(truncate_title);
        let kind = self.embedder(model)?;
        let (vector, used) = self.engine().borrow_mut().embed(content, kind);

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO clips(created_at, source_app, window_title, content, hash, pinned, title, file_path, lang)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
            params![
                Utc::now(),
                clip.source_app,
                clip.window_title,
                content,
                hash,
                title,
                clip.file_path,
                lang
            ],
        )?;
        let id = tx.last_insert_rowid();
        self.store_embedding(id, &vector, used)?;
        tx.commit()?;
        Ok(Some(id))
    }

    /// Insert a clip from an export bundle, preserving its provenance. A
    /// duplicate records a seen event against the existing row and returns
    /// its id instead of inserting.
    pub fn insert_import(&self, clip: &ImportClip) -> Result<Option<i64>> {
        let content = clip.content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let hash = content_digest(content);
        if let Some(existing) = self.fetch_by_hash(&hash)? {
            self.note_seen(existing)?;
            return Ok(Some(existing));
        }
        let created_at = clip.created_at.unwrap_or_else(Utc::now);
        let lang = clip
            .lang
            .clone()
            .unwrap_or_else(|| detect_language(content));
        let title = clip.title.as_deref().map(truncate_title);
        let kind = self.embedder(None)?;
        let (vector, used) = self.engine().borrow_mut().embed(content, kind);

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO clips(created_at, source_app, window_title, content, hash, pinned, title, file_path, lang)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                created_at,
                clip.source_app,
                clip.window_title,
                content,
                hash,
                clip.pinned as i64,
                title,
                clip.file_path,
                lang
            ],
        )?;
        let id = tx.last_insert_rowid();
        self.store_embedding(id, &vector, used)?;
        tx.commit()?;

        for tag in &clip.tags {
            if !tag.trim().is_empty() {
                self.assign_tag(id, tag)?;
            }
        }
        Ok(Some(id))
    }

    /// Record that the same content was copied again.
    pub fn note_seen(&self, clip_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO clip_events(clip_id, seen_at) VALUES (?, ?)",
            params![clip_id, Utc::now()],
        )?;
        Ok(())
    }

    /// Seen timestamps for a clip, newest first.
    pub fn history(&self, clip_id: i64, limit: i64) -> Result<Vec<DateTime<Utc>>> {
        let limit = if limit <= 0 { 50 } else { limit };
        let mut stmt = self.conn().prepare(
            "SELECT seen_at FROM clip_events WHERE clip_id = ? ORDER BY seen_at DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![clip_id, limit], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch(&self, id: i64) -> Result<Option<Clip>> {
        let clip = self
            .conn()
            .query_row(
                &format!("SELECT {CLIP_COLUMNS} FROM clips WHERE id = ?"),
                params![id],
                row_to_clip,
            )
            .optional()?;
        Ok(clip)
    }

    pub(crate) fn fetch_by_hash(&self, hash: &str) -> Result<Option<i64>> {
        let id = self
            .conn()
            .query_row(
                "SELECT id FROM clips WHERE hash = ? ORDER BY id DESC LIMIT 1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn latest(&self) -> Result<Option<Clip>> {
        let clip = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CLIP_COLUMNS} FROM clips ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                [],
                row_to_clip,
            )
            .optional()?;
        Ok(clip)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let changes = self
            .conn()
            .execute("DELETE FROM clips WHERE id = ?", params![id])?;
        Ok(changes > 0)
    }

    pub fn set_pinned(&self, id: i64, pinned: bool) -> Result<bool> {
        let changes = self.conn().execute(
            "UPDATE clips SET pinned = ? WHERE id = ?",
            params![pinned as i64, id],
        )?;
        Ok(changes > 0)
    }

    /// Bulk delete by criteria. `all` removes everything. App and tag scope
    /// the selection; age and keep-last each delete independently within
    /// that scope, so keep-last keeps the newest N of the scope, not the
    /// newest N overall.
    pub fn purge(&self, filter: &PurgeFilter) -> Result<i64> {
        if filter.all {
            let tx = self.conn().unchecked_transaction()?;
            let deleted = tx.execute("DELETE FROM clips", [])?;
            tx.commit()?;
            return Ok(deleted as i64);
        }
        let mut scope: Vec<String> = Vec::new();
        let mut scope_params: Vec<String> = Vec::new();
        if let Some(ref app) = filter.app {
            scope.push("LOWER(source_app) = LOWER(?)".to_string());
            scope_params.push(app.clone());
        }
        if let Some(ref tag) = filter.tag {
            scope.push(
                "id IN (SELECT clip_id FROM clip_tags ct JOIN tags t ON t.id = ct.tag_id
                 WHERE LOWER(t.name) = LOWER(?))"
                    .to_string(),
            );
            scope_params.push(tag.clone());
        }
        if filter.older_than_days.is_none() && filter.keep_last.is_none() && scope.is_empty() {
            return Err(VaultError::InvalidInput(
                "purge needs at least one criterion, or --all".to_string(),
            ));
        }
        let boxed_scope = |repeat: usize| -> Vec<Box<dyn rusqlite::ToSql>> {
            std::iter::repeat_n(&scope_params, repeat)
                .flatten()
                .map(|p| Box::new(p.clone()) as Box<dyn rusqlite::ToSql>)
                .collect()
        };

        let tx = self.conn().unchecked_transaction()?;
        let mut deleted = 0i64;
        if let Some(days) = filter.older_than_days {
            let cutoff = Utc::now() - Duration::days(days);
            let mut clauses = scope.clone();
            clauses.push("created_at < ?".to_string());
            let mut params = boxed_scope(1);
            params.push(Box::new(cutoff));
            let sql = format!("DELETE FROM clips WHERE {}", clauses.join(" AND "));
            deleted += tx.execute(&sql, params_from_iter(params.iter()))? as i64;
        }
        if let Some(keep) = filter.keep_last {
            let inner_where = if scope.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", scope.join(" AND "))
            };
            let mut clauses = scope.clone();
            clauses.push(format!(
                "id NOT IN (SELECT id FROM clips {inner_where}
                 ORDER BY created_at DESC, id DESC LIMIT ?)"
            ));
            // The scope binds twice: once for the outer delete, once inside
            // the keep-newest subselect.
            let mut params = boxed_scope(2);
            params.push(Box::new(keep));
            let sql = format!("DELETE FROM clips WHERE {}", clauses.join(" AND "));
            deleted += tx.execute(&sql, params_from_iter(params.iter()))? as i64;
        }
        if filter.older_than_days.is_none() && filter.keep_last.is_none() {
            let params = boxed_scope(1);
            let sql = format!("DELETE FROM clips WHERE {}", scope.join(" AND "));
            deleted += tx.execute(&sql, params_from_iter(params.iter()))? as i64;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Recency listing through the shared filter, with tags for display.
    pub fn filtered_rows(&self, filter: &ClipFilter) -> Result<(Vec<Clip>, TagMap)> {
        let (clauses, mut params) = filter.sql_clauses("");
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        params.push(Box::new(filter.effective_limit()));
        let sql = format!(
            "SELECT {CLIP_COLUMNS} FROM clips {where_sql}
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let clips = stmt
            .query_map(params_from_iter(params.iter()), row_to_clip)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let tags = self.tags_for_clips(clips.iter().map(|c| c.id))?;
        Ok((clips, tags))
    }

    /// Full-text search over clip content, newest first. The same filter
    /// predicates apply on top of the match.
    pub fn fts_search(&self, query: &str, filter: &ClipFilter) -> Result<Vec<Clip>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let (clauses, extra) = filter.sql_clauses("c.");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(query.to_string())];
        params.extend(extra);
        let and_sql = clauses
            .iter()
            .map(|c| format!(" AND {c}"))
            .collect::<String>();
        params.push(Box::new(filter.effective_limit()));
        let cols = clip_columns("c.");
        let sql = format!(
            "SELECT {cols} FROM clips_fts
             JOIN clips c ON c.id = clips_fts.rowid
             WHERE clips_fts MATCH ?{and_sql}
             ORDER BY c.created_at DESC, c.id DESC LIMIT ?"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let clips = stmt
            .query_map(params_from_iter(params.iter()), row_to_clip)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(clips)
    }

    /// Group recent clips into topics: one group per tag, plus an `app:`
    /// pseudo-group for untagged clips. Groups are ordered by their newest
    /// member.
    pub fn topic_groups(
        &self,
        max_groups: usize,
        per_group: usize,
        filter: &ClipFilter,
    ) -> Result<Vec<TopicGroup>> {
        let pool_size = (max_groups * per_group * 3).max(200) as i64;
        let pool_filter = ClipFilter {
            limit: pool_size,
            ..filter.clone()
        };
        let (clips, tag_map) = self.filtered_rows(&pool_filter)?;

        // Keyed buckets preserve pool order (newest first) within each group.
        let mut order: Vec<(String, String)> = Vec::new();
        let mut buckets: std::collections::HashMap<String, Vec<Clip>> =
            std::collections::HashMap::new();
        for clip in clips {
            let keys: Vec<(String, String)> = match tag_map.get(&clip.id) {
                Some(tags) if !tags.is_empty() => tags
                    .iter()
                    .map(|t| (t.clone(), "tag".to_string()))
                    .collect(),
                _ => {
                    let app = if clip.source_app.is_empty() {
                        "unknown".to_string()
                    } else {
                        clip.source_app.to_lowercase()
                    };
                    vec![(format!("app:{app}"), "app".to_string())]
                }
            };
            for (name, kind) in keys {
                if !buckets.contains_key(&name) {
                    order.push((name.clone(), kind));
                }
                buckets.entry(name).or_default().push(clip.clone());
            }
        }

        let mut groups: Vec<TopicGroup> = order
            .into_iter()
            .map(|(name, kind)| {
                let items = buckets.remove(&name).unwrap_or_default();
                let count = items.len();
                let latest = items[0].created_at;
                let items = items.into_iter().take(per_group).collect();
                TopicGroup { name, kind, count, latest, items }
            })
            .collect();
        groups.sort_by(|a, b| b.latest.cmp(&a.latest));
        groups.truncate(max_groups);
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Store {
        Store::in_memory().unwrap()
    }

    fn capture(store: &Store, content: &str, app: &str) -> i64 {
        store
            .insert(
                &NewClip {
                    content: content.to_string(),
                    source_app: app.to_string(),
                    ..Default::default()
                },
                None,
            )
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_insert_and_fetch() {
        let store = test_store();
        let id = capture(&store, "hello world", "Terminal");
        let clip = store.fetch(id).unwrap().unwrap();
        assert_eq!(clip.content, "hello world");
        assert_eq!(clip.source_app, "Terminal");
        assert!(!clip.pinned);
    }

    #[test]
    fn test_insert_trims_and_dedups() {
        let store = test_store();
        let first = store
            .insert(
                &NewClip { content: "  hello  ".into(), ..Default::default() },
                None,
            )
            .unwrap();
        assert!(first.is_some());
        // Same content modulo whitespace hashes identically.
        let second = store
            .insert(
                &NewClip { content: "hello".into(), ..Default::default() },
                None,
            )
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.stats().unwrap().count, 1);
    }

    #[test]
    fn test_insert_empty_is_noop() {
        let store = test_store();
        let id = store
            .insert(&NewClip { content: "   \n ".into(), ..Default::default() }, None)
            .unwrap();
        assert!(id.is_none());
        assert_eq!(store.stats().unwrap().count, 0);
    }

    #[test]
    fn test_insert_writes_embedding() {
        let store = test_store();
        let id = capture(&store, "embed me please", "app");
        let (vec, model) = store.embedding_for(id).unwrap().unwrap();
        assert_eq!(vec.len(), crate::embed::EMBED_DIM);
        assert_eq!(model, ModelKind::Hash);
    }

    #[test]
    fn test_title_truncation() {
        let long = "x".repeat(500);
        let title = truncate_title(&long);
        assert_eq!(title.chars().count(), 120);
        assert!(title.ends_with("..."));
        // Multi-byte input must not split a char.
        let wide = "é".repeat(500);
        let title = truncate_title(&wide);
        assert_eq!(title.chars().count(), 120);
        assert_eq!(truncate_title("  short  "), "short");
    }

    #[test]
    fn test_import_preserves_provenance() {
        let store = test_store();
        let when = "2024-03-01T12:00:00Z".parse().unwrap();
        let id = store
            .insert_import(&ImportClip {
                content: "imported".into(),
                source_app: "OtherHost".into(),
                created_at: Some(when),
                pinned: true,
                lang: Some("eng".into()),
                tags: vec!["work".into()],
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        let clip = store.fetch(id).unwrap().unwrap();
        assert_eq!(clip.created_at, when);
        assert!(clip.pinned);
        assert_eq!(clip.lang, "eng");
        assert_eq!(store.tags_for_clip(id).unwrap(), vec!["work"]);
    }

    #[test]
    fn test_import_duplicate_notes_seen() {
        let store = test_store();
        let id = capture(&store, "dup content", "app");
        let again = store
            .insert_import(&ImportClip { content: "dup content".into(), ..Default::default() })
            .unwrap();
        assert_eq!(again, Some(id));
        assert_eq!(store.stats().unwrap().count, 1);
        assert_eq!(store.history(id, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_history_newest_first() {
        let store = test_store();
        let id = capture(&store, "seen thrice", "app");
        for _ in 0..3 {
            store.note_seen(id).unwrap();
        }
        let seen = store.history(id, 10).unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0] >= seen[1] && seen[1] >= seen[2]);
        assert_eq!(store.history(id, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_cascades() {
        let store = test_store();
        let id = capture(&store, "goodbye", "app");
        store.note_seen(id).unwrap();
        store.assign_tag(id, "temp").unwrap();
        assert!(store.delete(id).unwrap());
        assert!(store.fetch(id).unwrap().is_none());
        assert!(store.embedding_for(id).unwrap().is_none());
        assert!(store.history(id, 10).unwrap().is_empty());
        assert!(!store.delete(id).unwrap());
    }

    #[test]
    fn test_set_pinned() {
        let store = test_store();
        let id = capture(&store, "pin me", "app");
        assert!(store.set_pinned(id, true).unwrap());
        assert!(store.fetch(id).unwrap().unwrap().pinned);
        assert!(store.set_pinned(id, false).unwrap());
        assert!(!store.fetch(id).unwrap().unwrap().pinned);
        assert!(!store.set_pinned(9999, true).unwrap());
    }

    #[test]
    fn test_purge_requires_criteria() {
        let store = test_store();
        capture(&store, "something", "app");
        assert!(matches!(
            store.purge(&PurgeFilter::default()),
            Err(VaultError::InvalidInput(_))
        ));
        assert_eq!(store.stats().unwrap().count, 1);
    }

    #[test]
    fn test_purge_all() {
        let store = test_store();
        capture(&store, "one", "app");
        capture(&store, "two", "app");
        let deleted = store
            .purge(&PurgeFilter { all: true, ..Default::default() })
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.stats().unwrap().count, 0);
    }

    #[test]
    fn test_purge_keep_last() {
        let store = test_store();
        for i in 0..5 {
            capture(&store, &format!("clip {i}"), "app");
        }
        let deleted = store
            .purge(&PurgeFilter { keep_last: Some(2), ..Default::default() })
            .unwrap();
        assert_eq!(deleted, 3);
        let (rows, _) = store.filtered_rows(&ClipFilter::default()).unwrap();
        let contents: Vec<_> = rows.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["clip 4", "clip 3"]);
    }

    #[test]
    fn test_purge_older_than() {
        let store = test_store();
        store
            .insert_import(&ImportClip {
                content: "ancient".into(),
                created_at: Some("2020-01-01T00:00:00Z".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();
        capture(&store, "recent", "app");
        let deleted = store
            .purge(&PurgeFilter { older_than_days: Some(30), ..Default::default() })
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.latest().unwrap().unwrap().content, "recent");
    }

    #[test]
    fn test_purge_by_app_and_tag() {
        let store = test_store();
        let a = capture(&store, "from terminal", "Terminal");
        capture(&store, "from safari", "Safari");
        store.assign_tag(a, "junk").unwrap();
        let deleted = store
            .purge(&PurgeFilter {
                app: Some("terminal".into()),
                tag: Some("JUNK".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.stats().unwrap().count, 1);
    }

    #[test]
    fn test_purge_keep_last_scoped_to_app() {
        let store = test_store();
        let old_a = capture(&store, "terminal one", "Terminal");
        let old_b = capture(&store, "terminal two", "Terminal");
        capture(&store, "safari one", "Safari");
        capture(&store, "safari two", "Safari");

        // Both Terminal clips are the newest 2 of their app, so nothing goes
        // even though newer Safari clips exist.
        let deleted = store
            .purge(&PurgeFilter {
                app: Some("terminal".into()),
                keep_last: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.stats().unwrap().count, 4);

        let deleted = store
            .purge(&PurgeFilter {
                app: Some("terminal".into()),
                keep_last: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.fetch(old_a).unwrap().is_none());
        assert!(store.fetch(old_b).unwrap().is_some());
        assert_eq!(store.stats().unwrap().count, 3);
    }

    #[test]
    fn test_purge_age_and_keep_last_are_cumulative() {
        let store = test_store();
        store
            .insert_import(&ImportClip {
                content: "ancient".into(),
                created_at: Some("2020-01-01T00:00:00Z".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();
        for i in 0..3 {
            capture(&store, &format!("recent {i}"), "app");
        }
        // The age pass takes the ancient clip, then keep-last trims the
        // remaining three down to two.
        let deleted = store
            .purge(&PurgeFilter {
                older_than_days: Some(30),
                keep_last: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.stats().unwrap().count, 2);
    }

    #[test]
    fn test_insert_accepts_precomputed_digest() {
        let store = test_store();
        let digest = content_digest("precomputed");
        let id = store
            .insert(
                &NewClip {
                    content: "precomputed".into(),
                    hash: Some(digest.clone()),
                    ..Default::default()
                },
                None,
            )
            .unwrap()
            .unwrap();
        assert_eq!(store.fetch(id).unwrap().unwrap().hash, digest);
        // Plain inserts of the same content still dedup against it.
        let again = store
            .insert(&NewClip { content: "precomputed".into(), ..Default::default() }, None)
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_filtered_rows_composition() {
        let store = test_store();
        let a = capture(&store, "alpha text", "Terminal");
        capture(&store, "beta text", "Safari");
        let c = capture(&store, "alpha again", "Terminal");
        store.set_pinned(c, true).unwrap();
        store.assign_tag(a, "work").unwrap();

        let (rows, _) = store
            .filtered_rows(&ClipFilter { app: Some("terminal".into()), ..Default::default() })
            .unwrap();
        assert_eq!(rows.len(), 2);

        let (rows, _) = store
            .filtered_rows(&ClipFilter {
                app: Some("terminal".into()),
                pins_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, c);

        let (rows, tags) = store
            .filtered_rows(&ClipFilter { tag: Some("work".into()), ..Default::default() })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(tags.get(&a).unwrap(), &vec!["work".to_string()]);

        let (rows, _) = store
            .filtered_rows(&ClipFilter {
                contains: Some("alpha".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_fts_search_with_filter() {
        let store = test_store();
        capture(&store, "the quick brown fox", "Terminal");
        capture(&store, "a quick snack", "Safari");
        let hits = store.fts_search("quick", &ClipFilter::default()).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = store
            .fts_search(
                "quick",
                &ClipFilter { app: Some("safari".into()), ..Default::default() },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "a quick snack");
        assert!(store.fts_search("  ", &ClipFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_fts_tracks_deletes() {
        let store = test_store();
        let id = capture(&store, "ephemeral needle", "app");
        assert_eq!(store.fts_search("needle", &ClipFilter::default()).unwrap().len(), 1);
        store.delete(id).unwrap();
        assert!(store.fts_search("needle", &ClipFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_topic_groups_by_tag_and_app() {
        let store = test_store();
        let a = capture(&store, "tagged one", "Terminal");
        let b = capture(&store, "tagged two", "Terminal");
        capture(&store, "untagged", "Safari");
        store.assign_tag(a, "work").unwrap();
        store.assign_tag(b, "work").unwrap();

        let groups = store
            .topic_groups(10, 5, &ClipFilter::default())
            .unwrap();
        assert_eq!(groups.len(), 2);
        let work = groups.iter().find(|g| g.name == "work").unwrap();
        assert_eq!(work.kind, "tag");
        assert_eq!(work.count, 2);
        let app = groups.iter().find(|g| g.name == "app:safari").unwrap();
        assert_eq!(app.kind, "app");
        assert_eq!(app.count, 1);
    }

    #[test]
    fn test_topic_groups_per_group_cap() {
        let store = test_store();
        for i in 0..4 {
            let id = capture(&store, &format!("item {i}"), "app");
            store.assign_tag(id, "big").unwrap();
        }
        let groups = store.topic_groups(5, 2, &ClipFilter::default()).unwrap();
        assert_eq!(groups[0].count, 4);
        assert_eq!(groups[0].items.len(), 2);
    }
}
