//! Tag assignment. Tag names are case-insensitive and stored lowercased;
//! assigning a capped tag can trigger eviction within that tag.

use log::info;
use rusqlite::{OptionalExtension, params, params_from_iter};

use super::models::TagMap;
use super::Store;
use crate::errors::{Result, VaultError};

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Store {
    pub(crate) fn get_or_create_tag(&self, name: &str) -> Result<i64> {
        let norm = normalize(name);
        if norm.is_empty() {
            return Err(VaultError::InvalidInput("tag name is empty".to_string()));
        }
        self.conn()
            .execute("INSERT OR IGNORE INTO tags(name) VALUES (?)", params![norm])?;
        let id = self.conn().query_row(
            "SELECT id FROM tags WHERE name = ?",
            params![norm],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Attach a tag to a clip. If the tag has a configured cap, trims the
    /// oldest clips under that tag down to it.
    pub fn assign_tag(&self, clip_id: i64, name: &str) -> Result<()> {
        let tag_id = self.get_or_create_tag(name)?;
        self.conn().execute(
            "INSERT OR IGNORE INTO clip_tags(clip_id, tag_id) VALUES (?, ?)",
            params![clip_id, tag_id],
        )?;
        let norm = normalize(name);
        if let Some(&cap) = self.cap_by_tag()?.get(&norm) {
            let evicted = self.evict_tag_cap(&norm, cap)?;
            if evicted > 0 {
                info!("tag '{norm}' over cap {cap}, evicted {evicted}");
            }
        }
        Ok(())
    }

    pub fn remove_tag(&self, clip_id: i64, name: &str) -> Result<bool> {
        let norm = normalize(name);
        let tag_id: Option<i64> = self
            .conn()
            .query_row("SELECT id FROM tags WHERE name = ?", params![norm], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(tag_id) = tag_id else {
            return Ok(false);
        };
        let changes = self.conn().execute(
            "DELETE FROM clip_tags WHERE clip_id = ? AND tag_id = ?",
            params![clip_id, tag_id],
        )?;
        Ok(changes > 0)
    }

    pub fn clear_tags(&self, clip_id: i64) -> Result<i64> {
        let changes = self
            .conn()
            .execute("DELETE FROM clip_tags WHERE clip_id = ?", params![clip_id])?;
        Ok(changes as i64)
    }

    /// All known tags with usage counts, most used first.
    pub fn list_tags(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.name, COUNT(ct.clip_id) FROM tags t
             LEFT JOIN clip_tags ct ON ct.tag_id = t.id
             GROUP BY t.id ORDER BY COUNT(ct.clip_id) DESC, t.name ASC",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn tags_for_clip(&self, clip_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.name FROM tags t
             JOIN clip_tags ct ON ct.tag_id = t.id
             WHERE ct.clip_id = ? ORDER BY t.name",
        )?;
        let rows = stmt
            .query_map(params![clip_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Tags for a batch of clips in one query.
    pub fn tags_for_clips(&self, ids: impl Iterator<Item = i64>) -> Result<TagMap> {
        let ids: Vec<i64> = ids.collect();
        if ids.is_empty() {
            return Ok(TagMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT ct.clip_id, t.name FROM clip_tags ct
             JOIN tags t ON t.id = ct.tag_id
             WHERE ct.clip_id IN ({placeholders}) ORDER BY t.name"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let mut map = TagMap::new();
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (clip_id, name) = row?;
            map.entry(clip_id).or_default().push(name);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::NewClip;

    fn test_store() -> Store {
        Store::in_memory().unwrap()
    }

    fn capture(store: &Store, content: &str) -> i64 {
        store
            .insert(
                &NewClip { content: content.to_string(), ..Default::default() },
                None,
            )
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_tag_roundtrip_normalized() {
        let store = test_store();
        let id = capture(&store, "tagged");
        store.assign_tag(id, "  Work  ").unwrap();
        assert_eq!(store.tags_for_clip(id).unwrap(), vec!["work"]);
        assert!(store.remove_tag(id, "WORK").unwrap());
        assert!(store.tags_for_clip(id).unwrap().is_empty());
        assert!(!store.remove_tag(id, "work").unwrap());
    }

    #[test]
    fn test_assign_is_idempotent() {
        let store = test_store();
        let id = capture(&store, "double tagged");
        store.assign_tag(id, "work").unwrap();
        store.assign_tag(id, "work").unwrap();
        assert_eq!(store.tags_for_clip(id).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_tag_rejected() {
        let store = test_store();
        let id = capture(&store, "blank tag");
        assert!(matches!(
            store.assign_tag(id, "   "),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_clear_tags_counts() {
        let store = test_store();
        let id = capture(&store, "multi");
        store.assign_tag(id, "a").unwrap();
        store.assign_tag(id, "b").unwrap();
        assert_eq!(store.clear_tags(id).unwrap(), 2);
        assert_eq!(store.clear_tags(id).unwrap(), 0);
    }

    #[test]
    fn test_list_tags_counts() {
        let store = test_store();
        let a = capture(&store, "one");
        let b = capture(&store, "two");
        store.assign_tag(a, "common").unwrap();
        store.assign_tag(b, "common").unwrap();
        store.assign_tag(a, "rare").unwrap();
        let tags = store.list_tags().unwrap();
        assert_eq!(tags[0], ("common".to_string(), 2));
        assert_eq!(tags[1], ("rare".to_string(), 1));
    }

    #[test]
    fn test_tags_for_clips_batch() {
        let store = test_store();
        let a = capture(&store, "first");
        let b = capture(&store, "second");
        let c = capture(&store, "third");
        store.assign_tag(a, "x").unwrap();
        store.assign_tag(b, "x").unwrap();
        store.assign_tag(b, "y").unwrap();
        let map = store.tags_for_clips([a, b, c].into_iter()).unwrap();
        assert_eq!(map.get(&a).unwrap(), &vec!["x".to_string()]);
        assert_eq!(map.get(&b).unwrap(), &vec!["x".to_string(), "y".to_string()]);
        assert!(!map.contains_key(&c));
        assert!(store.tags_for_clips(std::iter::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_capped_tag_evicts_on_assign() {
        let store = test_store();
        store
            .set_setting(crate::storage::SettingKey::CapByTag, r#"{"scratch": 2}"#)
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let id = capture(&store, &format!("scratch {i}"));
            store.assign_tag(id, "scratch").unwrap();
            ids.push(id);
        }
        // Oldest capped clip is gone, newest two remain.
        assert!(store.fetch(ids[0]).unwrap().is_none());
        assert!(store.fetch(ids[1]).unwrap().is_some());
        assert!(store.fetch(ids[2]).unwrap().is_some());
    }
}
