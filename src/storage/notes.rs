use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, params_from_iter};

use super::models::Note;
use super::Store;
use crate::errors::Result;

impl Store {
    /// Attach a free-form note to a clip. Blank notes are ignored.
    pub fn add_note(&self, clip_id: i64, note: &str) -> Result<bool> {
        let note = note.trim();
        if note.is_empty() {
            return Ok(false);
        }
        self.conn().execute(
            "INSERT INTO clip_notes(clip_id, note, created_at) VALUES (?, ?, ?)",
            params![clip_id, note, Utc::now()],
        )?;
        Ok(true)
    }

    /// Notes for a batch of clips, newest first within each clip.
    pub fn notes_for_clips(
        &self,
        ids: impl Iterator<Item = i64>,
    ) -> Result<HashMap<i64, Vec<Note>>> {
        let ids: Vec<i64> = ids.collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT clip_id, note, created_at FROM clip_notes
             WHERE clip_id IN ({placeholders}) ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let mut map: HashMap<i64, Vec<Note>> = HashMap::new();
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Note { note: row.get(1)?, created_at: row.get(2)? },
            ))
        })?;
        for row in rows {
            let (clip_id, note) = row?;
            map.entry(clip_id).or_default().push(note);
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
    fn test_note_roundtrip() {
        let store = test_store();
        let id = capture(&store, "noted");
        assert!(store.add_note(id, "  remember this  ").unwrap());
        let notes = store.notes_for_clips([id].into_iter()).unwrap();
        assert_eq!(notes.get(&id).unwrap()[0].note, "remember this");
    }

    #[test]
    fn test_blank_note_ignored() {
        let store = test_store();
        let id = capture(&store, "no note");
        assert!(!store.add_note(id, "   ").unwrap());
        assert!(store.notes_for_clips([id].into_iter()).unwrap().is_empty());
    }

    #[test]
    fn test_notes_newest_first() {
        let store = test_store();
        let id = capture(&store, "many notes");
        store.add_note(id, "first").unwrap();
        store.add_note(id, "second").unwrap();
        let notes = store.notes_for_clips([id].into_iter()).unwrap();
        let list = notes.get(&id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].note, "second");
    }

    #[test]
    fn test_notes_cascade_on_delete() {
        let store = test_store();
        let id = capture(&store, "doomed");
        store.add_note(id, "gone soon").unwrap();
        store.delete(id).unwrap();
        assert!(store.notes_for_clips([id].into_iter()).unwrap().is_empty());
    }
}
