pub const CREATE_CLIPS: &str = "
    CREATE TABLE IF NOT EXISTS clips (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        source_app TEXT NOT NULL DEFAULT '',
        window_title TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL,
        hash TEXT NOT NULL,
        pinned INTEGER NOT NULL DEFAULT 0,
        title TEXT,
        file_path TEXT,
        lang TEXT NOT NULL DEFAULT 'unk'
    );
    CREATE INDEX IF NOT EXISTS idx_clips_hash ON clips(hash);
    CREATE INDEX IF NOT EXISTS idx_clips_created_at ON clips(created_at);
";

// Contentless-delta FTS index over clip content. The triggers keep it in the
// same transaction as every row mutation, so the index never lags the table.
pub const CREATE_CLIPS_FTS: &str = "
    CREATE VIRTUAL TABLE IF NOT EXISTS clips_fts USING fts5(
        content,
        content='clips',
        content_rowid='id'
    );

    CREATE TRIGGER IF NOT EXISTS clips_ai AFTER INSERT ON clips BEGIN
        INSERT INTO clips_fts(rowid, content) VALUES (new.id, new.content);
    END;

    CREATE TRIGGER IF NOT EXISTS clips_ad AFTER DELETE ON clips BEGIN
        INSERT INTO clips_fts(clips_fts, rowid, content) VALUES('delete', old.id, old.content);
    END;

    CREATE TRIGGER IF NOT EXISTS clips_au AFTER UPDATE ON clips BEGIN
        INSERT INTO clips_fts(clips_fts, rowid, content) VALUES('delete', old.id, old.content);
        INSERT INTO clips_fts(rowid, content) VALUES (new.id, new.content);
    END;
";

pub const CREATE_EVENTS: &str = "
    CREATE TABLE IF NOT EXISTS clip_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        clip_id INTEGER NOT NULL,
        seen_at TEXT NOT NULL,
        FOREIGN KEY (clip_id) REFERENCES clips(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_clip_events_clip ON clip_events(clip_id);
    CREATE INDEX IF NOT EXISTS idx_clip_events_seen ON clip_events(seen_at);
";

pub const CREATE_VECTORS: &str = "
    CREATE TABLE IF NOT EXISTS clip_vectors (
        clip_id INTEGER PRIMARY KEY,
        dim INTEGER NOT NULL,
        vector TEXT NOT NULL,
        model TEXT NOT NULL DEFAULT 'hash',
        FOREIGN KEY (clip_id) REFERENCES clips(id) ON DELETE CASCADE
    );
";

pub const CREATE_TAGS: &str = "
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL
    );
    CREATE TABLE IF NOT EXISTS clip_tags (
        clip_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (clip_id, tag_id),
        FOREIGN KEY (clip_id) REFERENCES clips(id) ON DELETE CASCADE,
        FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_clip_tags_clip ON clip_tags(clip_id);
    CREATE INDEX IF NOT EXISTS idx_clip_tags_tag ON clip_tags(tag_id);
";

pub const CREATE_NOTES: &str = "
    CREATE TABLE IF NOT EXISTS clip_notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        clip_id INTEGER NOT NULL,
        note TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (clip_id) REFERENCES clips(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_clip_notes_clip ON clip_notes(clip_id);
";

pub const CREATE_SETTINGS: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

pub const CREATE_BLOCKLIST: &str = "
    CREATE TABLE IF NOT EXISTS blocklist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        app TEXT UNIQUE NOT NULL
    );
";

pub const ALL: &[&str] = &[
    CREATE_CLIPS,
    CREATE_CLIPS_FTS,
    CREATE_EVENTS,
    CREATE_VECTORS,
    CREATE_TAGS,
    CREATE_NOTES,
    CREATE_SETTINGS,
    CREATE_BLOCKLIST,
];
