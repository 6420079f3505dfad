use std::collections::HashMap;
use std::io::Read;
use std::process;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use clipvault::clipboard::write_text;
use clipvault::config::AppPaths;
use clipvault::daemon::{self, WatchOptions};
use clipvault::embed::ModelKind;
use clipvault::errors::{Result, VaultError};
use clipvault::storage::models::{Clip, ClipFilter, ImportClip, PurgeFilter, TagMap};
use clipvault::storage::{SettingKey, Store};

#[derive(Parser)]
#[command(name = "clipvault", version, about = "A local clipboard history vault")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Filter by source application
    #[arg(long)]
    app: Option<String>,

    /// Filter by substring of content
    #[arg(long)]
    contains: Option<String>,

    /// Filter by tag
    #[arg(long)]
    tag: Option<String>,

    /// Show only pinned entries
    #[arg(short, long)]
    pinned: bool,

    /// Only entries at or after this RFC 3339 timestamp
    #[arg(long)]
    since: Option<String>,

    /// Only entries at or before this RFC 3339 timestamp
    #[arg(long)]
    until: Option<String>,

    /// Only entries from the last N hours
    #[arg(long)]
    since_hours: Option<f64>,
}

impl FilterArgs {
    fn to_filter(&self, limit: i64) -> Result<ClipFilter> {
        // --since-hours replaces --since when both are given.
        let since = match self.since_hours {
            Some(hours) => Some(Utc::now() - Duration::seconds((hours * 3600.0) as i64)),
            None => parse_timestamp(self.since.as_deref())?,
        };
        Ok(ClipFilter {
            app: self.app.clone(),
            contains: self.contains.clone(),
            tag: self.tag.clone(),
            pins_only: self.pinned,
            since,
            until: parse_timestamp(self.until.as_deref())?,
            limit,
        })
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| VaultError::InvalidInput(format!("bad timestamp '{raw}': {e}"))),
    }
}

#[derive(Args, Clone)]
struct WatchArgs {
    /// Poll interval in seconds (floored at 0.25)
    #[arg(long, default_value = "0.5")]
    interval: f64,

    /// Global row cap enforced after each capture (0 disables)
    #[arg(long, default_value = "2000")]
    cap: i64,

    /// Per-capture size limit in bytes (overrides the stored setting)
    #[arg(long)]
    max_bytes: Option<i64>,

    /// Capture secret-looking content instead of skipping it
    #[arg(long)]
    allow_secrets: bool,

    /// Redact secret-looking spans instead of skipping the capture
    #[arg(long)]
    redact: bool,

    /// Embedding model for new captures: hash or e5-small
    #[arg(long)]
    embedder: Option<String>,
}

impl WatchArgs {
    fn to_options(&self) -> WatchOptions {
        WatchOptions {
            interval_secs: self.interval,
            cap: self.cap,
            max_bytes: self.max_bytes,
            allow_secrets: if self.allow_secrets { Some(true) } else { None },
            redact: self.redact,
            embedder: self.embedder.as_deref().map(ModelKind::parse),
        }
    }

    fn to_forwarded_args(&self) -> Vec<String> {
        let mut args = vec![
            "daemon".to_string(),
            "run".to_string(),
            format!("--interval={}", self.interval),
            format!("--cap={}", self.cap),
        ];
        if let Some(max_bytes) = self.max_bytes {
            args.push(format!("--max-bytes={max_bytes}"));
        }
        if self.allow_secrets {
            args.push("--allow-secrets".to_string());
        }
        if self.redact {
            args.push("--redact".to_string());
        }
        if let Some(ref embedder) = self.embedder {
            args.push(format!("--embedder={embedder}"));
        }
        args
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List recent clipboard entries
    List {
        /// Maximum number of entries
        #[arg(short, long, default_value = "10")]
        limit: i64,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Full-text search over clipboard history
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: i64,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Rank history by semantic similarity to a query
    Semantic {
        /// Query text
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: i64,

        /// Candidate pool size
        #[arg(long, default_value = "2000")]
        pool: i64,

        /// Embedding model: hash or e5-small
        #[arg(long)]
        embedder: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Clips similar to an existing clip
    Related {
        /// Clip ID
        id: i64,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: i64,

        /// Candidate pool size
        #[arg(long, default_value = "2000")]
        pool: i64,

        /// Filter by source application
        #[arg(long)]
        app: Option<String>,

        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Group recent clips by tag and app
    Topics {
        /// Maximum number of groups
        #[arg(long, default_value = "8")]
        groups: usize,

        /// Entries shown per group
        #[arg(long, default_value = "3")]
        per_group: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show a clip in full
    Show {
        /// Clip ID
        id: i64,
    },

    /// Copy a clip back to the clipboard
    Copy {
        /// Clip ID
        id: i64,
    },

    /// Delete a clip
    Delete {
        /// Clip ID
        id: i64,
    },

    /// Bulk-delete clips by criteria
    Purge {
        /// Delete entries older than N days
        #[arg(long)]
        older_than_days: Option<i64>,

        /// Keep only the newest N entries
        #[arg(long)]
        keep_last: Option<i64>,

        /// Restrict to a source application
        #[arg(long)]
        app: Option<String>,

        /// Restrict to a tag
        #[arg(long)]
        tag: Option<String>,

        /// Delete everything
        #[arg(long)]
        all: bool,
    },

    /// Pin or unpin a clip
    Pin {
        /// Clip ID
        id: i64,

        /// Unpin instead of pin
        #[arg(short, long, conflicts_with = "toggle")]
        unpin: bool,

        /// Flip the clip's current pin state
        #[arg(short, long)]
        toggle: bool,
    },

    /// Add or remove tags on a clip
    Tag {
        /// Clip ID
        id: i64,

        /// Tag name
        tag: Option<String>,

        /// Remove the tag instead of adding
        #[arg(short, long)]
        remove: bool,

        /// Remove all tags from the clip
        #[arg(long)]
        clear: bool,
    },

    /// List all known tags with usage counts
    Tags,

    /// Attach a note to a clip
    Note {
        /// Clip ID
        id: i64,

        /// Note text
        text: String,
    },

    /// Show when a clip's content was copied
    History {
        /// Clip ID
        id: i64,

        /// Maximum entries
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show storage statistics
    Stats,

    /// Show daemon state and effective configuration
    Status,

    /// Read or write settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the capture blocklist
    Blocklist {
        #[command(subcommand)]
        action: BlocklistAction,
    },

    /// Pause clipboard capture
    Pause,

    /// Resume clipboard capture
    Resume,

    /// Export clips as a JSON bundle on stdout
    Export {
        /// Maximum entries to export (0 = everything)
        #[arg(short, long, default_value = "0")]
        limit: i64,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Import clips from a JSON bundle
    Import {
        /// Bundle file; reads stdin when omitted
        file: Option<String>,
    },

    /// Manage the clipboard watcher daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show one setting
    Get { key: String },
    /// Write one setting
    Set { key: String, value: String },
    /// Show all settings
    List,
}

#[derive(Subcommand)]
enum BlocklistAction {
    /// Block captures from an application
    Add { app: String },
    /// Unblock an application
    Remove { app: String },
    /// Show blocked applications
    List,
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the clipboard watcher
    Start {
        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Stop the clipboard watcher
    Stop,
    /// Check daemon status
    Status,
    /// Run watcher in foreground (used internally)
    #[command(hide = true)]
    Run {
        #[command(flatten)]
        watch: WatchArgs,
    },
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<i64>,
}

/// One clip in an export bundle, self-contained enough to re-import on
/// another machine.
#[derive(Serialize, Deserialize)]
struct ExportEntry {
    content: String,
    source_app: String,
    window_title: String,
    created_at: DateTime<Utc>,
    pinned: bool,
    title: Option<String>,
    file_path: Option<String>,
    lang: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    notes: Vec<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::new();
    let json = cli.json;

    match cli.command {
        None => cmd_list(&paths, 10, &FilterArgs::default(), json),
        Some(Commands::List { limit, filter }) => cmd_list(&paths, limit, &filter, json),
        Some(Commands::Search { query, limit, filter }) => {
            cmd_search(&paths, &query, limit, &filter, json)
        }
        Some(Commands::Semantic { query, limit, pool, embedder, filter }) => {
            cmd_semantic(&paths, &query, limit, pool, embedder.as_deref(), &filter, json)
        }
        Some(Commands::Related { id, limit, pool, app, tag }) => {
            cmd_related(&paths, id, limit, pool, app, tag, json)
        }
        Some(Commands::Topics { groups, per_group, filter }) => {
            cmd_topics(&paths, groups, per_group, &filter, json)
        }
        Some(Commands::Show { id }) => cmd_show(&paths, id, json),
        Some(Commands::Copy { id }) => cmd_copy(&paths, id, json),
        Some(Commands::Delete { id }) => cmd_delete(&paths, id, json),
        Some(Commands::Purge { older_than_days, keep_last, app, tag, all }) => cmd_purge(
            &paths,
            PurgeFilter { older_than_days, keep_last, app, tag, all },
            json,
        ),
        Some(Commands::Pin { id, unpin, toggle }) => cmd_pin(&paths, id, unpin, toggle, json),
        Some(Commands::Tag { id, tag, remove, clear }) => {
            cmd_tag(&paths, id, tag.as_deref(), remove, clear, json)
        }
        Some(Commands::Tags) => cmd_tags(&paths, json),
        Some(Commands::Note { id, text }) => cmd_note(&paths, id, &text, json),
        Some(Commands::History { id, limit }) => cmd_history(&paths, id, limit, json),
        Some(Commands::Stats) => cmd_stats(&paths, json),
        Some(Commands::Status) => cmd_status(&paths, json),
        Some(Commands::Config { action }) => cmd_config(&paths, action, json),
        Some(Commands::Blocklist { action }) => cmd_blocklist(&paths, action, json),
        Some(Commands::Pause) => cmd_set_paused(&paths, true, json),
        Some(Commands::Resume) => cmd_set_paused(&paths, false, json),
        Some(Commands::Export { limit, filter }) => cmd_export(&paths, limit, &filter),
        Some(Commands::Import { file }) => cmd_import(&paths, file.as_deref(), json),
        Some(Commands::Daemon { action }) => cmd_daemon(&paths, action, json),
    }
}

fn open_store(paths: &AppPaths) -> Result<Store> {
    Store::open(&paths.db_path)
}

fn emit_status(message: String, success: bool, removed: Option<i64>, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string(&StatusResponse { success, message, removed }).unwrap()
        );
    } else {
        println!("{}", message);
    }
}

fn cmd_list(paths: &AppPaths, limit: i64, args: &FilterArgs, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let (clips, tags) = store.filtered_rows(&args.to_filter(limit)?)?;

    if json {
        println!("{}", serde_json::to_string(&clips).unwrap());
        return Ok(());
    }
    if clips.is_empty() {
        println!("No clips found.");
        return Ok(());
    }
    for clip in &clips {
        print_clip_row(clip, &tags);
    }
    Ok(())
}

fn cmd_search(
    paths: &AppPaths,
    query: &str,
    limit: i64,
    args: &FilterArgs,
    json: bool,
) -> Result<()> {
    let store = open_store(paths)?;
    let clips = store.fts_search(query, &args.to_filter(limit)?)?;

    if json {
        println!("{}", serde_json::to_string(&clips).unwrap());
        return Ok(());
    }
    if clips.is_empty() {
        println!("No results for \"{}\".", query);
        return Ok(());
    }
    let tags = store.tags_for_clips(clips.iter().map(|c| c.id))?;
    for clip in &clips {
        print_clip_row(clip, &tags);
    }
    Ok(())
}

fn cmd_semantic(
    paths: &AppPaths,
    query: &str,
    limit: i64,
    pool: i64,
    embedder: Option<&str>,
    args: &FilterArgs,
    json: bool,
) -> Result<()> {
    let store = open_store(paths)?;
    let filter = args.to_filter(limit)?;
    let model = embedder.map(ModelKind::parse);
    let hits =
        store.semantic_search(query, filter.effective_limit() as usize, pool, &filter, model)?;

    if json {
        println!("{}", serde_json::to_string(&hits).unwrap());
        return Ok(());
    }
    if hits.is_empty() {
        println!("No results for \"{}\".", query);
        return Ok(());
    }
    let tags = store.tags_for_clips(hits.iter().map(|h| h.clip.id))?;
    for hit in &hits {
        print!("{:.3} ", hit.score);
        print_clip_row(&hit.clip, &tags);
    }
    Ok(())
}

fn cmd_related(
    paths: &AppPaths,
    id: i64,
    limit: i64,
    pool: i64,
    app: Option<String>,
    tag: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store(paths)?;
    let hits = store.related(id, limit.max(1) as usize, pool, app, tag)?;

    if json {
        println!("{}", serde_json::to_string(&hits).unwrap());
        return Ok(());
    }
    if hits.is_empty() {
        println!("No related clips for #{}.", id);
        return Ok(());
    }
    let tags = store.tags_for_clips(hits.iter().map(|h| h.clip.id))?;
    for hit in &hits {
        print!("{:.3} ", hit.score);
        print_clip_row(&hit.clip, &tags);
    }
    Ok(())
}

fn cmd_topics(
    paths: &AppPaths,
    groups: usize,
    per_group: usize,
    args: &FilterArgs,
    json: bool,
) -> Result<()> {
    let store = open_store(paths)?;
    let topics = store.topic_groups(groups, per_group, &args.to_filter(0)?)?;

    if json {
        println!("{}", serde_json::to_string(&topics).unwrap());
        return Ok(());
    }
    if topics.is_empty() {
        println!("No clips found.");
        return Ok(());
    }
    let empty = TagMap::new();
    for topic in &topics {
        println!("{} ({}, {} clips)", topic.name, topic.kind, topic.count);
        for clip in &topic.items {
            print!("  ");
            print_clip_row(clip, &empty);
        }
    }
    Ok(())
}

fn cmd_show(paths: &AppPaths, id: i64, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let clip = store
        .fetch(id)?
        .ok_or_else(|| VaultError::NotFound(format!("clip {id}")))?;
    let tags = store.tags_for_clip(id)?;
    let notes = store.notes_for_clips([id].into_iter())?;
    let notes = notes.get(&id).cloned().unwrap_or_default();
    let seen = store.history(id, 1000)?.len();

    if json {
        let mut obj = serde_json::to_value(&clip).unwrap();
        let m = obj.as_object_mut().unwrap();
        m.insert("tags".into(), serde_json::json!(tags));
        m.insert("notes".into(), serde_json::to_value(&notes).unwrap());
        m.insert("seen_count".into(), serde_json::json!(seen));
        println!("{}", serde_json::to_string(&obj).unwrap());
        return Ok(());
    }

    println!("ID:      {}", clip.id);
    println!("Created: {}", clip.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("App:     {}", clip.source_app);
    if !clip.window_title.is_empty() {
        println!("Window:  {}", clip.window_title);
    }
    println!("Pinned:  {}", clip.pinned);
    println!("Lang:    {}", clip.lang);
    println!("Hash:    {}", &clip.hash[..16]);
    println!("Seen:    {} time(s)", seen);
    if let Some(ref title) = clip.title {
        println!("Title:   {}", title);
    }
    if let Some(ref path) = clip.file_path {
        println!("File:    {}", path);
    }
    if !tags.is_empty() {
        println!("Tags:    {}", tags.join(", "));
    }
    for note in &notes {
        println!("Note:    {} ({})", note.note, note.created_at.format("%Y-%m-%d %H:%M"));
    }
    println!("─────────────────────────");
    println!("{}", clip.content);
    Ok(())
}

fn cmd_copy(paths: &AppPaths, id: i64, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let clip = store
        .fetch(id)?
        .ok_or_else(|| VaultError::NotFound(format!("clip {id}")))?;
    write_text(&clip.content)?;
    store.note_seen(id)?;
    emit_status(format!("Copied clip #{} to clipboard.", id), true, None, json);
    Ok(())
}

fn cmd_delete(paths: &AppPaths, id: i64, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let found = store.delete(id)?;
    let message = if found {
        format!("Deleted clip #{}.", id)
    } else {
        format!("Clip #{} not found.", id)
    };
    emit_status(message, found, None, json);
    Ok(())
}

fn cmd_purge(paths: &AppPaths, filter: PurgeFilter, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let removed = store.purge(&filter)?;
    emit_status(format!("Removed {} clip(s).", removed), true, Some(removed), json);
    Ok(())
}

fn cmd_pin(paths: &AppPaths, id: i64, unpin: bool, toggle: bool, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let pinned = if toggle {
        let clip = store
            .fetch(id)?
            .ok_or_else(|| VaultError::NotFound(format!("clip {id}")))?;
        !clip.pinned
    } else {
        !unpin
    };
    let found = store.set_pinned(id, pinned)?;
    let message = match (found, pinned) {
        (true, true) => format!("Pinned clip #{}.", id),
        (true, false) => format!("Unpinned clip #{}.", id),
        (false, _) => format!("Clip #{} not found.", id),
    };
    emit_status(message, found, None, json);
    Ok(())
}

fn cmd_tag(
    paths: &AppPaths,
    id: i64,
    tag: Option<&str>,
    remove: bool,
    clear: bool,
    json: bool,
) -> Result<()> {
    let store = open_store(paths)?;
    let message = if clear {
        let removed = store.clear_tags(id)?;
        format!("Removed {} tag(s) from clip #{}.", removed, id)
    } else {
        let tag = tag.ok_or_else(|| {
            VaultError::InvalidInput("a tag name is required unless --clear is given".to_string())
        })?;
        if remove {
            store.remove_tag(id, tag)?;
            format!("Removed tag \"{}\" from clip #{}.", tag, id)
        } else {
            store.assign_tag(id, tag)?;
            format!("Added tag \"{}\" to clip #{}.", tag, id)
        }
    };
    emit_status(message, true, None, json);
    Ok(())
}

fn cmd_tags(paths: &AppPaths, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let tags = store.list_tags()?;
    if json {
        println!("{}", serde_json::to_string(&tags).unwrap());
        return Ok(());
    }
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }
    for (name, count) in &tags {
        println!("{:>5}  {}", count, name);
    }
    Ok(())
}

fn cmd_note(paths: &AppPaths, id: i64, text: &str, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    store
        .fetch(id)?
        .ok_or_else(|| VaultError::NotFound(format!("clip {id}")))?;
    let added = store.add_note(id, text)?;
    let message = if added {
        format!("Added note to clip #{}.", id)
    } else {
        "Empty note ignored.".to_string()
    };
    emit_status(message, added, None, json);
    Ok(())
}

fn cmd_history(paths: &AppPaths, id: i64, limit: i64, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    store
        .fetch(id)?
        .ok_or_else(|| VaultError::NotFound(format!("clip {id}")))?;
    let seen = store.history(id, limit)?;
    if json {
        println!("{}", serde_json::to_string(&seen).unwrap());
        return Ok(());
    }
    if seen.is_empty() {
        println!("Clip #{} has no recorded copies.", id);
        return Ok(());
    }
    for ts in &seen {
        println!("{}", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}

fn cmd_stats(paths: &AppPaths, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let stats = store.stats()?;

    if json {
        let daemon_pid = daemon::daemon_status(paths).ok().flatten();
        let mut obj = serde_json::to_value(&stats).unwrap();
        let m = obj.as_object_mut().unwrap();
        m.insert("daemon_running".into(), serde_json::json!(daemon_pid.is_some()));
        m.insert("daemon_pid".into(), serde_json::json!(daemon_pid));
        println!("{}", serde_json::to_string(&obj).unwrap());
        return Ok(());
    }

    println!("Clipboard Statistics");
    println!("────────────────────");
    println!("Total clips:  {}", stats.count);
    println!("Database:     {}", format_bytes(stats.db_size_bytes as i64));
    if let Some(latest) = stats.latest {
        println!("Latest:       {}", latest.format("%Y-%m-%d %H:%M"));
    }
    if let Ok(Some(pid)) = daemon::daemon_status(paths) {
        println!("Daemon:       running (pid {})", pid);
    } else {
        println!("Daemon:       not running");
    }
    Ok(())
}

fn cmd_status(paths: &AppPaths, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    let snapshot = store.status_snapshot()?;

    if json {
        let daemon_pid = daemon::daemon_status(paths).ok().flatten();
        let mut obj = serde_json::to_value(&snapshot).unwrap();
        let m = obj.as_object_mut().unwrap();
        m.insert("daemon_running".into(), serde_json::json!(daemon_pid.is_some()));
        m.insert("daemon_pid".into(), serde_json::json!(daemon_pid));
        println!("{}", serde_json::to_string(&obj).unwrap());
        return Ok(());
    }

    println!("Capture:      {}", if snapshot.paused { "paused" } else { "active" });
    println!("Embedder:     {}", snapshot.embedder);
    println!("Evict mode:   {}", snapshot.evict_mode);
    println!("Max bytes:    {}", snapshot.max_bytes);
    println!("Max DB:       {} MB (at {:.1} MB)", snapshot.max_db_mb, snapshot.db_size_mb);
    println!("Secrets:      {}", if snapshot.allow_secrets { "allowed" } else { "skipped" });
    println!("Notify:       {}", snapshot.notify);
    println!("Clips:        {}", snapshot.count);
    if let Some(latest) = snapshot.latest {
        println!("Latest:       {}", latest.format("%Y-%m-%d %H:%M"));
    }
    if !snapshot.cap_by_app.is_empty() {
        println!("App caps:     {}", format_caps(&snapshot.cap_by_app));
    }
    if !snapshot.cap_by_tag.is_empty() {
        println!("Tag caps:     {}", format_caps(&snapshot.cap_by_tag));
    }
    println!("Blocklist:    {} app(s)", snapshot.blocklist_size);
    if let Ok(Some(pid)) = daemon::daemon_status(paths) {
        println!("Daemon:       running (pid {})", pid);
    } else {
        println!("Daemon:       not running");
    }
    Ok(())
}

fn cmd_config(paths: &AppPaths, action: ConfigAction, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    match action {
        ConfigAction::Get { key } => {
            let key = SettingKey::parse(&key)
                .ok_or_else(|| VaultError::InvalidInput(format!("unknown setting '{key}'")))?;
            let value = store.get_setting(key)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({"key": key.name(), "value": value.display()})
                );
            } else {
                println!("{} = {}", key.name(), value.display());
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let parsed = SettingKey::parse(&key)
                .ok_or_else(|| VaultError::InvalidInput(format!("unknown setting '{key}'")))?;
            store.set_setting(parsed, &value)?;
            let stored = store.get_setting(parsed)?;
            emit_status(
                format!("Set {} = {}.", parsed.name(), stored.display()),
                true,
                None,
                json,
            );
            Ok(())
        }
        ConfigAction::List => {
            if json {
                let mut obj = serde_json::Map::new();
                for key in SettingKey::ALL {
                    obj.insert(
                        key.name().to_string(),
                        serde_json::json!(store.get_setting(*key)?.display()),
                    );
                }
                println!("{}", serde_json::Value::Object(obj));
            } else {
                for key in SettingKey::ALL {
                    println!("{:<14} {}", key.name(), store.get_setting(*key)?.display());
                }
            }
            Ok(())
        }
    }
}

fn cmd_blocklist(paths: &AppPaths, action: BlocklistAction, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    match action {
        BlocklistAction::Add { app } => {
            let added = store.add_blocked_app(&app)?;
            let message = if added {
                format!("Blocked captures from \"{}\".", app.trim().to_lowercase())
            } else {
                "Application name is empty.".to_string()
            };
            emit_status(message, added, None, json);
            Ok(())
        }
        BlocklistAction::Remove { app } => {
            let removed = store.remove_blocked_app(&app)?;
            let message = if removed {
                format!("Unblocked \"{}\".", app.trim().to_lowercase())
            } else {
                format!("\"{}\" was not blocked.", app)
            };
            emit_status(message, removed, None, json);
            Ok(())
        }
        BlocklistAction::List => {
            let mut apps: Vec<String> = store.blocklist()?.into_iter().collect();
            apps.sort();
            if json {
                println!("{}", serde_json::to_string(&apps).unwrap());
            } else if apps.is_empty() {
                println!("Blocklist is empty.");
            } else {
                for app in &apps {
                    println!("{}", app);
                }
            }
            Ok(())
        }
    }
}

fn cmd_set_paused(paths: &AppPaths, paused: bool, json: bool) -> Result<()> {
    let store = open_store(paths)?;
    store.set_paused(paused)?;
    let message = if paused {
        "Capture paused.".to_string()
    } else {
        "Capture resumed.".to_string()
    };
    emit_status(message, true, None, json);
    Ok(())
}

fn cmd_export(paths: &AppPaths, limit: i64, args: &FilterArgs) -> Result<()> {
    let store = open_store(paths)?;
    let filter = args.to_filter(if limit <= 0 { i64::MAX } else { limit })?;
    let (clips, tags) = store.filtered_rows(&filter)?;
    let notes = store.notes_for_clips(clips.iter().map(|c| c.id))?;

    let entries: Vec<ExportEntry> = clips
        .into_iter()
        .map(|clip| ExportEntry {
            tags: tags.get(&clip.id).cloned().unwrap_or_default(),
            notes: notes
                .get(&clip.id)
                .map(|list| list.iter().map(|n| n.note.clone()).collect())
                .unwrap_or_default(),
            content: clip.content,
            source_app: clip.source_app,
            window_title: clip.window_title,
            created_at: clip.created_at,
            pinned: clip.pinned,
            title: clip.title,
            file_path: clip.file_path,
            lang: clip.lang,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries).unwrap());
    Ok(())
}

fn cmd_import(paths: &AppPaths, file: Option<&str>, json: bool) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| VaultError::InvalidInput(format!("cannot read {path}: {e}")))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| VaultError::InvalidInput(format!("cannot read stdin: {e}")))?;
            buf
        }
    };
    let entries: Vec<ExportEntry> = serde_json::from_str(&raw)
        .map_err(|e| VaultError::InvalidInput(format!("bad bundle: {e}")))?;

    let store = open_store(paths)?;
    let mut imported = 0i64;
    for entry in &entries {
        let clip = ImportClip {
            content: entry.content.clone(),
            source_app: entry.source_app.clone(),
            window_title: entry.window_title.clone(),
            created_at: Some(entry.created_at),
            pinned: entry.pinned,
            title: entry.title.clone(),
            file_path: entry.file_path.clone(),
            lang: Some(entry.lang.clone()),
            tags: entry.tags.clone(),
        };
        if let Some(id) = store.insert_import(&clip)? {
            for note in &entry.notes {
                store.add_note(id, note)?;
            }
            imported += 1;
        }
    }
    emit_status(
        format!("Imported {} of {} clip(s).", imported, entries.len()),
        true,
        Some(imported),
        json,
    );
    Ok(())
}

fn cmd_daemon(paths: &AppPaths, action: DaemonAction, json: bool) -> Result<()> {
    match action {
        DaemonAction::Start { watch } => {
            if let Ok(Some(pid)) = daemon::daemon_status(paths) {
                emit_status(format!("Daemon already running (pid {}).", pid), true, None, json);
                return Ok(());
            }

            let exe = std::env::current_exe().map_err(|e| VaultError::Daemon(e.to_string()))?;
            std::fs::create_dir_all(&paths.base_dir)
                .map_err(|e| VaultError::Daemon(e.to_string()))?;
            let log_file = std::fs::File::create(&paths.log_file)
                .map_err(|e| VaultError::Daemon(e.to_string()))?;

            let child = std::process::Command::new(exe)
                .args(watch.to_forwarded_args())
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::from(log_file))
                .spawn()
                .map_err(|e| VaultError::Daemon(e.to_string()))?;

            emit_status(
                format!("Started clipboard watcher (pid {}).", child.id()),
                true,
                None,
                json,
            );
            Ok(())
        }
        DaemonAction::Stop => {
            let stopped = daemon::stop_daemon(paths)?;
            let message = if stopped {
                "Stopped clipboard watcher.".to_string()
            } else {
                "Daemon is not running.".to_string()
            };
            emit_status(message, stopped, None, json);
            Ok(())
        }
        DaemonAction::Status => {
            let pid = daemon::daemon_status(paths)?;
            if json {
                println!("{}", serde_json::json!({"running": pid.is_some(), "pid": pid}));
            } else {
                match pid {
                    Some(pid) => println!("Daemon running (pid {}).", pid),
                    None => println!("Daemon is not running."),
                }
            }
            Ok(())
        }
        DaemonAction::Run { watch } => daemon::run_watcher(paths, &watch.to_options()),
    }
}

fn print_clip_row(clip: &Clip, tags: &TagMap) {
    let pin = if clip.pinned { "*" } else { " " };
    let oneline = clip.content.replace('\n', "\\n");
    let preview: String = if oneline.chars().count() > 60 {
        let cut: String = oneline.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        oneline
    };
    let age = format_age(clip.created_at);
    let tag_list = match tags.get(&clip.id) {
        Some(list) if !list.is_empty() => format!(" [{}]", list.join(", ")),
        _ => String::new(),
    };
    let app = if clip.source_app.is_empty() {
        String::new()
    } else {
        format!(" ({})", clip.source_app)
    };
    println!("{:>4}{} {:>6}  {}{}{}", clip.id, pin, age, preview, tag_list, app);
}

fn format_age(dt: DateTime<Utc>) -> String {
    let dur = Utc::now() - dt;
    if dur.num_seconds() < 60 {
        "now".to_string()
    } else if dur.num_minutes() < 60 {
        format!("{}m", dur.num_minutes())
    } else if dur.num_hours() < 24 {
        format!("{}h", dur.num_hours())
    } else {
        format!("{}d", dur.num_days())
    }
}

fn format_bytes(bytes: i64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_caps(caps: &HashMap<String, i64>) -> String {
    let mut pairs: Vec<String> = caps.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(", ")
}
