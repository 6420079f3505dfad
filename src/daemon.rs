//! Background capture daemon: pid-file lifecycle and the clipboard watch
//! loop that feeds the store.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::clipboard::{frontmost_app_and_window, read_text};
use crate::config::AppPaths;
use crate::embed::ModelKind;
use crate::errors::{Result, VaultError};
use crate::hash::content_digest;
use crate::secrets::{looks_like_secret, redact_secrets};
use crate::storage::Store;
use crate::storage::models::NewClip;

const MIN_INTERVAL_SECS: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Poll interval in seconds, floored at 250ms.
    pub interval_secs: f64,
    /// Global row cap enforced after each capture; 0 disables it.
    pub cap: i64,
    pub max_bytes: Option<i64>,
    pub allow_secrets: Option<bool>,
    /// Redact secret-looking spans instead of skipping the capture.
    pub redact: bool,
    pub embedder: Option<ModelKind>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval_secs: 0.5,
            cap: 2000,
            max_bytes: None,
            allow_secrets: None,
            redact: false,
            embedder: None,
        }
    }
}

pub fn write_pid_file(path: &Path) -> Result<()> {
    let pid = std::process::id();
    fs::write(path, pid.to_string()).map_err(|e| VaultError::Daemon(e.to_string()))
}

pub fn read_pid_file(path: &Path) -> Result<Option<u32>> {
    match fs::read_to_string(path) {
        Ok(contents) => match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => Ok(None),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(VaultError::Daemon(e.to_string())),
    }
}

pub fn remove_pid_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VaultError::Daemon(e.to_string())),
    }
}

pub fn is_process_running(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

pub fn stop_daemon(paths: &AppPaths) -> Result<bool> {
    match read_pid_file(&paths.pid_file)? {
        Some(pid) if is_process_running(pid) => {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            remove_pid_file(&paths.pid_file)?;
            Ok(true)
        }
        Some(_) => {
            remove_pid_file(&paths.pid_file)?;
            Ok(false)
        }
        None => Ok(false),
    }
}

/// Pid of the running daemon, cleaning up a stale pid file on the way.
pub fn daemon_status(paths: &AppPaths) -> Result<Option<u32>> {
    match read_pid_file(&paths.pid_file)? {
        Some(pid) if is_process_running(pid) => Ok(Some(pid)),
        Some(_) => {
            remove_pid_file(&paths.pid_file)?;
            Ok(None)
        }
        None => Ok(None),
    }
}

struct WatchState {
    last_digest: Option<String>,
    was_paused: bool,
}

pub fn run_watcher(paths: &AppPaths, options: &WatchOptions) -> Result<()> {
    fs::create_dir_all(&paths.base_dir).map_err(|e| VaultError::Daemon(e.to_string()))?;
    write_pid_file(&paths.pid_file)?;

    let store = Store::open(&paths.db_path)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let _ = ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    });

    let interval = Duration::from_secs_f64(options.interval_secs.max(MIN_INTERVAL_SECS));
    let mut state = WatchState { last_digest: None, was_paused: false };

    info!("watching clipboard (pid {})", std::process::id());

    while running.load(Ordering::Relaxed) {
        if let Err(e) = poll_once(&store, options, &mut state) {
            warn!("poll error: {e}");
        }
        thread::sleep(interval);
    }

    info!("shutting down");
    remove_pid_file(&paths.pid_file)?;
    Ok(())
}

fn poll_once(store: &Store, options: &WatchOptions, state: &mut WatchState) -> Result<()> {
    if store.paused()? {
        if !state.was_paused {
            info!("capture paused");
            state.was_paused = true;
        }
        return Ok(());
    }
    if state.was_paused {
        info!("capture resumed");
        state.was_paused = false;
    }

    let Some(text) = read_text()? else {
        return Ok(());
    };
    let digest = content_digest(&text);
    if state.last_digest.as_deref() == Some(&digest) {
        return Ok(());
    }
    state.last_digest = Some(digest.clone());

    let (app, window) = frontmost_app_and_window();
    if store.blocklist()?.contains(&app.to_lowercase()) {
        info!("skipping capture from blocklisted app '{app}'");
        return Ok(());
    }

    let max_bytes = store.max_bytes(options.max_bytes)?;
    if max_bytes > 0 && text.len() as i64 > max_bytes {
        info!("skipping oversized capture ({} bytes)", text.len());
        return Ok(());
    }

    let mut content = text;
    let mut digest = digest;
    if looks_like_secret(&content) && !store.allow_secrets(options.allow_secrets)? {
        if options.redact {
            content = redact_secrets(&content);
            digest = content_digest(&content);
            info!("redacted secret-looking capture");
        } else {
            info!("skipping secret-looking capture");
            return Ok(());
        }
    }

    // A repeat of stored content bumps its seen history instead of
    // inserting a new row.
    if let Some(existing) = store.fetch_by_hash(&digest)? {
        store.note_seen(existing)?;
        info!("noted repeat of clip {existing}");
        return Ok(());
    }

    let title = content.lines().next().map(str::to_string);
    let clip = NewClip {
        content,
        source_app: app.clone(),
        window_title: window,
        title,
        file_path: None,
        hash: Some(digest),
    };
    let Some(id) = store.insert(&clip, options.embedder)? else {
        return Ok(());
    };
    store.note_seen(id)?;
    info!("captured clip {id} from '{app}'");

    enforce_retention(store, options, &app)?;
    Ok(())
}

fn enforce_retention(store: &Store, options: &WatchOptions, app: &str) -> Result<()> {
    if let Some(&cap) = store.cap_by_app()?.get(&app.to_lowercase()) {
        let evicted = store.evict_app_cap(app, cap)?;
        if evicted > 0 {
            info!("app '{app}' over cap {cap}, evicted {evicted}");
        }
    }
    if options.cap > 0 {
        let pruned = store.prune(options.cap)?;
        if pruned > 0 {
            info!("pruned {pruned} clips over global cap {}", options.cap);
        }
    }
    let max_db_mb = store.max_db_mb(None)?;
    let evicted = store.evict_if_needed(max_db_mb)?;
    if evicted > 0 {
        info!("database over {max_db_mb} MB, evicted {evicted}");
    }

    let stats = store.stats()?;
    if options.cap > 0 && stats.count as f64 > options.cap as f64 * 0.9 {
        warn!(
            "history at {} of {} clips, captures will start evicting soon",
            stats.count, options.cap
        );
    }
    if max_db_mb > 0 {
        let size_mb = stats.db_size_bytes as f64 / (1024.0 * 1024.0);
        if size_mb > max_db_mb as f64 * 0.8 {
            warn!("database at {size_mb:.1} MB of {max_db_mb} MB cap");
        }
    }
    Ok(())
}
