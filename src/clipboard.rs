use arboard::Clipboard;

use crate::errors::{Result, VaultError};

/// Current clipboard text, or `None` when the clipboard is empty or holds
/// non-text content.
pub fn read_text() -> Result<Option<String>> {
    let mut cb = Clipboard::new().map_err(|e| VaultError::Clipboard(e.to_string()))?;
    match cb.get_text() {
        Ok(text) if !text.is_empty() => Ok(Some(text)),
        _ => Ok(None),
    }
}

pub fn write_text(text: &str) -> Result<()> {
    let mut cb = Clipboard::new().map_err(|e| VaultError::Clipboard(e.to_string()))?;
    cb.set_text(text)
        .map_err(|e| VaultError::Clipboard(e.to_string()))
}

/// Frontmost application name and window title, for capture provenance.
/// Only implemented on macOS; elsewhere the capture is recorded without
/// an app attribution.
#[cfg(target_os = "macos")]
pub fn frontmost_app_and_window() -> (String, String) {
    let script = r#"
        tell application "System Events"
            set frontApp to first application process whose frontmost is true
            set appName to name of frontApp
            set winTitle to ""
            try
                set winTitle to name of front window of frontApp
            end try
            return appName & "\n" & winTitle
        end tell
    "#;
    let output = std::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            let mut lines = text.lines();
            let app = lines.next().unwrap_or("unknown").trim().to_string();
            let window = lines.next().unwrap_or("").trim().to_string();
            if app.is_empty() {
                ("unknown".to_string(), window)
            } else {
                (app, window)
            }
        }
        _ => ("unknown".to_string(), String::new()),
    }
}

#[cfg(not(target_os = "macos"))]
pub fn frontmost_app_and_window() -> (String, String) {
    ("unknown".to_string(), String::new())
}
