//! Typed settings on top of the key/value table. Every known key has a
//! declared kind, and values are validated when written; a rejected write
//! leaves the stored value untouched.

use std::collections::{HashMap, HashSet};

use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use super::Store;
use crate::embed::ModelKind;
use crate::errors::{Result, VaultError};

pub const DEFAULT_MAX_BYTES: i64 = 16_384;
pub const DEFAULT_MAX_DB_MB: i64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Int,
    Bool,
    Json,
    Str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    MaxBytes,
    MaxDbMb,
    CapByApp,
    CapByTag,
    EvictMode,
    Embedder,
    AllowSecrets,
    Notify,
    Paused,
}

impl SettingKey {
    pub const ALL: &'static [SettingKey] = &[
        SettingKey::MaxBytes,
        SettingKey::MaxDbMb,
        SettingKey::CapByApp,
        SettingKey::CapByTag,
        SettingKey::EvictMode,
        SettingKey::Embedder,
        SettingKey::AllowSecrets,
        SettingKey::Notify,
        SettingKey::Paused,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::MaxBytes => "max_bytes",
            SettingKey::MaxDbMb => "max_db_mb",
            SettingKey::CapByApp => "cap_by_app",
            SettingKey::CapByTag => "cap_by_tag",
            SettingKey::EvictMode => "evict_mode",
            SettingKey::Embedder => "embedder",
            SettingKey::AllowSecrets => "allow_secrets",
            SettingKey::Notify => "notify",
            SettingKey::Paused => "paused",
        }
    }

    pub fn kind(&self) -> SettingKind {
        match self {
            SettingKey::MaxBytes | SettingKey::MaxDbMb => SettingKind::Int,
            SettingKey::CapByApp | SettingKey::CapByTag => SettingKind::Json,
            SettingKey::EvictMode | SettingKey::Embedder => SettingKind::Str,
            SettingKey::AllowSecrets | SettingKey::Notify | SettingKey::Paused => {
                SettingKind::Bool
            }
        }
    }

    pub fn parse(name: &str) -> Option<SettingKey> {
        SettingKey::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Int(i64),
    Bool(bool),
    Json(Value),
    Str(String),
}

impl SettingValue {
    pub fn display(&self) -> String {
        match self {
            SettingValue::Int(v) => v.to_string(),
            SettingValue::Bool(v) => if *v { "true" } else { "false" }.to_string(),
            SettingValue::Json(v) => v.to_string(),
            SettingValue::Str(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictMode {
    Fifo,
    Tiered,
}

impl EvictMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictMode::Fifo => "fifo",
            EvictMode::Tiered => "tiered",
        }
    }

    pub fn parse(s: &str) -> Option<EvictMode> {
        match s.trim().to_lowercase().as_str() {
            "fifo" => Some(EvictMode::Fifo),
            "tiered" => Some(EvictMode::Tiered),
            _ => None,
        }
    }
}

fn parse_bool_value(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validate a cap map: a JSON object of integer caps. Keys are normalized to
/// lowercase; blank keys are rejected.
fn parse_cap_map(raw: &str) -> std::result::Result<HashMap<String, i64>, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| "value must be a JSON object".to_string())?;
    let mut out = HashMap::new();
    for (key, val) in obj {
        let key_norm = key.trim().to_lowercase();
        if key_norm.is_empty() {
            return Err("cap map keys must be non-empty".to_string());
        }
        let cap = val
            .as_i64()
            .ok_or_else(|| format!("cap for '{key}' must be an integer"))?;
        out.insert(key_norm, cap);
    }
    Ok(out)
}

impl Store {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO settings(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Write a setting, validating against the key's declared kind. Invalid
    /// values are rejected with a reason and the stored value is unchanged.
    pub fn set_setting(&self, key: SettingKey, raw: &str) -> Result<()> {
        match key.kind() {
            SettingKind::Int => {
                let parsed: i64 = raw.trim().parse().map_err(|_| {
                    VaultError::InvalidInput(format!(
                        "{} must be an integer, got '{raw}'",
                        key.name()
                    ))
                })?;
                self.set_raw(key.name(), &parsed.to_string())
            }
            SettingKind::Bool => {
                let parsed = parse_bool_value(raw).ok_or_else(|| {
                    VaultError::InvalidInput(format!(
                        "{} must be true/false or 1/0, got '{raw}'",
                        key.name()
                    ))
                })?;
                self.set_raw(key.name(), if parsed { "1" } else { "0" })
            }
            SettingKind::Json => {
                let map = parse_cap_map(raw).map_err(|reason| {
                    VaultError::InvalidInput(format!("{}: {reason}", key.name()))
                })?;
                let encoded = serde_json::to_string(&map)
                    .map_err(|e| VaultError::InvalidInput(e.to_string()))?;
                self.set_raw(key.name(), &encoded)
            }
            SettingKind::Str => {
                let canonical = match key {
                    SettingKey::EvictMode => EvictMode::parse(raw)
                        .ok_or_else(|| {
                            VaultError::InvalidInput(format!(
                                "evict_mode must be 'fifo' or 'tiered', got '{raw}'"
                            ))
                        })?
                        .as_str()
                        .to_string(),
                    SettingKey::Embedder => {
                        let norm = raw.trim().to_lowercase();
                        if !matches!(norm.as_str(), "hash" | "e5" | "e5-small") {
                            return Err(VaultError::InvalidInput(format!(
                                "embedder must be 'hash' or 'e5-small', got '{raw}'"
                            )));
                        }
                        ModelKind::parse(&norm).as_str().to_string()
                    }
                    _ => raw.trim().to_string(),
                };
                self.set_raw(key.name(), &canonical)
            }
        }
    }

    /// Read a setting as its typed value, falling back to the built-in
    /// default when unset or unreadable.
    pub fn get_setting(&self, key: SettingKey) -> Result<SettingValue> {
        let raw = self.get_raw(key.name())?;
        Ok(match key {
            SettingKey::MaxBytes => SettingValue::Int(self.max_bytes(None)?),
            SettingKey::MaxDbMb => SettingValue::Int(self.max_db_mb(None)?),
            SettingKey::CapByApp => SettingValue::Json(
                serde_json::to_value(self.cap_by_app()?)
                    .map_err(|e| VaultError::InvalidInput(e.to_string()))?,
            ),
            SettingKey::CapByTag => SettingValue::Json(
                serde_json::to_value(self.cap_by_tag()?)
                    .map_err(|e| VaultError::InvalidInput(e.to_string()))?,
            ),
            SettingKey::EvictMode => {
                SettingValue::Str(self.evict_mode()?.as_str().to_string())
            }
            SettingKey::Embedder => {
                SettingValue::Str(self.embedder(None)?.as_str().to_string())
            }
            SettingKey::AllowSecrets => SettingValue::Bool(self.allow_secrets(None)?),
            SettingKey::Notify => SettingValue::Bool(self.notify(None)?),
            SettingKey::Paused => {
                SettingValue::Bool(raw.as_deref().map(parse_bool_value).flatten().unwrap_or(false))
            }
        })
    }

    // -- Typed accessors used by the policy checks --

    pub fn max_bytes(&self, override_val: Option<i64>) -> Result<i64> {
        if let Some(v) = override_val {
            return Ok(v);
        }
        Ok(self
            .get_raw(SettingKey::MaxBytes.name())?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_BYTES))
    }

    pub fn max_db_mb(&self, override_val: Option<i64>) -> Result<i64> {
        if let Some(v) = override_val {
            return Ok(v);
        }
        Ok(self
            .get_raw(SettingKey::MaxDbMb.name())?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_DB_MB))
    }

    fn cap_map(&self, key: SettingKey) -> Result<HashMap<String, i64>> {
        let raw = match self.get_raw(key.name())? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(HashMap::new()),
        };
        // Stored maps were validated on write; anything unreadable is
        // treated as unset rather than an error.
        Ok(parse_cap_map(&raw).unwrap_or_default())
    }

    pub fn cap_by_app(&self) -> Result<HashMap<String, i64>> {
        self.cap_map(SettingKey::CapByApp)
    }

    pub fn cap_by_tag(&self) -> Result<HashMap<String, i64>> {
        self.cap_map(SettingKey::CapByTag)
    }

    pub fn evict_mode(&self) -> Result<EvictMode> {
        Ok(self
            .get_raw(SettingKey::EvictMode.name())?
            .and_then(|raw| EvictMode::parse(&raw))
            .unwrap_or(EvictMode::Fifo))
    }

    pub fn embedder(&self, override_val: Option<ModelKind>) -> Result<ModelKind> {
        if let Some(kind) = override_val {
            return Ok(kind);
        }
        Ok(self
            .get_raw(SettingKey::Embedder.name())?
            .map(|raw| ModelKind::parse(&raw))
            .unwrap_or(ModelKind::Hash))
    }

    pub fn allow_secrets(&self, override_val: Option<bool>) -> Result<bool> {
        if let Some(v) = override_val {
            return Ok(v);
        }
        Ok(self
            .get_raw(SettingKey::AllowSecrets.name())?
            .as_deref()
            .and_then(parse_bool_value)
            .unwrap_or(false))
    }

    pub fn notify(&self, override_val: Option<bool>) -> Result<bool> {
        if let Some(v) = override_val {
            return Ok(v);
        }
        Ok(self
            .get_raw(SettingKey::Notify.name())?
            .as_deref()
            .and_then(parse_bool_value)
            .unwrap_or(false))
    }

    pub fn paused(&self) -> Result<bool> {
        Ok(self
            .get_raw(SettingKey::Paused.name())?
            .as_deref()
            .and_then(parse_bool_value)
            .unwrap_or(false))
    }

    pub fn set_paused(&self, paused: bool) -> Result<()> {
        self.set_raw(SettingKey::Paused.name(), if paused { "1" } else { "0" })
    }

    // -- Blocklist --

    pub fn blocklist(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn().prepare("SELECT app FROM blocklist")?;
        let apps = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(apps)
    }

    pub fn add_blocked_app(&self, app: &str) -> Result<bool> {
        let norm = app.trim().to_lowercase();
        if norm.is_empty() {
            return Ok(false);
        }
        self.conn().execute(
            "INSERT OR IGNORE INTO blocklist(app) VALUES (?)",
            params![norm],
        )?;
        Ok(true)
    }

    pub fn remove_blocked_app(&self, app: &str) -> Result<bool> {
        let norm = app.trim().to_lowercase();
        let changes = self
            .conn()
            .execute("DELETE FROM blocklist WHERE app = ?", params![norm])?;
        Ok(changes > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Store {
        Store::in_memory().unwrap()
    }

    #[test]
    fn test_int_setting_roundtrip() {
        let store = test_store();
        assert_eq!(store.max_bytes(None).unwrap(), DEFAULT_MAX_BYTES);
        store.set_setting(SettingKey::MaxBytes, "2048").unwrap();
        assert_eq!(store.max_bytes(None).unwrap(), 2048);
    }

    #[test]
    fn test_int_setting_rejects_garbage() {
        let store = test_store();
        store.set_setting(SettingKey::MaxDbMb, "100").unwrap();
        let err = store.set_setting(SettingKey::MaxDbMb, "lots");
        assert!(matches!(err, Err(VaultError::InvalidInput(_))));
        // Rejected write leaves the previous value in place.
        assert_eq!(store.max_db_mb(None).unwrap(), 100);
    }

    #[test]
    fn test_override_wins() {
        let store = test_store();
        store.set_setting(SettingKey::MaxBytes, "2048").unwrap();
        assert_eq!(store.max_bytes(Some(64)).unwrap(), 64);
    }

    #[test]
    fn test_bool_setting_variants() {
        let store = test_store();
        for raw in ["1", "true", "YES", "on"] {
            store.set_setting(SettingKey::Notify, raw).unwrap();
            assert!(store.notify(None).unwrap());
        }
        for raw in ["0", "false", "no", "OFF"] {
            store.set_setting(SettingKey::Notify, raw).unwrap();
            assert!(!store.notify(None).unwrap());
        }
        assert!(matches!(
            store.set_setting(SettingKey::Notify, "maybe"),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cap_map_normalizes_keys() {
        let store = test_store();
        store
            .set_setting(SettingKey::CapByApp, r#"{"Terminal": 5, "Safari": 10}"#)
            .unwrap();
        let map = store.cap_by_app().unwrap();
        assert_eq!(map.get("terminal"), Some(&5));
        assert_eq!(map.get("safari"), Some(&10));
    }

    #[test]
    fn test_cap_map_rejects_bad_json() {
        let store = test_store();
        store
            .set_setting(SettingKey::CapByTag, r#"{"work": 3}"#)
            .unwrap();
        assert!(matches!(
            store.set_setting(SettingKey::CapByTag, "{not json"),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(matches!(
            store.set_setting(SettingKey::CapByTag, r#"{"work": "three"}"#),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(matches!(
            store.set_setting(SettingKey::CapByTag, r#"[1, 2]"#),
            Err(VaultError::InvalidInput(_))
        ));
        assert_eq!(store.cap_by_tag().unwrap().get("work"), Some(&3));
    }

    #[test]
    fn test_evict_mode_validation() {
        let store = test_store();
        assert_eq!(store.evict_mode().unwrap(), EvictMode::Fifo);
        store.set_setting(SettingKey::EvictMode, "tiered").unwrap();
        assert_eq!(store.evict_mode().unwrap(), EvictMode::Tiered);
        assert!(matches!(
            store.set_setting(SettingKey::EvictMode, "lru"),
            Err(VaultError::InvalidInput(_))
        ));
        assert_eq!(store.evict_mode().unwrap(), EvictMode::Tiered);
    }

    #[test]
    fn test_embedder_canonicalized() {
        let store = test_store();
        store.set_setting(SettingKey::Embedder, "E5").unwrap();
        assert_eq!(
            store.embedder(None).unwrap(),
            crate::embed::ModelKind::E5Small
        );
        assert!(matches!(
            store.set_setting(SettingKey::Embedder, "word2vec"),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_paused_roundtrip() {
        let store = test_store();
        assert!(!store.paused().unwrap());
        store.set_paused(true).unwrap();
        assert!(store.paused().unwrap());
        store.set_paused(false).unwrap();
        assert!(!store.paused().unwrap());
    }

    #[test]
    fn test_setting_key_parse() {
        assert_eq!(SettingKey::parse("max_bytes"), Some(SettingKey::MaxBytes));
        assert_eq!(SettingKey::parse(" Evict_Mode "), Some(SettingKey::EvictMode));
        assert_eq!(SettingKey::parse("ui_theme"), None);
    }

    #[test]
    fn test_blocklist_roundtrip() {
        let store = test_store();
        assert!(store.blocklist().unwrap().is_empty());
        assert!(store.add_blocked_app(" Terminal ").unwrap());
        assert!(store.blocklist().unwrap().contains("terminal"));
        // idempotent add
        assert!(store.add_blocked_app("terminal").unwrap());
        assert_eq!(store.blocklist().unwrap().len(), 1);
        assert!(store.remove_blocked_app("TERMINAL").unwrap());
        assert!(!store.remove_blocked_app("terminal").unwrap());
        assert!(!store.add_blocked_app("   ").unwrap());
    }
}
