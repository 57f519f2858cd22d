//! Session-scoped keyed store.
//!
//! Stands in for browser session storage: a private namespace of JSON values
//! that survives between `rmerge` invocations until the session is cleared.
//!
//! Read/write points:
//! - `onesiteData` / `apricotData`: written by the upload step, read by the
//!   editor (columns) and the reconciliation run (rows).
//! - `mergePairs`: read once when the editor opens, written after every
//!   editor mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upload service output for the OneSite export (`{columns, data}`).
pub const ONESITE_DATA_KEY: &str = "onesiteData";

/// Upload service output for the Apricot export (`{columns, data}`).
pub const APRICOT_DATA_KEY: &str = "apricotData";

/// Serialized merge configuration.
pub const MERGE_PAIRS_KEY: &str = "mergePairs";

#[derive(Debug)]
pub enum SessionError {
    /// Key contains characters that cannot name an entry.
    InvalidKey(String),
    /// Filesystem error while reading or writing an entry.
    Io { key: String, message: String },
    /// Stored value does not deserialize into the requested type.
    Corrupt { key: String, message: String },
    /// Value could not be serialized.
    Serialize { key: String, message: String },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid session key: '{key}'"),
            Self::Io { key, message } => write!(f, "session '{key}': {message}"),
            Self::Corrupt { key, message } => {
                write!(f, "session '{key}' holds unreadable data: {message}")
            }
            Self::Serialize { key, message } => {
                write!(f, "session '{key}': cannot serialize value: {message}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Listing entry for `rmerge session show`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntryInfo {
    pub key: String,
    pub updated_at: DateTime<Utc>,
    pub bytes: usize,
}

/// A private keyed namespace of JSON values.
///
/// No concurrent external writers are expected during a session, so
/// implementations do no locking.
pub trait SessionStore {
    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, SessionError>;

    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SessionError>;

    fn remove(&mut self, key: &str) -> Result<(), SessionError>;

    fn entries(&self) -> Result<Vec<SessionEntryInfo>, SessionError>;

    /// Drop every key (ends the session).
    fn clear(&mut self) -> Result<(), SessionError> {
        for entry in self.entries()? {
            self.remove(&entry.key)?;
        }
        Ok(())
    }

    /// Typed read. `Ok(None)` when the key was never written.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| SessionError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Typed write.
    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| SessionError::Serialize {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_value(key, value)
    }
}

fn validate_key(key: &str) -> Result<(), SessionError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(SessionError::InvalidKey(key.to_string()))
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// On-disk shape of one entry: `<dir>/<key>.json`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    updated_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// One JSON file per key under a session directory.
///
/// Per-key files keep a pair edit from rewriting the uploaded row sets.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default session directory (`$XDG_STATE_HOME/rostermerge/session` on Linux).
    pub fn default_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rostermerge")
            .join("session")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_entry(&self, path: &Path, key: &str) -> Result<Option<StoredEntry>, SessionError> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Io {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| SessionError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl SessionStore for FileSessionStore {
    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, SessionError> {
        validate_key(key)?;
        let entry = self.read_entry(&self.entry_path(key), key)?;
        Ok(entry.map(|e| e.value))
    }

    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SessionError> {
        validate_key(key)?;
        let io_err = |e: std::io::Error| SessionError::Io {
            key: key.to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let entry = StoredEntry {
            key: key.to_string(),
            updated_at: Utc::now(),
            value,
        };
        let json = serde_json::to_string(&entry).map_err(|e| SessionError::Serialize {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        let path = self.entry_path(key);
        fs::write(&path, &json).map_err(io_err)?;
        log::debug!("session: wrote '{}' ({} bytes) to {}", key, json.len(), path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        validate_key(key)?;
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("session: removed '{}'", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn entries(&self) -> Result<Vec<SessionEntryInfo>, SessionError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SessionError::Io {
                    key: "*".into(),
                    message: e.to_string(),
                })
            }
        };

        let mut result = Vec::new();
        for dir_entry in read_dir.flatten() {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            if validate_key(&key).is_err() {
                continue;
            }
            let bytes = dir_entry.metadata().map(|m| m.len() as usize).unwrap_or(0);
            match self.read_entry(&path, &key) {
                Ok(Some(entry)) => result.push(SessionEntryInfo {
                    key,
                    updated_at: entry.updated_at,
                    bytes,
                }),
                Ok(None) => {}
                Err(e) => log::warn!("session: skipping {}: {}", path.display(), e),
            }
        }
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: BTreeMap<String, (DateTime<Utc>, serde_json::Value)>,
    writes: usize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl SessionStore for MemorySessionStore {
    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, SessionError> {
        validate_key(key)?;
        Ok(self.entries.get(key).map(|(_, v)| v.clone()))
    }

    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SessionError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), (Utc::now(), value));
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        validate_key(key)?;
        self.entries.remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<SessionEntryInfo>, SessionError> {
        Ok(self
            .entries
            .iter()
            .map(|(key, (updated_at, value))| SessionEntryInfo {
                key: key.clone(),
                updated_at: *updated_at,
                bytes: value.to_string().len(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path().join("session"));

        assert!(store.get_value(MERGE_PAIRS_KEY).unwrap().is_none());

        let pairs = json!([{ "onesite": "Name", "apricot": "FullName" }, { "onesite": "", "apricot": "" }]);
        store.set_value(MERGE_PAIRS_KEY, pairs.clone()).unwrap();

        // A fresh handle over the same directory sees the write
        let reopened = FileSessionStore::new(dir.path().join("session"));
        assert_eq!(reopened.get_value(MERGE_PAIRS_KEY).unwrap(), Some(pairs));
    }

    #[test]
    fn test_file_store_entries_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path());

        store.set_value(ONESITE_DATA_KEY, json!({ "columns": ["Name"], "data": [] })).unwrap();
        store.set_value(APRICOT_DATA_KEY, json!({ "columns": [], "data": [] })).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let keys: Vec<String> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![APRICOT_DATA_KEY.to_string(), ONESITE_DATA_KEY.to_string()]);

        store.clear().unwrap();
        assert!(store.entries().unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path());
        store.remove(MERGE_PAIRS_KEY).unwrap();
    }

    #[test]
    fn test_entries_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("never-created"));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let mut store = MemorySessionStore::new();
        assert!(matches!(
            store.set_value("../escape", json!(1)),
            Err(SessionError::InvalidKey(_))
        ));
        assert!(matches!(store.get_value(""), Err(SessionError::InvalidKey(_))));
    }

    #[test]
    fn test_typed_get_reports_corrupt_value() {
        let mut store = MemorySessionStore::new();
        store.set_value(MERGE_PAIRS_KEY, json!("not a list")).unwrap();
        let err = store.get::<Vec<u32>>(MERGE_PAIRS_KEY).unwrap_err();
        assert!(matches!(err, SessionError::Corrupt { .. }));
        assert!(err.to_string().contains(MERGE_PAIRS_KEY));
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mergePairs.json"), "{not json").unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(matches!(
            store.get_value(MERGE_PAIRS_KEY),
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let mut store = MemorySessionStore::new();
        store.set(MERGE_PAIRS_KEY, &vec![1, 2, 3]).unwrap();
        store.set(MERGE_PAIRS_KEY, &vec![4]).unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get::<Vec<u32>>(MERGE_PAIRS_KEY).unwrap(), Some(vec![4]));
    }

    #[test]
    fn test_default_dir_is_namespaced() {
        let dir = FileSessionStore::default_dir();
        assert!(dir.to_string_lossy().contains("rostermerge"));
    }
}
