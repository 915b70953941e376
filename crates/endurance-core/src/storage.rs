//! Durable key/value storage behind the mission log.
//!
//! The log store only ever needs "read the whole value under one key" and
//! "replace the whole value under one key", so the backend trait is kept to
//! exactly that. [`FileStorage`] keeps one JSON file per key in a data
//! directory; [`MemoryStorage`] is a shared in-process map used by tests and
//! by the server when no data directory is wanted.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::EngineError;

/// Whole-value key/value backend.
pub trait KeyValueStorage: Send {
    /// Short name used in log lines.
    fn backend_name(&self) -> &'static str;

    /// Current value under `key`, or `None` if nothing was ever stored.
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Replace the value under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError>;
}

fn validate_key(key: &str) -> Result<(), EngineError> {
    let ok = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(persistence(key, "key must be non-empty and match [A-Za-z0-9_.-]"))
    }
}

fn persistence(key: &str, detail: impl std::fmt::Display) -> EngineError {
    EngineError::Persistence {
        key: key.to_string(),
        detail: detail.to_string(),
    }
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key under `dir`.
///
/// Writes land in a temp file in the same directory and are renamed over the
/// target, so a reader never sees a half-written collection.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that backs `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    /// Bytes that are not UTF-8 come back lossily decoded. They are a damaged
    /// value, not a failed read, and the caller's parser decides what to keep.
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        validate_key(key)?;
        let bytes = match fs::read(self.path_for(key)) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence(key, e)),
        };
        match String::from_utf8(bytes) {
            Ok(s) => Ok(Some(s)),
            Err(e) => {
                log::warn!("file storage: `{key}` is not valid UTF-8 ({})", e.utf8_error());
                Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| persistence(key, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| persistence(key, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| persistence(key, e))?;
        tmp.as_file().sync_all().map_err(|e| persistence(key, e))?;
        tmp.persist(self.path_for(key))
            .map_err(|e| persistence(key, e.error))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Shared in-process map. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `set` fail with [`EngineError::Persistence`].
    pub fn with_fail_writes(mut self, fail_writes: bool) -> Self {
        self.fail_writes = fail_writes;
        self
    }

    /// Seed a raw value, bypassing `fail_writes`.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.values.lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    /// Raw stored value, for inspection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        validate_key(key)?;
        let map = self
            .values
            .lock()
            .map_err(|_| persistence(key, "storage mutex poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        validate_key(key)?;
        if self.fail_writes {
            return Err(persistence(key, "write rejected (storage full)"));
        }
        let mut map = self
            .values
            .lock()
            .map_err(|_| persistence(key, "storage mutex poisoned"))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = FileStorage::new(dir.path().join("nested"));
        assert_eq!(s.get("mission_logs").unwrap(), None);
        s.set("mission_logs", "[1,2]").unwrap();
        assert_eq!(s.get("mission_logs").unwrap().as_deref(), Some("[1,2]"));
        s.set("mission_logs", "[]").unwrap();
        assert_eq!(s.get("mission_logs").unwrap().as_deref(), Some("[]"));
        assert!(s.path_for("mission_logs").exists());
    }

    #[test]
    fn file_storage_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = FileStorage::new(dir.path());
        s.set("a", "1").unwrap();
        s.set("a", "2").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json")]);
    }

    #[test]
    fn non_utf8_file_reads_as_damaged_value() {
        let dir = tempfile::tempdir().unwrap();
        let s = FileStorage::new(dir.path());
        fs::write(s.path_for("mission_logs"), [0xff, 0xfe, 0x00, 0x5b]).unwrap();
        let raw = s.get("mission_logs").unwrap().unwrap();
        assert!(raw.ends_with('['));
        assert!(raw.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = FileStorage::new(dir.path());
        assert!(s.set("../escape", "x").is_err());
        assert!(s.get("a/b").is_err());
        assert!(s.get("..").is_err());
        assert!(s.get("").is_err());
    }

    #[test]
    fn memory_clones_share_values() {
        let a = MemoryStorage::new();
        let mut b = a.clone();
        b.set("k", "v").unwrap();
        assert_eq!(a.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(a.raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn memory_write_failure_injection() {
        let mut s = MemoryStorage::new().with_fail_writes(true);
        let err = s.set("k", "v").unwrap_err();
        assert!(matches!(err, EngineError::Persistence { .. }));
        assert_eq!(s.get("k").unwrap(), None);
        s.insert_raw("k", "seeded");
        assert_eq!(s.get("k").unwrap().as_deref(), Some("seeded"));
    }
}
