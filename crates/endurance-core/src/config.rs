//! Engine configuration, loaded from an optional JSON file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::logbook::{DEFAULT_LOG_KEY, LogStore, SEED_AUTHOR};
use crate::storage::FileStorage;

/// Runtime settings shared by the CLI and the server.
///
/// Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `<log_key>.json`.
    pub data_dir: PathBuf,
    /// Storage key of the mission log.
    pub log_key: String,
    /// Fixed drift seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Author used when a log append names nobody.
    pub default_author: String,
    /// How often hosts call `Panel::pump`, in milliseconds.
    pub pump_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("endurance-data"),
            log_key: DEFAULT_LOG_KEY.to_string(),
            seed: None,
            default_author: SEED_AUTHOR.to_string(),
            pump_interval_ms: 250,
        }
    }
}

impl EngineConfig {
    /// Load config JSON from disk.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let err = |detail: String| EngineError::Config {
            path: path.display().to_string(),
            detail,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| err(format!("failed to parse config JSON: {e}")))?;
        if config.pump_interval_ms == 0 {
            return Err(err("pump_interval_ms must be positive".to_string()));
        }
        Ok(config)
    }

    /// `load_from_path` if a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Ok(Self::default()),
        }
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms.max(1))
    }

    /// Open the file-backed mission log this config points at.
    pub fn open_log(&self, clock: Arc<dyn Clock>) -> LogStore {
        LogStore::open(
            Box::new(FileStorage::new(&self.data_dir)),
            clock,
            &self.log_key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_gives_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{}}").unwrap();
        let c = EngineConfig::load_from_path(f.path()).unwrap();
        assert_eq!(c, EngineConfig::default());
        assert_eq!(c.log_key, "mission_logs");
    }

    #[test]
    fn partial_override() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"seed": 42, "data_dir": "/tmp/bridge"}}"#).unwrap();
        let c = EngineConfig::load_from_path(f.path()).unwrap();
        assert_eq!(c.seed, Some(42));
        assert_eq!(c.data_dir, PathBuf::from("/tmp/bridge"));
        assert_eq!(c.default_author, "Купър");
    }

    #[test]
    fn bad_json_is_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "seed = 4").unwrap();
        let err = EngineConfig::load_from_path(f.path()).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }

    #[test]
    fn zero_pump_interval_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"pump_interval_ms": 0}}"#).unwrap();
        assert!(EngineConfig::load_from_path(f.path()).is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = EngineConfig::load_from_path(Path::new("/nonexistent/endurance.json")).unwrap_err();
        assert_eq!(err.code(), "END-0009");
        assert_eq!(EngineConfig::load_or_default(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn open_log_uses_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = config.open_log(Arc::new(crate::clock::ManualClock::new(0)));
        assert_eq!(store.len(), 1);
        assert!(dir.path().join("mission_logs.json").exists());
    }
}
