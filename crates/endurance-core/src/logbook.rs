//! Append-only mission log.
//!
//! Entries are immutable once created and read back most-recent-first. The
//! whole collection lives under one storage key as a JSON array and is
//! rewritten on every append. Storage failures never roll back the
//! in-memory list; they are returned in the [`AppendReceipt`], queued for
//! [`LogStore::take_persistence_errors`], and logged.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, format_log_date};
use crate::error::EngineError;
use crate::storage::KeyValueStorage;

/// Storage key the log lives under unless configured otherwise.
pub const DEFAULT_LOG_KEY: &str = "mission_logs";

/// Crew identities allowed to sign the log at the console boundary.
pub const CREW: [&str; 6] = ["Купър", "Бранд", "Ромили", "Доил", "TARS", "CASE"];

/// Id of the synthesized opening entry.
pub const SEED_ID: &str = "init-1";
pub const SEED_AUTHOR: &str = "Купър";
pub const SEED_CONTENT: &str =
    "Системите са стабилни. Навлизаме в орбита около червеевата дупка. Екипажът е в бойна готовност.";

/// Whether `author` is one of the [`CREW`].
pub fn is_crew(author: &str) -> bool {
    CREW.contains(&author)
}

/// One immutable log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    /// Display date, e.g. `16.10.2026 г.`
    pub date: String,
    pub author: String,
    pub content: String,
    /// Creation time, unix ms.
    pub timestamp: u64,
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendReceipt {
    pub entry: LogEntry,
    /// Set when the entry is in memory but could not be persisted.
    pub persistence: Option<EngineError>,
}

/// Log store handle shared between panels.
pub type SharedLogStore = Arc<Mutex<LogStore>>;

/// The mission log bound to one storage key.
pub struct LogStore {
    storage: Box<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    key: String,
    /// Most recent first.
    entries: Vec<LogEntry>,
    next_seq: u64,
    persistence_errors: Vec<EngineError>,
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("backend", &self.storage.backend_name())
            .field("key", &self.key)
            .field("entries", &self.entries.len())
            .field("pending_errors", &self.persistence_errors.len())
            .finish()
    }
}

impl LogStore {
    /// Load the log under `key`.
    ///
    /// A missing or unparseable value yields a single seed entry, which is
    /// persisted right away. A storage read failure also yields the seed
    /// but leaves the stored value untouched.
    pub fn open(
        storage: Box<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
        key: &str,
    ) -> Self {
        let mut store = Self {
            storage,
            clock,
            key: key.to_string(),
            entries: Vec::new(),
            next_seq: 0,
            persistence_errors: Vec::new(),
        };

        match store.storage.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<LogEntry>>(&raw) {
                Ok(entries) => {
                    log::debug!("mission log: loaded {} entries from `{key}`", entries.len());
                    store.entries = entries;
                }
                Err(e) => {
                    log::warn!("mission log: `{key}` is corrupt ({e}); starting from seed");
                    store.seed();
                    store.persist_or_queue();
                }
            },
            Ok(None) => {
                log::info!("mission log: no `{key}` yet; writing seed entry");
                store.seed();
                store.persist_or_queue();
            }
            Err(e) => {
                log::warn!("mission log: {e}; using seed entry in memory only");
                store.seed();
                store.persistence_errors.push(e);
            }
        }

        store.next_seq = store
            .entries
            .iter()
            .filter_map(|e| parse_seq(&e.id))
            .max()
            .map_or(0, |s| s + 1);
        store
    }

    /// Wrap in the shared handle panels expect.
    pub fn into_shared(self) -> SharedLogStore {
        Arc::new(Mutex::new(self))
    }

    /// Append a new entry at the top of the log.
    ///
    /// Blank content (after trimming) is rejected with
    /// [`EngineError::EmptyContent`] and nothing changes. Content is stored
    /// as given. The author is not checked here; see [`is_crew`].
    pub fn append(&mut self, author: &str, content: &str) -> Result<AppendReceipt, EngineError> {
        if content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }

        let now = self.clock.now_ms();
        let entry = LogEntry {
            id: self.fresh_id(now),
            date: format_log_date(now),
            author: author.to_string(),
            content: content.to_string(),
            timestamp: now,
        };
        self.entries.insert(0, entry.clone());
        log::info!("mission log: {} appended {}", entry.author, entry.id);

        let persistence = self.persist_or_queue();
        Ok(AppendReceipt { entry, persistence })
    }

    /// Every entry, most recent first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// At most `limit` of the newest entries.
    pub fn recent(&self, limit: usize) -> &[LogEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drain the queue of persistence failures seen so far.
    pub fn take_persistence_errors(&mut self) -> Vec<EngineError> {
        std::mem::take(&mut self.persistence_errors)
    }

    fn seed(&mut self) {
        let now = self.clock.now_ms();
        self.entries = vec![LogEntry {
            id: SEED_ID.to_string(),
            date: format_log_date(now),
            author: SEED_AUTHOR.to_string(),
            content: SEED_CONTENT.to_string(),
            timestamp: now,
        }];
    }

    /// `<ms:013>-<seq:06>`. The sequence keeps ids unique within one
    /// millisecond; collisions with loaded ids are skipped.
    fn fresh_id(&mut self, now_ms: u64) -> String {
        let taken: HashSet<&str> = self.entries.iter().map(|e| e.id.as_str()).collect();
        loop {
            let id = format!("{now_ms:013}-{:06}", self.next_seq);
            self.next_seq += 1;
            if !taken.contains(id.as_str()) {
                return id;
            }
        }
    }

    fn persist_or_queue(&mut self) -> Option<EngineError> {
        let result = serde_json::to_string(&self.entries)
            .map_err(|e| EngineError::Persistence {
                key: self.key.clone(),
                detail: e.to_string(),
            })
            .and_then(|raw| self.storage.set(&self.key, &raw));

        match result {
            Ok(()) => None,
            Err(e) => {
                log::warn!("mission log: {e}; entry kept in memory only");
                self.persistence_errors.push(e.clone());
                Some(e)
            }
        }
    }
}

fn parse_seq(id: &str) -> Option<u64> {
    let (ms, seq) = id.split_once('-')?;
    if ms.len() != 13 || !ms.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;

    const T0: u64 = 1_760_000_000_000;

    fn open(storage: &MemoryStorage, clock: &ManualClock) -> LogStore {
        LogStore::open(
            Box::new(storage.clone()),
            Arc::new(clock.clone()),
            DEFAULT_LOG_KEY,
        )
    }

    #[test]
    fn fresh_store_is_seeded_and_persisted() {
        let storage = MemoryStorage::new();
        let store = open(&storage, &ManualClock::new(T0));
        assert_eq!(store.len(), 1);
        let seed = &store.entries()[0];
        assert_eq!(seed.id, SEED_ID);
        assert_eq!(seed.author, "Купър");
        assert_eq!(seed.timestamp, T0);
        assert!(storage.raw(DEFAULT_LOG_KEY).is_some());
    }

    #[test]
    fn corrupt_store_reads_as_seed() {
        let storage = MemoryStorage::new();
        storage.insert_raw(DEFAULT_LOG_KEY, "{not json");
        let store = open(&storage, &ManualClock::new(T0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].content, SEED_CONTENT);
        let raw = storage.raw(DEFAULT_LOG_KEY).unwrap();
        assert!(raw.starts_with('['));
    }

    #[test]
    fn ids_unique_within_one_millisecond() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T0));
        let a = store.append("Купър", "one").unwrap().entry;
        let b = store.append("Бранд", "two").unwrap().entry;
        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.id, format!("{T0:013}-000000"));
    }

    #[test]
    fn blank_content_rejected_without_mutation() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T0));
        assert_eq!(store.append("Купър", " \t\n"), Err(EngineError::EmptyContent));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn content_kept_verbatim() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T0));
        let e = store.append("TARS", "  honesty 90%  ").unwrap().entry;
        assert_eq!(e.content, "  honesty 90%  ");
    }

    #[test]
    fn failed_write_keeps_entry_and_queues_error() {
        let storage = MemoryStorage::new();
        storage.insert_raw(DEFAULT_LOG_KEY, "[]");
        let mut store = LogStore::open(
            Box::new(storage.clone().with_fail_writes(true)),
            Arc::new(ManualClock::new(T0)),
            DEFAULT_LOG_KEY,
        );
        let receipt = store.append("Доил", "hull breach drill").unwrap();
        assert!(matches!(
            receipt.persistence,
            Some(EngineError::Persistence { .. })
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.take_persistence_errors().len(), 1);
        assert!(store.take_persistence_errors().is_empty());
        assert_eq!(storage.raw(DEFAULT_LOG_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn sequence_resumes_after_reload() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T0);
        let mut first = open(&storage, &clock);
        first.append("Купър", "a").unwrap();
        first.append("Купър", "b").unwrap();

        let mut second = open(&storage, &clock);
        let c = second.append("Купър", "c").unwrap().entry;
        assert_eq!(c.id, format!("{T0:013}-000002"));
    }

    #[test]
    fn recent_is_bounded() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T0));
        store.append("CASE", "x").unwrap();
        assert_eq!(store.recent(1).len(), 1);
        assert_eq!(store.recent(1)[0].author, "CASE");
        assert_eq!(store.recent(50).len(), 2);
    }

    #[test]
    fn crew_membership() {
        assert!(is_crew("TARS"));
        assert!(is_crew("Ромили"));
        assert!(!is_crew("Mann"));
    }

    #[test]
    fn parse_seq_ignores_foreign_ids() {
        assert_eq!(parse_seq("init-1"), None);
        assert_eq!(parse_seq("1760000000000"), None);
        assert_eq!(parse_seq("1760000000000-000042"), Some(42));
    }
}
