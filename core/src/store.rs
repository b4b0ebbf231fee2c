//! Durable key-value backing and the journey store built on it.
//!
//! The store is the only durable side-effect boundary for journey state. One
//! well-known key holds the whole habit aggregate as JSON; writes replace it
//! atomically, so a failed save leaves the previous value readable.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use checkin_types::{Habit, HabitRecord};
use checkin_utils::{
    atomic_write, ensure_private_dir, read_if_exists, recover_bak_file, remove_if_exists,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{JourneyError, PersistenceError};

/// Key under which the habit aggregate is persisted.
pub const HABIT_KEY: &str = "daily-checkin-habit";

/// Minimal get/set/delete storage.
///
/// `set` must replace the value for a key atomically: a reader sees the old
/// value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// One file per key under a private data directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        ensure_private_dir(&dir)?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid store key: {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        recover_bak_file(&path);
        match read_if_exists(&path)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        atomic_write(self.path_for(key)?, value.as_bytes())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        remove_if_exists(&self.path_for(key)?)
    }
}

/// In-memory store for tests, with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` and `delete` fail until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing failure injection.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn check(flag: &AtomicBool, op: &str) -> io::Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("injected {op} failure")));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Self::check(&self.fail_reads, "read")?;
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        Self::check(&self.fail_writes, "write")?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        Self::check(&self.fail_writes, "delete")?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Decode the JSON value at `key`, or `None` if the key was never written.
pub fn read_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &'static str,
) -> Result<Option<T>, PersistenceError> {
    let Some(text) = kv
        .get(key)
        .map_err(|source| PersistenceError::Read { key, source })?
    else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| PersistenceError::Decode { key, source })
}

pub fn write_json<T: Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &'static str,
    value: &T,
) -> Result<(), PersistenceError> {
    let text =
        serde_json::to_string(value).map_err(|source| PersistenceError::Encode { key, source })?;
    kv.set(key, &text)
        .map_err(|source| PersistenceError::Write { key, source })
}

pub fn delete_key(kv: &dyn KeyValueStore, key: &'static str) -> Result<(), PersistenceError> {
    kv.delete(key)
        .map_err(|source| PersistenceError::Delete { key, source })
}

/// Whole-aggregate persistence of the single habit.
#[derive(Clone)]
pub struct JourneyStore {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for JourneyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyStore")
            .field("key", &HABIT_KEY)
            .finish_non_exhaustive()
    }
}

impl JourneyStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// The backing store, shared with other durable records.
    #[must_use]
    pub fn backing(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Load the persisted habit.
    ///
    /// Malformed JSON is a [`PersistenceError::Decode`]; well-formed JSON that
    /// breaks the slot structure is a [`JourneyError::Invariant`].
    pub fn load(&self) -> Result<Option<Habit>, JourneyError> {
        let Some(record) = read_json::<HabitRecord>(self.kv.as_ref(), HABIT_KEY)? else {
            return Ok(None);
        };
        match Habit::try_from(record) {
            Ok(habit) => Ok(Some(habit)),
            Err(violation) => {
                warn!(%violation, "Stored habit failed validation");
                Err(violation.into())
            }
        }
    }

    pub fn save(&self, habit: &Habit) -> Result<(), PersistenceError> {
        write_json(self.kv.as_ref(), HABIT_KEY, habit)
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        delete_key(self.kv.as_ref(), HABIT_KEY)
    }
}
