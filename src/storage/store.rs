use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::agent::error::AutofillError;

pub type Record = Map<String, Value>;

/// Extension-style local key-value storage.
///
/// `get` returns only the keys that exist; `set` merges the given record into
/// the stored one.
pub trait KeyValueStore {
    fn get(&self, keys: &[&str]) -> Result<Record, AutofillError>;
    fn set(&self, record: Record) -> Result<(), AutofillError>;
    fn remove(&self, key: &str) -> Result<(), AutofillError>;
    fn get_all(&self) -> Result<Record, AutofillError>;
}

/// Read one key and deserialize it. `Ok(None)` when the key is absent or null.
pub fn get_typed<T: DeserializeOwned, K: KeyValueStore + ?Sized>(
    store: &K,
    key: &str,
) -> Result<Option<T>, AutofillError> {
    let mut record = store.get(&[key])?;
    match record.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AutofillError::json(format!("stored '{}'", key), e)),
    }
}

/// Serialize `value` and store it under `key`.
pub fn set_typed<T: Serialize, K: KeyValueStore + ?Sized>(
    store: &K,
    key: &str,
    value: &T,
) -> Result<(), AutofillError> {
    let value = serde_json::to_value(value)
        .map_err(|e| AutofillError::json(format!("storing '{}'", key), e))?;
    let mut record = Record::new();
    record.insert(key.to_string(), value);
    store.set(record)
}

fn pick(all: &Record, keys: &[&str]) -> Record {
    keys.iter()
        .filter_map(|k| all.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Record>, AutofillError> {
        self.data
            .lock()
            .map_err(|e| AutofillError::Storage(format!("store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<Record, AutofillError> {
        Ok(pick(&*self.lock()?, keys))
    }

    fn set(&self, record: Record) -> Result<(), AutofillError> {
        self.lock()?.extend(record);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AutofillError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn get_all(&self) -> Result<Record, AutofillError> {
        Ok(self.lock()?.clone())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Whole-file JSON object store. Every write rewrites the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Record, AutofillError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(e) => return Err(AutofillError::io(self.path.display().to_string(), e)),
        };
        if content.trim().is_empty() {
            return Ok(Record::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| AutofillError::json(self.path.display().to_string(), e))
    }

    fn write(&self, record: &Record) -> Result<(), AutofillError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AutofillError::json("serializing store", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| AutofillError::io(self.path.display().to_string(), e))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, AutofillError> {
        self.lock
            .lock()
            .map_err(|e| AutofillError::Storage(format!("store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> Result<Record, AutofillError> {
        let _guard = self.guard()?;
        Ok(pick(&self.read()?, keys))
    }

    fn set(&self, record: Record) -> Result<(), AutofillError> {
        let _guard = self.guard()?;
        let mut all = self.read()?;
        all.extend(record);
        self.write(&all)
    }

    fn remove(&self, key: &str) -> Result<(), AutofillError> {
        let _guard = self.guard()?;
        let mut all = self.read()?;
        if all.remove(key).is_some() {
            self.write(&all)?;
        }
        Ok(())
    }

    fn get_all(&self) -> Result<Record, AutofillError> {
        let _guard = self.guard()?;
        self.read()
    }
}
