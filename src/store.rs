use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Error, StoreError};
use crate::portfolio::Portfolio;

pub const PORTFOLIO_KEY: &str = "portfolio";

/// A flat key/value store of JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// All keys live in one JSON object on disk. A missing file is an empty store.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        JsonFileStore { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read()?;
        map.insert(key.to_owned(), value);
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        // write beside the store, then swap it in whole
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(serde_json::to_string_pretty(&Value::Object(map))?.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Keeps the user's portfolio in a [`KeyValueStore`].
pub struct PortfolioStore {
    inner: Box<dyn KeyValueStore>,
    write: Mutex<()>,
}

impl PortfolioStore {
    pub fn new(inner: Box<dyn KeyValueStore>) -> Self {
        PortfolioStore { inner, write: Mutex::new(()) }
    }

    pub fn load(&self) -> Result<Portfolio, StoreError> {
        match self.inner.get(PORTFOLIO_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Portfolio::default()),
        }
    }

    pub fn save(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        let _guard = self.write.lock().map_err(|_| StoreError::Poisoned)?;
        self.inner.set(PORTFOLIO_KEY, serde_json::to_value(portfolio)?)
    }

    /// Loads the portfolio, hands it to `f` and saves the result. Nothing is
    /// written when `f` fails.
    pub fn modify<R, F>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Portfolio) -> Result<R, Error>,
    {
        let _guard = self.write.lock().map_err(|_| StoreError::Poisoned)?;
        let mut portfolio = self.load()?;
        let result = f(&mut portfolio)?;
        let value = serde_json::to_value(&portfolio).map_err(StoreError::from)?;
        self.inner.set(PORTFOLIO_KEY, value)?;
        debug!("Saved portfolio with {} positions", portfolio.positions.len());
        Ok(result)
    }
}
