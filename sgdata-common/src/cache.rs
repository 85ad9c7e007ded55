//! Persistent memoization of upstream fetches
//!
//! A [`ResponseCache`] maps deterministic [`CacheKey`]s to JSON values. It is
//! loaded once when a processor starts and saved once when it finishes; there
//! is no flush-on-write, so a crash before [`ResponseCache::save`] only loses
//! entries computed during that run.
//!
//! Keys have the form `function_id/positional_args/keyword_args` where both
//! argument parts are compact JSON. `serde_json::Map` keeps keys sorted, so
//! logically equal arguments always produce byte-identical keys.
//!
//! Only successful results are stored. A computation that returns `Err` is
//! propagated to the caller and retried on the next call.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Deterministic cache key for one call site and argument tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a function identifier plus positional and keyword arguments
    pub fn new(function_id: &str, args: &[Value], kwargs: &Map<String, Value>) -> Self {
        let args = Value::Array(args.to_vec()).to_string();
        let kwargs = Value::Object(kwargs.clone()).to_string();
        Self(format!("{}/{}/{}", function_id, args, kwargs))
    }

    /// Key for a call with positional arguments only
    pub fn with_args(function_id: &str, args: &[Value]) -> Self {
        Self::new(function_id, args, &Map::new())
    }

    /// Key for a call without arguments
    pub fn bare(function_id: &str) -> Self {
        Self::new(function_id, &[], &Map::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of looking a key up in the store
enum Lookup<T> {
    Hit(T),
    Miss,
    /// Present but no longer decodes into the requested type
    Undecodable,
}

/// Key-value store wrapping expensive fetch operations
#[derive(Debug)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    enabled: bool,
    entries: BTreeMap<String, Value>,
}

impl ResponseCache {
    /// Load the store from `path`
    ///
    /// A missing file starts an empty store. An unreadable or malformed file
    /// is logged and also starts empty; it is overwritten on the next save.
    /// When `enabled` is false nothing is read and every call passes through.
    pub fn load(path: impl Into<PathBuf>, enabled: bool) -> Self {
        let path = path.into();

        if !enabled {
            info!("Response cache disabled");
            return Self {
                path: Some(path),
                enabled: false,
                entries: BTreeMap::new(),
            };
        }

        let entries = read_store(&path);
        info!(path = %path.display(), entries = entries.len(), "Loaded response cache");

        Self {
            path: Some(path),
            enabled: true,
            entries,
        }
    }

    /// Enabled store without backing file
    pub fn in_memory() -> Self {
        Self {
            path: None,
            enabled: true,
            entries: BTreeMap::new(),
        }
    }

    /// Pass-through store: never memoizes, never reads or writes a file
    pub fn disabled() -> Self {
        Self {
            path: None,
            enabled: false,
            entries: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key.as_str())
    }

    /// Stored value for `key`, if present and decodable as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.lookup(key) {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Undecodable => None,
        }
    }

    /// Store `value` under `key` unless the key is already present
    ///
    /// Returns `Ok(true)` when the value was stored. Existing entries are
    /// never overwritten; a disabled store ignores the call.
    pub fn insert<T: Serialize>(&mut self, key: &CacheKey, value: &T) -> Result<bool> {
        if !self.enabled || self.contains(key) {
            return Ok(false);
        }
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.0.clone(), value);
        Ok(true)
    }

    /// Memoize a synchronous computation
    pub fn get_or_compute<T, E, F>(&mut self, key: &CacheKey, compute: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let stale = match self.lookup(key) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => false,
            Lookup::Undecodable => true,
        };

        let value = compute()?;
        self.store(key, &value, stale);
        Ok(value)
    }

    /// Memoize an asynchronous computation
    ///
    /// The future is only created on a miss. Its error is returned unchanged
    /// and nothing is stored for it.
    pub async fn cached<T, E, F, Fut>(&mut self, key: &CacheKey, compute: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let stale = match self.lookup(key) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => false,
            Lookup::Undecodable => true,
        };

        let value = compute().await?;
        self.store(key, &value, stale);
        Ok(value)
    }

    /// Write the store to its backing file
    ///
    /// Writes a temporary sibling then renames it over the target. A disabled
    /// or in-memory store does nothing.
    pub fn save(&self) -> Result<()> {
        let path = match (&self.path, self.enabled) {
            (Some(path), true) => path,
            _ => return Ok(()),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = temp_path_for(path)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        info!(path = %path.display(), entries = self.entries.len(), "Saved response cache");
        Ok(())
    }

    fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Lookup<T> {
        if !self.enabled {
            return Lookup::Miss;
        }
        let Some(raw) = self.entries.get(key.as_str()) else {
            debug!(key = %key, "Cache miss");
            return Lookup::Miss;
        };
        match T::deserialize(raw) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Lookup::Hit(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value has unexpected shape, recomputing");
                Lookup::Undecodable
            }
        }
    }

    /// Record a freshly computed value. `replace` is only set for entries
    /// that failed to decode.
    fn store<T: Serialize>(&mut self, key: &CacheKey, value: &T, replace: bool) {
        if !self.enabled {
            return;
        }
        if self.contains(key) && !replace {
            return;
        }
        match serde_json::to_value(value) {
            Ok(json) => {
                self.entries.insert(key.0.clone(), json);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode result, not caching");
            }
        }
    }
}

/// Read a persisted store, degrading to empty on any problem
fn read_store(path: &Path) -> BTreeMap<String, Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No cache file, starting empty");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cache file, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cache file is corrupted or empty, starting empty");
            BTreeMap::new()
        }
    }
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Cache path has no file name: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
