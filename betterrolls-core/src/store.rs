//! Host key-value settings storage.
//!
//! Every option is persisted under a namespace (the module id, or `core`
//! for host-global settings such as the roll mode). Reads are synchronous
//! against a cached map; writes go through the backing storage and are
//! awaited.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tokio::fs;

/// Errors from the underlying storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Generic namespaced settings storage provided by the host.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a stored value, `None` if it was never written.
    fn read(&self, namespace: &str, key: &str) -> Option<Value>;

    /// Persist a value.
    async fn write(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

type Namespaces = HashMap<String, Map<String, Value>>;

fn read_cached(cache: &RwLock<Namespaces>, namespace: &str, key: &str) -> Option<Value> {
    let guard = cache.read().unwrap_or_else(PoisonError::into_inner);
    guard.get(namespace).and_then(|ns| ns.get(key)).cloned()
}

fn write_cached(cache: &RwLock<Namespaces>, namespace: &str, key: &str, value: Value) {
    let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
    guard
        .entry(namespace.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<Namespaces>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through the async write path.
    pub fn with_value(self, namespace: &str, key: &str, value: impl Into<Value>) -> Self {
        write_cached(&self.values, namespace, key, value.into());
        self
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    fn read(&self, namespace: &str, key: &str) -> Option<Value> {
        read_cached(&self.values, namespace, key)
    }

    async fn write(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        write_cached(&self.values, namespace, key, value);
        Ok(())
    }
}

/// Settings backed by a pretty-printed JSON file.
///
/// The file holds one object per namespace. The whole file is rewritten on
/// every write.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<Namespaces>,
}

impl JsonFileSettingsStore {
    /// Open a settings file, starting empty if it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            Namespaces::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    fn read(&self, namespace: &str, key: &str) -> Option<Value> {
        read_cached(&self.values, namespace, key)
    }

    async fn write(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        write_cached(&self.values, namespace, key, value);

        // Serialize under the lock, write after releasing it
        let content = {
            let guard = self.values.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*guard)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, content).await?;
        Ok(())
    }
}
