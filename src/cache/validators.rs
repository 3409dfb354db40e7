//! Conditional-request validator store (URL → ETag).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

/// Read/write contract for validator tokens. How tokens are persisted is up
/// to the implementation.
pub trait ValidatorStore: Send + Sync {
    /// Known token for a normalized URL.
    fn get(&self, url: &str) -> Option<String>;

    /// Remember the token last returned for a normalized URL.
    fn put(&self, url: &str, token: &str);
}

/// In-memory validator store with optional JSON file persistence.
#[derive(Clone, Default)]
pub struct MemoryValidatorStore {
    inner: Arc<DashMap<String, String>>,
    persistence_path: Option<String>,
}

impl MemoryValidatorStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists; start empty otherwise.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (url, token) in map {
                store.inner.insert(url, token);
            }
            tracing::info!("Loaded {} validators from {}", store.inner.len(), path);
        }
        Ok(store)
    }

    /// Save to the configured file. No-op without a persistence path.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();
            serde_json::to_writer(writer, &map)?;
            tracing::info!("Saved {} validators to {}", map.len(), path);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ValidatorStore for MemoryValidatorStore {
    fn get(&self, url: &str) -> Option<String> {
        self.inner.get(url).map(|r| r.value().clone())
    }

    fn put(&self, url: &str, token: &str) {
        self.inner.insert(url.to_string(), token.to_string());
    }
}
