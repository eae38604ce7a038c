//! Key/value store shared between feeders and running units

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide string store, cheap to clone
#[derive(Clone, Debug, Default)]
pub struct DataStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl DataStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner.write().insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
