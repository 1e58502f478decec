//! Simple in-memory store using DashMap
//!
//! Behaves like a remote hash store for single-process deployments and
//! tests. An optional per-request latency widens the window between fetch
//! and writeback so interleavings become observable.

use crate::core::error::StoreError;
use crate::log_trace;
use crate::storage::StoreAdapter;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::time::Duration;

/// In-memory store: namespace -> root key -> serialized document
#[derive(Default)]
pub struct MemoryStore {
    namespaces: DashMap<String, DashMap<String, Bytes>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that delays every request by `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            namespaces: DashMap::new(),
            latency: Some(latency),
        }
    }

    /// Number of root documents held in `namespace`
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, |ns| ns.len())
    }

    /// Check whether `namespace` holds no documents
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Write raw bytes directly, bypassing codecs and locks
    pub fn insert_raw(&self, namespace: &str, root_key: &str, raw: impl Into<Bytes>) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(root_key.to_string(), raw.into());
    }

    /// Read raw bytes directly
    pub fn get_raw(&self, namespace: &str, root_key: &str) -> Option<Bytes> {
        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.get(root_key).map(|raw| raw.value().clone()))
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn get(&self, namespace: &str, root_key: &str) -> Result<Option<Bytes>, StoreError> {
        self.delay().await;
        log_trace!("MemoryStore::get {}/{}", namespace, root_key);
        Ok(self.get_raw(namespace, root_key))
    }

    async fn set(&self, namespace: &str, root_key: &str, raw: Bytes) -> Result<(), StoreError> {
        self.delay().await;
        log_trace!("MemoryStore::set {}/{} ({} bytes)", namespace, root_key, raw.len());
        self.insert_raw(namespace, root_key, raw);
        Ok(())
    }

    async fn exists(&self, namespace: &str, root_key: &str) -> Result<bool, StoreError> {
        self.delay().await;
        Ok(self
            .namespaces
            .get(namespace)
            .is_some_and(|ns| ns.contains_key(root_key)))
    }

    async fn delete(&self, namespace: &str, root_key: &str) -> Result<bool, StoreError> {
        self.delay().await;
        log_trace!("MemoryStore::delete {}/{}", namespace, root_key);
        Ok(self
            .namespaces
            .get(namespace)
            .is_some_and(|ns| ns.remove(root_key).is_some()))
    }
}
