//! Storage layer for nestlock
//!
//! The store is a flat hash per namespace: root key to serialized document.
//! Network clients implement [`StoreAdapter`]; the engine never sees more
//! than these four requests.

use crate::core::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;

/// In-memory store adapter
pub mod memory;

pub use memory::MemoryStore;

/// Async request/response access to one hash-oriented key-value store
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Read the serialized document stored under `root_key`
    async fn get(&self, namespace: &str, root_key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Replace the serialized document stored under `root_key`
    async fn set(&self, namespace: &str, root_key: &str, raw: Bytes) -> Result<(), StoreError>;

    /// Check whether `root_key` holds a document
    async fn exists(&self, namespace: &str, root_key: &str) -> Result<bool, StoreError>;

    /// Remove `root_key`; returns whether anything was removed
    async fn delete(&self, namespace: &str, root_key: &str) -> Result<bool, StoreError>;
}
