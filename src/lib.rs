//! nestlock - locked read-modify-write of nested paths in a key-value store
//!
//! Documents live under root keys in a hash-oriented store. A [`Cursor`]
//! names a path inside one document without touching the store; terminal
//! operations on it run a fetch, apply, write-back cycle under a distributed
//! lock on the root key, so concurrent writers to different paths of the
//! same document never lose each other's updates.
//!
//! ```no_run
//! use nestlock::{MemoryStore, Registry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() -> nestlock::Result<()> {
//! let registry = Registry::new(Arc::new(MemoryStore::new()))?;
//! let hello = registry.get("hello")?;
//! hello.navigate("world").navigate("foo").navigate("bar").set(true).await?;
//! assert_eq!(hello.get().await?, Some(json!({"world": {"foo": {"bar": true}}})));
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

// Core foundational modules
pub mod core;
pub mod types;

// Collaborators
pub mod codec;
pub mod lock;
pub mod storage;

// Document engine and caller-facing surfaces
pub mod blocking;
pub mod cursor;
pub mod engine;
pub mod registry;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::blocking::{BlockingCursor, BlockingRegistry};
pub use crate::codec::{Codec, JsonCodec, MessagePackCodec, YamlCodec};
pub use crate::core::{create_registry, Config, ConfiguredRegistry, Error, Result};
pub use crate::cursor::{Access, Cursor, Member};
pub use crate::engine::Operation;
pub use crate::lock::{DistributedLock, LockCoordinator, LockService, MemoryLockService, NoopLockCoordinator};
pub use crate::registry::{Registry, RegistryBuilder};
pub use crate::storage::{MemoryStore, StoreAdapter};
pub use crate::types::{Document, Key, Path};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Install logging from `config` and register metrics
pub fn init(config: &Config) -> Result<()> {
    crate::core::logging::init_logging(&config.logging)?;
    log_info!("Initializing {} v{}", NAME, VERSION);
    system::metrics::registry();
    Ok(())
}
