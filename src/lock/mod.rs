//! Lock coordination for document mutations
//!
//! Two layers:
//! - [`LockService`] is one lock server: set-if-absent with expiry, and
//!   compare-and-delete on release.
//! - [`LockCoordinator`] is what the engine talks to. [`DistributedLock`]
//!   reaches quorum over one or more services; [`NoopLockCoordinator`]
//!   grants everything when locking is disabled.

use crate::core::error::LockError;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Quorum coordinator over lock services
pub mod distributed;

/// In-process lock service
pub mod memory;

/// Coordinator used when locking is disabled
pub mod noop;

pub use distributed::DistributedLock;
pub use memory::MemoryLockService;
pub use noop::NoopLockCoordinator;

/// Proof of exclusive mutation rights over one resource.
///
/// The right lapses at the end of the validity window even if never
/// released; expiry only exists to recover from crashed holders.
#[derive(Debug, Clone)]
pub struct LockHandle {
    resource: String,
    token: String,
    ttl: Duration,
    acquired_at: Instant,
    validity: Duration,
}

impl LockHandle {
    /// Create a handle for `resource` owned through `token`
    pub fn new(resource: impl Into<String>, token: impl Into<String>, ttl: Duration, validity: Duration) -> Self {
        Self {
            resource: resource.into(),
            token: token.into(),
            ttl,
            acquired_at: Instant::now(),
            validity,
        }
    }

    /// Locked resource name
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Random value identifying this holder to the lock services
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Lease time requested at acquisition
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time left before the lock may be granted to someone else
    pub fn remaining(&self) -> Duration {
        self.validity.saturating_sub(self.acquired_at.elapsed())
    }

    /// Whether the validity window is still open
    pub fn is_valid(&self) -> bool {
        !self.remaining().is_zero()
    }
}

/// What the engine uses to serialize mutations of one root key
#[async_trait]
pub trait LockCoordinator: Send + Sync {
    /// Acquire `resource` for at most `ttl`
    async fn acquire(&self, resource: &str, ttl: Duration) -> Result<LockHandle, LockError>;

    /// Give up a previously acquired lock
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

/// A single lock server
#[async_trait]
pub trait LockService: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Take `resource` for `token` unless someone else holds an unexpired lease
    async fn try_lock(&self, resource: &str, token: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Drop `resource` if it is still held by `token`
    async fn unlock(&self, resource: &str, token: &str) -> Result<bool, LockError>;
}

/// Lock resource guarding one root document
pub fn lock_resource(namespace: &str, root_key: &str) -> String {
    format!("{}:{}", namespace, root_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_validity_window() {
        let handle = LockHandle::new("ns:doc", "t", Duration::from_secs(10), Duration::from_secs(9));
        assert!(handle.is_valid());
        assert!(handle.remaining() <= Duration::from_secs(9));
        assert_eq!(handle.ttl(), Duration::from_secs(10));

        let spent = LockHandle::new("ns:doc", "t", Duration::from_millis(5), Duration::ZERO);
        assert!(!spent.is_valid());
    }

    #[test]
    fn test_resource_is_scoped_to_namespace_and_key() {
        assert_eq!(lock_resource("nestlock", "hello"), "nestlock:hello");
        assert_ne!(lock_resource("a", "doc"), lock_resource("b", "doc"));
    }
}
