use crate::core::error::LockError;
use crate::lock::{LockCoordinator, LockHandle};
use async_trait::async_trait;
use std::time::Duration;

/// Grants every acquire immediately; release does nothing.
///
/// Keeps the locked code path intact for single-process deployments that
/// turn locking off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLockCoordinator;

#[async_trait]
impl LockCoordinator for NoopLockCoordinator {
    async fn acquire(&self, resource: &str, ttl: Duration) -> Result<LockHandle, LockError> {
        Ok(LockHandle::new(resource, "noop", ttl, ttl))
    }

    async fn release(&self, _handle: LockHandle) -> Result<(), LockError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_never_contends() {
        let lock = NoopLockCoordinator;
        tokio_test::block_on(async {
            let first = lock.acquire("ns:doc", Duration::from_secs(1)).await.unwrap();
            let second = lock.acquire("ns:doc", Duration::from_secs(1)).await.unwrap();
            assert_eq!(first.resource(), second.resource());
            lock.release(first).await.unwrap();
            lock.release(second).await.unwrap();
        });
    }
}
