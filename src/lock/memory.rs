use crate::core::error::LockError;
use crate::lock::LockService;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

static SHARED: Lazy<Arc<MemoryLockService>> = Lazy::new(|| Arc::new(MemoryLockService::new("local")));

struct Lease {
    token: String,
    expires_at: Instant,
}

/// In-process lease table behaving like one lock server.
///
/// An expired lease counts as absent, so a holder that never releases
/// blocks others only until its ttl runs out.
pub struct MemoryLockService {
    name: String,
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLockService {
    /// Create an empty lock service
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// The lease table shared by every registry in this process.
    ///
    /// Registries built without lock endpoints use it, so they exclude each
    /// other. It does not reach other processes.
    pub fn shared() -> Arc<MemoryLockService> {
        Arc::clone(&SHARED)
    }

    /// Number of unexpired leases
    pub fn active_leases(&self) -> usize {
        let now = Instant::now();
        self.leases.lock().values().filter(|l| l.expires_at > now).count()
    }
}

impl Default for MemoryLockService {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl LockService for MemoryLockService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn try_lock(&self, resource: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        if let Some(lease) = leases.get(resource) {
            if lease.expires_at > now {
                return Ok(false);
            }
        }
        leases.insert(
            resource.to_string(),
            Lease {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn unlock(&self, resource: &str, token: &str) -> Result<bool, LockError> {
        let mut leases = self.leases.lock();
        let held = leases
            .get(resource)
            .map(|lease| (lease.token == token, lease.expires_at > Instant::now()));
        match held {
            Some((true, live)) => {
                leases.remove(resource);
                Ok(live)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_holder_is_refused() {
        let service = MemoryLockService::default();
        assert!(service.try_lock("r", "a", Duration::from_secs(5)).await.unwrap());
        assert!(!service.try_lock("r", "b", Duration::from_secs(5)).await.unwrap());
        assert!(service.try_lock("other", "b", Duration::from_secs(5)).await.unwrap());
        assert_eq!(service.active_leases(), 2);
    }

    #[tokio::test]
    async fn test_unlock_requires_matching_token() {
        let service = MemoryLockService::default();
        service.try_lock("r", "a", Duration::from_secs(5)).await.unwrap();

        assert!(!service.unlock("r", "b").await.unwrap());
        assert!(!service.try_lock("r", "b", Duration::from_secs(5)).await.unwrap());
        assert!(service.unlock("r", "a").await.unwrap());
        assert!(service.try_lock("r", "b", Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_shared_instance_is_process_wide() {
        let a = MemoryLockService::shared();
        let b = MemoryLockService::shared();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(a.try_lock("shared-test", "a", Duration::from_secs(5)).await.unwrap());
        assert!(!b.try_lock("shared-test", "b", Duration::from_secs(5)).await.unwrap());
        assert!(a.unlock("shared-test", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimed() {
        let service = MemoryLockService::default();
        service.try_lock("r", "crashed", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(service.active_leases(), 0);
        assert!(service.try_lock("r", "next", Duration::from_secs(5)).await.unwrap());
        assert!(!service.unlock("r", "crashed").await.unwrap());
    }
}
