//! Quorum locking across independent lock services
//!
//! A lock counts as held once a majority of services granted it to the same
//! random token and enough of the ttl is left after subtracting the time
//! spent asking and an allowance for clock drift. Failed attempts undo their
//! partial grants before retrying.

use crate::core::config::LockConfig;
use crate::core::error::LockError;
use crate::lock::{LockCoordinator, LockHandle, LockService};
use crate::{log_debug, log_warn};
use async_trait::async_trait;
use futures_util::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Fixed drift allowance on top of the proportional one
const DRIFT_FLOOR: Duration = Duration::from_millis(2);

/// Lock coordinator reaching quorum over one or more [`LockService`]s
pub struct DistributedLock {
    services: Vec<Arc<dyn LockService>>,
    retry_count: u32,
    retry_delay: Duration,
    retry_jitter: Duration,
    drift_factor: f64,
}

impl DistributedLock {
    /// Create a coordinator over `services` with retry behaviour from `config`
    pub fn new(services: Vec<Arc<dyn LockService>>, config: &LockConfig) -> Self {
        Self {
            services,
            retry_count: config.retry_count,
            retry_delay: config.retry_delay,
            retry_jitter: config.retry_jitter,
            drift_factor: config.drift_factor,
        }
    }

    /// Number of grants needed to hold a lock
    pub fn quorum(&self) -> usize {
        self.services.len() / 2 + 1
    }

    /// Number of lock services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    fn drift(&self, ttl: Duration) -> Duration {
        ttl.mul_f64(self.drift_factor) + DRIFT_FLOOR
    }

    fn backoff(&self) -> Duration {
        let jitter_ms = self.retry_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        self.retry_delay + Duration::from_millis(jitter)
    }

    async fn unlock_all(&self, resource: &str, token: &str) -> (usize, Option<LockError>) {
        let results = join_all(self.services.iter().map(|s| s.unlock(resource, token))).await;

        let mut acknowledged = 0;
        let mut last_error = None;
        for (service, result) in self.services.iter().zip(results) {
            match result {
                Ok(true) => acknowledged += 1,
                Ok(false) => {}
                Err(e) => {
                    log_debug!("unlock of {} on {} failed: {}", resource, service.name(), e);
                    last_error = Some(e);
                }
            }
        }
        (acknowledged, last_error)
    }
}

#[async_trait]
impl LockCoordinator for DistributedLock {
    async fn acquire(&self, resource: &str, ttl: Duration) -> Result<LockHandle, LockError> {
        if self.services.is_empty() {
            return Err(LockError::Unavailable {
                service: "none".to_string(),
                reason: format!("no lock services configured for {}", resource),
            });
        }
        let attempts = self.retry_count + 1;

        for attempt in 1..=attempts {
            let token = Uuid::new_v4().to_string();
            let started = Instant::now();

            let votes = join_all(
                self.services
                    .iter()
                    .map(|s| s.try_lock(resource, &token, ttl)),
            )
            .await;

            let mut granted = 0;
            let mut unreachable = Vec::new();
            for (service, vote) in self.services.iter().zip(votes) {
                match vote {
                    Ok(true) => granted += 1,
                    Ok(false) => {}
                    Err(e) => unreachable.push((service.name().to_string(), e)),
                }
            }

            let validity = ttl
                .checked_sub(started.elapsed() + self.drift(ttl))
                .filter(|v| !v.is_zero());

            if granted >= self.quorum() {
                if let Some(validity) = validity {
                    log_debug!(
                        "acquired {} on {}/{} services (attempt {})",
                        resource,
                        granted,
                        self.services.len(),
                        attempt
                    );
                    return Ok(LockHandle::new(resource, token, ttl, validity));
                }
            }

            // Undo partial grants so other contenders are not starved
            self.unlock_all(resource, &token).await;

            if unreachable.len() == self.services.len() {
                if attempt == attempts {
                    if let Some((service, e)) = unreachable.into_iter().next() {
                        return Err(LockError::Unavailable {
                            service,
                            reason: e.to_string(),
                        });
                    }
                }
            } else if !unreachable.is_empty() {
                log_warn!("{} lock services unreachable while locking {}", unreachable.len(), resource);
            }

            if attempt < attempts {
                tokio::time::sleep(self.backoff()).await;
            }
        }

        Err(LockError::Contended {
            resource: resource.to_string(),
            attempts,
        })
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let (acknowledged, last_error) = self.unlock_all(handle.resource(), handle.token()).await;
        if acknowledged > 0 {
            return Ok(());
        }
        match last_error {
            Some(e) => Err(e),
            None => Err(LockError::Release {
                resource: handle.resource().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::MemoryLockService;

    struct DownService;

    #[async_trait]
    impl LockService for DownService {
        fn name(&self) -> &str {
            "down"
        }

        async fn try_lock(&self, _: &str, _: &str, _: Duration) -> Result<bool, LockError> {
            Err(LockError::Unavailable {
                service: "down".into(),
                reason: "connection refused".into(),
            })
        }

        async fn unlock(&self, _: &str, _: &str) -> Result<bool, LockError> {
            Err(LockError::Unavailable {
                service: "down".into(),
                reason: "connection refused".into(),
            })
        }
    }

    fn fast_config(retry_count: u32) -> LockConfig {
        LockConfig {
            retry_count,
            retry_delay: Duration::from_millis(5),
            retry_jitter: Duration::from_millis(2),
            ..LockConfig::default()
        }
    }

    fn memory_services(n: usize) -> Vec<Arc<dyn LockService>> {
        (0..n)
            .map(|i| Arc::new(MemoryLockService::new(format!("mem-{}", i))) as Arc<dyn LockService>)
            .collect()
    }

    #[tokio::test]
    async fn test_acquire_release_single_service() {
        let lock = DistributedLock::new(memory_services(1), &fast_config(0));
        assert_eq!(lock.quorum(), 1);

        let handle = lock.acquire("ns:doc", Duration::from_secs(1)).await.unwrap();
        assert!(handle.is_valid());
        assert!(lock.acquire("ns:doc", Duration::from_secs(1)).await.is_err());

        lock.release(handle).await.unwrap();
        let again = lock.acquire("ns:doc", Duration::from_secs(1)).await.unwrap();
        lock.release(again).await.unwrap();
    }

    #[tokio::test]
    async fn test_contention_reports_attempts() {
        let lock = DistributedLock::new(memory_services(1), &fast_config(2));
        let _held = lock.acquire("ns:doc", Duration::from_secs(5)).await.unwrap();

        match lock.acquire("ns:doc", Duration::from_secs(5)).await {
            Err(LockError::Contended { resource, attempts }) => {
                assert_eq!(resource, "ns:doc");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected contention, got {:?}", other.map(|h| h.token().to_string())),
        }
    }

    #[tokio::test]
    async fn test_quorum_tolerates_minority_outage() {
        let mut services = memory_services(2);
        services.push(Arc::new(DownService));
        let lock = DistributedLock::new(services, &fast_config(0));
        assert_eq!(lock.quorum(), 2);

        let handle = lock.acquire("ns:doc", Duration::from_secs(1)).await.unwrap();
        lock.release(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_majority_outage_is_a_failure() {
        let services: Vec<Arc<dyn LockService>> = vec![
            Arc::new(MemoryLockService::new("mem")),
            Arc::new(DownService),
            Arc::new(DownService),
        ];
        let lock = DistributedLock::new(services, &fast_config(1));
        assert!(lock.acquire("ns:doc", Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_total_outage_is_unavailable() {
        let lock = DistributedLock::new(vec![Arc::new(DownService)], &fast_config(0));
        match lock.acquire("ns:doc", Duration::from_secs(1)).await {
            Err(LockError::Unavailable { service, .. }) => assert_eq!(service, "down"),
            other => panic!("expected unavailable, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn test_no_services_is_unavailable() {
        let lock = DistributedLock::new(Vec::new(), &fast_config(2));
        match lock.acquire("ns:doc", Duration::from_secs(1)).await {
            Err(LockError::Unavailable { reason, .. }) => assert!(reason.contains("no lock services")),
            other => panic!("expected unavailable, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn test_ttl_below_drift_never_grants() {
        let lock = DistributedLock::new(memory_services(1), &fast_config(0));
        assert!(lock.acquire("ns:doc", Duration::from_millis(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_release_of_expired_lock_is_not_acknowledged() {
        let lock = DistributedLock::new(memory_services(1), &fast_config(0));
        let handle = lock.acquire("ns:doc", Duration::from_millis(30)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(lock.release(handle).await, Err(LockError::Release { .. })));
    }
}
