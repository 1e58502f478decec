//! The locked read-modify-write cycle
//!
//! Every mutation of a root key runs acquire, fetch, decode, apply,
//! writeback and release. The lock is released whether the middle steps
//! succeed or not. Reads skip the lock and see whatever was last written.

use crate::codec::Codec;
use crate::core::error::{Error, Result};
use crate::lock::{lock_resource, LockCoordinator};
use crate::storage::StoreAdapter;
use crate::system::metrics::{self, Timer};
use crate::types::Document;
use crate::{log_debug, log_warn};
use bytes::Bytes;
use serde_json::Map;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a cursor needs to reach the store: shared by every cursor of
/// one registry and cheap to clone.
#[derive(Clone)]
pub struct Context {
    store: Arc<dyn StoreAdapter>,
    lock: Arc<dyn LockCoordinator>,
    codec: Arc<dyn Codec>,
    namespace: Arc<str>,
    ttl: Duration,
}

impl Context {
    /// Create a context
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        lock: Arc<dyn LockCoordinator>,
        codec: Arc<dyn Codec>,
        namespace: impl Into<Arc<str>>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            lock,
            codec,
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Store namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Lock lease time
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store adapter
    pub fn store(&self) -> &Arc<dyn StoreAdapter> {
        &self.store
    }

    /// Document codec
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Run `work` while holding the lock on `root_key`.
    ///
    /// `work` is not polled before the lock is granted. A failed acquire
    /// means `work` never runs; a failed release is logged and does not
    /// change the outcome.
    pub async fn locked<R, Fut>(&self, root_key: &str, operation: &'static str, work: Fut) -> Result<R>
    where
        Fut: Future<Output = Result<R>>,
    {
        check_root_key(root_key)?;
        let timer = Timer::start(operation);
        let resource = lock_resource(&self.namespace, root_key);

        let waiting = Instant::now();
        let handle = match self.lock.acquire(&resource, self.ttl).await {
            Ok(handle) => handle,
            Err(e) => {
                metrics::record(|m| m.lock_failures.inc());
                let err = Error::from(e);
                timer.finish(err.class());
                return Err(err);
            }
        };
        metrics::record(|m| m.lock_wait.observe(waiting.elapsed().as_secs_f64()));
        log_debug!("{} acquired {}", operation, resource);

        let held = Instant::now();
        let outcome = work.await;

        if !handle.is_valid() {
            log_warn!("lock on {} lapsed during {}", resource, operation);
        }
        if let Err(e) = self.lock.release(handle).await {
            metrics::record(|m| m.release_failures.inc());
            log_warn!("failed to release {} after {}: {}", resource, operation, e);
        } else {
            log_debug!("{} released {}", operation, resource);
        }
        metrics::record(|m| m.lock_hold.observe(held.elapsed().as_secs_f64()));

        timer.finish(outcome.as_ref().map_or_else(Error::class, |_| "ok"));
        outcome
    }

    /// Fetch, modify and optionally write back the document under `root_key`.
    ///
    /// `f` gets the decoded working copy and returns its result together
    /// with whether the copy must be written back. A missing, `null` or
    /// undecodable document starts out as `{}`.
    pub async fn mutate<R, F>(&self, root_key: &str, operation: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Document) -> Result<(R, bool)>,
    {
        self.locked(root_key, operation, async {
            let raw = self.store.get(&self.namespace, root_key).await?;
            let mut doc = self.decode_for_mutation(root_key, raw);

            let (result, write_back) = f(&mut doc)?;
            if write_back {
                let encoded = self.codec.encode(&doc)?;
                self.store.set(&self.namespace, root_key, encoded).await?;
                metrics::record(|m| m.writebacks.inc());
                log_debug!("{} wrote back {}", operation, root_key);
            }
            Ok::<R, Error>(result)
        })
        .await
    }

    /// Fetch the document under `root_key` without locking and hand it to `f`.
    ///
    /// Decode failures surface here; nothing is fabricated for a missing key.
    pub async fn read<R, F>(&self, root_key: &str, operation: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(Option<&Document>) -> Result<R>,
    {
        check_root_key(root_key)?;
        let timer = Timer::start(operation);

        let outcome = async {
            let raw = self.store.get(&self.namespace, root_key).await?;
            let doc = raw.map(|raw| self.codec.decode(&raw)).transpose()?;
            f(doc.as_ref())
        }
        .await;

        timer.finish(outcome.as_ref().map_or_else(Error::class, |_| "ok"));
        outcome
    }

    fn decode_for_mutation(&self, root_key: &str, raw: Option<Bytes>) -> Document {
        let Some(raw) = raw else {
            return Document::Object(Map::new());
        };
        match self.codec.decode(&raw) {
            Ok(Document::Null) => Document::Object(Map::new()),
            Ok(doc) => doc,
            Err(e) => {
                metrics::record(|m| m.decode_recoveries.inc());
                log_warn!(
                    "stored document {} is not valid {}, starting from an empty object: {}",
                    root_key,
                    self.codec.name(),
                    e
                );
                Document::Object(Map::new())
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("namespace", &self.namespace)
            .field("codec", &self.codec.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Reject root keys that cannot name a document
pub fn check_root_key(root_key: &str) -> Result<()> {
    if root_key.is_empty() {
        return Err(Error::usage("root key must not be empty"));
    }
    Ok(())
}
