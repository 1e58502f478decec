//! Root registry: the entry point handing out cursors per root key

use crate::codec::{codec_for, Codec};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::cursor::Cursor;
use crate::engine::cycle::check_root_key;
use crate::engine::Context;
use crate::lock::{DistributedLock, LockCoordinator, LockService, MemoryLockService, NoopLockCoordinator};
use crate::log_info;
use crate::storage::StoreAdapter;
use crate::types::Document;
use std::collections::HashMap;
use std::sync::Arc;

/// Collection of root documents in one store namespace
#[derive(Clone, Debug)]
pub struct Registry {
    ctx: Context,
}

impl Registry {
    /// Registry over `store` with the default configuration
    pub fn new(store: Arc<dyn StoreAdapter>) -> Result<Self> {
        Self::builder(Config::default()).store(store).build()
    }

    /// Start building a registry from `config`
    pub fn builder(config: Config) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    pub(crate) fn from_context(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Store namespace of this registry
    pub fn namespace(&self) -> &str {
        self.ctx.namespace()
    }

    /// Cursor at the root of `root_key`. No I/O.
    pub fn get(&self, root_key: &str) -> Result<Cursor> {
        check_root_key(root_key)?;
        Ok(Cursor::new(self.ctx.clone(), root_key))
    }

    /// Replace the whole document under `root_key`
    pub async fn set(&self, root_key: &str, value: impl Into<Document>) -> Result<Document> {
        self.get(root_key)?.set(value).await
    }

    /// Remove the document under `root_key`. Returns whether it existed.
    pub async fn delete(&self, root_key: &str) -> Result<bool> {
        let store = self.ctx.store();
        let namespace = self.ctx.namespace();
        self.ctx
            .locked(root_key, "drop", async { store.delete(namespace, root_key).await.map_err(Error::from) })
            .await
    }

    /// Whether a document is stored under `root_key`. Takes no lock.
    pub async fn has(&self, root_key: &str) -> Result<bool> {
        check_root_key(root_key)?;
        Ok(self.ctx.store().exists(self.ctx.namespace(), root_key).await?)
    }
}

/// Wires a [`Registry`] from configuration and injected collaborators
pub struct RegistryBuilder {
    config: Config,
    store: Option<Arc<dyn StoreAdapter>>,
    codec: Option<Arc<dyn Codec>>,
    lock_services: HashMap<String, Arc<dyn LockService>>,
}

impl RegistryBuilder {
    /// Builder over `config`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            codec: None,
            lock_services: HashMap::new(),
        }
    }

    /// Store adapter (required)
    pub fn store(mut self, store: Arc<dyn StoreAdapter>) -> Self {
        self.store = Some(store);
        self
    }

    /// Codec overriding the configured format
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Register the lock service behind a configured endpoint name
    pub fn lock_service(mut self, name: impl Into<String>, service: Arc<dyn LockService>) -> Self {
        self.lock_services.insert(name.into(), service);
        self
    }

    /// Validate the configuration and assemble the registry
    pub fn build(self) -> Result<Registry> {
        self.config.validate()?;
        let store = self.store.clone().ok_or_else(|| Error::config("a store adapter is required"))?;
        let codec = self.codec.clone().unwrap_or_else(|| codec_for(self.config.codec.format));
        let lock = self.lock_coordinator()?;

        log_info!(
            "Registry ready: namespace={} codec={} locking={}",
            self.config.store.namespace,
            codec.name(),
            self.config.lock.enabled
        );

        let ctx = Context::new(
            store,
            lock,
            codec,
            self.config.store.namespace.as_str(),
            self.config.lock.ttl,
        );
        Ok(Registry::from_context(ctx))
    }

    fn lock_coordinator(&self) -> Result<Arc<dyn LockCoordinator>> {
        let lock = &self.config.lock;
        if !lock.enabled {
            return Ok(Arc::new(NoopLockCoordinator));
        }

        if lock.endpoints.is_empty() {
            let local: Arc<dyn LockService> = MemoryLockService::shared();
            return Ok(Arc::new(DistributedLock::new(vec![local], lock)));
        }

        let services = lock
            .endpoints
            .iter()
            .map(|name| {
                self.lock_services
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::config(format!("no lock service registered for endpoint '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(DistributedLock::new(services, lock)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_builder_requires_store() {
        let err = Registry::builder(Config::default()).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unregistered_endpoint_is_a_config_error() {
        let mut config = Config::default();
        config.lock.endpoints = vec!["a".into(), "b".into()];

        let err = Registry::builder(config.clone())
            .store(Arc::new(MemoryStore::new()))
            .lock_service("a", Arc::new(MemoryLockService::new("a")))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'b'"));

        let registry = Registry::builder(config)
            .store(Arc::new(MemoryStore::new()))
            .lock_service("a", Arc::new(MemoryLockService::new("a")))
            .lock_service("b", Arc::new(MemoryLockService::new("b")))
            .build();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_get_does_no_io_and_rejects_empty_keys() {
        let registry = Registry::new(Arc::new(MemoryStore::new())).unwrap();
        let cursor = registry.get("hello").unwrap().navigate("a").navigate("b");
        assert_eq!(cursor.root_key(), "hello");
        assert_eq!(cursor.path().to_string(), "a.b");
        assert!(registry.get("").unwrap_err().is_usage());
    }
}
