//! Registry factory
//!
//! Builds the registry a deployment asked for from configuration: async or
//! blocking facade, configured codec and lock topology.

use crate::blocking::BlockingRegistry;
use crate::core::config::{Config, FacadeMode};
use crate::core::error::Result;
use crate::lock::LockService;
use crate::log_info;
use crate::registry::Registry;
use crate::storage::StoreAdapter;
use std::sync::Arc;

/// Registry in the facade mode selected by configuration
pub enum ConfiguredRegistry {
    /// Operations return futures
    Async(Registry),
    /// Operations block the calling thread
    Blocking(BlockingRegistry),
}

impl ConfiguredRegistry {
    /// Facade mode of this registry
    pub fn mode(&self) -> FacadeMode {
        match self {
            ConfiguredRegistry::Async(_) => FacadeMode::Async,
            ConfiguredRegistry::Blocking(_) => FacadeMode::Blocking,
        }
    }

    /// The async registry, in either mode
    pub fn as_async(&self) -> &Registry {
        match self {
            ConfiguredRegistry::Async(registry) => registry,
            ConfiguredRegistry::Blocking(registry) => registry.as_async(),
        }
    }
}

/// Create a registry over `store` as described by `config`.
///
/// `lock_services` supplies the lock service for every name listed in
/// `lock.endpoints`.
pub fn create_registry(
    config: Config,
    store: Arc<dyn StoreAdapter>,
    lock_services: Vec<(String, Arc<dyn LockService>)>,
) -> Result<ConfiguredRegistry> {
    let mode = config.facade.mode;
    log_info!("Creating registry with facade mode: {:?}", mode);

    let builder = lock_services
        .into_iter()
        .fold(Registry::builder(config).store(store), |builder, (name, service)| {
            builder.lock_service(name, service)
        });
    let registry = builder.build()?;

    match mode {
        FacadeMode::Async => Ok(ConfiguredRegistry::Async(registry)),
        FacadeMode::Blocking => Ok(ConfiguredRegistry::Blocking(BlockingRegistry::new(registry)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_mode_follows_config() {
        let mut config = Config::default();
        let async_registry = create_registry(config.clone(), Arc::new(MemoryStore::new()), Vec::new()).unwrap();
        assert_eq!(async_registry.mode(), FacadeMode::Async);

        config.facade.mode = FacadeMode::Blocking;
        config.store.namespace = "blocking".into();
        let blocking = create_registry(config, Arc::new(MemoryStore::new()), Vec::new()).unwrap();
        assert_eq!(blocking.mode(), FacadeMode::Blocking);
        assert_eq!(blocking.as_async().namespace(), "blocking");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.store.namespace.clear();
        assert!(create_registry(config, Arc::new(MemoryStore::new()), Vec::new()).is_err());
    }
}
