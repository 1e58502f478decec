//! Core foundations: configuration, errors, logging and the registry factory

pub mod config;
pub mod error;
pub mod factory;
pub mod logging;

// Re-export commonly used items
pub use config::Config;
pub use error::{Error, Result};
pub use factory::{create_registry, ConfiguredRegistry};
