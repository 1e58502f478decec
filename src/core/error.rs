//! Error types and handling for nestlock
//!
//! Every terminal operation reports failures through [`Error`]. The nested
//! enums separate the collaborator that failed (store, lock service, codec)
//! from caller misuse, so callers can tell a transport fault from a bad
//! request without string matching.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nestlock
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store adapter errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Lock coordination errors
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// Serialization/deserialization errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Caller misuse: empty root keys, operations on the wrong value type,
    /// blocking calls from inside a runtime
    #[error("Usage error: {0}")]
    Usage(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registration errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Store adapter errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or rejected the request
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The store answered with something the adapter cannot interpret
    #[error("Unexpected response: {0}")]
    Protocol(String),
}

/// Lock coordination errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Every acquire attempt lost to another holder or failed to reach quorum
    #[error("Could not acquire lock on {resource} after {attempts} attempts")]
    Contended {
        /// Lock resource name
        resource: String,
        /// Number of acquire attempts made
        attempts: u32,
    },

    /// A lock service could not be reached
    #[error("Lock service {service} unavailable: {reason}")]
    Unavailable {
        /// Name of the lock service
        service: String,
        /// Transport failure description
        reason: String,
    },

    /// Release was not acknowledged by any lock service
    #[error("Release of {resource} was not acknowledged")]
    Release {
        /// Lock resource name
        resource: String,
    },
}

/// Serialization/deserialization errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// MessagePack serialization error
    #[error("MessagePack error: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),

    /// MessagePack deserialization error
    #[error("MessagePack decode error: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),

    /// Typed conversion between a document node and a caller type failed
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Check if this is a transport failure in a collaborator
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Transport(_)) | Error::Lock(LockError::Unavailable { .. })
        )
    }

    /// Check if this is a caller misuse error
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// Check if this is a lock acquisition failure
    pub fn is_lock_failure(&self) -> bool {
        matches!(self, Error::Lock(_))
    }

    /// Short error class, used as a metrics label
    pub fn class(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Store(_) => "store",
            Error::Lock(_) => "lock",
            Error::Codec(_) => "codec",
            Error::Usage(_) => "usage",
            Error::Io(_) => "io",
            Error::Metrics(_) => "metrics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::usage("x").class(), "usage");
        assert!(Error::usage("x").is_usage());
        assert!(Error::from(StoreError::Transport("down".into())).is_transport());
        assert!(!Error::from(StoreError::Protocol("odd".into())).is_transport());

        let contended = Error::from(LockError::Contended { resource: "r".into(), attempts: 3 });
        assert!(contended.is_lock_failure());
        assert!(contended.to_string().contains("after 3 attempts"));
    }
}
