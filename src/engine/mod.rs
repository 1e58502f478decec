//! Document engine: path traversal, forwarded operations and the locked cycle

/// Write-through and pure traversal of nested paths
pub mod apply;

/// The locked read-modify-write cycle
pub mod cycle;

/// Operations forwarded to sequence and string values
pub mod ops;

pub use apply::{apply, lookup};
pub use cycle::Context;
pub use ops::Operation;
