//! Repeat Chat SDK
//!
//! Shared library providing the dialogue types and error taxonomy used by the
//! repeat-chat engine and its tests.

/// Error types and handling
pub mod errors;

/// Dialogue types
pub mod types;

// Re-export commonly used types
pub use errors::{ChatErrorExt, EngineError};
pub use types::{PerRole, Role, Scenario, Turn};
