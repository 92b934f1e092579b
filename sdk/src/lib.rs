//! Wayfarer SDK
//!
//! Shared library providing the tool trait, tool I/O types and the engine
//! error type. Tool implementations depend on this crate only.

/// Error types and handling
pub mod errors;

/// Tool trait
pub mod tool;

/// Tool input/output types
pub mod types;

// Re-export commonly used types
pub use errors::{AgentErrorExt, EngineError};
pub use tool::Tool;
pub use types::{ToolError, ToolInput, ToolOutput};
