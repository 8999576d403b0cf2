//! Error types for the polybridge runtime.

use thiserror::Error;

/// Errors that can occur while loading, discovering, or invoking guest code.
///
/// Guest-raised errors are deliberately absent: an exception thrown inside
/// guest code surfaces as a [`crate::Value::Exception`] or
/// [`crate::Value::Throwable`] result, never as a host-side error.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Guest engine startup failed; fatal to loader construction.
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// A builtin type name collided with an incompatible existing entry.
    #[error("Type registration failed: {0}")]
    TypeRegistration(String),

    /// Compiling or executing the top level of a source unit failed.
    #[error("Load execution failed: {0}")]
    LoadExecution(String),

    /// A known-typed candidate could not be registered during discovery.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// No function with the requested name is registered.
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// The function's persistent engine reference was already released.
    #[error("Function was already released: {0}")]
    FunctionReleased(String),

    /// The argument array does not match the signature's parameter count.
    #[error("Arity mismatch: expected {expected} arguments, received {received}")]
    ArityMismatch { expected: usize, received: usize },

    /// IO error while reading a source file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
