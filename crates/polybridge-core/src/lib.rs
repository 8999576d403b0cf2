//! # polybridge-core
//!
//! Language-agnostic core of the polybridge function-bridging runtime.
//!
//! This crate provides:
//! - The host-neutral typed value model exchanged across the host/guest
//!   boundary
//! - The per-loader type registry and function signatures
//! - The uniform create/invoke/destroy dispatch contract every guest-language
//!   backend implements
//! - The loader and load-unit contracts plus the language-tag registry
//!
//! ## Architecture
//!
//! A `Loader` embeds one guest runtime and produces `LoadUnit`s, one per
//! source file or buffer. Discovery inside a load unit publishes
//! `BridgedFunction`s, each backed by a backend-specific `FunctionInterface`.
//! The host invokes every discovered function the same way, whatever guest
//! language produced it.

pub mod error;
pub mod function;
pub mod loader;
pub mod types;
pub mod value;

pub use error::{BridgeError, BridgeResult};
pub use function::{BridgedFunction, FunctionDescriptor, FunctionInterface, HostFunction};
pub use loader::{LoadUnit, Loader, LoaderRegistry};
pub use types::{Parameter, Signature, TypeDescriptor, TypeRegistry};
pub use value::{Callable, Exception, FunctionHandle, Value, ValueId};
