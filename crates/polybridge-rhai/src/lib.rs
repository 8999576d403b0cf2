//! # polybridge-rhai
//!
//! Rhai scripting-engine backend for polybridge.
//!
//! This crate provides:
//! - The guest runtime adapter owning one embedded `rhai::Engine`
//! - Load units: one compiled-and-executed script per isolated scope
//! - Two-pass function discovery (source annotations + AST reflection)
//! - The dispatch adapter marshaling values across the host/guest boundary
//!
//! ## Declaring callable functions
//!
//! A script exposes a function to the host by pairing its definition with a
//! type annotation comment:
//!
//! ```rhai
//! //# greet(name: string) -> string
//! fn greet(name) {
//!     "hello " + name
//! }
//! ```
//!
//! Functions without an annotation stay callable inside the script but are
//! never registered with the host. The annotation pass is a pure text
//! transformation and runs before compilation, so it needs no live engine.

pub mod engine;
pub mod guard;
pub mod unit;

mod convert;
mod function;

pub use engine::RhaiLoader;
pub use guard::{neutralize_shebang, parse as guard_parse, FunctionAnnotation, GuardedSource};
pub use unit::RhaiLoadUnit;
