//! Loader and load-unit contracts, plus the language-tag registry.
//!
//! One [`Loader`] embeds one guest runtime for the lifetime of the process.
//! Each loaded source file or buffer becomes a [`LoadUnit`] with its own
//! isolated global scope and its own function table.

use crate::error::BridgeResult;
use crate::function::BridgedFunction;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One compiled-and-executed source unit inside a dedicated execution
/// context.
pub trait LoadUnit: Send {
    /// Name of the unit (file stem or caller-supplied buffer name).
    fn name(&self) -> &str;

    /// Enumerate the unit's callables and publish typed functions.
    fn discover(&mut self) -> BridgeResult<()>;

    /// Retrieve a registered function by name.
    fn function(&self, name: &str) -> Option<Arc<BridgedFunction>>;

    /// All registered functions, in no particular order.
    fn functions(&self) -> Vec<Arc<BridgedFunction>>;

    /// Register an externally-built function (e.g. a host callback) under
    /// its name. Last registration for a name wins.
    fn register(&mut self, function: BridgedFunction) -> BridgeResult<()>;

    /// Release every function wrapper and the execution context.
    ///
    /// Safe to call repeatedly; the second call is a no-op.
    fn clear(&mut self);
}

/// A guest-language backend.
pub trait Loader: Send {
    /// Language tag this loader handles (e.g. `"rhai"`).
    fn tag(&self) -> &'static str;

    /// Start the embedded guest runtime. Exactly-once per loader lifetime;
    /// re-initializing a live loader is a no-op success.
    fn initialize(&mut self) -> BridgeResult<()>;

    /// Load and execute a source file into a fresh execution context.
    fn load_from_file(&mut self, path: &Path) -> BridgeResult<Box<dyn LoadUnit>>;

    /// Load and execute an in-memory buffer into a fresh execution context.
    fn load_from_memory(&mut self, name: &str, source: &str) -> BridgeResult<Box<dyn LoadUnit>>;

    /// Tear the guest runtime down. Idempotent.
    fn destroy(&mut self) -> BridgeResult<()>;
}

/// Registry mapping a language tag to its loader backend.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<&'static str, Box<dyn Loader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its tag. Last registration wins.
    pub fn register(&mut self, loader: Box<dyn Loader>) {
        info!("Registered loader backend: {}", loader.tag());
        self.loaders.insert(loader.tag(), loader);
    }

    /// Retrieve a backend by tag.
    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Box<dyn Loader>> {
        self.loaders.get_mut(tag)
    }

    /// Registered language tags.
    pub fn tags(&self) -> Vec<&'static str> {
        self.loaders.keys().copied().collect()
    }

    /// Destroy every registered backend.
    pub fn destroy_all(&mut self) -> BridgeResult<()> {
        for loader in self.loaders.values_mut() {
            loader.destroy()?;
        }
        Ok(())
    }
}
