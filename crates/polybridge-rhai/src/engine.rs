//! Guest runtime adapter: owns the embedded rhai engine.
//!
//! One adapter owns at most one live engine state for its whole lifetime.
//! All compilation, top-level evaluation, and invocation serialize through
//! the adapter's execution lock; the engine is single-threaded by contract
//! even though the handles are shareable.

use crate::unit::RhaiLoadUnit;
use polybridge_core::{BridgeError, BridgeResult, LoadUnit, Loader, TypeRegistry, ValueId};
use rhai::{Dynamic, Engine, EvalAltResult, Position};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Builtin type names the rhai value system natively understands, seeded
/// into the type registry at initialization.
const BUILTIN_TYPES: &[(&str, ValueId)] = &[
    ("bool", ValueId::Bool),
    ("i32", ValueId::Int),
    ("int", ValueId::Long),
    ("f32", ValueId::Float),
    ("float", ValueId::Double),
    ("string", ValueId::String),
    ("array", ValueId::Array),
    ("fn", ValueId::Function),
    // Generic object; marshaled as the unsupported pointer kind.
    ("map", ValueId::Ptr),
];

struct EngineState {
    engine: Arc<Engine>,
    types: Arc<TypeRegistry>,
    exec: Arc<Mutex<()>>,
}

/// The rhai loader backend.
pub struct RhaiLoader {
    state: Option<EngineState>,
}

impl RhaiLoader {
    /// Create an uninitialized loader.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Seed a type registry with the builtin type names.
    pub fn register_builtin_types(registry: &mut TypeRegistry) -> BridgeResult<()> {
        for (name, id) in BUILTIN_TYPES {
            registry.define(name, *id)?;
        }
        Ok(())
    }

    /// Whether the engine is live.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> BridgeResult<&EngineState> {
        self.state
            .as_ref()
            .ok_or_else(|| BridgeError::EngineInit("rhai loader is not initialized".to_string()))
    }
}

impl Default for RhaiLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for RhaiLoader {
    fn tag(&self) -> &'static str {
        "rhai"
    }

    fn initialize(&mut self) -> BridgeResult<()> {
        if self.state.is_some() {
            return Ok(());
        }

        let mut engine = Engine::new();
        engine.register_fn("read_line", read_line);

        let mut types = TypeRegistry::new();
        Self::register_builtin_types(&mut types)?;

        info!(
            "Initialized rhai loader ({} builtin types)",
            types.len()
        );

        self.state = Some(EngineState {
            engine: Arc::new(engine),
            types: Arc::new(types),
            exec: Arc::new(Mutex::new(())),
        });

        Ok(())
    }

    fn load_from_file(&mut self, path: &Path) -> BridgeResult<Box<dyn LoadUnit>> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_from_memory(&name, &source)
    }

    fn load_from_memory(&mut self, name: &str, source: &str) -> BridgeResult<Box<dyn LoadUnit>> {
        let state = self.state()?;
        let unit = RhaiLoadUnit::from_source(
            Arc::clone(&state.engine),
            Arc::clone(&state.types),
            Arc::clone(&state.exec),
            name,
            source,
        )?;
        Ok(Box::new(unit))
    }

    fn destroy(&mut self) -> BridgeResult<()> {
        if let Some(state) = self.state.take() {
            // Strict teardown order: execution lock, type registry, engine.
            let EngineState {
                engine,
                types,
                exec,
            } = state;
            drop(exec);
            drop(types);
            drop(engine);
            info!("Destroyed rhai loader");
        }
        Ok(())
    }
}

impl Drop for RhaiLoader {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

/// Host builtin exposed to guest scripts: read one line from stdin.
///
/// End of input surfaces as a guest runtime error so an interactive
/// `evaluate` function rejects instead of looping on empty reads.
fn read_line() -> Result<String, Box<EvalAltResult>> {
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => Err(EvalAltResult::ErrorRuntime(
            Dynamic::from("end of input".to_string()),
            Position::NONE,
        )
        .into()),
        Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(err) => Err(EvalAltResult::ErrorRuntime(
            Dynamic::from(err.to_string()),
            Position::NONE,
        )
        .into()),
    }
}
