//! One loaded rhai script: compiled program, isolated scope, function table.

use crate::function::{lock, CallContext, RhaiFunction};
use crate::guard::{self, FunctionAnnotation};
use polybridge_core::{
    BridgeError, BridgeResult, BridgedFunction, LoadUnit, Signature, TypeRegistry,
};
use rhai::{Dynamic, Engine, FnAccess, Scope};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A compiled-and-executed rhai source with its own global scope.
///
/// Construction runs the guard pass, compiles, and executes the top level;
/// [`LoadUnit::discover`] then enumerates script functions and publishes the
/// annotated ones.
pub struct RhaiLoadUnit {
    name: String,
    ctx: CallContext,
    types: Arc<TypeRegistry>,
    annotations: HashMap<String, FunctionAnnotation>,
    functions: HashMap<String, Arc<BridgedFunction>>,
}

impl RhaiLoadUnit {
    pub(crate) fn from_source(
        engine: Arc<Engine>,
        types: Arc<TypeRegistry>,
        exec: Arc<Mutex<()>>,
        name: &str,
        source: &str,
    ) -> BridgeResult<Self> {
        let source = guard::neutralize_shebang(source);
        let guarded = guard::parse(&source);

        let (ast, scope) = {
            let _serial = lock(&exec);

            let ast = engine.compile(&guarded.source).map_err(|err| {
                BridgeError::LoadExecution(format!("compilation of '{name}' failed: {err}"))
            })?;

            let mut scope = Scope::new();
            let _ = engine
                .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
                .map_err(|err| {
                    BridgeError::LoadExecution(format!(
                        "top-level execution of '{name}' failed: {err}"
                    ))
                })?;

            (ast, scope)
        };

        debug!(
            "Loaded unit '{}' ({} annotations)",
            name,
            guarded.annotations.len()
        );

        Ok(Self {
            name: name.to_string(),
            ctx: CallContext {
                engine,
                ast: Arc::new(ast),
                scope: Arc::new(Mutex::new(scope)),
                exec,
            },
            types,
            annotations: guarded.annotations,
            functions: HashMap::new(),
        })
    }
}

impl LoadUnit for RhaiLoadUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn discover(&mut self) -> BridgeResult<()> {
        // Pass two: reflect over the compiled program. Pass one (the
        // annotation scan) already ran at load time. The guest overloads by
        // arity, so candidates group into one overload set per name.
        let mut candidates: HashMap<String, Vec<usize>> = HashMap::new();
        for meta in self
            .ctx
            .ast
            .iter_functions()
            .filter(|meta| meta.access == FnAccess::Public)
        {
            candidates
                .entry(meta.name.to_string())
                .or_default()
                .push(meta.params.len());
        }

        for (fn_name, arities) in candidates {
            let Some(annotation) = self.annotations.get(&fn_name).cloned() else {
                debug!("Skipping unannotated function '{}'", fn_name);
                continue;
            };

            // The annotation picks the overload whose arity it declares;
            // call-time dispatch resolves by argument count anyway.
            let arity = annotation.params.len();
            if !arities.contains(&arity) {
                self.clear();
                return Err(BridgeError::Discovery(format!(
                    "function '{}' declares {} parameter(s) but is defined with {:?}",
                    fn_name, arity, arities
                )));
            }

            let mut signature = Signature::with_count(arity);
            let mut resolved = true;

            for (index, (param_name, type_name)) in annotation.params.iter().enumerate() {
                let Some(ty) = self.types.lookup(type_name) else {
                    warn!(
                        "Skipping '{}': unknown parameter type '{}'",
                        fn_name, type_name
                    );
                    resolved = false;
                    break;
                };
                if let Err(err) = signature.set(index, param_name, ty.clone()) {
                    self.clear();
                    return Err(err);
                }
            }
            if !resolved {
                continue;
            }

            if let Some(type_name) = &annotation.ret {
                let Some(ty) = self.types.lookup(type_name) else {
                    warn!("Skipping '{}': unknown return type '{}'", fn_name, type_name);
                    continue;
                };
                signature.set_return(ty.clone());
            }

            let interface = RhaiFunction::new(fn_name.clone(), self.ctx.clone());
            let function = match BridgedFunction::new(&fn_name, signature, Box::new(interface)) {
                Ok(function) => function,
                Err(err) => {
                    self.clear();
                    return Err(err);
                }
            };

            // Last definition for a name wins, matching the guest's own
            // redefinition rule.
            self.functions.insert(fn_name, Arc::new(function));
        }

        info!(
            "Discovered {} function(s) in unit '{}'",
            self.functions.len(),
            self.name
        );
        Ok(())
    }

    fn function(&self, name: &str) -> Option<Arc<BridgedFunction>> {
        self.functions.get(name).cloned()
    }

    fn functions(&self) -> Vec<Arc<BridgedFunction>> {
        self.functions.values().cloned().collect()
    }

    fn register(&mut self, function: BridgedFunction) -> BridgeResult<()> {
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        Ok(())
    }

    fn clear(&mut self) {
        for function in self.functions.values() {
            function.destroy();
        }
        self.functions.clear();
    }
}

impl Drop for RhaiLoadUnit {
    fn drop(&mut self) {
        self.clear();
    }
}
