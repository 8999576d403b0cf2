//! Dispatch wrapper binding one discovered rhai function to the uniform
//! create/invoke/destroy contract.

use crate::convert;
use polybridge_core::{BridgeError, BridgeResult, Callable, FunctionInterface, Signature, Value};
use rhai::{Dynamic, Engine, FnPtr, Scope, AST};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Lock a mutex, recovering the guard from a poisoned lock instead of
/// propagating the panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared handles into one load unit's execution context.
///
/// Cloning is cheap; every clone keeps the engine, compiled program, and
/// scope alive. The `exec` lock serializes all guest execution for the
/// owning engine instance.
#[derive(Clone)]
pub(crate) struct CallContext {
    pub(crate) engine: Arc<Engine>,
    pub(crate) ast: Arc<AST>,
    pub(crate) scope: Arc<Mutex<Scope<'static>>>,
    pub(crate) exec: Arc<Mutex<()>>,
}

/// One discovered rhai function behind the dispatch contract.
///
/// Holds the persistent back-reference into the guest engine behind an
/// `Option` so `destroy` releases it exactly once; invoking afterwards is a
/// clean error rather than a dangling call.
pub(crate) struct RhaiFunction {
    name: String,
    persistent: Mutex<Option<CallContext>>,
}

impl RhaiFunction {
    pub(crate) fn new(name: String, ctx: CallContext) -> Self {
        Self {
            name,
            persistent: Mutex::new(Some(ctx)),
        }
    }
}

impl FunctionInterface for RhaiFunction {
    fn invoke(&self, signature: &Signature, args: &[Value]) -> BridgeResult<Value> {
        let ctx = match lock(&self.persistent).as_ref() {
            Some(ctx) => ctx.clone(),
            None => return Err(BridgeError::FunctionReleased(self.name.clone())),
        };

        let native_args: Vec<Dynamic> = args
            .iter()
            .enumerate()
            .map(|(index, value)| convert::to_dynamic_typed(signature.get_type(index), value))
            .collect();

        let result = {
            let _serial = lock(&ctx.exec);
            let mut scope = lock(&ctx.scope);
            ctx.engine
                .call_fn::<Dynamic>(&mut scope, &ctx.ast, &self.name, native_args)
        };

        match result {
            Ok(native) => Ok(convert::from_dynamic_typed(
                signature.get_return(),
                native,
                &ctx,
            )),
            // Guest-raised errors surface as values, not host errors.
            Err(err) => Ok(convert::error_to_value(err, &ctx)),
        }
    }

    fn destroy(&self) {
        if lock(&self.persistent).take().is_some() {
            debug!("Released persistent reference for '{}'", self.name);
        }
    }
}

/// A guest function value (rhai `FnPtr`) invocable from the host.
///
/// This is how continuation functions returned by a script travel through
/// the typed value model.
pub(crate) struct GuestFunction {
    pub(crate) ctx: CallContext,
    pub(crate) fn_ptr: FnPtr,
}

impl Callable for GuestFunction {
    fn call(&self, args: &[Value]) -> BridgeResult<Value> {
        let native_args: Vec<Dynamic> = args.iter().map(convert::to_dynamic).collect();

        let result = {
            let _serial = lock(&self.ctx.exec);
            self.fn_ptr
                .call::<Dynamic>(&self.ctx.engine, &self.ctx.ast, native_args)
        };

        match result {
            Ok(native) => Ok(convert::from_dynamic(native, &self.ctx)),
            Err(err) => Ok(convert::error_to_value(err, &self.ctx)),
        }
    }
}
