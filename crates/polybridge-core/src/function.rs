//! The uniform dispatch contract bound to every discovered function.
//!
//! Each guest-language backend implements [`FunctionInterface`] once per
//! discovered callable; the host only ever sees [`BridgedFunction`], so it
//! never needs to know which guest language produced a function.

use crate::error::{BridgeError, BridgeResult};
use crate::types::Signature;
use crate::value::{Callable, Value};
use serde::Serialize;

/// Backend-specific create/invoke/destroy triplet.
///
/// `create` runs once when the wrapper is published, `invoke` marshals and
/// calls, `destroy` releases the backend's persistent reference into the
/// guest engine. `destroy` must be idempotent: it is called from the owning
/// load unit's teardown and again from `Drop`, whichever comes first wins.
pub trait FunctionInterface: Send + Sync {
    /// Backend-specific setup hook.
    fn create(&self) -> BridgeResult<()> {
        Ok(())
    }

    /// Marshal `args` into the guest, call, and marshal the result back.
    fn invoke(&self, signature: &Signature, args: &[Value]) -> BridgeResult<Value>;

    /// Release the persistent reference into the guest engine.
    fn destroy(&self) {}
}

/// Serializable introspection view of a discovered function.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub signature: Signature,
}

/// A discovered guest function behind the uniform contract.
pub struct BridgedFunction {
    name: String,
    signature: Signature,
    interface: Box<dyn FunctionInterface>,
}

impl BridgedFunction {
    /// Bind a signature to a backend interface, running its `create` hook.
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        interface: Box<dyn FunctionInterface>,
    ) -> BridgeResult<Self> {
        interface.create()?;
        Ok(Self {
            name: name.into(),
            signature,
            interface,
        })
    }

    /// Wrap a host-side closure behind the same contract.
    ///
    /// This is how host callbacks (the command loop's `exit`, `inspect`)
    /// are registered into a load unit next to guest functions.
    pub fn host<F>(name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&[Value]) -> BridgeResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Signature::with_count(arity),
            interface: Box::new(HostFunction::new(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn arity(&self) -> usize {
        self.signature.count()
    }

    /// Invoke through the backend interface.
    pub fn invoke(&self, args: &[Value]) -> BridgeResult<Value> {
        if args.len() != self.signature.count() {
            return Err(BridgeError::ArityMismatch {
                expected: self.signature.count(),
                received: args.len(),
            });
        }
        self.interface.invoke(&self.signature, args)
    }

    /// Release the backend's persistent reference.
    pub fn destroy(&self) {
        self.interface.destroy();
    }

    pub fn describe(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }
}

impl Drop for BridgedFunction {
    fn drop(&mut self) {
        self.interface.destroy();
    }
}

impl Callable for BridgedFunction {
    fn call(&self, args: &[Value]) -> BridgeResult<Value> {
        self.invoke(args)
    }
}

impl std::fmt::Debug for BridgedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedFunction")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}

/// Host-native closure behind the dispatch contract.
pub struct HostFunction<F>
where
    F: Fn(&[Value]) -> BridgeResult<Value> + Send + Sync,
{
    f: F,
}

impl<F> HostFunction<F>
where
    F: Fn(&[Value]) -> BridgeResult<Value> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FunctionInterface for HostFunction<F>
where
    F: Fn(&[Value]) -> BridgeResult<Value> + Send + Sync,
{
    fn invoke(&self, _signature: &Signature, args: &[Value]) -> BridgeResult<Value> {
        (self.f)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_host_function_invoke() {
        let f = BridgedFunction::host("concat", 2, |args| {
            let a = args[0].as_str().unwrap_or_default();
            let b = args[1].as_str().unwrap_or_default();
            Ok(Value::Str(format!("{a}{b}")))
        });

        let result = f
            .invoke(&[Value::Str("poly".into()), Value::Str("bridge".into())])
            .unwrap();
        assert_eq!(result, Value::Str("polybridge".into()));
    }

    #[test]
    fn test_arity_checked_before_dispatch() {
        let f = BridgedFunction::host("nullary", 0, |_| Ok(Value::Null));
        let err = f.invoke(&[Value::Long(1)]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ArityMismatch {
                expected: 0,
                received: 1
            }
        ));
    }

    struct CountingInterface {
        destroyed: Arc<AtomicUsize>,
    }

    impl FunctionInterface for CountingInterface {
        fn invoke(&self, _signature: &Signature, _args: &[Value]) -> BridgeResult<Value> {
            Ok(Value::Null)
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_runs_destroy() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let f = BridgedFunction::new(
            "f",
            Signature::with_count(0),
            Box::new(CountingInterface {
                destroyed: Arc::clone(&destroyed),
            }),
        )
        .unwrap();

        drop(f);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
