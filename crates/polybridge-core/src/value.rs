//! Host-neutral typed value model.
//!
//! Every piece of data crossing the host/guest boundary is a [`Value`]: a
//! tagged union of the primitive and composite kinds all loader backends
//! understand. Creation is plain construction, copying is `Clone`, and
//! destruction is `Drop`.

use crate::error::BridgeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type tag shared by values and type descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueId {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Ptr,
    Array,
    Function,
    Exception,
    Throwable,
    Null,
    Invalid,
}

/// A guest-raised error surfaced as data.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    /// Human-readable error message.
    pub message: String,

    /// Stack trace or source position, best-effort.
    pub stacktrace: String,
}

impl Exception {
    pub fn new(message: impl Into<String>, stacktrace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stacktrace: stacktrace.into(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.stacktrace.is_empty() {
            write!(f, "\n{}", self.stacktrace)?;
        }
        Ok(())
    }
}

/// Something the host can call with typed values.
///
/// Guest function objects (e.g. the continuation returned by a REPL
/// `evaluate` function) implement this so they can travel inside a
/// [`Value::Function`] and be invoked later.
pub trait Callable: Send + Sync {
    fn call(&self, args: &[Value]) -> BridgeResult<Value>;
}

/// Cloneable handle around a [`Callable`].
#[derive(Clone)]
pub struct FunctionHandle(Arc<dyn Callable>);

impl FunctionHandle {
    pub fn new(callable: impl Callable + 'static) -> Self {
        Self(Arc::new(callable))
    }

    pub fn from_arc(callable: Arc<dyn Callable>) -> Self {
        Self(callable)
    }

    /// Invoke the underlying callable.
    pub fn call(&self, args: &[Value]) -> BridgeResult<Value> {
        self.0.call(args)
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionHandle({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for FunctionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Host-neutral tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Ptr(usize),
    Array(Vec<Value>),
    Function(FunctionHandle),
    Exception(Exception),
    Throwable(Box<Value>),
    Null,
    Invalid,
}

impl Value {
    /// Type-id query.
    pub fn id(&self) -> ValueId {
        match self {
            Value::Bool(_) => ValueId::Bool,
            Value::Int(_) => ValueId::Int,
            Value::Long(_) => ValueId::Long,
            Value::Float(_) => ValueId::Float,
            Value::Double(_) => ValueId::Double,
            Value::Str(_) => ValueId::String,
            Value::Ptr(_) => ValueId::Ptr,
            Value::Array(_) => ValueId::Array,
            Value::Function(_) => ValueId::Function,
            Value::Exception(_) => ValueId::Exception,
            Value::Throwable(_) => ValueId::Throwable,
            Value::Null => ValueId::Null,
            Value::Invalid => ValueId::Invalid,
        }
    }

    /// Exception/throwable predicate.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Exception(_) | Value::Throwable(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionHandle> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ids() {
        assert_eq!(Value::Bool(true).id(), ValueId::Bool);
        assert_eq!(Value::Long(7).id(), ValueId::Long);
        assert_eq!(Value::Str("x".into()).id(), ValueId::String);
        assert_eq!(Value::Null.id(), ValueId::Null);
        assert_eq!(Value::Invalid.id(), ValueId::Invalid);
    }

    #[test]
    fn test_error_predicate() {
        let ex = Value::Exception(Exception::new("boom", ""));
        let th = Value::Throwable(Box::new(Value::Long(1)));
        assert!(ex.is_error());
        assert!(th.is_error());
        assert!(!Value::Null.is_error());
    }

    #[test]
    fn test_numeric_widening_accessors() {
        assert_eq!(Value::Int(3).as_long(), Some(3));
        assert_eq!(Value::Float(1.5).as_double(), Some(1.5));
        assert_eq!(Value::Str("no".into()).as_long(), None);
    }

    struct Doubler;

    impl Callable for Doubler {
        fn call(&self, args: &[Value]) -> BridgeResult<Value> {
            Ok(Value::Long(args[0].as_long().unwrap_or(0) * 2))
        }
    }

    #[test]
    fn test_function_handle_call() {
        let handle = FunctionHandle::new(Doubler);
        let result = handle.call(&[Value::Long(21)]).unwrap();
        assert_eq!(result, Value::Long(42));

        // Clones compare equal, fresh handles do not.
        assert_eq!(handle, handle.clone());
        assert_ne!(handle, FunctionHandle::new(Doubler));
    }
}
