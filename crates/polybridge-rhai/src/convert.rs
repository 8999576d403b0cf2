//! Bidirectional value marshaling between the host typed value model and
//! rhai's native `Dynamic` representation.
//!
//! Typed conversions follow the declared type id from the function's
//! signature; generic conversions (array elements, continuation results)
//! follow the runtime type of the guest value. Unsupported and unrecognized
//! kinds are a recoverable condition: they log and yield unit/null, never an
//! error.

use crate::function::{CallContext, GuestFunction};
use polybridge_core::{Exception, FunctionHandle, TypeDescriptor, Value, ValueId};
use rhai::{Array, Dynamic, EvalAltResult, FnPtr};
use tracing::{debug, error, warn};

/// Marshal one host argument into the guest by its declared type id.
pub(crate) fn to_dynamic_typed(declared: Option<&TypeDescriptor>, value: &Value) -> Dynamic {
    let Some(declared) = declared else {
        return to_dynamic(value);
    };

    match declared.id {
        ValueId::Bool => match value.as_bool() {
            Some(b) => Dynamic::from_bool(b),
            None => argument_mismatch(declared, value),
        },
        ValueId::Int | ValueId::Long => match value.as_long() {
            Some(i) => Dynamic::from_int(i),
            None => argument_mismatch(declared, value),
        },
        ValueId::Float | ValueId::Double => {
            match value.as_double().or_else(|| value.as_long().map(|i| i as f64)) {
                Some(f) => Dynamic::from_float(f),
                None => argument_mismatch(declared, value),
            }
        }
        ValueId::String => match value.as_str() {
            Some(s) => Dynamic::from(s.to_string()),
            None => argument_mismatch(declared, value),
        },
        ValueId::Array => match value.as_array() {
            Some(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
            None => argument_mismatch(declared, value),
        },
        // Known limitation of this backend: no native representation.
        ValueId::Ptr => {
            debug!("Pointer arguments are not supported by the rhai backend, passing unit");
            Dynamic::UNIT
        }
        ValueId::Function => {
            debug!("Function arguments are not supported host-to-guest, passing unit");
            Dynamic::UNIT
        }
        ValueId::Null => Dynamic::UNIT,
        other => {
            warn!("Unrecognized parameter type id {:?}, passing unit", other);
            Dynamic::UNIT
        }
    }
}

/// Marshal a host value into the guest by its own kind.
pub(crate) fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Int(i) => Dynamic::from_int(i64::from(*i)),
        Value::Long(l) => Dynamic::from_int(*l),
        Value::Float(f) => Dynamic::from_float(f64::from(*f)),
        Value::Double(d) => Dynamic::from_float(*d),
        Value::Str(s) => Dynamic::from(s.clone()),
        Value::Array(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
        // Rhai has no exception object; the message string is the closest
        // guest-visible shape.
        Value::Exception(ex) => Dynamic::from(ex.message.clone()),
        Value::Throwable(inner) => to_dynamic(inner),
        Value::Null | Value::Invalid => Dynamic::UNIT,
        Value::Ptr(_) | Value::Function(_) => {
            debug!("Value kind {:?} has no guest representation, passing unit", value.id());
            Dynamic::UNIT
        }
    }
}

/// Marshal a guest result back into the host by the declared return type id.
///
/// An absent return type yields null. An empty string yields null rather
/// than an empty-string value.
pub(crate) fn from_dynamic_typed(
    declared: Option<&TypeDescriptor>,
    native: Dynamic,
    ctx: &CallContext,
) -> Value {
    let Some(declared) = declared else {
        return Value::Null;
    };

    match declared.id {
        ValueId::Bool => match native.as_bool() {
            Ok(b) => Value::Bool(b),
            Err(_) => result_mismatch(declared, &native),
        },
        ValueId::Int => match integer(&native) {
            Some(i) => Value::Int(i as i32),
            None => result_mismatch(declared, &native),
        },
        ValueId::Long => match integer(&native) {
            Some(i) => Value::Long(i),
            None => result_mismatch(declared, &native),
        },
        ValueId::Float => match number(&native) {
            Some(f) => Value::Float(f as f32),
            None => result_mismatch(declared, &native),
        },
        ValueId::Double => match number(&native) {
            Some(f) => Value::Double(f),
            None => result_mismatch(declared, &native),
        },
        ValueId::String => {
            let s = match native.clone().into_string() {
                Ok(s) => s,
                Err(_) => native.to_string(),
            };
            if s.is_empty() {
                Value::Null
            } else {
                Value::Str(s)
            }
        }
        ValueId::Array => match native.try_cast::<Array>() {
            Some(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| from_dynamic(item, ctx))
                    .collect(),
            ),
            None => {
                warn!(
                    "Result does not convert to declared '{}', yielding null",
                    declared.name
                );
                Value::Null
            }
        },
        ValueId::Function => match native.try_cast::<FnPtr>() {
            Some(fn_ptr) => Value::Function(FunctionHandle::new(GuestFunction {
                ctx: ctx.clone(),
                fn_ptr,
            })),
            None => {
                warn!(
                    "Result does not convert to declared '{}', yielding null",
                    declared.name
                );
                Value::Null
            }
        },
        ValueId::Ptr => {
            debug!("Pointer results are not supported by the rhai backend, yielding null");
            Value::Null
        }
        ValueId::Null => Value::Null,
        other => {
            error!("Unrecognized return type id {:?}", other);
            Value::Null
        }
    }
}

/// Marshal a guest value into the host by its runtime type.
pub(crate) fn from_dynamic(native: Dynamic, ctx: &CallContext) -> Value {
    if native.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = native.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = native.as_int() {
        return Value::Long(i);
    }
    if let Ok(f) = native.as_float() {
        return Value::Double(f);
    }
    if let Ok(s) = native.clone().into_string() {
        return Value::Str(s);
    }
    if let Some(items) = native.clone().try_cast::<Array>() {
        return Value::Array(
            items
                .into_iter()
                .map(|item| from_dynamic(item, ctx))
                .collect(),
        );
    }
    if let Some(fn_ptr) = native.try_cast::<FnPtr>() {
        return Value::Function(FunctionHandle::new(GuestFunction {
            ctx: ctx.clone(),
            fn_ptr,
        }));
    }

    debug!("Guest value has no host counterpart, yielding null");
    Value::Null
}

/// Convert an engine-level call failure into a host error value.
///
/// A guest `throw` becomes a throwable wrapping the thrown payload; any
/// other engine failure becomes an exception carrying message and position.
pub(crate) fn error_to_value(err: Box<EvalAltResult>, ctx: &CallContext) -> Value {
    match *err {
        EvalAltResult::ErrorRuntime(payload, _pos) => {
            Value::Throwable(Box::new(from_dynamic(payload, ctx)))
        }
        other => {
            let position = other.position();
            Value::Exception(Exception::new(other.to_string(), format!("at {position}")))
        }
    }
}

fn integer(native: &Dynamic) -> Option<i64> {
    native
        .as_int()
        .ok()
        .or_else(|| native.as_float().ok().map(|f| f as i64))
}

fn number(native: &Dynamic) -> Option<f64> {
    native
        .as_float()
        .ok()
        .or_else(|| native.as_int().ok().map(|i| i as f64))
}

fn argument_mismatch(declared: &TypeDescriptor, value: &Value) -> Dynamic {
    warn!(
        "Argument of kind {:?} does not match declared type '{}', passing unit",
        value.id(),
        declared.name
    );
    Dynamic::UNIT
}

fn result_mismatch(declared: &TypeDescriptor, native: &Dynamic) -> Value {
    warn!(
        "Result of type '{}' does not convert to declared '{}', yielding null",
        native.type_name(),
        declared.name
    );
    Value::Null
}
