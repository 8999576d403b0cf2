//! The interactive command loop.
//!
//! Two load units cooperate: the repl unit supplies `initialize`, `evaluate`
//! and `close`, the cli unit supplies the command implementations. Each
//! iteration invokes `evaluate` on a producer thread and blocks on the
//! rendezvous slot until it accepts (tokens plus a continuation) or rejects.

use crate::rendezvous::RendezvousSlot;
use polybridge_core::{
    BridgeError, BridgeResult, BridgedFunction, Exception, FunctionDescriptor, LoadUnit, Value,
};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Signature report produced by the builtin `inspect` command.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub repl: Vec<FunctionDescriptor>,
    pub cli: Vec<FunctionDescriptor>,
}

/// Drives the repl unit's evaluate/continuation protocol against the cli
/// unit's command table.
pub struct CommandLoop {
    repl: Box<dyn LoadUnit>,
    cli: Box<dyn LoadUnit>,
    slot: Arc<RendezvousSlot>,
}

impl CommandLoop {
    /// Wire two discovered units together and register the builtin
    /// commands (`exit`, `inspect`) into the cli unit.
    pub fn new(repl: Box<dyn LoadUnit>, mut cli: Box<dyn LoadUnit>) -> BridgeResult<Self> {
        let slot = Arc::new(RendezvousSlot::new());

        // Snapshot of the guest functions only, taken before the builtins
        // join the table.
        let report = InspectReport {
            repl: repl.functions().iter().map(|f| f.describe()).collect(),
            cli: cli.functions().iter().map(|f| f.describe()).collect(),
        };

        let exit_slot = Arc::clone(&slot);
        cli.register(BridgedFunction::host("exit", 0, move |_| {
            exit_slot.request_exit();
            Ok(Value::Null)
        }))?;

        cli.register(BridgedFunction::host("inspect", 0, move |_| {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => Ok(Value::Str(json)),
                Err(err) => Ok(Value::Exception(Exception::new(
                    format!("inspection report failed to serialize: {err}"),
                    String::new(),
                ))),
            }
        }))?;

        Ok(Self { repl, cli, slot })
    }

    /// The rendezvous slot, shared with producer threads.
    pub fn slot(&self) -> Arc<RendezvousSlot> {
        Arc::clone(&self.slot)
    }

    /// Run iterations until the repl rejects or a command requests exit.
    pub fn run(&mut self) -> BridgeResult<()> {
        if let Some(initialize) = self.repl.function("initialize") {
            match initialize.invoke(&[]) {
                Ok(value) => check_for_exception(&value),
                Err(err) => warn!("initialize failed: {}", err),
            }
        }

        let evaluate = self
            .repl
            .function("evaluate")
            .ok_or_else(|| BridgeError::FunctionNotFound("evaluate".to_string()))?;

        while !self.slot.is_terminated() {
            let producer = {
                let slot = Arc::clone(&self.slot);
                let evaluate = Arc::clone(&evaluate);
                thread::spawn(move || match evaluate.invoke(&[]) {
                    Ok(value) if value.is_error() => slot.reject(value),
                    Ok(value) => slot.accept(value),
                    Err(err) => slot.reject(Value::Exception(Exception::new(
                        err.to_string(),
                        String::new(),
                    ))),
                })
            };

            let (value, rejected) = self.slot.wait();
            let _ = producer.join();

            if rejected {
                check_for_exception(&value);
                break;
            }

            self.step(value);
        }

        if let Some(close) = self.repl.function("close") {
            match close.invoke(&[]) {
                Ok(value) => check_for_exception(&value),
                Err(err) => warn!("close failed: {}", err),
            }
        }

        Ok(())
    }

    /// Process one accepted evaluate result: `[tokens, continuation]`.
    fn step(&mut self, value: Value) {
        let (tokens, continuation) = match value {
            Value::Array(mut items) if items.len() == 2 => {
                let continuation = items.pop().unwrap_or(Value::Null);
                let tokens = items.pop().unwrap_or(Value::Null);
                (tokens, continuation)
            }
            other => {
                warn!("evaluate produced {:?}, expected a token/continuation pair", other.id());
                return;
            }
        };

        let Value::Function(continuation) = continuation else {
            warn!("evaluate produced a non-callable continuation, skipping iteration");
            return;
        };

        let (error_arg, result_arg) = if tokens.is_error() {
            (tokens, Value::Null)
        } else {
            let result = match tokens {
                Value::Array(tokens) => self.execute(tokens),
                other => other,
            };
            let result = match result {
                Value::Invalid => Value::Null,
                other => other,
            };
            (Value::Null, result)
        };

        match continuation.call(&[error_arg, result_arg]) {
            Ok(value) => check_for_exception(&value),
            Err(err) => warn!("continuation failed: {}", err),
        }
    }

    /// Dispatch a tokenized command line against the cli unit.
    ///
    /// The first token is the command key, the rest are positional
    /// arguments. Failures surface as exception values so the continuation
    /// always runs.
    fn execute(&mut self, tokens: Vec<Value>) -> Value {
        let mut tokens = tokens.into_iter();
        let Some(key) = tokens.next() else {
            return Value::Null;
        };
        let Value::Str(key) = key else {
            return Value::Exception(Exception::new(
                "command key is not a string".to_string(),
                String::new(),
            ));
        };
        let Some(command) = self.cli.function(&key) else {
            return Value::Exception(Exception::new(
                format!("unknown command '{key}'"),
                String::new(),
            ));
        };

        let mut args: Vec<Value> = tokens.collect();
        if args.len() > command.arity() {
            warn!(
                "command '{}' takes {} argument(s), ignoring {} extra",
                key,
                command.arity(),
                args.len() - command.arity()
            );
            args.truncate(command.arity());
        }

        debug!("Executing command '{}' with {} argument(s)", key, args.len());
        match command.invoke(&args) {
            Ok(value) => value,
            Err(err) => Value::Exception(Exception::new(err.to_string(), String::new())),
        }
    }
}

/// Print an exception or throwable value for the operator and move on.
pub fn check_for_exception(value: &Value) {
    match value {
        Value::Exception(ex) => print_exception(ex),
        Value::Throwable(inner) => match inner.as_ref() {
            Value::Exception(ex) => print_exception(ex),
            Value::Str(message) => eprintln!("Uncaught: {message}"),
            other => eprintln!("Uncaught: {other:?}"),
        },
        _ => {}
    }
}

fn print_exception(ex: &Exception) {
    eprintln!("Exception: {}", ex.message);
    if !ex.stacktrace.is_empty() {
        eprintln!("{}", ex.stacktrace);
    }
}
