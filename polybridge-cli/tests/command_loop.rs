//! Command-loop scenarios driven by stub load units, so the protocol is
//! testable without a terminal attached.

use polybridge_cli::{CommandLoop, RendezvousSlot};
use polybridge_core::{
    BridgeError, BridgeResult, BridgedFunction, Callable, Exception, FunctionHandle, LoadUnit,
    Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct StubUnit {
    name: &'static str,
    functions: HashMap<String, Arc<BridgedFunction>>,
}

impl StubUnit {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            functions: HashMap::new(),
        }
    }
}

impl LoadUnit for StubUnit {
    fn name(&self) -> &str {
        self.name
    }

    fn discover(&mut self) -> BridgeResult<()> {
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
        self.functions.clear();
    }
}

/// Continuation that records every `(error, result)` pair it receives.
struct Recorder {
    calls: Arc<Mutex<Vec<(Value, Value)>>>,
}

impl Callable for Recorder {
    fn call(&self, args: &[Value]) -> BridgeResult<Value> {
        assert_eq!(args.len(), 2);
        self.calls
            .lock()
            .unwrap()
            .push((args[0].clone(), args[1].clone()));
        Ok(Value::Null)
    }
}

type Calls = Arc<Mutex<Vec<(Value, Value)>>>;

/// Build a repl stub whose `evaluate` yields each scripted token value in
/// turn, paired with a recording continuation.
fn scripted_repl(scripts: Vec<Value>) -> (StubUnit, Calls, Arc<AtomicBool>) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let continuation = FunctionHandle::from_arc(Arc::new(Recorder {
        calls: Arc::clone(&calls),
    }));

    let mut repl = StubUnit::new("repl");
    let step = AtomicUsize::new(0);
    repl.register(BridgedFunction::host("evaluate", 0, move |_| {
        let index = step.fetch_add(1, Ordering::SeqCst);
        match scripts.get(index) {
            Some(tokens) => Ok(Value::Array(vec![
                tokens.clone(),
                Value::Function(continuation.clone()),
            ])),
            None => Ok(Value::Exception(Exception::new(
                "script exhausted".to_string(),
                String::new(),
            ))),
        }
    }))
    .unwrap();

    let closed = Arc::new(AtomicBool::new(false));
    let closed_flag = Arc::clone(&closed);
    repl.register(BridgedFunction::host("close", 0, move |_| {
        closed_flag.store(true, Ordering::SeqCst);
        Ok(Value::Null)
    }))
    .unwrap();

    (repl, calls, closed)
}

fn greeting_cli() -> StubUnit {
    let mut cli = StubUnit::new("cli");
    cli.register(BridgedFunction::host("greet", 0, |_| {
        Ok(Value::Str("hello".into()))
    }))
    .unwrap();
    cli
}

fn tokens(words: &[&str]) -> Value {
    Value::Array(words.iter().map(|w| Value::Str((*w).into())).collect())
}

#[test]
fn test_exit_command_terminates_loop() {
    let (repl, calls, closed) = scripted_repl(vec![tokens(&["greet"]), tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    assert!(command_loop.slot().is_terminated());
    assert!(closed.load(Ordering::SeqCst));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (Value::Null, Value::Str("hello".into())));
    assert_eq!(calls[1], (Value::Null, Value::Null));
}

#[test]
fn test_reject_terminates_loop() {
    // No scripts: the very first evaluate yields an error value, which
    // fires the reject continuation.
    let (repl, calls, closed) = scripted_repl(vec![]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    assert!(calls.lock().unwrap().is_empty());
    assert!(closed.load(Ordering::SeqCst));
    assert!(command_loop.slot().is_terminated());
}

#[test]
fn test_unknown_command_yields_exception_result() {
    let (repl, calls, _) = scripted_repl(vec![tokens(&["frobnicate"]), tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].0, Value::Null);
    match &calls[0].1 {
        Value::Exception(ex) => assert!(ex.message.contains("frobnicate")),
        other => panic!("expected exception, got {other:?}"),
    }
}

#[test]
fn test_empty_token_list_yields_null() {
    let (repl, calls, _) = scripted_repl(vec![tokens(&[]), tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    assert_eq!(calls.lock().unwrap()[0], (Value::Null, Value::Null));
}

#[test]
fn test_non_sequence_tokens_pass_through() {
    let (repl, calls, _) =
        scripted_repl(vec![Value::Str("raw text".into()), tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    assert_eq!(
        calls.lock().unwrap()[0],
        (Value::Null, Value::Str("raw text".into()))
    );
}

#[test]
fn test_error_tokens_reach_continuation_as_error() {
    let boom = Value::Exception(Exception::new("parse failed".to_string(), String::new()));
    let (repl, calls, _) = scripted_repl(vec![boom, tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    let calls = calls.lock().unwrap();
    match &calls[0].0 {
        Value::Exception(ex) => assert_eq!(ex.message, "parse failed"),
        other => panic!("expected exception, got {other:?}"),
    }
    assert_eq!(calls[0].1, Value::Null);
}

#[test]
fn test_extra_arguments_are_truncated() {
    let (repl, calls, _) = scripted_repl(vec![
        tokens(&["greet", "spurious", "arguments"]),
        tokens(&["exit"]),
    ]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    assert_eq!(
        calls.lock().unwrap()[0],
        (Value::Null, Value::Str("hello".into()))
    );
}

#[test]
fn test_missing_evaluate_is_function_not_found() {
    let repl = StubUnit::new("repl");
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    let err = command_loop.run().unwrap_err();
    assert!(matches!(err, BridgeError::FunctionNotFound(_)));
}

#[test]
fn test_inspect_reports_both_units() {
    let (repl, calls, _) = scripted_repl(vec![tokens(&["inspect"]), tokens(&["exit"])]);
    let mut command_loop = CommandLoop::new(Box::new(repl), Box::new(greeting_cli())).unwrap();

    command_loop.run().unwrap();

    let calls = calls.lock().unwrap();
    let json = match &calls[0].1 {
        Value::Str(json) => json.clone(),
        other => panic!("expected report string, got {other:?}"),
    };

    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    let repl_names: Vec<&str> = report["repl"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    let cli_names: Vec<&str> = report["cli"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();

    assert!(repl_names.contains(&"evaluate"));
    assert_eq!(cli_names, vec!["greet"]);
}

#[test]
fn test_rendezvous_stress_no_missed_or_duplicate_wakeups() {
    let slot = Arc::new(RendezvousSlot::new());

    for i in 0..300_i64 {
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                // Vary the interleaving: sometimes the producer delivers
                // before the consumer starts waiting, sometimes after.
                thread::sleep(Duration::from_micros((i % 5) as u64 * 200));
                slot.accept(Value::Long(i));
            })
        };

        let (value, rejected) = slot.wait();
        producer.join().unwrap();

        assert_eq!(value, Value::Long(i));
        assert!(!rejected);
    }
}
