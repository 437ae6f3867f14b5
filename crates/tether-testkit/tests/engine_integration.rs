//! End-to-end tests of the engine double through the `ScriptEngine` trait

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tether_sdk::{
    CallbackResult, ClassDefinition, DateFields, DebugCommand, DebuggerChannel, EngineError, NoopCallbacks,
    ObjectCallbacks, ObjectHandle, PropertyAttributes, ReferenceId, ScriptEngine, ScriptValue,
    SourcePosition,
};
use tether_testkit::{EngineOptions, TestEngine};

fn eval(engine: &TestEngine, source: &str) -> ScriptValue {
    engine.evaluate(source, None).expect("evaluation failed")
}

fn thrown_message(engine: &TestEngine, source: &str) -> String {
    let thrown = engine.evaluate(source, None).expect_err("expected a throw");
    engine.to_display_string(&thrown)
}

#[test]
fn test_arithmetic_and_strings() {
    let engine = TestEngine::new();
    assert_eq!(eval(&engine, "1 + 2 * 3"), ScriptValue::Number(7.0));
    assert_eq!(eval(&engine, "'hi ' + 'Ann'"), ScriptValue::String("hi Ann".into()));
    assert_eq!(eval(&engine, "'n=' + 1.5"), ScriptValue::String("n=1.5".into()));
    assert_eq!(eval(&engine, "typeof null"), ScriptValue::String("object".into()));
    assert_eq!(eval(&engine, "typeof missing"), ScriptValue::String("undefined".into()));
    assert_eq!(eval(&engine, "null == undefined"), ScriptValue::Bool(true));
    assert_eq!(eval(&engine, "NaN === NaN"), ScriptValue::Bool(false));
}

#[test]
fn test_functions_and_closures() {
    let engine = TestEngine::new();
    let source = r#"
        function counter() {
            var n = 0;
            return function () { n = n + 1; return n; };
        }
        var next = counter();
        next();
        next();
    "#;
    assert_eq!(eval(&engine, source), ScriptValue::Number(2.0));
}

#[test]
fn test_arrays() {
    let engine = TestEngine::new();
    assert_eq!(eval(&engine, "var a = [1, 2]; a.push(3); a.length"), ScriptValue::Number(3.0));
    assert_eq!(eval(&engine, "a.join('-')"), ScriptValue::String("1-2-3".into()));
    assert_eq!(eval(&engine, "a.pop() + a[0]"), ScriptValue::Number(4.0));
    assert_eq!(eval(&engine, "String(a)"), ScriptValue::String("1,2".into()));
}

#[test]
fn test_dates() {
    let engine = TestEngine::new();
    let source = "var d = new Date(2021, 11, 31, 23, 59, 58); \
                  [d.getFullYear(), d.getMonth(), d.getDate(), d.getHours(), d.getMinutes(), d.getSeconds()].join(',')";
    assert_eq!(eval(&engine, source), ScriptValue::String("2021,11,31,23,59,58".into()));
    assert_eq!(eval(&engine, "isNaN(new Date(NaN).getMonth())"), ScriptValue::Bool(true));
}

#[test]
fn test_try_catch_and_errors() {
    let engine = TestEngine::new();
    let source = "try { throw new Error('boom') } catch (e) { e.message }";
    assert_eq!(eval(&engine, source), ScriptValue::String("boom".into()));
    assert_eq!(thrown_message(&engine, "missing + 1"), "ReferenceError: missing is not defined");
    assert_eq!(thrown_message(&engine, "null.x"), "TypeError: Cannot read property 'x' of null");
    assert_eq!(thrown_message(&engine, "throw 'plain'"), "plain");
}

#[test]
fn test_syntax_errors_are_thrown_before_running() {
    let engine = TestEngine::new();
    let thrown = engine.check_syntax("var x = ;").unwrap_err();
    assert!(engine.to_display_string(&thrown).starts_with("SyntaxError: "));

    assert!(engine.evaluate("ran = true; var = 1", None).is_err());
    assert_eq!(engine.global("ran"), None);
}

#[test]
fn test_compile_function() {
    let engine = TestEngine::new();
    let function = engine
        .compile_function("sum", &["a".to_string(), "b".to_string()], "return a + b")
        .unwrap();
    let result = engine
        .call_function(function, &ScriptValue::Undefined, &[1.into(), 2.into()])
        .unwrap();
    assert_eq!(result, ScriptValue::Number(3.0));
}

#[test]
fn test_stack_trace() {
    let engine = TestEngine::new();
    let source = "function inner() { return new Error('x').stack }\ninner()";
    let stack = eval_with_url(&engine, source, "test.js");
    assert_eq!(
        stack,
        ScriptValue::String("inner@test.js:1\nglobal code@test.js:2".into())
    );
    let engine = TestEngine::new();
    assert!(engine.evaluate(source, Some("test.js")).is_ok());
    assert_eq!(engine.stack_trace(), "");
}

// ============================================================================
// Host classes
// ============================================================================

/// Callbacks exposing a single read-only `answer` property and counting
/// finalizations
#[derive(Default)]
struct AnswerCallbacks {
    finalized: Mutex<Vec<ReferenceId>>,
    finalize_threads: Mutex<Vec<std::thread::ThreadId>>,
}

impl ObjectCallbacks for AnswerCallbacks {
    fn has_property(&self, _engine: &dyn ScriptEngine, _object: ObjectHandle, name: &str) -> bool {
        name == "answer"
    }

    fn get_property(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
    ) -> CallbackResult<Option<ScriptValue>> {
        match name {
            "answer" => Ok(Some(ScriptValue::Number(42.0))),
            "slot" => Ok(engine
                .private_slot(object)
                .map(|id| ScriptValue::Number(id.index() as f64))),
            "boom" => Err(ScriptValue::String("getter failed".into())),
            _ => Ok(None),
        }
    }

    fn set_property(
        &self,
        _engine: &dyn ScriptEngine,
        _object: ObjectHandle,
        name: &str,
        _value: &ScriptValue,
    ) -> CallbackResult<bool> {
        Ok(name == "answer")
    }

    fn call_as_function(
        &self,
        _engine: &dyn ScriptEngine,
        _function: ObjectHandle,
        _this: &ScriptValue,
        args: &[ScriptValue],
    ) -> CallbackResult<ScriptValue> {
        Ok(ScriptValue::Number(args.len() as f64))
    }

    fn call_as_constructor(
        &self,
        engine: &dyn ScriptEngine,
        constructor: ObjectHandle,
        args: &[ScriptValue],
    ) -> CallbackResult<Option<ObjectHandle>> {
        let name = engine.get_property(constructor, "name")?;
        assert_eq!(name, ScriptValue::String("Answer".into()));
        if args.is_empty() {
            return Ok(None);
        }
        let class = tether_sdk::ClassHandle::from_raw(0);
        Ok(engine.make_proxy(class, ReferenceId::new(7, 1)).ok())
    }

    fn finalize(&self, id: ReferenceId) {
        self.finalized.lock().push(id);
        self.finalize_threads.lock().push(std::thread::current().id());
    }
}

#[test]
fn test_host_class_round_trip() {
    let engine = TestEngine::new();
    let callbacks = Arc::new(AnswerCallbacks::default());
    engine
        .define_class(&ClassDefinition::new("Answer"), callbacks.clone())
        .unwrap();

    assert_eq!(eval(&engine, "var a = new Answer(1); a.answer"), ScriptValue::Number(42.0));
    assert_eq!(eval(&engine, "a.slot"), ScriptValue::Number(7.0));
    assert_eq!(eval(&engine, "'answer' in a"), ScriptValue::Bool(true));
    assert_eq!(eval(&engine, "a.answer = 1; a.answer"), ScriptValue::Number(42.0));
    assert_eq!(eval(&engine, "a.other = 5; a.other"), ScriptValue::Number(5.0));
    assert_eq!(thrown_message(&engine, "a.boom"), "getter failed");
    assert_eq!(
        thrown_message(&engine, "new Answer()"),
        "TypeError: Failed to construct 'Answer'"
    );
    assert_eq!(
        thrown_message(&engine, "Answer(1)"),
        "TypeError: Class constructor Answer cannot be invoked without 'new'"
    );
}

#[test]
fn test_host_callable() {
    let engine = TestEngine::new();
    let class = engine
        .define_class(&ClassDefinition::internal("Fn"), Arc::new(AnswerCallbacks::default()))
        .unwrap();
    assert_eq!(engine.global("Fn"), None);

    let function = engine.make_callable(class).unwrap();
    engine
        .set_property(function, "selector", "count".into(), PropertyAttributes::HIDDEN)
        .unwrap();
    engine.set_global("f", ScriptValue::Object(function)).unwrap();

    assert_eq!(eval(&engine, "f(1, 2, 3)"), ScriptValue::Number(3.0));
    assert_eq!(eval(&engine, "f.selector = 'x'; f.selector"), ScriptValue::String("count".into()));
    assert_eq!(eval(&engine, "typeof f"), ScriptValue::String("function".into()));
}

#[test]
fn test_duplicate_class_rejected() {
    let engine = TestEngine::new();
    engine
        .define_class(&ClassDefinition::new("Twice"), Arc::new(NoopCallbacks))
        .unwrap();
    assert!(engine
        .define_class(&ClassDefinition::new("Twice"), Arc::new(NoopCallbacks))
        .is_err());
}

#[test]
fn test_collection_finalizes_unreachable_proxies_on_another_thread() {
    let engine = TestEngine::new();
    let callbacks = Arc::new(AnswerCallbacks::default());
    engine
        .define_class(&ClassDefinition::new("Answer"), callbacks.clone())
        .unwrap();

    eval(&engine, "var kept = new Answer(1); new Answer(2).answer");
    engine.collect_garbage();
    assert_eq!(callbacks.finalized.lock().len(), 1);
    assert_ne!(callbacks.finalize_threads.lock()[0], std::thread::current().id());

    eval(&engine, "kept = null");
    engine.collect_garbage();
    assert_eq!(callbacks.finalized.lock().len(), 2);

    engine.collect_garbage();
    assert_eq!(callbacks.finalized.lock().len(), 2);
    assert_eq!(engine.gc_stats().collections, 3);
}

#[test]
fn test_inline_finalization() {
    let engine = TestEngine::with_options(EngineOptions {
        finalize_on_thread: false,
        ..EngineOptions::default()
    });
    let callbacks = Arc::new(AnswerCallbacks::default());
    engine
        .define_class(&ClassDefinition::new("Answer"), callbacks.clone())
        .unwrap();
    eval(&engine, "new Answer(1)");
    engine.collect_garbage();
    assert_eq!(callbacks.finalize_threads.lock()[0], std::thread::current().id());
}

#[test]
fn test_make_date_and_error() {
    let engine = TestEngine::new();
    let date = engine
        .make_date(DateFields {
            year: 1999.0,
            month: 0.0,
            day: 2.0,
            hour: 3.0,
            minute: 4.0,
            second: 5.0,
        })
        .unwrap();
    engine.set_global("d", ScriptValue::Object(date)).unwrap();
    assert_eq!(eval(&engine, "d.getFullYear() * 100 + d.getMonth()"), ScriptValue::Number(199900.0));

    let error = engine.make_error("bad").unwrap();
    assert_eq!(engine.to_display_string(&ScriptValue::Object(error)), "Error: bad");
}

#[test]
fn test_refused_errors() {
    let engine = TestEngine::with_options(EngineOptions {
        refuse_errors: true,
        ..EngineOptions::default()
    });
    assert_eq!(
        engine.make_error("bad"),
        Err(EngineError::Unsupported("make_error".to_string()))
    );
    assert_eq!(eval(&engine, "String(new Error('bad'))"), ScriptValue::from("Error: bad"));
}

// ============================================================================
// Debugger
// ============================================================================

#[derive(Default)]
struct RecordingChannel {
    events: Mutex<Vec<String>>,
}

impl DebuggerChannel for RecordingChannel {
    fn source_parsed(&self, source_id: u64, source_url: Option<&str>) {
        self.events
            .lock()
            .push(format!("parsed {} {}", source_id, source_url.unwrap_or("-")));
    }

    fn is_breakpoint(&self, position: &SourcePosition) -> bool {
        position.line == 4
    }

    fn breakpoint_hit(&self, position: SourcePosition) -> DebugCommand {
        self.events.lock().push(format!("break {}", position.line));
        DebugCommand::StepOver
    }

    fn exception_hit(
        &self,
        engine: &dyn ScriptEngine,
        position: SourcePosition,
        exception: &ScriptValue,
    ) -> DebugCommand {
        self.events.lock().push(format!(
            "exception {} {}",
            position.line,
            engine.to_display_string(exception)
        ));
        DebugCommand::Continue
    }

    fn step_hit(&self, position: SourcePosition) -> DebugCommand {
        self.events.lock().push(format!("step {}", position.line));
        DebugCommand::Continue
    }
}

#[test]
fn test_debugger_events() {
    let engine = TestEngine::new();
    let channel = Arc::new(RecordingChannel::default());
    engine.attach_debugger(channel.clone());

    let source = "var a = 1;\ndebugger;\na = 2;\na = 3;\ntry { throw 'x' } catch (e) {}";
    eval_with_url(&engine, source, "main.js");

    assert_eq!(
        *channel.events.lock(),
        vec![
            "parsed 1 main.js".to_string(),
            "break 2".to_string(),
            "step 3".to_string(),
            "break 4".to_string(),
            "step 5".to_string(),
            "exception 5 x".to_string(),
        ]
    );
}

fn eval_with_url(engine: &TestEngine, source: &str, url: &str) -> ScriptValue {
    engine.evaluate(source, Some(url)).expect("evaluation failed")
}
