//! Debugger events seen through the bridge

use std::sync::Arc;

use parking_lot::Mutex;
use tether_bridge::{BridgeError, DebugCommand, DebugListener, HostObject, HostValue, SourcePosition};

use super::harness::*;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl DebugListener for Recorder {
    fn source_parsed(&self, _source_id: u64, source_url: Option<&str>) {
        self.events
            .lock()
            .push(format!("parsed {}", source_url.unwrap_or("-")));
    }

    fn breakpoint_hit(&self, position: SourcePosition) -> DebugCommand {
        self.events.lock().push(format!("break {}", position.line));
        DebugCommand::Continue
    }

    fn exception_hit(&self, position: Option<SourcePosition>, error: &BridgeError) -> DebugCommand {
        let at = position.map_or("host".to_string(), |p| p.line.to_string());
        self.events.lock().push(format!("exception {} {}", at, error));
        DebugCommand::Continue
    }
}

#[test]
fn test_breakpoint_by_url() {
    let bridge = bridge();
    let recorder = Arc::new(Recorder::default());
    let adapter = bridge.set_debugger(recorder.clone());
    adapter.break_at("main.js", 2);

    bridge
        .evaluate_named("var a = 1;\nvar b = 2;\na + b", "main.js")
        .unwrap();
    bridge.evaluate_named("var c = 1;\nvar d = 2;", "other.js").unwrap();

    assert_eq!(
        recorder.events(),
        vec!["parsed main.js", "break 2", "parsed other.js"]
    );
    assert_eq!(adapter.source_url(1).as_deref(), Some("main.js"));
}

#[test]
fn test_debugger_statement() {
    let bridge = bridge();
    let recorder = Arc::new(Recorder::default());
    bridge.set_debugger(recorder.clone());

    bridge.evaluate("var a = 1;\ndebugger;").unwrap();
    assert_eq!(recorder.events(), vec!["parsed -", "break 2"]);
}

#[test]
fn test_syntax_error_parses_nothing() {
    let bridge = bridge();
    let recorder = Arc::new(Recorder::default());
    bridge.set_debugger(recorder.clone());

    assert!(bridge.evaluate("var = ;").is_err());
    assert!(recorder.events().is_empty());
}

#[test]
fn test_host_failure_reported_once() {
    let bridge = bridge();
    bridge
        .expose("sensor", &HostValue::Object(HostObject::new(Sensor::offline())))
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    bridge.set_debugger(recorder.clone());

    bridge
        .evaluate_named("try { sensor.broken } catch (e) {}", "main.js")
        .unwrap();
    assert_eq!(
        recorder.events(),
        vec!["parsed main.js", "exception host sensor offline"]
    );
}

#[test]
fn test_rethrown_host_failure_reported_with_position() {
    let bridge = bridge();
    bridge
        .expose("sensor", &HostValue::Object(HostObject::new(Sensor::offline())))
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    bridge.set_debugger(recorder.clone());

    let result = bridge.evaluate_named("try { sensor.broken } catch (e) {\n  throw e;\n}", "main.js");
    assert!(matches!(result, Err(BridgeError::Host(_))));
    assert_eq!(
        recorder.events(),
        vec![
            "parsed main.js",
            "exception host sensor offline",
            "exception 2 sensor offline",
        ]
    );
}

#[test]
fn test_script_exception_reported() {
    let bridge = bridge();
    let recorder = Arc::new(Recorder::default());
    bridge.set_debugger(recorder.clone());

    assert!(bridge.evaluate("throw 'x'").is_err());
    assert_eq!(
        recorder.events(),
        vec!["parsed -", "exception 1 Uncaught exception: x"]
    );
}
