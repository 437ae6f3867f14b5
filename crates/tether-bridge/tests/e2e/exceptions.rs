//! Failures crossing the boundary in both directions

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::harness::*;
use pretty_assertions::assert_eq;
use tether_bridge::{BridgeError, HostFailure, HostObject, HostValue};
use tether_sdk::EngineError;
use tether_testkit::{EngineOptions, TestEngine};

fn expose_sensor(bridge: &tether_bridge::Bridge<TestEngine>) -> Sensor {
    let sensor = Sensor::offline();
    let exposed = Sensor {
        failure: sensor.failure.clone(),
    };
    bridge
        .expose("sensor", &HostValue::Object(HostObject::new(exposed)))
        .unwrap();
    sensor
}

// ============================================================================
// Host -> script -> host
// ============================================================================

#[test]
fn test_getter_failure_keeps_identity() {
    let bridge = bridge();
    let sensor = expose_sensor(&bridge);

    let exception = host_failure(&bridge, "sensor.broken");
    assert!(exception.ptr_eq(&sensor.failure));
    assert_eq!(exception.to_string(), "sensor offline");
}

#[test]
fn test_failure_rethrown_by_script_keeps_identity() {
    let bridge = bridge();
    let sensor = expose_sensor(&bridge);

    let source = "function read() { return sensor.broken; }\ntry { read() } catch (e) { throw e }";
    let exception = host_failure(&bridge, source);
    assert!(exception.ptr_eq(&sensor.failure));
}

#[test]
fn test_script_catches_host_failure() {
    let bridge = bridge();
    expose_sensor(&bridge);

    assert_eq!(
        eval(&bridge, "var m; try { sensor.broken } catch (e) { m = e.message } m"),
        HostValue::from("sensor offline")
    );
    assert_eq!(
        eval(&bridge, "var s; try { sensor.broken } catch (e) { s = String(e) } s"),
        HostValue::from("Error: sensor offline")
    );
}

#[test]
fn test_failure_inside_script_function_called_by_host() {
    let bridge = bridge();
    let sensor = expose_sensor(&bridge);
    let result = bridge.evaluate_with_parameters("return s.broken;", &["s"], &[HostValue::Null]);
    assert!(matches!(result, Err(BridgeError::Script(_))));

    let source = HostValue::Object(HostObject::new(Sensor {
        failure: sensor.failure.clone(),
    }));
    match bridge.evaluate_with_parameters("return s.broken;", &["s"], &[source]) {
        Err(BridgeError::Host(exception)) => assert!(exception.ptr_eq(&sensor.failure)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_script_cannot_impersonate_host_failure() {
    let bridge = bridge();
    expose_sensor(&bridge);

    let source = "try { sensor.broken } catch (e) {}\nvar o = {}; o.__hostException = 1; throw o";
    match bridge.evaluate(source) {
        Err(BridgeError::Script(exception)) => assert_eq!(exception.message, "[object Object]"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_failure_while_bridging_takes_precedence() {
    let engine = TestEngine::with_options(EngineOptions {
        refuse_errors: true,
        ..EngineOptions::default()
    });
    let bridge = bridge_with(engine, Arc::new(AtomicUsize::new(0)));
    let sensor = expose_sensor(&bridge);

    let exception = host_failure(&bridge, "var m; try { sensor.broken } catch (e) { m = e } m");
    assert!(!exception.ptr_eq(&sensor.failure));
    assert!(matches!(
        exception.failure(),
        HostFailure::Engine(EngineError::Unsupported(_))
    ));

    // The script caught the bare message and the next evaluation starts clean
    assert_eq!(eval(&bridge, "m"), HostValue::from("sensor offline"));
    assert_eq!(eval(&bridge, "1 + 1"), HostValue::Number(2.0));
}

// ============================================================================
// Argument validation
// ============================================================================

#[test]
fn test_missing_constructor_parameter() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "new Point(1)");
    assert!(matches!(exception.failure(), HostFailure::ParamRequired { .. }));
    assert_eq!(
        exception.to_string(),
        "Parameter 'y' of method '<constructor>' from 'Point' is required"
    );

    let exception = host_failure(&bridge, "new Point(1, null)");
    assert!(matches!(exception.failure(), HostFailure::ParamRequired { param, .. } if param == "y"));
}

#[test]
fn test_parameter_of_wrong_type() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "new Greeter().greet(5)");
    assert_eq!(
        exception.to_string(),
        "Parameter 'name' of method 'greet' from 'Greeter' is not instance of 'String'"
    );
}

#[test]
fn test_optional_parameter_of_wrong_type() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "new Point(1, 2).translate(1, 'up')");
    assert!(matches!(
        exception.failure(),
        HostFailure::ParamTypeInvalid { param, method, .. } if param == "dy" && method == "translate"
    ));
}

#[test]
fn test_property_validation() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "var g = new Greeter(); g.greeting = 5;");
    assert_eq!(
        exception.to_string(),
        "Property 'greeting' of 'Greeter' is not instance of 'String'"
    );

    let exception = host_failure(&bridge, "var g = new Greeter(); g.greeting = null;");
    assert_eq!(exception.to_string(), "Property 'greeting' of 'Greeter' is required");
}

#[test]
fn test_validation_failure_visible_to_script() {
    let bridge = bridge();
    assert_eq!(
        eval(&bridge, "var m; try { new Point() } catch (e) { m = e.message } m"),
        HostValue::from("Parameter 'x' of method '<constructor>' from 'Point' is required")
    );
}

// ============================================================================
// Script failures
// ============================================================================

#[test]
fn test_uncaught_script_error() {
    let bridge = bridge();
    match bridge.evaluate_named("function f() {\n  throw new Error('bad');\n}\nf();", "app.js") {
        Err(BridgeError::Script(exception)) => {
            assert_eq!(exception.message, "Error: bad");
            assert_eq!(
                exception.stack_trace.as_deref(),
                Some("f@app.js:2\nglobal code@app.js:4")
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_thrown_primitive() {
    let bridge = bridge();
    assert_eq!(script_failure(&bridge, "throw 42"), "42");
}

#[test]
fn test_syntax_error_before_side_effects() {
    let bridge = bridge();
    eval(&bridge, "var touched = 0;");

    match bridge.evaluate("touched = 1;\nvar = ;") {
        Err(err @ BridgeError::Syntax(_)) => assert!(err.to_string().starts_with("Syntax error: ")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(eval(&bridge, "touched"), HostValue::Number(0.0));
}

#[test]
fn test_reference_error() {
    let bridge = bridge();
    assert_eq!(
        script_failure(&bridge, "missing + 1"),
        "ReferenceError: missing is not defined"
    );
}
