//! Host classes used from script: construction, properties, methods

use super::harness::*;
use pretty_assertions::assert_eq;
use tether_bridge::{HostFailure, HostObject, HostValue};

// ============================================================================
// Construction and properties
// ============================================================================

#[test]
fn test_construct_and_read_property() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Point(1, 2).x"), HostValue::Number(1.0));
    assert_eq!(eval(&bridge, "var p = new Point(1, 2); p.x + p.y"), HostValue::Number(3.0));
}

#[test]
fn test_constructed_object_reaches_host() {
    let bridge = bridge();
    let value = eval(&bridge, "new Point(3, 4)");
    let point = value
        .as_object()
        .and_then(|object| object.downcast_ref::<Point>())
        .expect("expected a Point");
    assert_eq!((point.x, point.y), (3.0, 4.0));
}

#[test]
fn test_optional_constructor_argument() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Greeter().greeting"), HostValue::from("hi"));
    assert_eq!(eval(&bridge, "new Greeter('hey').greeting"), HostValue::from("hey"));
}

#[test]
fn test_class_without_constructor() {
    let bridge = bridge();
    let message = script_failure(&bridge, "new Sensor()");
    assert_eq!(message, "TypeError: Failed to construct 'Sensor'");
}

#[test]
fn test_constructor_requires_new() {
    let bridge = bridge();
    let message = script_failure(&bridge, "Point(1, 2)");
    assert_eq!(message, "TypeError: Class constructor Point cannot be invoked without 'new'");
}

#[test]
fn test_mapped_marker() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Point(1, 2).isMappedObject"), HostValue::Bool(true));

    let exception = host_failure(&bridge, "var p = new Point(1, 2); p.isMappedObject = false;");
    assert!(matches!(
        exception.failure(),
        HostFailure::PropertyReadOnly { property, class } if property == "isMappedObject" && class == "Point"
    ));
}

#[test]
fn test_unmapped_names_use_ordinary_slots() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Point(1, 2).z"), HostValue::Null);
    assert_eq!(
        eval(&bridge, "var p = new Point(1, 2); p.tag = 'mine'; p.tag"),
        HostValue::from("mine")
    );
}

#[test]
fn test_setter() {
    let bridge = bridge();
    assert_eq!(
        eval(&bridge, "var g = new Greeter(); g.greeting = 'hello'; g.greeting"),
        HostValue::from("hello")
    );

    let greeter = HostObject::new(Greeter::new("yo"));
    bridge.expose("g2", &HostValue::Object(greeter.clone())).unwrap();
    eval(&bridge, "g2.greeting = 'hey'");
    let greeter = greeter.downcast_ref::<Greeter>().unwrap();
    assert_eq!(*greeter.greeting.lock(), "hey");
}

#[test]
fn test_read_only_property() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "var p = new Point(1, 2); p.x = 5;");
    assert_eq!(exception.to_string(), "Property 'x' of 'Point' is read-only");
}

#[test]
fn test_assigning_a_method_name() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "var p = new Point(1, 2); p.length = 1;");
    assert_eq!(exception.to_string(), "Class 'Point' has no property 'length'");
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_method_call() {
    let bridge = bridge();
    bridge
        .expose("obj", &HostValue::object(Greeter::new("hi")))
        .unwrap();
    assert_eq!(eval(&bridge, "obj.greet('Ann')"), HostValue::from("hi Ann"));
}

#[test]
fn test_method_returning_host_object() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Point(1, 2).translate(1, 1).y"), HostValue::Number(3.0));
    assert_eq!(eval(&bridge, "new Point(1, 2).translate(2).x"), HostValue::Number(3.0));
    assert_eq!(eval(&bridge, "new Point(3, 4).length()"), HostValue::Number(5.0));
}

#[test]
fn test_method_runs_on_its_receiver() {
    let bridge = bridge();
    assert_eq!(
        eval(&bridge, "var p = new Point(6, 8); var q = new Point(0, 1); q.size = p.length; q.size()"),
        HostValue::Number(1.0)
    );
}

#[test]
fn test_detached_method() {
    let bridge = bridge();
    let exception = host_failure(&bridge, "var f = new Point(6, 8).length; f()");
    assert_eq!(exception.to_string(), "Receiver is not a mapped object");
}

#[test]
fn test_method_reaches_host_as_its_name() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Greeter().greet"), HostValue::from("greet"));
    assert_eq!(eval(&bridge, "new Point(1, 2).length.name"), HostValue::from("length"));
    assert_eq!(
        eval(&bridge, "var f = new Point(1, 2).translate; f.name = 'moved'; f.name"),
        HostValue::from("translate")
    );
}

#[test]
fn test_builtin_to_string() {
    let bridge = bridge();
    assert_eq!(eval(&bridge, "new Point(1, 2).toString()"), HostValue::from("[object Point]"));
    assert_eq!(eval(&bridge, "String(new Greeter())"), HostValue::from("[object Greeter]"));
    assert_eq!(eval(&bridge, "new Point(1, 2).valueOf()"), HostValue::from("[object Point]"));
}

// ============================================================================
// Values crossing the boundary
// ============================================================================

#[test]
fn test_exposed_array() {
    let bridge = bridge();
    let array = HostValue::Array(vec![
        HostValue::Number(10.0),
        HostValue::Number(20.0),
        HostValue::Number(30.0),
    ]);
    bridge.expose("arr", &array).unwrap();

    assert_eq!(eval(&bridge, "arr.length"), HostValue::Number(3.0));
    assert_eq!(eval(&bridge, "arr[1]"), HostValue::Number(20.0));
    assert_eq!(eval(&bridge, "arr"), array);
}

#[test]
fn test_exposed_object_keeps_identity() {
    let bridge = bridge();
    let point = HostObject::new(Point { x: 1.0, y: 1.0 });
    bridge.expose("p", &HostValue::Object(point.clone())).unwrap();

    for _ in 0..3 {
        match eval(&bridge, "p") {
            HostValue::Object(resolved) => assert!(resolved.ptr_eq(&point)),
            other => panic!("expected host object, got {}", other),
        }
    }
    assert_eq!(bridge.live_references(), 1);
}

#[test]
fn test_host_objects_inside_arrays() {
    let bridge = bridge();
    let value = eval(&bridge, "[new Point(1, 2), new Point(3, 4)]");
    let items = value.as_array().expect("expected an array");
    assert_eq!(items.len(), 2);
    let second = items[1].as_object().and_then(|object| object.downcast_ref::<Point>());
    assert_eq!(second.map(|p| p.y), Some(4.0));
}

#[test]
fn test_parameters() {
    let bridge = bridge();
    let point = HostValue::object(Point { x: 2.0, y: 3.0 });
    let result = bridge
        .evaluate_with_parameters("return p.x * n;", &["p", "n"], &[point, HostValue::Int(5)])
        .unwrap();
    assert_eq!(result, HostValue::Number(10.0));
}
