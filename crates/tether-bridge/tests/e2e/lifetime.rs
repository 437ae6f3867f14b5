//! Reference lifetime: finalization, release and dispose hooks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::harness::*;
use tether_bridge::{HostObject, HostValue, ReferenceError, ScriptEngine};
use tether_sdk::ReferenceId;
use tether_testkit::{EngineOptions, TestEngine};

fn resource(name: &str) -> HostObject {
    HostObject::new(Resource {
        name: name.to_string(),
    })
}

/// Expose `object` under `global` and return the id its proxy carries
fn expose(bridge: &tether_bridge::Bridge<TestEngine>, global: &str, object: &HostObject) -> ReferenceId {
    let proxy = bridge.to_script(&HostValue::Object(object.clone())).unwrap();
    let handle = proxy.as_object().unwrap();
    bridge.engine().set_global(global, proxy).unwrap();
    bridge.engine().private_slot(handle).unwrap()
}

fn lifecycle(engine: TestEngine) {
    let disposed = Arc::new(AtomicUsize::new(0));
    let bridge = bridge_with(engine, Arc::clone(&disposed));
    let id = expose(&bridge, "r", &resource("db"));

    assert_eq!(eval(&bridge, "r.name"), HostValue::from("db"));
    assert_eq!(bridge.collect_garbage(), 0);
    assert_eq!(bridge.live_references(), 1);

    eval(&bridge, "r = null;");
    assert_eq!(bridge.collect_garbage(), 1);
    assert_eq!(bridge.live_references(), 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert!(matches!(bridge.references().get(id), Err(ReferenceError::Stale(stale)) if stale == id));

    assert_eq!(bridge.collect_garbage(), 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_finalized_on_collector_thread() {
    lifecycle(TestEngine::new());
}

#[test]
fn test_finalized_inline() {
    lifecycle(TestEngine::with_options(EngineOptions {
        finalize_on_thread: false,
        ..EngineOptions::default()
    }));
}

#[test]
fn test_dispose_waits_for_last_proxy() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let bridge = bridge_with(TestEngine::new(), Arc::clone(&disposed));
    let object = resource("shared");
    let first = expose(&bridge, "a", &object);
    let second = expose(&bridge, "b", &object);
    assert_ne!(first, second);
    assert_eq!(bridge.references().count_of(&object), 2);

    eval(&bridge, "a = null;");
    assert_eq!(bridge.collect_garbage(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 0);
    assert!(bridge.references().get(second).unwrap().ptr_eq(&object));

    eval(&bridge, "b = null;");
    assert_eq!(bridge.collect_garbage(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_script_created_objects_are_released() {
    let bridge = bridge();
    eval(&bridge, "new Point(1, 2).x");
    eval(&bridge, "var keep = new Point(3, 4); keep.length(); keep.length();");
    assert_eq!(bridge.live_references(), 2);

    assert_eq!(bridge.collect_garbage(), 1);
    assert_eq!(bridge.live_references(), 1);
    assert_eq!(eval(&bridge, "keep.y"), HostValue::Number(4.0));
}

#[test]
fn test_unknown_reference() {
    let bridge = bridge();
    let id = ReferenceId::new(40, 1);
    assert!(matches!(bridge.references().get(id), Err(ReferenceError::Unknown(_))));
    assert_eq!(bridge.references().dealloc(id).unwrap_err(), ReferenceError::Unknown(id));
}

#[test]
fn test_release_drained_after_evaluation() {
    let bridge = bridge();
    let id = expose(&bridge, "p", &HostObject::new(Point { x: 0.0, y: 0.0 }));
    eval(&bridge, "p = null;");

    // A collection outside the bridge leaves the release queued until the
    // next evaluation settles
    bridge.engine().collect_garbage();
    assert_eq!(bridge.live_references(), 1);
    eval(&bridge, "1");
    assert_eq!(bridge.live_references(), 0);
    assert!(!bridge.references().contains(id));
}
