//! Host classes and helpers shared by the end-to-end tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tether_bridge::{
    Bridge, BridgeError, ClassBuilder, HostException, HostFailure, HostResult, HostValue,
};
use tether_testkit::TestEngine;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Host classes
// ============================================================================

pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

pub struct Greeter {
    pub greeting: Mutex<String>,
}

impl Greeter {
    pub fn new(greeting: &str) -> Self {
        Self {
            greeting: Mutex::new(greeting.to_string()),
        }
    }
}

/// Every read of `broken` fails with the same host exception
pub struct Sensor {
    pub failure: HostException,
}

impl Sensor {
    pub fn offline() -> Self {
        Self {
            failure: HostException::new(HostFailure::message("sensor offline")),
        }
    }
}

/// Disposable host resource; see `bridge_with`
pub struct Resource {
    pub name: String,
}

// ============================================================================
// Bridge setup
// ============================================================================

/// Route bridge logs to the test output. Filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn bridge() -> Bridge<TestEngine> {
    bridge_with(TestEngine::new(), Arc::new(AtomicUsize::new(0)))
}

/// Bridge over `engine` whose `Resource` class bumps `disposed`
pub fn bridge_with(engine: TestEngine, disposed: Arc<AtomicUsize>) -> Bridge<TestEngine> {
    init_tracing();
    let bridge = Bridge::new(engine);

    bridge
        .register_class(
            ClassBuilder::<Point>::new("Point")
                .constructor(|args| {
                    Ok(Point {
                        x: args.required(0, "x")?,
                        y: args.required(1, "y")?,
                    })
                })
                .property("x", |p: &Point| Ok(p.x))
                .property("y", |p: &Point| Ok(p.y))
                .method("length", |p: &Point, _args| Ok(p.length()))
                .method("translate", |p: &Point, args| {
                    let dx: f64 = args.required(0, "dx")?;
                    let dy: f64 = args.optional(1, "dy")?.unwrap_or(0.0);
                    Ok(HostValue::object(Point {
                        x: p.x + dx,
                        y: p.y + dy,
                    }))
                })
                .build(),
        )
        .unwrap();

    bridge
        .register_class(
            ClassBuilder::<Greeter>::new("Greeter")
                .constructor(|args| {
                    let greeting: Option<String> = args.optional(0, "greeting")?;
                    Ok(Greeter::new(greeting.as_deref().unwrap_or("hi")))
                })
                .property_with_setter(
                    "greeting",
                    |g: &Greeter| Ok(g.greeting.lock().clone()),
                    |g: &Greeter, greeting: String| {
                        *g.greeting.lock() = greeting;
                        Ok(())
                    },
                )
                .method("greet", |g: &Greeter, args| {
                    let name: String = args.required(0, "name")?;
                    Ok(format!("{} {}", g.greeting.lock(), name))
                })
                .build(),
        )
        .unwrap();

    bridge
        .register_class(
            ClassBuilder::<Sensor>::new("Sensor")
                .property("broken", |s: &Sensor| -> HostResult<f64> { Err(s.failure.clone()) })
                .build(),
        )
        .unwrap();

    bridge
        .register_class(
            ClassBuilder::<Resource>::new("Resource")
                .property("name", |r: &Resource| Ok(r.name.clone()))
                .on_dispose(move |_: &Resource| {
                    disposed.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .unwrap();

    bridge
}

// ============================================================================
// Helpers
// ============================================================================

/// Evaluate and expect success
pub fn eval(bridge: &Bridge<TestEngine>, source: &str) -> HostValue {
    match bridge.evaluate(source) {
        Ok(value) => value,
        Err(err) => panic!("evaluation of {:?} failed: {}", source, err),
    }
}

/// Evaluate and expect a host failure
pub fn host_failure(bridge: &Bridge<TestEngine>, source: &str) -> HostException {
    match bridge.evaluate(source) {
        Err(BridgeError::Host(exception)) => exception,
        other => panic!("expected host failure from {:?}, got {:?}", source, other),
    }
}

/// Evaluate and expect an uncaught script exception; returns its message
pub fn script_failure(bridge: &Bridge<TestEngine>, source: &str) -> String {
    match bridge.evaluate(source) {
        Err(BridgeError::Script(exception)) => exception.message,
        other => panic!("expected script exception from {:?}, got {:?}", source, other),
    }
}
