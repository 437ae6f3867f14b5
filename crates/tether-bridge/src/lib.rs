//! Tether bridge - host objects inside an embedded script engine
//!
//! The bridge lets scripts construct, read, write and call Rust objects as
//! if they were native script objects, and lets the host observe script
//! values and failures in Rust terms.
//!
//! # Overview
//!
//! - [`host`]: the host class model (`HostValue`, `HostObject`,
//!   `ClassBuilder`, `HostFailure`)
//! - [`marshal`]: value conversion in both directions
//! - [`proxy`]: engine callbacks serving host classes
//! - [`reference`]: generation-checked table of host objects held by script
//! - [`exception`]: host failure and script error translation
//! - [`debugger`]: adapter from engine debugging events to a host listener
//! - [`Bridge`]: the context tying all of the above to one engine
//!
//! # Example
//!
//! ```ignore
//! use tether_bridge::{Bridge, ClassBuilder, HostValue};
//! use tether_testkit::TestEngine;
//!
//! struct Point { x: f64, y: f64 }
//!
//! let bridge = Bridge::new(TestEngine::new());
//! bridge.register_class(
//!     ClassBuilder::<Point>::new("Point")
//!         .constructor(|args| Ok(Point { x: args.required(0, "x")?, y: args.required(1, "y")? }))
//!         .property("x", |p: &Point| Ok(p.x))
//!         .build(),
//! )?;
//! assert_eq!(bridge.evaluate("new Point(1, 2).x")?, HostValue::Number(1.0));
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod debugger;
pub mod error;
pub mod exception;
pub mod host;
pub mod marshal;
pub mod options;
pub mod proxy;
pub mod reference;
pub mod registry;
pub mod release;
pub(crate) mod state;

pub use bridge::Bridge;
pub use debugger::{DebugListener, DebuggerAdapter};
pub use error::{BridgeError, BridgeResult, ReferenceError, ScriptException};
pub use exception::ExceptionBridge;
pub use host::{
    Args, Calendar, ClassBuilder, ClassDescriptor, FromHostValue, HostException, HostFailure,
    HostObject, HostResult, HostValue,
};
pub use marshal::{probe, Capability, ValueBridge, MAX_DEPTH};
pub use options::BridgeOptions;
pub use reference::ReferenceTable;
pub use registry::ClassRegistry;
pub use release::ReleaseQueue;

pub use tether_sdk::{Breakpoint, DebugCommand, ScriptEngine, ScriptValue, SourcePosition};
