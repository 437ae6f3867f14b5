//! Tether SDK - engine-facing ABI of the script/host bridge
//!
//! This crate holds the minimal types and traits a script engine has to
//! provide, and the callbacks it has to honor, so the bridge in
//! `tether-bridge` can expose host objects to scripts without depending on
//! any engine internals.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tether_sdk::{ClassDefinition, NoopCallbacks, ScriptEngine};
//!
//! fn define(engine: &dyn ScriptEngine) {
//!     let class = engine
//!         .define_class(&ClassDefinition::new("Point"), Arc::new(NoopCallbacks))
//!         .unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod debugger;
pub mod error;
pub mod handler;
pub mod value;

pub use context::{ClassDefinition, ScriptEngine, ScriptResult};
pub use debugger::{Breakpoint, DebugCommand, DebuggerChannel, SourcePosition};
pub use error::{EngineError, EngineResult};
pub use handler::{CallbackResult, NoopCallbacks, ObjectCallbacks};
pub use value::{ClassHandle, DateFields, ObjectHandle, PropertyAttributes, ReferenceId, ScriptValue};
