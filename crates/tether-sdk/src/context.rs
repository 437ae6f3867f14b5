//! ScriptEngine trait - abstract engine operations
//!
//! Defines the interface a script engine implements so the bridge can drive
//! it. The bridge programs against this trait only; it never depends on a
//! particular engine's internals.

use std::sync::Arc;

use crate::debugger::DebuggerChannel;
use crate::error::EngineResult;
use crate::handler::ObjectCallbacks;
use crate::value::{ClassHandle, DateFields, ObjectHandle, PropertyAttributes, ReferenceId, ScriptValue};

/// Result of an engine operation that may throw a script exception.
///
/// The error is the thrown script value.
pub type ScriptResult<T> = Result<T, ScriptValue>;

/// Definition of a host-backed class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    /// Class name as seen by scripts
    pub name: String,
    /// Expose a global constructor named after the class
    pub global_constructor: bool,
}

impl ClassDefinition {
    /// A class with a global constructor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_constructor: true,
        }
    }

    /// A class that is only instantiated from the host side
    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_constructor: false,
        }
    }
}

/// Abstract script engine context.
///
/// Every method takes `&self`: engines are expected to call back into
/// [`ObjectCallbacks`] while evaluating, and those callbacks use this same
/// trait object re-entrantly.
pub trait ScriptEngine {
    // ========================================================================
    // Classes & Proxies
    // ========================================================================

    /// Define a class whose instances route property access, calls and
    /// construction through `callbacks`.
    fn define_class(
        &self,
        definition: &ClassDefinition,
        callbacks: Arc<dyn ObjectCallbacks>,
    ) -> EngineResult<ClassHandle>;

    /// Instantiate a proxy of `class` whose private slot holds `id`
    fn make_proxy(&self, class: ClassHandle, id: ReferenceId) -> EngineResult<ObjectHandle>;

    /// Instantiate a callable object of `class` with no private slot.
    ///
    /// Calling it invokes the class callbacks' `call_as_function`.
    fn make_callable(&self, class: ClassHandle) -> EngineResult<ObjectHandle>;

    /// Read the private slot of a proxy object
    fn private_slot(&self, object: ObjectHandle) -> Option<ReferenceId>;

    // ========================================================================
    // Value Creation
    // ========================================================================

    /// Allocate an array holding `items`
    fn make_array(&self, items: &[ScriptValue]) -> EngineResult<ObjectHandle>;

    /// Allocate a date through the engine's native date construction
    fn make_date(&self, fields: DateFields) -> EngineResult<ObjectHandle>;

    /// Allocate an `Error` carrying `message`
    fn make_error(&self, message: &str) -> EngineResult<ObjectHandle>;

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read a named property (may invoke callbacks and throw)
    fn get_property(&self, object: ObjectHandle, name: &str) -> ScriptResult<ScriptValue>;

    /// Read an indexed element (may invoke callbacks and throw)
    fn get_index(&self, object: ObjectHandle, index: u32) -> ScriptResult<ScriptValue>;

    /// Define or assign a named property
    fn set_property(
        &self,
        object: ObjectHandle,
        name: &str,
        value: ScriptValue,
        attributes: PropertyAttributes,
    ) -> ScriptResult<()>;

    /// Check whether the object or its prototype chain has a property
    fn has_property(&self, object: ObjectHandle, name: &str) -> bool;

    /// Prototype of an object, if any
    fn prototype(&self, object: ObjectHandle) -> Option<ObjectHandle>;

    /// Bind a global variable
    fn set_global(&self, name: &str, value: ScriptValue) -> EngineResult<()>;

    // ========================================================================
    // Functions & Evaluation
    // ========================================================================

    /// Check whether an object can be called
    fn is_function(&self, object: ObjectHandle) -> bool;

    /// Call a function with an explicit receiver
    fn call_function(
        &self,
        function: ObjectHandle,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue>;

    /// Build a function from parameter names and a source body
    fn compile_function(&self, name: &str, params: &[String], body: &str) -> ScriptResult<ObjectHandle>;

    /// Check source for syntax errors without evaluating it
    fn check_syntax(&self, source: &str) -> ScriptResult<()>;

    /// Evaluate source in the global scope
    fn evaluate(&self, source: &str, source_url: Option<&str>) -> ScriptResult<ScriptValue>;

    // ========================================================================
    // Runtime
    // ========================================================================

    /// Convert any value to its display string (script `String(value)`)
    fn to_display_string(&self, value: &ScriptValue) -> String;

    /// Run the engine collector. Finalizers of unreachable proxies are
    /// invoked before this returns, possibly from another thread.
    fn collect_garbage(&self);

    /// Current script stack trace, innermost frame first
    fn stack_trace(&self) -> String;

    /// Attach a debugger channel receiving engine notifications
    fn attach_debugger(&self, channel: Arc<dyn DebuggerChannel>);
}
