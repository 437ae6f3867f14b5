//! ObjectCallbacks trait - interception points of host-backed classes
//!
//! The engine invokes these when a script touches an object of a class
//! defined through [`ScriptEngine::define_class`].

use crate::context::ScriptEngine;
use crate::value::{ObjectHandle, ReferenceId, ScriptValue};

/// Result of a callback. The error is a script value to throw.
pub type CallbackResult<T> = Result<T, ScriptValue>;

/// Callbacks for a host-backed class.
///
/// Every method except `finalize` runs on the thread evaluating script.
/// `finalize` may run on any thread, so implementors must be `Send + Sync`
/// and must not touch engine state from it.
pub trait ObjectCallbacks: Send + Sync {
    /// Whether the class provides `name` on `object`
    fn has_property(&self, engine: &dyn ScriptEngine, object: ObjectHandle, name: &str) -> bool;

    /// Read `name`. `Ok(None)` declines and lets the engine fall back to
    /// the object's ordinary slots.
    fn get_property(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
    ) -> CallbackResult<Option<ScriptValue>>;

    /// Assign `name`. `Ok(false)` declines and lets the engine store the
    /// value in the object's ordinary slots.
    fn set_property(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
        value: &ScriptValue,
    ) -> CallbackResult<bool>;

    /// `function(...args)` with receiver `this`
    fn call_as_function(
        &self,
        engine: &dyn ScriptEngine,
        function: ObjectHandle,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> CallbackResult<ScriptValue>;

    /// `new constructor(...args)`. `Ok(None)` means no object was produced.
    fn call_as_constructor(
        &self,
        engine: &dyn ScriptEngine,
        constructor: ObjectHandle,
        args: &[ScriptValue],
    ) -> CallbackResult<Option<ObjectHandle>>;

    /// A proxy carrying `id` became unreachable and was collected
    fn finalize(&self, id: ReferenceId);
}

/// Callbacks that decline every operation
pub struct NoopCallbacks;

impl ObjectCallbacks for NoopCallbacks {
    fn has_property(&self, _engine: &dyn ScriptEngine, _object: ObjectHandle, _name: &str) -> bool {
        false
    }

    fn get_property(
        &self,
        _engine: &dyn ScriptEngine,
        _object: ObjectHandle,
        _name: &str,
    ) -> CallbackResult<Option<ScriptValue>> {
        Ok(None)
    }

    fn set_property(
        &self,
        _engine: &dyn ScriptEngine,
        _object: ObjectHandle,
        _name: &str,
        _value: &ScriptValue,
    ) -> CallbackResult<bool> {
        Ok(false)
    }

    fn call_as_function(
        &self,
        _engine: &dyn ScriptEngine,
        _function: ObjectHandle,
        _this: &ScriptValue,
        _args: &[ScriptValue],
    ) -> CallbackResult<ScriptValue> {
        Ok(ScriptValue::Undefined)
    }

    fn call_as_constructor(
        &self,
        _engine: &dyn ScriptEngine,
        _constructor: ObjectHandle,
        _args: &[ScriptValue],
    ) -> CallbackResult<Option<ObjectHandle>> {
        Ok(None)
    }

    fn finalize(&self, _id: ReferenceId) {}
}
