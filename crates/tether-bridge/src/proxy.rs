//! Engine callbacks of host classes
//!
//! [`ProxyProtocol`] serves property reads, writes and construction for the
//! proxies of one registered class. Method reads hand out function proxies:
//! callable objects of an internal class whose [`FunctionProtocol`] reads
//! back the method name from a hidden property and invokes it on `this`.

use std::sync::Arc;

use tether_sdk::{
    CallbackResult, ClassDefinition, ObjectCallbacks, ObjectHandle, PropertyAttributes, ReferenceId,
    ScriptEngine, ScriptValue,
};
use tracing::trace;

use crate::host::{ClassDescriptor, HostFailure, HostObject, HostResult, HostValue};
use crate::state::BridgeState;

/// Members every proxy answers, whatever its class
pub const BUILTIN_METHODS: [&str; 3] = ["toString", "valueOf", "Symbol.toPrimitive"];

/// Engine class name of function proxies
pub const FUNCTION_CLASS: &str = "__HostFunction";

fn is_builtin(name: &str) -> bool {
    BUILTIN_METHODS.contains(&name)
}

/// Resolve the host object behind a proxy value
fn resolve_receiver(
    state: &BridgeState,
    engine: &dyn ScriptEngine,
    value: &ScriptValue,
) -> HostResult<HostObject> {
    let id = value
        .as_object()
        .and_then(|object| engine.private_slot(object))
        .ok_or_else(|| HostFailure::message("Receiver is not a mapped object"))?;
    Ok(state.references.get(id)?)
}

// ============================================================================
// Object proxies
// ============================================================================

/// Callbacks of the proxies of one host class
pub struct ProxyProtocol {
    state: Arc<BridgeState>,
    descriptor: Arc<ClassDescriptor>,
}

impl ProxyProtocol {
    pub(crate) fn new(state: Arc<BridgeState>, descriptor: Arc<ClassDescriptor>) -> Self {
        Self { state, descriptor }
    }

    fn is_marker(&self, name: &str) -> bool {
        name == self.state.options.mapped_marker
    }

    fn read(&self, engine: &dyn ScriptEngine, object: ObjectHandle, name: &str) -> HostResult<ScriptValue> {
        let host = resolve_receiver(&self.state, engine, &ScriptValue::Object(object))?;
        let value = self.descriptor.get(&host, name)?;
        self.state.values(engine).to_script(&value)
    }

    fn write(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
        value: &ScriptValue,
    ) -> HostResult<()> {
        if self.is_marker(name) {
            return Err(HostFailure::PropertyReadOnly {
                class: self.descriptor.name().to_string(),
                property: name.to_string(),
            }
            .into());
        }
        let converted = self.state.values(engine).to_host(value);
        let host = resolve_receiver(&self.state, engine, &ScriptValue::Object(object))?;
        self.descriptor.set(&host, name, converted)
    }

    /// Callable forwarding to the method `selector` of its receiver
    fn function_proxy(&self, engine: &dyn ScriptEngine, selector: &str) -> HostResult<ScriptValue> {
        let class = *self.state.function_class.get_or_try_init(|| {
            trace!("defining function proxy class");
            engine.define_class(
                &ClassDefinition::internal(FUNCTION_CLASS),
                Arc::new(FunctionProtocol::new(Arc::clone(&self.state))),
            )
        })?;

        let function = engine.make_callable(class)?;
        for property in [self.state.options.selector_property.as_str(), "name"] {
            engine
                .set_property(
                    function,
                    property,
                    ScriptValue::String(selector.to_string()),
                    PropertyAttributes::HIDDEN,
                )
                .map_err(|thrown| HostFailure::Message(engine.to_display_string(&thrown)))?;
        }
        Ok(ScriptValue::Object(function))
    }

    fn construct(
        &self,
        engine: &dyn ScriptEngine,
        descriptor: &ClassDescriptor,
        args: &[ScriptValue],
    ) -> HostResult<ObjectHandle> {
        let values = self.state.values(engine);
        let args: Vec<HostValue> = args.iter().map(|arg| values.to_host(arg)).collect();
        let object = descriptor.construct(&args)?;
        values.expose(&object)
    }
}

impl ObjectCallbacks for ProxyProtocol {
    fn has_property(&self, _engine: &dyn ScriptEngine, _object: ObjectHandle, name: &str) -> bool {
        self.is_marker(name)
            || self.descriptor.has_property(name)
            || self.descriptor.has_method(name)
            || is_builtin(name)
    }

    fn get_property(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
    ) -> CallbackResult<Option<ScriptValue>> {
        if self.is_marker(name) {
            return Ok(Some(ScriptValue::Bool(true)));
        }
        let result = if self.descriptor.has_method(name) || is_builtin(name) {
            self.function_proxy(engine, name)
        } else if self.descriptor.has_property(name) {
            self.read(engine, object, name)
        } else {
            return Ok(None);
        };
        result.map(Some).map_err(|e| self.state.raise(engine, e))
    }

    fn set_property(
        &self,
        engine: &dyn ScriptEngine,
        object: ObjectHandle,
        name: &str,
        value: &ScriptValue,
    ) -> CallbackResult<bool> {
        if !self.has_property(engine, object, name) {
            return Ok(false);
        }
        self.write(engine, object, name, value)
            .map(|()| true)
            .map_err(|e| self.state.raise(engine, e))
    }

    fn call_as_function(
        &self,
        engine: &dyn ScriptEngine,
        _function: ObjectHandle,
        _this: &ScriptValue,
        _args: &[ScriptValue],
    ) -> CallbackResult<ScriptValue> {
        let failure = HostFailure::Message(format!("'{}' is not a function", self.descriptor.name()));
        Err(self.state.raise(engine, failure.into()))
    }

    fn call_as_constructor(
        &self,
        engine: &dyn ScriptEngine,
        constructor: ObjectHandle,
        args: &[ScriptValue],
    ) -> CallbackResult<Option<ObjectHandle>> {
        let name = match engine.get_property(constructor, "name") {
            Ok(ScriptValue::String(name)) => name,
            _ => return Ok(None),
        };
        let Some(class) = self.state.registry.by_name(&name) else {
            return Ok(None);
        };
        if !class.descriptor.has_constructor() {
            return Ok(None);
        }
        self.construct(engine, &class.descriptor, args)
            .map(Some)
            .map_err(|e| self.state.raise(engine, e))
    }

    fn finalize(&self, id: ReferenceId) {
        trace!(%id, class = self.descriptor.name(), "proxy finalized");
        self.state.releases.push(id);
    }
}

// ============================================================================
// Function proxies
// ============================================================================

/// Callbacks of function proxies
pub struct FunctionProtocol {
    state: Arc<BridgeState>,
}

impl FunctionProtocol {
    pub(crate) fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    fn selector(&self, engine: &dyn ScriptEngine, function: ObjectHandle) -> HostResult<String> {
        match engine.get_property(function, &self.state.options.selector_property) {
            Ok(ScriptValue::String(selector)) => Ok(selector),
            _ => Err(HostFailure::message("Function proxy has no selector").into()),
        }
    }

    fn invoke(
        &self,
        engine: &dyn ScriptEngine,
        function: ObjectHandle,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> HostResult<ScriptValue> {
        let selector = self.selector(engine, function)?;
        let host = resolve_receiver(&self.state, engine, this)?;
        let class = self
            .state
            .registry
            .by_type(host.type_id())
            .ok_or_else(|| HostFailure::ClassUnregistered(host.type_name().to_string()))?;
        let descriptor = &class.descriptor;

        if is_builtin(&selector) && !descriptor.has_method(&selector) {
            return Ok(ScriptValue::String(format!("[object {}]", descriptor.name())));
        }

        let values = self.state.values(engine);
        let args: Vec<HostValue> = args.iter().map(|arg| values.to_host(arg)).collect();
        let result = descriptor.call(&host, &selector, &args)?;
        values.to_script(&result)
    }
}

impl ObjectCallbacks for FunctionProtocol {
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
        engine: &dyn ScriptEngine,
        function: ObjectHandle,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> CallbackResult<ScriptValue> {
        self.invoke(engine, function, this, args)
            .map_err(|e| self.state.raise(engine, e))
    }

    fn call_as_constructor(
        &self,
        _engine: &dyn ScriptEngine,
        _constructor: ObjectHandle,
        _args: &[ScriptValue],
    ) -> CallbackResult<Option<ObjectHandle>> {
        Ok(None)
    }

    // Function proxies carry no reference
    fn finalize(&self, _id: ReferenceId) {}
}
