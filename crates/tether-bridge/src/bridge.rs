//! The bridge context
//!
//! A [`Bridge`] owns one engine together with the tables that tie it to the
//! host: registered classes, live references, exception correlations and the
//! queue of finalized proxies. Every top-level evaluation ends by settling
//! the pending failure, clearing correlations and draining the queue.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use tether_sdk::{ClassDefinition, ClassHandle, EngineError, ScriptEngine, ScriptResult, ScriptValue};
use tracing::{debug, trace};

use crate::debugger::{DebugListener, DebuggerAdapter};
use crate::error::{BridgeError, BridgeResult, ScriptException};
use crate::host::object::short_type_name;
use crate::host::{ClassDescriptor, HostValue};
use crate::options::BridgeOptions;
use crate::proxy::ProxyProtocol;
use crate::reference::ReferenceTable;
use crate::state::BridgeState;

/// Name of functions built by [`Bridge::evaluate_with_parameters`]
const PARAMETERIZED_FUNCTION: &str = "anonymous";

/// Script engine bound to the host class model
pub struct Bridge<E: ScriptEngine> {
    engine: E,
    state: Arc<BridgeState>,
}

impl<E: ScriptEngine> Bridge<E> {
    /// Create a bridge with default options
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, BridgeOptions::default())
    }

    /// Create a bridge with explicit options
    pub fn with_options(engine: E, options: BridgeOptions) -> Self {
        Self {
            engine,
            state: Arc::new(BridgeState::new(options)),
        }
    }

    /// The underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Options the bridge was created with
    pub fn options(&self) -> &BridgeOptions {
        &self.state.options
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Register a host class and define its global constructor
    pub fn register_class(&self, descriptor: ClassDescriptor) -> BridgeResult<ClassHandle> {
        if self.state.registry.contains_type(descriptor.type_id()) {
            return Err(EngineError::ClassExists(descriptor.name().to_string()).into());
        }

        let descriptor = Arc::new(descriptor);
        let callbacks = Arc::new(ProxyProtocol::new(
            Arc::clone(&self.state),
            Arc::clone(&descriptor),
        ));
        let handle = self
            .engine
            .define_class(&ClassDefinition::new(descriptor.name()), callbacks)?;

        debug!(
            class = descriptor.name(),
            properties = descriptor.property_names().len(),
            methods = descriptor.method_names().len(),
            "registered host class"
        );
        self.state.registry.insert(descriptor, handle);
        Ok(handle)
    }

    /// Whether a host type has been registered
    pub fn is_registered<T: Any>(&self) -> bool {
        self.state.registry.contains_type(TypeId::of::<T>())
    }

    /// Names of the properties mapped for a registered class
    pub fn mapped_properties<T: Any>(&self) -> BridgeResult<Vec<String>> {
        self.state
            .registry
            .by_type(TypeId::of::<T>())
            .map(|class| class.descriptor.property_names())
            .ok_or_else(|| BridgeError::ClassUnregistered(short_type_name(type_name::<T>()).to_string()))
    }

    /// Names of the methods mapped for a registered class
    pub fn mapped_methods<T: Any>(&self) -> BridgeResult<Vec<String>> {
        self.state
            .registry
            .by_type(TypeId::of::<T>())
            .map(|class| class.descriptor.method_names())
            .ok_or_else(|| BridgeError::ClassUnregistered(short_type_name(type_name::<T>()).to_string()))
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate a script in the global scope
    pub fn evaluate(&self, source: &str) -> BridgeResult<HostValue> {
        self.run(source, None)
    }

    /// Evaluate a script loaded from `source_url`
    pub fn evaluate_named(&self, source: &str, source_url: &str) -> BridgeResult<HostValue> {
        self.run(source, Some(source_url))
    }

    /// Run `body` as a function of `names`, called with `values`.
    ///
    /// Every value is checked before anything runs: host objects must be of
    /// a registered class.
    pub fn evaluate_with_parameters(
        &self,
        body: &str,
        names: &[&str],
        values: &[HostValue],
    ) -> BridgeResult<HostValue> {
        for value in values {
            self.validate(value)?;
        }

        let params: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        let function = self
            .engine
            .compile_function(PARAMETERIZED_FUNCTION, &params, body)
            .map_err(|thrown| BridgeError::Syntax(ScriptException::from_value(&self.engine, &thrown)))?;

        let converter = self.state.values(&self.engine);
        let args = values
            .iter()
            .map(|value| converter.to_script(value))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(params = params.len(), "calling parameterized function");
        let outcome = self
            .engine
            .call_function(function, &ScriptValue::Undefined, &args);
        self.finish(outcome)
    }

    fn run(&self, source: &str, source_url: Option<&str>) -> BridgeResult<HostValue> {
        if self.state.options.syntax_check {
            if let Err(thrown) = self.engine.check_syntax(source) {
                let exception = ScriptException::from_value(&self.engine, &thrown);
                debug!(error = %exception, "syntax check failed");
                return Err(BridgeError::Syntax(exception));
            }
        }
        let outcome = self.engine.evaluate(source, source_url);
        self.finish(outcome)
    }

    /// Settle a top-level outcome. A pending failure wins over the result.
    fn finish(&self, outcome: ScriptResult<ScriptValue>) -> BridgeResult<HostValue> {
        let exceptions = &self.state.exceptions;
        let result = match exceptions.take_pending() {
            Some(pending) => Err(BridgeError::Host(pending)),
            None => match outcome {
                Ok(value) => Ok(self.state.values(&self.engine).to_host(&value)),
                Err(thrown) => Err(exceptions.script_to_host(&self.engine, &thrown)),
            },
        };
        exceptions.clear();
        self.state.drain_releases();
        result
    }

    fn validate(&self, value: &HostValue) -> BridgeResult<()> {
        match value {
            HostValue::Object(object) if !self.state.registry.contains_type(object.type_id()) => {
                Err(BridgeError::ClassUnregistered(object.type_name().to_string()))
            }
            HostValue::Array(items) => items.iter().try_for_each(|item| self.validate(item)),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Bind a host value to a global variable
    pub fn expose(&self, name: &str, value: &HostValue) -> BridgeResult<()> {
        let value = self.to_script(value)?;
        self.engine.set_global(name, value)?;
        Ok(())
    }

    /// Convert a script value to its host counterpart
    pub fn to_host(&self, value: &ScriptValue) -> HostValue {
        self.state.values(&self.engine).to_host(value)
    }

    /// Convert a host value to a script value
    pub fn to_script(&self, value: &HostValue) -> BridgeResult<ScriptValue> {
        Ok(self.state.values(&self.engine).to_script(value)?)
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Run the engine collector and release the entries of collected proxies.
    /// Returns the number of entries released.
    pub fn collect_garbage(&self) -> usize {
        self.engine.collect_garbage();
        self.state.drain_releases()
    }

    /// Release the entries of proxies finalized so far
    pub fn drain_releases(&self) -> usize {
        self.state.drain_releases()
    }

    /// Number of live reference entries
    pub fn live_references(&self) -> usize {
        self.state.references.len()
    }

    /// The reference table
    pub fn references(&self) -> &ReferenceTable {
        &self.state.references
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Current script stack trace
    pub fn stack_trace(&self) -> String {
        self.engine.stack_trace()
    }

    /// Attach a debugger listener, replacing any previous one
    pub fn set_debugger(&self, listener: Arc<dyn DebugListener>) -> Arc<DebuggerAdapter> {
        let adapter = Arc::new(DebuggerAdapter::new(
            Arc::clone(&self.state.exceptions),
            listener,
        ));
        *self.state.debugger.write() = Some(Arc::clone(&adapter));
        self.engine.attach_debugger(adapter.clone());
        debug!("debugger attached");
        adapter
    }
}
