//! Error types for the bridge

use std::fmt;

use tether_sdk::{EngineError, ReferenceId, ScriptEngine, ScriptValue};
use thiserror::Error;

use crate::host::HostException;

/// Lifetime violation on the reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The id was never issued by this table
    #[error("Unknown reference {0}")]
    Unknown(ReferenceId),

    /// The id was released already
    #[error("Stale reference {0}")]
    Stale(ReferenceId),
}

/// An exception thrown by script code and observed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptException {
    /// Display string of the thrown value
    pub message: String,
    /// Script stack trace, when the thrown value carries one
    pub stack_trace: Option<String>,
}

impl ScriptException {
    /// Create an exception with a message and no stack trace
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Describe a thrown script value
    pub fn from_value(engine: &dyn ScriptEngine, thrown: &ScriptValue) -> Self {
        let stack_trace = thrown.as_object().and_then(|object| {
            match engine.get_property(object, "stack") {
                Ok(ScriptValue::String(stack)) if !stack.is_empty() => Some(stack),
                _ => None,
            }
        });
        Self {
            message: engine.to_display_string(thrown),
            stack_trace,
        }
    }
}

impl fmt::Display for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Error returned to host callers of the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The script failed to parse. Nothing was evaluated.
    #[error("Syntax error: {0}")]
    Syntax(ScriptException),

    /// The script threw and nothing caught it
    #[error("Uncaught exception: {0}")]
    Script(ScriptException),

    /// A host failure escaped the script
    #[error(transparent)]
    Host(HostException),

    /// A host object of an unregistered class was passed in
    #[error("Class {0} not registered. Did you forget to call registerClass first?")]
    ClassUnregistered(String),

    /// Lifetime violation on the reference table
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The engine rejected an operation
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl BridgeError {
    /// The host exception, when a host failure escaped
    pub fn host_exception(&self) -> Option<&HostException> {
        match self {
            BridgeError::Host(exception) => Some(exception),
            _ => None,
        }
    }

    /// The script exception, for syntax and uncaught script errors
    pub fn script_exception(&self) -> Option<&ScriptException> {
        match self {
            BridgeError::Syntax(exception) | BridgeError::Script(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<HostException> for BridgeError {
    fn from(exception: HostException) -> Self {
        BridgeError::Host(exception)
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
