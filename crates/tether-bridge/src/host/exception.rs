//! Failures raised by host operations

use std::fmt;
use std::sync::Arc;

use tether_sdk::EngineError;
use thiserror::Error;

use crate::error::ReferenceError;

/// Failure of a host constructor, accessor or method
#[derive(Debug, Error)]
pub enum HostFailure {
    /// A required parameter was missing or null
    #[error("Parameter '{param}' of method '{method}' from '{class}' is required")]
    ParamRequired {
        /// Parameter name
        param: String,
        /// Method name (`<constructor>` for constructors)
        method: String,
        /// Class name
        class: String,
    },

    /// A parameter had the wrong type
    #[error("Parameter '{param}' of method '{method}' from '{class}' is not instance of '{expected}'")]
    ParamTypeInvalid {
        /// Parameter name
        param: String,
        /// Method name (`<constructor>` for constructors)
        method: String,
        /// Class name
        class: String,
        /// Expected type
        expected: String,
    },

    /// A property was assigned null
    #[error("Property '{property}' of '{class}' is required")]
    PropertyRequired {
        /// Property name
        property: String,
        /// Class name
        class: String,
    },

    /// A property was assigned a value of the wrong type
    #[error("Property '{property}' of '{class}' is not instance of '{expected}'")]
    PropertyTypeInvalid {
        /// Property name
        property: String,
        /// Class name
        class: String,
        /// Expected type
        expected: String,
    },

    /// A property without setter was assigned
    #[error("Property '{property}' of '{class}' is read-only")]
    PropertyReadOnly {
        /// Property name
        property: String,
        /// Class name
        class: String,
    },

    /// The class maps no property of that name
    #[error("Class '{class}' has no property '{property}'")]
    UnknownProperty {
        /// Property name
        property: String,
        /// Class name
        class: String,
    },

    /// The class maps no method of that name
    #[error("Class '{class}' has no method '{method}'")]
    UnknownMethod {
        /// Method name
        method: String,
        /// Class name
        class: String,
    },

    /// A host object of an unregistered class crossed into script
    #[error("Class {0} not registered. Did you forget to call registerClass first?")]
    ClassUnregistered(String),

    /// The class cannot be constructed from script
    #[error("Class '{0}' has no constructor")]
    NoConstructor(String),

    /// A proxy pointed at a released reference
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The engine rejected an operation
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Free-form failure raised by host code
    #[error("{0}")]
    Message(String),

    /// Any other error raised by host code
    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HostFailure {
    /// Free-form failure
    pub fn message(message: impl Into<String>) -> Self {
        HostFailure::Message(message.into())
    }

    /// Wrap an arbitrary error
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        HostFailure::Other(Box::new(error))
    }
}

/// Shared, identity-carrying host failure.
///
/// A failure that crosses into script and comes back out is the same
/// `HostException` (see [`HostException::ptr_eq`]).
#[derive(Clone)]
pub struct HostException(Arc<HostFailure>);

impl HostException {
    /// Wrap a failure
    pub fn new(failure: HostFailure) -> Self {
        Self(Arc::new(failure))
    }

    /// The underlying failure
    pub fn failure(&self) -> &HostFailure {
        &self.0
    }

    /// Whether both are the same exception instance
    pub fn ptr_eq(&self, other: &HostException) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<HostFailure> for HostException {
    fn from(failure: HostFailure) -> Self {
        Self::new(failure)
    }
}

impl From<ReferenceError> for HostException {
    fn from(error: ReferenceError) -> Self {
        Self::new(HostFailure::Reference(error))
    }
}

impl From<EngineError> for HostException {
    fn from(error: EngineError) -> Self {
        Self::new(HostFailure::Engine(error))
    }
}

impl fmt::Debug for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostException").field(&self.0).finish()
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for HostException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Result of a host operation
pub type HostResult<T> = Result<T, HostException>;
