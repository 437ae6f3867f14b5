//! Exception translation between host and script
//!
//! A host failure thrown into script becomes a script `Error` carrying a
//! hidden numeric correlation id. When that error propagates back out, the
//! id resolves to the original [`HostException`], so host callers observe
//! the very failure their code raised. An id only resolves on the error
//! object it was attached to.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tether_sdk::{ObjectHandle, PropertyAttributes, ScriptEngine, ScriptValue};
use tracing::{debug, warn};

use crate::error::{BridgeError, ScriptException};
use crate::host::{HostException, HostFailure};

struct Correlation {
    error: ObjectHandle,
    exception: HostException,
}

/// Correlation table between script errors and host failures
pub struct ExceptionBridge {
    property: String,
    table: DashMap<u64, Correlation>,
    next_id: AtomicU64,
    pending: Mutex<Option<HostException>>,
}

impl ExceptionBridge {
    /// Create a bridge that tags script errors with `property`
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            table: DashMap::new(),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(None),
        }
    }

    /// Hidden property carrying the correlation id
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Turn a host failure into a script value to throw.
    ///
    /// If the error envelope cannot be built, the bridging failure becomes
    /// the pending failure and the message string is thrown instead.
    pub fn host_to_script(&self, engine: &dyn ScriptEngine, exception: HostException) -> ScriptValue {
        let message = exception.to_string();
        match self.envelope(engine, exception, &message) {
            Ok(value) => value,
            Err(failure) => {
                warn!(error = %failure, "failed to wrap host failure");
                self.set_pending(HostException::new(failure));
                ScriptValue::String(message)
            }
        }
    }

    fn envelope(
        &self,
        engine: &dyn ScriptEngine,
        exception: HostException,
        message: &str,
    ) -> Result<ScriptValue, HostFailure> {
        let error = engine.make_error(message)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table.insert(id, Correlation { error, exception });

        let tagged = engine.set_property(
            error,
            &self.property,
            ScriptValue::Number(id as f64),
            PropertyAttributes::HIDDEN,
        );
        if let Err(thrown) = tagged {
            self.table.remove(&id);
            return Err(HostFailure::Message(engine.to_display_string(&thrown)));
        }
        debug!(id, message, "host failure wrapped");
        Ok(ScriptValue::Object(error))
    }

    /// The host failure a thrown script value stands for, if any
    pub fn correlate(&self, engine: &dyn ScriptEngine, thrown: &ScriptValue) -> Option<HostException> {
        let error = thrown.as_object()?;
        let id = engine.get_property(error, &self.property).ok()?.as_number()?;
        if id < 1.0 || id.fract() != 0.0 {
            return None;
        }
        self.table
            .get(&(id as u64))
            .filter(|entry| entry.error == error)
            .map(|entry| entry.exception.clone())
    }

    /// Translate a thrown script value for host callers: the original host
    /// failure when it is one, a script exception otherwise.
    pub fn script_to_host(&self, engine: &dyn ScriptEngine, thrown: &ScriptValue) -> BridgeError {
        match self.correlate(engine, thrown) {
            Some(exception) => BridgeError::Host(exception),
            None => BridgeError::Script(ScriptException::from_value(engine, thrown)),
        }
    }

    /// Record a failure that takes precedence over the evaluation outcome.
    /// The first one recorded wins.
    pub fn set_pending(&self, exception: HostException) {
        let mut pending = self.pending.lock();
        if pending.is_none() {
            *pending = Some(exception);
        }
    }

    /// Take the pending failure
    pub fn take_pending(&self) -> Option<HostException> {
        self.pending.lock().take()
    }

    /// Forget every correlation. Called after each top-level evaluation.
    pub fn clear(&self) {
        self.table.clear();
    }

    /// Number of live correlations
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no correlation is live
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
