//! Value conversion between script and host
//!
//! Script objects carry no type tag the bridge can rely on, so they are
//! classified by [`probe`]: a private slot marks a proxy, a prototype with
//! the calendar accessors marks a date, one with `push`/`pop`/`join` and a
//! `length` marks an array. Anything callable converts to its name, and
//! everything else to [`HostValue::Unmapped`].

use chrono::{Datelike, NaiveDate, Timelike};
use tether_sdk::{DateFields, ObjectHandle, ReferenceId, ScriptEngine, ScriptValue};
use tracing::{error, trace};

use crate::host::{Calendar, HostFailure, HostObject, HostResult, HostValue};
use crate::reference::ReferenceTable;
use crate::registry::ClassRegistry;

/// Default nesting depth beyond which values are not converted
pub const MAX_DEPTH: usize = 64;

/// Accessors a date prototype provides, in field order
const DATE_SHAPE: [&str; 6] = [
    "getFullYear",
    "getMonth",
    "getDate",
    "getHours",
    "getMinutes",
    "getSeconds",
];

/// Members an array prototype provides
const ARRAY_SHAPE: [&str; 4] = ["pop", "length", "push", "join"];

/// What a script object turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Proxy of a host object
    Proxy(ReferenceId),
    /// Calendar date
    Date,
    /// Array-like list
    Array,
    /// Function
    Callable,
    /// Anything else
    Plain,
}

/// Classify a script object by its shape
pub fn probe(engine: &dyn ScriptEngine, object: ObjectHandle) -> Capability {
    if let Some(id) = engine.private_slot(object) {
        return Capability::Proxy(id);
    }
    if let Some(prototype) = engine.prototype(object) {
        if has_shape(engine, prototype, &DATE_SHAPE) {
            return Capability::Date;
        }
        if has_shape(engine, prototype, &ARRAY_SHAPE) {
            return Capability::Array;
        }
    }
    if engine.is_function(object) {
        Capability::Callable
    } else {
        Capability::Plain
    }
}

fn has_shape(engine: &dyn ScriptEngine, prototype: ObjectHandle, members: &[&str]) -> bool {
    members.iter().all(|name| engine.has_property(prototype, name))
}

/// Converts values in both directions for one engine
pub struct ValueBridge<'a> {
    engine: &'a dyn ScriptEngine,
    references: &'a ReferenceTable,
    registry: &'a ClassRegistry,
    max_depth: usize,
}

impl<'a> ValueBridge<'a> {
    /// Create a converter over an engine and the bridge tables
    pub fn new(
        engine: &'a dyn ScriptEngine,
        references: &'a ReferenceTable,
        registry: &'a ClassRegistry,
        max_depth: usize,
    ) -> Self {
        Self {
            engine,
            references,
            registry,
            max_depth,
        }
    }

    // ========================================================================
    // Script -> Host
    // ========================================================================

    /// Convert a script value. Never fails: objects without a host
    /// counterpart become [`HostValue::Unmapped`].
    pub fn to_host(&self, value: &ScriptValue) -> HostValue {
        self.to_host_at(value, 0)
    }

    fn to_host_at(&self, value: &ScriptValue, depth: usize) -> HostValue {
        match value {
            ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
            ScriptValue::Bool(b) => HostValue::Bool(*b),
            ScriptValue::Number(n) => HostValue::Number(*n),
            ScriptValue::String(s) => HostValue::String(s.clone()),
            ScriptValue::Object(object) => {
                if depth >= self.max_depth {
                    trace!(depth, "conversion depth exceeded");
                    return HostValue::Unmapped;
                }
                self.object_to_host(*object, depth)
            }
        }
    }

    fn object_to_host(&self, object: ObjectHandle, depth: usize) -> HostValue {
        match probe(self.engine, object) {
            Capability::Proxy(id) => match self.references.get(id) {
                Ok(host) => HostValue::Object(host),
                Err(err) => {
                    error!(error = %err, "proxy points at a released reference");
                    debug_assert!(false, "{}", err);
                    HostValue::Null
                }
            },
            Capability::Date => self.date_to_host(object),
            Capability::Array => self.array_to_host(object, depth),
            Capability::Callable => match self.engine.get_property(object, "name") {
                Ok(name) => HostValue::String(self.engine.to_display_string(&name)),
                Err(_) => HostValue::Unmapped,
            },
            Capability::Plain => {
                trace!(object = object.as_u64(), "unmapped script object");
                HostValue::Unmapped
            }
        }
    }

    fn date_to_host(&self, object: ObjectHandle) -> HostValue {
        let mut fields = [0.0; 6];
        for (field, accessor) in fields.iter_mut().zip(DATE_SHAPE) {
            match self.call_accessor(object, accessor) {
                Some(n) if n.is_finite() => *field = n,
                _ => return HostValue::Null,
            }
        }
        let [year, month, day, hour, minute, second] = fields;
        NaiveDate::from_ymd_opt(year as i32, month as u32 + 1, day as u32)
            .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
            .map_or(HostValue::Null, HostValue::Date)
    }

    fn call_accessor(&self, object: ObjectHandle, name: &str) -> Option<f64> {
        let accessor = self.engine.get_property(object, name).ok()?.as_object()?;
        self.engine
            .call_function(accessor, &ScriptValue::Object(object), &[])
            .ok()?
            .as_number()
    }

    fn array_to_host(&self, object: ObjectHandle, depth: usize) -> HostValue {
        let length = self
            .engine
            .get_property(object, "length")
            .ok()
            .and_then(|value| value.as_number())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .unwrap_or(0.0) as u32;

        let items = (0..length)
            .map(|index| match self.engine.get_index(object, index) {
                Ok(item) => self.to_host_at(&item, depth + 1),
                Err(_) => HostValue::Null,
            })
            .collect();
        HostValue::Array(items)
    }

    // ========================================================================
    // Host -> Script
    // ========================================================================

    /// Convert a host value. Host objects become fresh proxies; an object
    /// of an unregistered class fails with `ClassUnregistered`.
    pub fn to_script(&self, value: &HostValue) -> HostResult<ScriptValue> {
        self.to_script_at(value, 0)
    }

    fn to_script_at(&self, value: &HostValue, depth: usize) -> HostResult<ScriptValue> {
        Ok(match value {
            HostValue::Null | HostValue::Unmapped => ScriptValue::Null,
            HostValue::Bool(b) => ScriptValue::Bool(*b),
            HostValue::Number(n) => ScriptValue::Number(*n),
            HostValue::Int(i) => ScriptValue::Number(*i as f64),
            HostValue::String(s) => ScriptValue::String(s.clone()),
            HostValue::Date(date) => ScriptValue::Object(self.engine.make_date(date_fields(date))?),
            HostValue::Array(items) => {
                if depth >= self.max_depth {
                    trace!(depth, "conversion depth exceeded");
                    return Ok(ScriptValue::Null);
                }
                let items = items
                    .iter()
                    .map(|item| self.to_script_at(item, depth + 1))
                    .collect::<HostResult<Vec<_>>>()?;
                ScriptValue::Object(self.engine.make_array(&items)?)
            }
            HostValue::Object(object) => ScriptValue::Object(self.expose(object)?),
        })
    }

    /// Wrap a host object in a fresh proxy of its registered class
    pub fn expose(&self, object: &HostObject) -> HostResult<ObjectHandle> {
        let class = self
            .registry
            .by_type(object.type_id())
            .ok_or_else(|| HostFailure::ClassUnregistered(object.type_name().to_string()))?;

        let id = self.references.alloc(object.clone());
        match self.engine.make_proxy(class.handle, id) {
            Ok(proxy) => Ok(proxy),
            Err(err) => {
                let _ = self.references.revoke(id);
                Err(err.into())
            }
        }
    }
}

/// Script date fields of a calendar value (month 0-based)
pub fn date_fields(date: &Calendar) -> DateFields {
    DateFields {
        year: date.year() as f64,
        month: date.month0() as f64,
        day: date.day() as f64,
        hour: date.hour() as f64,
        minute: date.minute() as f64,
        second: date.second() as f64,
    }
}
