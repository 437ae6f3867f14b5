//! Built-in prototypes and globals
//!
//! Only what the bridge probes for and what test scripts need: `Date` with
//! its calendar accessors, arrays with `push`/`pop`/`join`, `Error`, and a
//! few conversion helpers.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use tether_sdk::{DateFields, ObjectHandle, PropertyAttributes, ScriptResult, ScriptValue};

use crate::engine::TestEngine;
use crate::heap::{NativeFunction, ObjectKind};

/// Largest time value a date can hold, in milliseconds
const MAX_TIME_MS: f64 = 8.64e15;

/// Install prototypes and globals
pub(crate) fn install(engine: &TestEngine) {
    let realm = engine.realm;

    method(engine, realm.object_prototype, "toString", object_to_string);
    method(engine, realm.function_prototype, "toString", function_to_string);

    engine.define_own(realm.array_prototype, "length", ScriptValue::Number(0.0), PropertyAttributes::NONE);
    method(engine, realm.array_prototype, "push", array_push);
    method(engine, realm.array_prototype, "pop", array_pop);
    method(engine, realm.array_prototype, "join", array_join);
    method(engine, realm.array_prototype, "indexOf", array_index_of);
    method(engine, realm.array_prototype, "toString", array_join);

    method(engine, realm.date_prototype, "getFullYear", date_get_full_year);
    method(engine, realm.date_prototype, "getMonth", date_get_month);
    method(engine, realm.date_prototype, "getDate", date_get_date);
    method(engine, realm.date_prototype, "getHours", date_get_hours);
    method(engine, realm.date_prototype, "getMinutes", date_get_minutes);
    method(engine, realm.date_prototype, "getSeconds", date_get_seconds);
    method(engine, realm.date_prototype, "getTime", date_get_time);
    method(engine, realm.date_prototype, "toString", date_to_string);

    engine.define_own(realm.error_prototype, "name", "Error".into(), PropertyAttributes::NONE);
    engine.define_own(realm.error_prototype, "message", "".into(), PropertyAttributes::NONE);
    method(engine, realm.error_prototype, "toString", error_to_string);

    global(engine, "Date", date_call, Some(date_construct));
    global(engine, "Error", error_construct, Some(error_construct));
    global(engine, "String", string_call, None);
    global(engine, "isNaN", is_nan_call, None);
    engine.globals.define("NaN", ScriptValue::Number(f64::NAN));
    engine.globals.define("Infinity", ScriptValue::Number(f64::INFINITY));
    engine.globals.define("undefined", ScriptValue::Undefined);
}

fn method(
    engine: &TestEngine,
    target: ObjectHandle,
    name: &'static str,
    call: fn(&TestEngine, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue>,
) {
    let function = engine.alloc_native(NativeFunction {
        name,
        call,
        construct: None,
    });
    engine.define_own(target, name, ScriptValue::Object(function), PropertyAttributes::NONE);
}

fn global(
    engine: &TestEngine,
    name: &'static str,
    call: fn(&TestEngine, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue>,
    construct: Option<fn(&TestEngine, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue>>,
) {
    let function = engine.alloc_native(NativeFunction { name, call, construct });
    engine.globals.define(name, ScriptValue::Object(function));
}

fn arg(args: &[ScriptValue], index: usize) -> ScriptValue {
    args.get(index).cloned().unwrap_or_default()
}

// ============================================================================
// Number formatting
// ============================================================================

/// Format a number the way scripts print it
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse a string the way `Number(string)` does
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

// ============================================================================
// Object / Function
// ============================================================================

fn object_to_string(_engine: &TestEngine, _this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    Ok("[object Object]".into())
}

fn function_to_string(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let name = engine.get_value(this, "name")?;
    Ok(ScriptValue::String(format!(
        "function {}() {{ [native code] }}",
        engine.display(&name)
    )))
}

fn string_call(engine: &TestEngine, _this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    Ok(ScriptValue::String(match args.first() {
        Some(value) => engine.display(value),
        None => String::new(),
    }))
}

fn is_nan_call(engine: &TestEngine, _this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    Ok(ScriptValue::Bool(engine.to_number(&arg(args, 0)).is_nan()))
}

// ============================================================================
// Array
// ============================================================================

fn this_array(engine: &TestEngine, this: &ScriptValue) -> ScriptResult<ObjectHandle> {
    match this {
        ScriptValue::Object(handle) if engine.array_items(*handle).is_some() => Ok(*handle),
        _ => Err(engine.throw_error("TypeError", "receiver is not an array")),
    }
}

fn with_items<R>(engine: &TestEngine, array: ObjectHandle, f: impl FnOnce(&mut Vec<ScriptValue>) -> R) -> Option<R> {
    let mut heap = engine.heap.borrow_mut();
    match &mut heap.get_mut(array)?.kind {
        ObjectKind::Array(items) => Some(f(items)),
        _ => None,
    }
}

fn array_push(engine: &TestEngine, this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let array = this_array(engine, this)?;
    let length = with_items(engine, array, |items| {
        items.extend_from_slice(args);
        items.len()
    })
    .unwrap_or_default();
    Ok(ScriptValue::Number(length as f64))
}

fn array_pop(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let array = this_array(engine, this)?;
    Ok(with_items(engine, array, Vec::pop).flatten().unwrap_or_default())
}

fn array_join(engine: &TestEngine, this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let array = this_array(engine, this)?;
    let separator = match args.first() {
        None | Some(ScriptValue::Undefined) => ",".to_string(),
        Some(value) => engine.display(value),
    };
    let items = engine.array_items(array).unwrap_or_default();
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            ScriptValue::Undefined | ScriptValue::Null => String::new(),
            other => engine.display(other),
        })
        .collect();
    Ok(ScriptValue::String(parts.join(&separator)))
}

fn array_index_of(engine: &TestEngine, this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let array = this_array(engine, this)?;
    let needle = arg(args, 0);
    let position = engine
        .array_items(array)
        .unwrap_or_default()
        .iter()
        .position(|item| *item == needle);
    Ok(ScriptValue::Number(position.map_or(-1.0, |index| index as f64)))
}

// ============================================================================
// Date
// ============================================================================

/// Build a calendar value from script-style fields (0-based month),
/// normalizing overflow. `None` stands for an invalid date.
pub fn date_from_fields(fields: DateFields) -> Option<NaiveDateTime> {
    let DateFields {
        year,
        month,
        day,
        hour,
        minute,
        second,
    } = fields;
    if [year, month, day, hour, minute, second]
        .iter()
        .any(|value| !value.is_finite())
    {
        return None;
    }

    let months = year.trunc() * 12.0 + month.trunc();
    if months.abs() > 12.0 * 300_000.0 {
        return None;
    }
    let months = months as i64;
    let start = NaiveDate::from_ymd_opt(
        i32::try_from(months.div_euclid(12)).ok()?,
        months.rem_euclid(12) as u32 + 1,
        1,
    )?
    .and_hms_opt(0, 0, 0)?;

    let offset_ms = ((day.trunc() - 1.0) * 86_400.0 + hour.trunc() * 3_600.0 + minute.trunc() * 60.0 + second)
        * 1_000.0;
    if offset_ms.abs() > MAX_TIME_MS {
        return None;
    }
    start.checked_add_signed(Duration::milliseconds(offset_ms as i64))
}

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.and_hms_opt(0, 0, 0)
}

fn date_from_time(ms: f64) -> Option<NaiveDateTime> {
    if !ms.is_finite() || ms.abs() > MAX_TIME_MS {
        return None;
    }
    epoch()?.checked_add_signed(Duration::milliseconds(ms as i64))
}

fn this_date(engine: &TestEngine, this: &ScriptValue) -> ScriptResult<Option<NaiveDateTime>> {
    if let ScriptValue::Object(handle) = this {
        if let Some(object) = engine.heap.borrow().get(*handle) {
            if let ObjectKind::Date(value) = object.kind {
                return Ok(value);
            }
        }
    }
    Err(engine.throw_error("TypeError", "this is not a Date object."))
}

fn date_field(
    engine: &TestEngine,
    this: &ScriptValue,
    field: fn(&NaiveDateTime) -> f64,
) -> ScriptResult<ScriptValue> {
    let date = this_date(engine, this)?;
    Ok(ScriptValue::Number(date.as_ref().map_or(f64::NAN, field)))
}

fn date_get_full_year(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.year() as f64)
}

fn date_get_month(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.month0() as f64)
}

fn date_get_date(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.day() as f64)
}

fn date_get_hours(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.hour() as f64)
}

fn date_get_minutes(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.minute() as f64)
}

fn date_get_seconds(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| d.second() as f64)
}

fn date_get_time(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    date_field(engine, this, |d| {
        epoch().map_or(f64::NAN, |epoch| (*d - epoch).num_milliseconds() as f64)
    })
}

fn date_to_string(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let date = this_date(engine, this)?;
    Ok(ScriptValue::String(match date {
        Some(date) => date.format("%a %b %d %Y %H:%M:%S").to_string(),
        None => "Invalid Date".to_string(),
    }))
}

fn date_call(_engine: &TestEngine, _this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    Ok(ScriptValue::String(
        Local::now().naive_local().format("%a %b %d %Y %H:%M:%S").to_string(),
    ))
}

fn date_construct(engine: &TestEngine, _this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let value = match args {
        [] => Some(Local::now().naive_local()),
        [ScriptValue::String(text)] => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok(),
        [single] => date_from_time(engine.to_number(single)),
        _ => {
            let field = |index: usize, default: f64| args.get(index).map_or(default, |v| engine.to_number(v));
            date_from_fields(DateFields {
                year: field(0, f64::NAN),
                month: field(1, 0.0),
                day: field(2, 1.0),
                hour: field(3, 0.0),
                minute: field(4, 0.0),
                second: field(5, 0.0),
            })
        }
    };
    Ok(ScriptValue::Object(
        engine.alloc(ObjectKind::Date(value), engine.realm.date_prototype),
    ))
}

// ============================================================================
// Error
// ============================================================================

fn error_construct(engine: &TestEngine, _this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let message = match args.first() {
        None | Some(ScriptValue::Undefined) => String::new(),
        Some(value) => engine.display(value),
    };
    Ok(ScriptValue::Object(engine.new_error("Error", &message)))
}

fn error_to_string(engine: &TestEngine, this: &ScriptValue, _args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
    let name = engine.get_value(this, "name")?;
    let message = engine.get_value(this, "message")?;
    let name = if name.is_nullish() { "Error".to_string() } else { engine.display(&name) };
    let message = if message.is_nullish() { String::new() } else { engine.display(&message) };
    Ok(ScriptValue::String(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }))
}
