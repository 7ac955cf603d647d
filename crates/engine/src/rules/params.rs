//! Typed rule parameters and override merging.
//!
//! Each parameter declares its type through its default value; an override
//! is coerced against that declared type, never against the override's own
//! runtime shape. Coercion failure is a hard [`EngineError::InvalidOverride`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use ruletrace_core::EngineError;

/// A rule parameter value: a number, an integer, or a set of strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Number(f64),
    StringSet(Vec<String>),
}

impl ParamValue {
    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "integer",
            ParamValue::Number(_) => "number",
            ParamValue::StringSet(_) => "set of strings",
        }
    }

    /// Numeric view (ints widen to f64). `None` for string sets.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Number(n) => Some(*n),
            ParamValue::StringSet(_) => None,
        }
    }

    /// String-set view. `None` for numeric values.
    pub fn as_set(&self) -> Option<&[String]> {
        match self {
            ParamValue::StringSet(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Ordered parameter map (name → typed value). Insertion order is the
/// declaration order, kept stable so serialized defaults and traces do not
/// shuffle between calls.
pub type Params = IndexMap<String, ParamValue>;

// ── Override merging ─────────────────────────────────────────────────

/// Merge caller overrides onto a rule's defaults.
///
/// Partial merge: only named parameters are replaced, unknown names are
/// ignored. Each named value must coerce to the parameter's declared type.
pub fn merge_overrides(
    defaults: &Params,
    overrides: &serde_json::Map<String, Value>,
) -> Result<Params, EngineError> {
    let mut params = defaults.clone();
    for (name, value) in overrides {
        let Some(declared) = params.get(name) else {
            continue;
        };
        let coerced = coerce(value, declared).ok_or_else(|| EngineError::InvalidOverride {
            param: name.clone(),
            expected: declared.type_name(),
        })?;
        params.insert(name.clone(), coerced);
    }
    Ok(params)
}

/// Coerce a raw override value to the declared parameter type.
fn coerce(value: &Value, declared: &ParamValue) -> Option<ParamValue> {
    match declared {
        ParamValue::Number(_) => number_of(value).map(ParamValue::Number),
        ParamValue::Int(_) => number_of(value).map(|n| ParamValue::Int(n as i64)),
        ParamValue::StringSet(_) => match value {
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::StringSet),
            Value::String(s) => Some(ParamValue::StringSet(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        },
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────
