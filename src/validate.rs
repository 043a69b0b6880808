//! Structural validation of caller-supplied arguments.
//!
//! Checks presence of required parameters, coerces loosely typed values to
//! the declared type and fills in defaults. Semantic checks (is this a legal
//! timestamp, does this codec exist) are left to the external tools.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::catalog::{OperationDescriptor, ParamSpec, ParamType};

/// Caller arguments after validation and default substitution.
///
/// Unknown keys from the caller are kept as they were received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationReason {
    MissingRequired,
    TypeMismatch { expected: ParamType },
    UnsupportedValue { allowed: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub parameter: String,
    #[serde(flatten)]
    pub reason: ValidationReason,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ValidationReason::MissingRequired => {
                write!(f, "missing_required: parameter '{}' is required", self.parameter)
            }
            ValidationReason::TypeMismatch { expected } => {
                write!(f, "type_mismatch: parameter '{}' must be {}", self.parameter, expected)
            }
            ValidationReason::UnsupportedValue { allowed } => write!(
                f,
                "unsupported_value: parameter '{}' must be one of {}",
                self.parameter,
                allowed.join(", ")
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate `raw` against `descriptor`. Never touches the filesystem.
pub fn validate(
    descriptor: &OperationDescriptor,
    raw: &Map<String, Value>,
) -> Result<ValidatedArgs, ValidationError> {
    let mut record = raw.clone();

    for spec in &descriptor.params {
        match raw.get(&spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = coerce(spec, value)?;
                check_choices(spec, &coerced)?;
                record.insert(spec.name.clone(), coerced);
            }
            None => {
                if let Some(default) = &spec.default {
                    record.insert(spec.name.clone(), default.clone());
                } else if descriptor.is_required(&spec.name) {
                    return Err(ValidationError {
                        parameter: spec.name.clone(),
                        reason: ValidationReason::MissingRequired,
                    });
                } else {
                    // explicit null for an optional parameter means "absent"
                    record.remove(&spec.name);
                }
            }
        }
    }

    Ok(ValidatedArgs(record))
}

fn mismatch(spec: &ParamSpec) -> ValidationError {
    ValidationError {
        parameter: spec.name.clone(),
        reason: ValidationReason::TypeMismatch {
            expected: spec.param_type,
        },
    }
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<Value, ValidationError> {
    let coerced = match spec.param_type {
        ParamType::String => coerce_string(value),
        ParamType::Integer => coerce_integer(value),
        ParamType::Number => coerce_number(value),
        ParamType::Boolean => coerce_boolean(value),
        ParamType::StringArray => match value {
            Value::Array(items) => items
                .iter()
                .map(coerce_string)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        },
    };
    coerced.ok_or_else(|| mismatch(spec))
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn check_choices(spec: &ParamSpec, value: &Value) -> Result<(), ValidationError> {
    if !spec.strict_choices {
        return Ok(());
    }
    let allowed = value
        .as_str()
        .map(|s| spec.choices.iter().any(|choice| choice == s))
        .unwrap_or(false);
    if allowed {
        Ok(())
    } else {
        Err(ValidationError {
            parameter: spec.name.clone(),
            reason: ValidationReason::UnsupportedValue {
                allowed: spec.choices.clone(),
            },
        })
    }
}
