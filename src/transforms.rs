//! Ready-made value transforms
//!
//! Each function returns a [`Transform`] that can be attached to any
//! extractor with [`Extractor::with_transform`](crate::Extractor::with_transform).
//! `null` passes through every transform unchanged, and string transforms
//! are applied element-wise to arrays.

use serde_json::{Number, Value};

use crate::error::TransformError;
use crate::extractors::Transform;

fn on_strings(f: impl Fn(&str) -> Result<Value, TransformError> + Send + Sync + 'static) -> Transform {
    Transform::new(move |value| map_strings(value, &f))
}

fn map_strings(value: &Value, f: &dyn Fn(&str) -> Result<Value, TransformError>) -> Result<Value, TransformError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => f(s),
        Value::Array(items) => items
            .iter()
            .map(|item| map_strings(item, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(TransformError::new(format!("expected a string, got {other}"))),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn trim() -> Transform {
    on_strings(|s| Ok(Value::String(s.trim().to_string())))
}

pub fn upper() -> Transform {
    on_strings(|s| Ok(Value::String(s.to_uppercase())))
}

pub fn lower() -> Transform {
    on_strings(|s| Ok(Value::String(s.to_lowercase())))
}

/// Capitalize the first letter of every word, lowercase the rest
pub fn title() -> Transform {
    on_strings(|s| {
        let mut out = String::with_capacity(s.len());
        let mut word_start = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                word_start = false;
            } else {
                out.push(c);
                word_start = true;
            }
        }
        Ok(Value::String(out))
    })
}

/// The part of an IRI after its final `/` or `#`
pub fn local_name() -> Transform {
    on_strings(|s| {
        let trimmed = s.trim_end_matches(['/', '#']);
        let name = trimmed.rsplit(['/', '#']).next().unwrap_or(trimmed);
        Ok(Value::String(name.to_string()))
    })
}

pub fn parse_int() -> Transform {
    on_strings(|s| {
        s.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| TransformError::new(format!("`{s}` is not an integer: {e}")))
    })
}

pub fn parse_float() -> Transform {
    on_strings(|s| {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| TransformError::new(format!("`{s}` is not a number")))
    })
}

/// Join an array into one string; nulls are left out
pub fn join(separator: impl Into<String>) -> Transform {
    let separator = separator.into();
    Transform::new(move |value| match value {
        Value::Array(items) => Ok(Value::String(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(text_of)
                .collect::<Vec<_>>()
                .join(&separator),
        )),
        other => Ok(other.clone()),
    })
}

/// Split a string into an array
pub fn split(separator: impl Into<String>) -> Transform {
    let separator = separator.into();
    Transform::new(move |value| match value {
        Value::String(s) => Ok(Value::Array(
            s.split(separator.as_str())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )),
        other => Ok(other.clone()),
    })
}
