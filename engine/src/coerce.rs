//! Type coercion applied to each comparison a filter makes.
//!
//! Records carry native datetimes while filters arriving over the wire carry
//! strings. Before two values are compared, a datetime facing a string is
//! rendered as a string so equality and prefix tests behave the same no
//! matter which side holds the native value.

use crate::Value;
use std::borrow::Cow;

/// Canonical rendering of a datetime for comparison with a string.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Canonical rendering of a date for comparison with a string.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize a pair of values for comparison.
///
/// Only temporal-vs-string pairs are converted; everything else is borrowed
/// through untouched.
pub fn match_types<'a>(a: &'a Value, b: &'a Value) -> (Cow<'a, Value>, Cow<'a, Value>) {
    match (a, b) {
        (Value::DateTime(_) | Value::Date(_), Value::String(_)) => {
            (Cow::Owned(render(a)), Cow::Borrowed(b))
        }
        (Value::String(_), Value::DateTime(_) | Value::Date(_)) => {
            (Cow::Borrowed(a), Cow::Owned(render(b)))
        }
        _ => (Cow::Borrowed(a), Cow::Borrowed(b)),
    }
}

fn render(value: &Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::String(dt.format(TIMESTAMP_FORMAT).to_string()),
        Value::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        other => other.clone(),
    }
}
