//! Variable parsing and resolution
//!
//! Handles `${name}` / `$!{name}` / `$$` placeholder substitution, shell
//! expression evaluation and the session-scoped variable resolver that backs
//! configuration loading.

pub mod expression;
pub mod parser;
pub mod resolver;

pub use parser::{VAR_MATCH_REGEX, parse_string};
pub use resolver::Resolver;

use serde_yaml::Value;

/// Convert a raw string to its native value, mirroring placeholder coercion
///
/// Integer literals become integers, `true`/`false` become booleans,
/// everything else stays a string.
#[must_use]
#[inline]
pub fn convert_string_value(value: &str) -> Value {
    if let Ok(number) = value.parse::<i64>() {
        return Value::Number(number.into());
    }
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_owned()),
    }
}

/// Render a resolved value back into string form for concatenation
#[must_use]
#[inline]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_owned(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}
