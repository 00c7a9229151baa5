//! Generic document tree traversal
//!
//! Walks a parsed YAML document and replaces matching string leaves in place.
//! Mappings and sequences are recursed into; non-string scalars are skipped
//! without a match test. The accumulated path is slash separated
//! (`images/app/image`, `deployments/0/name`) and exists purely for
//! diagnostics and exclusion-list matching.

use anyhow::Result;
use serde_yaml::Value;

/// Predicate deciding whether a string leaf should be replaced.
///
/// Receives `(path, key, value)`.
pub type MatchFn<'a> = dyn Fn(&str, &str, &str) -> bool + 'a;

/// Replacement callback, receives `(path, value)` and returns the new node.
///
/// The returned value may be of any kind; replacing a string with a mapping
/// or sequence is legal and common (expression output).
pub type ReplaceFn<'a> = dyn FnMut(&str, &str) -> Result<Value> + 'a;

/// Walk the document tree and replace matching string leaves in place
///
/// Traversal order across mapping keys follows document order, but callers
/// must not depend on key resolution order when multiple variables interact.
/// The first error returned by `replace` aborts the entire walk.
///
/// # Errors
///
/// Returns an error if:
/// - The replace callback returns an error for any matched leaf
#[inline]
pub fn walk(value: &mut Value, matcher: &MatchFn, replace: &mut ReplaceFn) -> Result<()> {
    walk_inner(value, "", "", matcher, replace)
}

fn walk_inner(
    value: &mut Value,
    path: &str,
    key: &str,
    matcher: &MatchFn,
    replace: &mut ReplaceFn,
) -> Result<()> {
    match value {
        Value::String(s) => {
            if matcher(path, key, s) {
                *value = replace(path, s)?;
            }
            Ok(())
        }
        Value::Mapping(mapping) => {
            for (k, v) in mapping.iter_mut() {
                let key_str = key_display(k);
                let child_path = join_path(path, &key_str);
                walk_inner(v, &child_path, &key_str, matcher, replace)?;
            }
            Ok(())
        }
        Value::Sequence(sequence) => {
            for (index, v) in sequence.iter_mut().enumerate() {
                let key_str = index.to_string();
                let child_path = join_path(path, &key_str);
                walk_inner(v, &child_path, &key_str, matcher, replace)?;
            }
            Ok(())
        }
        Value::Tagged(tagged) => walk_inner(&mut tagged.value, path, key, matcher, replace),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}/{key}")
    }
}

/// Render a mapping key for path accumulation
///
/// Non-string keys (numbers, booleans) are legal YAML; they only matter here
/// for diagnostics, so any stable rendering works.
fn key_display(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_owned(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}
