//! Shell expression resolution
//!
//! A string consisting entirely of `$(...)`, `$#(...)` or `$!(...)` is a
//! config expression: the parenthesized body is executed as a shell command
//! in the config directory and the captured stdout is substituted. The `#`
//! modifier keeps raw stdout (trailing newline included) for expressions
//! whose output must preserve exact formatting; the `!` modifier suppresses
//! type coercion of the result.
//!
//! Expressions are not cached between resolution passes within a single
//! load; callers needing to avoid duplicate side effects use exclusion lists
//! keyed by document path. No timeout is enforced, a hung expression hangs
//! the whole config load.

use crate::error::RigError;
use crate::system::System;
use crate::walk;
use anyhow::{Context as _, Result};
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::LazyLock;

/// Matches a string that is entirely a config expression
pub static EXPRESSION_MATCH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\$(\$)?(#)?(!)?\((.+)\)$")
        .unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Check whether a document path is excluded from resolution
///
/// A path is excluded when it matches any exclusion pattern, or when an
/// inclusion list is present and the path matches none of its patterns.
#[must_use]
#[inline]
pub fn excluded_path(path: &str, exclude: &[Regex], include: &[Regex]) -> bool {
    if exclude.iter().any(|expr| expr.is_match(path)) {
        return true;
    }
    if !include.is_empty() {
        return !include.iter().any(|expr| expr.is_match(path));
    }
    false
}

/// Compile glob-style document path patterns into anchored regexes
///
/// `**` spans path segments, `*` matches within a single segment.
///
/// # Errors
///
/// Returns an error if a pattern does not compile into a valid regex.
#[inline]
pub fn compile_path_patterns(paths: &[&str]) -> Result<Vec<Regex>> {
    let mut compiled = Vec::with_capacity(paths.len());
    for path in paths {
        let pattern = format!("^{}$", path.replace("**", ".+").replace('*', "[^/]+"));
        let expr = Regex::new(&pattern)
            .with_context(|| format!("Invalid document path pattern: {path}"))?;
        compiled.push(expr);
    }
    Ok(compiled)
}

/// Execute a shell command with the resolved variables exported
///
/// # Errors
///
/// Returns an error if the shell itself cannot be spawned.
#[inline]
pub fn execute_shell(
    command: &str,
    dir: &Path,
    system: &dyn System,
    variables: &HashMap<String, Value>,
) -> Result<Output> {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .envs(system.env_vars());
    // the config dir may only exist behind the system abstraction
    if dir.is_dir() {
        cmd.current_dir(dir);
    }
    for (name, value) in variables {
        cmd.env(name, crate::vars::value_to_string(value));
    }

    cmd.output()
        .with_context(|| format!("Failed to execute shell command: {command}"))
}

/// Resolve a single expression string
///
/// Strings that are not expressions are returned unchanged. The `$$(...)`
/// escape drops one leading `$` and skips execution.
///
/// # Errors
///
/// Returns an error if:
/// - The shell cannot be spawned
/// - The command exits non-zero (stdout/stderr are included for diagnostics)
#[inline]
pub fn resolve_expressions(
    value: &str,
    dir: &Path,
    system: &dyn System,
    variables: &HashMap<String, Value>,
) -> Result<Value> {
    let Some(captures) = EXPRESSION_MATCH_REGEX.captures(value) else {
        return Ok(Value::String(value.to_owned()));
    };

    // escaped expression: emit the literal without the first dollar
    if captures.get(1).is_some() {
        return Ok(Value::String(value.get(1..).unwrap_or_default().to_owned()));
    }

    let raw = captures.get(2).is_some();
    let force_string = captures.get(3).is_some();
    let body = captures
        .get(4)
        .map(|m| m.as_str())
        .unwrap_or_default();

    let output = execute_shell(body, dir, system, variables)?;
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RigError::expression(format!(
            "error executing config expression {body}: exit code {} (stdout: {}, stderr: {})",
            output.status.code().unwrap_or(-1),
            stdout.trim(),
            stderr.trim()
        ))
        .into());
    }

    let mut out = String::from_utf8_lossy(&output.stdout).into_owned();
    if !raw {
        out = out.trim().to_owned();
    }

    if force_string {
        return Ok(Value::String(out));
    }

    Ok(coerce_expression_output(&out))
}

/// Progressive interpretation of expression output
///
/// bool, then int, then null, then YAML mapping, then YAML sequence; the
/// first successful interpretation wins, otherwise the raw string is kept.
fn coerce_expression_output(out: &str) -> Value {
    match out {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "" | "null" | "undefined" => return Value::Null,
        _ => {}
    }
    if let Ok(number) = out.parse::<i64>() {
        return Value::Number(number.into());
    }
    if let Ok(mapping) = serde_yaml::from_str::<serde_yaml::Mapping>(out) {
        return Value::Mapping(mapping);
    }
    if let Ok(sequence) = serde_yaml::from_str::<Vec<Value>>(out) {
        return Value::Sequence(sequence);
    }
    Value::String(out.to_owned())
}

/// Resolve every expression found in the document tree in place
///
/// # Errors
///
/// Returns an error if any expression fails; the walk aborts immediately.
#[inline]
pub fn resolve_all_expressions(
    haystack: &mut Value,
    dir: &Path,
    system: &dyn System,
    exclude: &[Regex],
    include: &[Regex],
    variables: &HashMap<String, Value>,
) -> Result<()> {
    walk::walk(
        haystack,
        &|path, _key, value| {
            EXPRESSION_MATCH_REGEX.is_match(value) && !excluded_path(path, exclude, include)
        },
        &mut |_path, value| resolve_expressions(value, dir, system, variables),
    )
}
