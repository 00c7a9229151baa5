//! Placeholder tokenization and substitution
//!
//! Grammar: a run of `$` characters immediately followed by `{...}` is a
//! candidate token. Two or more consecutive `$` before the brace escape the
//! token: exactly one leading `$` is dropped and the braces are emitted
//! literally. A single `$` followed by `!{` forces the resolved value to its
//! string representation even when the resolver returns a native type.

use crate::error::RigError;
use crate::vars::{convert_string_value, value_to_string};
use anyhow::Result;
use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

/// Matches any candidate variable token inside a string
pub static VAR_MATCH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$+!?\{[^{}]+\}").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Resolver callback: variable name in, resolved value out.
pub type ResolveFn<'a> = dyn FnMut(&str) -> Result<Value> + 'a;

/// Substitute all variable tokens in `value`
///
/// Tokens are resolved left-to-right and concatenated with the untouched
/// text between them. After all substitutions, if the entire resulting
/// string parses as an integer or boolean literal, the native value is
/// returned instead of the string. A string without tokens is returned
/// unchanged and `resolve` is never called.
///
/// # Errors
///
/// Returns an error if:
/// - A token has an unbalanced closing brace
/// - The resolver callback returns an error (aborts immediately)
#[inline]
pub fn parse_string(value: &str, resolve: &mut ResolveFn) -> Result<Value> {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut tokens = 0_usize;
    let mut escapes = 0_usize;
    let mut whole_token_value: Option<Value> = None;
    let mut whole_stringify = false;

    let mut i = 0_usize;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        // count the run of dollar signs
        let start = i;
        let mut dollars = 0_usize;
        while i < chars.len() && chars[i] == '$' {
            dollars += 1;
            i += 1;
        }

        let stringify = i < chars.len() && chars[i] == '!';
        let brace = i + usize::from(stringify);
        if brace >= chars.len() || chars[brace] != '{' {
            // not a candidate token, emit the run untouched
            out.extend(&chars[start..i]);
            continue;
        }

        let Some(close) = chars[brace..].iter().position(|&c| c == '}') else {
            return Err(RigError::variable(format!(
                "unterminated variable placeholder in: {value}"
            ))
            .into());
        };
        let close = brace + close;
        let body: String = chars[brace + 1..close].iter().collect();

        if dollars >= 2 {
            // escape: drop exactly one leading dollar, emit the rest literally
            escapes += 1;
            for _ in 0..dollars - 1 {
                out.push('$');
            }
            if stringify {
                out.push('!');
            }
            out.push('{');
            out.push_str(&body);
            out.push('}');
        } else {
            tokens += 1;
            let resolved = resolve(body.trim())?;
            if start == 0 && close == chars.len() - 1 && tokens == 1 {
                if stringify {
                    whole_stringify = true;
                } else {
                    whole_token_value = Some(resolved.clone());
                }
            }
            out.push_str(&value_to_string(&resolved));
        }

        i = close + 1;
    }

    if tokens == 0 && escapes == 0 {
        return Ok(Value::String(value.to_owned()));
    }

    // a single stringify token spanning the whole string skips coercion
    if whole_stringify {
        return Ok(Value::String(out));
    }

    // a single token spanning the whole string keeps its native type
    if let Some(native) = whole_token_value {
        if !matches!(native, Value::String(_)) {
            return Ok(native);
        }
    }

    Ok(convert_string_value(&out))
}
