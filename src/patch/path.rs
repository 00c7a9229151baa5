//! Patch path normalization and evaluation
//!
//! Paths address nodes in a YAML document with a JSONPath-like subset:
//! dotted child access, bracketed quoted children, numeric indexes,
//! wildcards (`[*]`, `.*`) and filter predicates (`[?(@.field=='value')]`).
//! A legacy shorthand syntax (`deployments.name=backend.field`,
//! `deployments/0/field`) is rewritten to the canonical form by
//! `transform_path` before any evaluation.

use crate::error::RigError;
use crate::vars::value_to_string;
use anyhow::Result;
use serde_yaml::Value;

/// One concrete navigation step inside a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Child(String),
    Index(usize),
    Wildcard,
    Filter { field: Vec<String>, value: String },
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub segments: Vec<Segment>,
}

/// Rewrite legacy shorthand path syntax into the canonical form
///
/// `deployments.name=backend.field` becomes
/// `deployments[?(@.name=='backend')].field`; `deployments/0/field` becomes
/// `deployments[0].field`. Numeric filter values compare both as string and
/// number. This normalization is purely syntactic and precedes any path
/// resolution.
#[must_use]
#[inline]
pub fn transform_path(path: &str) -> String {
    if path.is_empty() || path.contains("[?(") {
        return path.to_owned();
    }

    // slash shorthand: segments separated by '/', numeric segments index
    if path.contains('/') && !path.contains('=') {
        let rooted = path.starts_with('/');
        let mut out = String::new();
        if rooted {
            out.push('$');
        }
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "*" {
                out.push_str("[*]");
            } else if segment.chars().all(|c| c.is_ascii_digit()) {
                out.push('[');
                out.push_str(segment);
                out.push(']');
            } else {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(segment);
            }
        }
        return out;
    }

    if !path.contains('=') {
        return path.to_owned();
    }

    // property=value shorthand attaches a filter to the previous segment
    let mut out = String::new();
    for segment in path.split('.') {
        if let Some((field, value)) = segment.split_once('=') {
            let numeric = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
            if numeric {
                out.push_str(&format!("[?(@.{field}=='{value}' || @.{field}=={value})]"));
            } else {
                out.push_str(&format!("[?(@.{field}=='{value}')]"));
            }
        } else {
            if !out.is_empty() && !segment.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
        }
    }
    out
}

/// Parse a canonical path into segments
///
/// # Errors
///
/// Returns an error for unbalanced brackets or unsupported filter syntax.
#[inline]
pub fn parse_path(path: &str) -> Result<PathExpr> {
    let mut segments = Vec::new();
    let chars: Vec<char> = path.chars().collect();
    let mut i = 0_usize;

    // optional root marker
    if chars.first() == Some(&'$') {
        i = 1;
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                if chars.get(i) == Some(&'*')
                    && matches!(chars.get(i + 1), None | Some('.') | Some('['))
                {
                    segments.push(Segment::Wildcard);
                    i += 1;
                } else {
                    let (name, next) = read_name(&chars, i);
                    if !name.is_empty() {
                        segments.push(Segment::Child(name));
                    }
                    i = next;
                }
            }
            '[' => {
                let close = find_bracket_close(&chars, i).ok_or_else(|| {
                    RigError::patch(format!("unbalanced brackets in path: {path}"))
                })?;
                let inner: String = chars[i + 1..close].iter().collect();
                segments.push(parse_bracket(&inner, path)?);
                i = close + 1;
            }
            _ => {
                let (name, next) = read_name(&chars, i);
                if !name.is_empty() {
                    segments.push(Segment::Child(name));
                }
                i = next;
            }
        }
    }

    Ok(PathExpr { segments })
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    let mut name = String::new();
    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
        name.push(chars[i]);
        i += 1;
    }
    (name, i)
}

fn find_bracket_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[open..].iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_bracket(inner: &str, path: &str) -> Result<Segment> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        let index = inner
            .parse::<usize>()
            .map_err(|_| RigError::patch(format!("invalid index in path: {path}")))?;
        return Ok(Segment::Index(index));
    }
    if let Some(stripped) = strip_quotes(inner) {
        return Ok(Segment::Child(stripped.to_owned()));
    }
    if let Some(filter) = inner.strip_prefix("?(") {
        let filter = filter.strip_suffix(')').ok_or_else(|| {
            RigError::patch(format!("unbalanced filter predicate in path: {path}"))
        })?;
        return parse_filter(filter, path);
    }
    Err(RigError::patch(format!("unsupported path segment [{inner}] in path: {path}")).into())
}

/// Parse a `@.field=='value'` comparison
///
/// A `|| @.field==value` alternative (emitted for numeric values by
/// `transform_path`) compares the same field, so only the first comparison
/// is kept.
fn parse_filter(filter: &str, path: &str) -> Result<Segment> {
    let first = filter.split("||").next().unwrap_or(filter).trim();
    let field_part = first.strip_prefix("@.").ok_or_else(|| {
        RigError::patch(format!("unsupported filter predicate in path: {path}"))
    })?;
    let Some((field, value)) = field_part.split_once("==") else {
        return Err(
            RigError::patch(format!("unsupported filter predicate in path: {path}")).into(),
        );
    };

    let field: Vec<String> = field.trim().split('.').map(ToOwned::to_owned).collect();
    let value = value.trim();
    let value = strip_quotes(value).unwrap_or(value);
    Ok(Segment::Filter {
        field,
        value: value.to_owned(),
    })
}

fn strip_quotes(s: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s.get(1..s.len() - 1);
        }
    }
    None
}

/// Resolve a path expression against a document
///
/// Returns the concrete location of every match; wildcard and filter
/// segments may produce multiple locations.
#[must_use]
#[inline]
pub fn resolve_path(expr: &PathExpr, doc: &Value) -> Vec<Vec<Step>> {
    let mut locations: Vec<Vec<Step>> = vec![Vec::new()];

    for segment in &expr.segments {
        let mut next = Vec::new();
        for location in &locations {
            let Some(node) = get(doc, location) else {
                continue;
            };
            match segment {
                Segment::Child(name) => {
                    if let Value::Mapping(mapping) = node {
                        if mapping.contains_key(Value::String(name.clone())) {
                            next.push(extend(location, Step::Key(name.clone())));
                        }
                    }
                }
                Segment::Index(index) => {
                    if let Value::Sequence(sequence) = node {
                        if *index < sequence.len() {
                            next.push(extend(location, Step::Index(*index)));
                        }
                    }
                }
                Segment::Wildcard => match node {
                    Value::Mapping(mapping) => {
                        for key in mapping.keys() {
                            if let Value::String(name) = key {
                                next.push(extend(location, Step::Key(name.clone())));
                            }
                        }
                    }
                    Value::Sequence(sequence) => {
                        for index in 0..sequence.len() {
                            next.push(extend(location, Step::Index(index)));
                        }
                    }
                    _ => {}
                },
                Segment::Filter { field, value } => match node {
                    Value::Sequence(sequence) => {
                        for (index, element) in sequence.iter().enumerate() {
                            if filter_matches(element, field, value) {
                                next.push(extend(location, Step::Index(index)));
                            }
                        }
                    }
                    Value::Mapping(mapping) => {
                        for (key, element) in mapping {
                            if let Value::String(name) = key {
                                if filter_matches(element, field, value) {
                                    next.push(extend(location, Step::Key(name.clone())));
                                }
                            }
                        }
                    }
                    _ => {}
                },
            }
        }
        locations = next;
    }

    locations
}

fn extend(location: &[Step], step: Step) -> Vec<Step> {
    let mut extended = location.to_vec();
    extended.push(step);
    extended
}

fn filter_matches(element: &Value, field: &[String], value: &str) -> bool {
    let mut node = element;
    for part in field {
        let Value::Mapping(mapping) = node else {
            return false;
        };
        let Some(child) = mapping.get(Value::String(part.clone())) else {
            return false;
        };
        node = child;
    }
    match node {
        Value::String(_) | Value::Bool(_) | Value::Number(_) => value_to_string(node) == value,
        _ => false,
    }
}

/// Navigate to the node at a concrete location
#[must_use]
#[inline]
pub fn get<'a>(doc: &'a Value, location: &[Step]) -> Option<&'a Value> {
    let mut node = doc;
    for step in location {
        node = match step {
            Step::Key(name) => node.as_mapping()?.get(Value::String(name.clone()))?,
            Step::Index(index) => node.as_sequence()?.get(*index)?,
        };
    }
    Some(node)
}

/// Navigate to the node at a concrete location, mutably
#[must_use]
#[inline]
pub fn get_mut<'a>(doc: &'a mut Value, location: &[Step]) -> Option<&'a mut Value> {
    let mut node = doc;
    for step in location {
        node = match step {
            Step::Key(name) => node
                .as_mapping_mut()?
                .get_mut(Value::String(name.clone()))?,
            Step::Index(index) => node.as_sequence_mut()?.get_mut(*index)?,
        };
    }
    Some(node)
}

/// The path with its final segment removed
#[must_use]
#[inline]
pub fn parent_path(path: &str) -> String {
    let Some(split) = last_segment_start(path) else {
        return String::new();
    };
    let parent = path.get(..split.cut_at).unwrap_or_default();
    parent.trim_end_matches('.').to_owned()
}

/// The name addressed by the final path segment
#[must_use]
#[inline]
pub fn child_name(path: &str) -> String {
    let Some(split) = last_segment_start(path) else {
        return String::new();
    };
    let child = path.get(split.child_from..).unwrap_or_default();
    let child = child.trim_start_matches(['.', '$']);
    let child = child.strip_suffix(']').unwrap_or(child);
    let child = child.strip_prefix('[').unwrap_or(child);
    strip_quotes(child).unwrap_or(child).to_owned()
}

struct SegmentSplit {
    cut_at: usize,
    child_from: usize,
}

/// Find where the final path segment begins, respecting brackets and quotes
fn last_segment_start(path: &str) -> Option<SegmentSplit> {
    if path.is_empty() {
        return None;
    }

    let chars: Vec<char> = path.chars().collect();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;

    for i in (0..chars.len()).rev() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 && i > 0 && chars.last() == Some(&']') {
                    // the path ends in a bracket group starting here
                    return Some(SegmentSplit {
                        cut_at: i,
                        child_from: i,
                    });
                }
            }
            '.' if depth == 0 => {
                return Some(SegmentSplit {
                    cut_at: i,
                    child_from: i + 1,
                });
            }
            _ => {}
        }
    }

    // single segment, possibly prefixed with '$'
    let trimmed = path.trim_start_matches('$');
    if trimmed.is_empty() {
        return None;
    }
    Some(SegmentSplit {
        cut_at: 0,
        child_from: path.len() - trimmed.len(),
    })
}
