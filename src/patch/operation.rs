//! Patch operations over YAML documents

use crate::error::RigError;
use crate::patch::path::{
    child_name, get, get_mut, parent_path, parse_path, resolve_path, transform_path, PathExpr,
    Segment, Step,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// The kind of a patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Remove,
    Replace,
}

impl Op {
    #[must_use]
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

/// A single patch operation from a profile definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operation {
    pub op: Op,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Operation {
    /// Apply this operation to a document in place
    ///
    /// # Errors
    ///
    /// `remove` and `replace` fail when the path matches nothing. `add`
    /// fails when the path addresses an existing scalar that is not a
    /// sequence element, or when missing parents cannot be synthesized.
    pub fn apply(&self, doc: &mut Value) -> Result<()> {
        let path = transform_path(&self.path);
        let expr = parse_path(&path)?;
        let matches = resolve_path(&expr, doc);

        match self.op {
            Op::Remove => self.remove(doc, &path, &expr, &matches),
            Op::Replace => self.replace(doc, &path, &matches),
            Op::Add => self.add(doc, &path, &matches),
        }
    }

    fn remove(
        &self,
        doc: &mut Value,
        path: &str,
        expr: &PathExpr,
        matches: &[Vec<Step>],
    ) -> Result<()> {
        if matches.is_empty() {
            return Err(self.missing_path(path));
        }

        // removal shifts sequence indices, so re-resolve after each one
        loop {
            let matches = resolve_path(expr, doc);
            let Some(location) = matches.first() else {
                return Ok(());
            };
            let Some((step, parent)) = location.split_last() else {
                *doc = Value::Null;
                return Ok(());
            };
            let node = get_mut(doc, parent)
                .ok_or_else(|| RigError::patch(format!("cannot resolve path: {path}")))?;
            match (step, node) {
                (Step::Key(name), Value::Mapping(mapping)) => {
                    mapping.remove(Value::String(name.clone()));
                }
                (Step::Index(index), Value::Sequence(sequence)) => {
                    sequence.remove(*index);
                }
                _ => return Err(RigError::patch(format!("cannot resolve path: {path}")).into()),
            }
        }
    }

    fn replace(&self, doc: &mut Value, path: &str, matches: &[Vec<Step>]) -> Result<()> {
        if matches.is_empty() {
            return Err(self.missing_path(path));
        }
        let value = self.value.clone().unwrap_or(Value::Null);
        for location in matches {
            if let Some(node) = get_mut(doc, location) {
                *node = value.clone();
            }
        }
        Ok(())
    }

    fn add(&self, doc: &mut Value, path: &str, matches: &[Vec<Step>]) -> Result<()> {
        let value = self.value.clone().unwrap_or(Value::Null);

        if !matches.is_empty() {
            return self.add_to_existing(doc, path, matches, &value);
        }

        // the path itself matches nothing: insert under its parent,
        // synthesizing missing containers along the way
        let parent = parent_path(path);
        let child = child_name(path);
        if child.is_empty() || child.starts_with("?(") || child == "*" {
            return Err(RigError::patch(format!("could not add using path: {path}")).into());
        }
        let child_step = if child.chars().all(|c| c.is_ascii_digit()) {
            Step::Index(
                child
                    .parse::<usize>()
                    .map_err(|_| RigError::patch(format!("could not add using path: {path}")))?,
            )
        } else {
            Step::Key(child)
        };

        let parent_expr = parse_path(&parent)?;
        let mut parents = resolve_path(&parent_expr, doc);
        if parents.is_empty() {
            let leaf = match child_step {
                Step::Index(_) => ContainerKind::Sequence,
                Step::Key(_) => ContainerKind::Mapping,
            };
            parents = vec![ensure_path(doc, &parent_expr.segments, leaf, path)?];
        }

        for location in &parents {
            let node = get_mut(doc, location)
                .ok_or_else(|| RigError::patch(format!("cannot resolve path: {path}")))?;
            insert_child(node, &child_step, value.clone(), path)?;
        }
        Ok(())
    }

    /// Add where the target path already exists
    ///
    /// Mappings merge the value's entries, sequences append it, and a
    /// scalar sequence element gets the value inserted before it. Any
    /// other existing target is a conflict.
    fn add_to_existing(
        &self,
        doc: &mut Value,
        path: &str,
        matches: &[Vec<Step>],
        value: &Value,
    ) -> Result<()> {
        for location in matches {
            let target = get(doc, location)
                .ok_or_else(|| RigError::patch(format!("cannot resolve path: {path}")))?;
            let is_mapping = target.is_mapping();
            let is_sequence = target.is_sequence();

            if is_mapping {
                let Value::Mapping(entries) = value else {
                    return Err(RigError::patch(format!(
                        "cannot add non-object value to object path '{path}'"
                    ))
                    .into());
                };
                if let Some(Value::Mapping(mapping)) = get_mut(doc, location) {
                    for (key, entry) in entries {
                        mapping.insert(key.clone(), entry.clone());
                    }
                }
            } else if is_sequence {
                if let Some(Value::Sequence(sequence)) = get_mut(doc, location) {
                    sequence.push(value.clone());
                }
            } else {
                // scalar element of a sequence: insert before it
                let Some((Step::Index(index), parent)) = location.split_last() else {
                    return Err(RigError::patch(format!(
                        "attempting add operation for non array/object path '{path}' which already exists"
                    ))
                    .into());
                };
                let index = *index;
                let Some(Value::Sequence(sequence)) = get_mut(doc, parent) else {
                    return Err(RigError::patch(format!(
                        "attempting add operation for non array/object path '{path}' which already exists"
                    ))
                    .into());
                };
                sequence.insert(index, value.clone());
            }
        }
        Ok(())
    }

    fn missing_path(&self, path: &str) -> anyhow::Error {
        RigError::patch(format!(
            "{} operation does not apply: doc is missing path: {path}",
            self.op.as_str()
        ))
        .into()
    }
}

/// Insert a value under a parent container at the final step
///
/// A null parent (an empty YAML key) is promoted to the container kind the
/// step implies; a scalar parent is a conflict.
fn insert_child(node: &mut Value, child: &Step, value: Value, path: &str) -> Result<()> {
    if node.is_null() {
        *node = match child {
            Step::Index(_) => Value::Sequence(Vec::new()),
            Step::Key(_) => Value::Mapping(Mapping::new()),
        };
    }

    match (&mut *node, child) {
        (Value::Mapping(mapping), Step::Key(name)) => {
            mapping.insert(Value::String(name.clone()), value);
            Ok(())
        }
        (Value::Sequence(sequence), Step::Index(index)) => {
            if *index > sequence.len() {
                return Err(RigError::patch(format!("could not add using path: {path}")).into());
            }
            sequence.insert(*index, value);
            Ok(())
        }
        _ => Err(RigError::patch(format!(
            "attempting add operation for non array/object path '{path}' which already exists"
        ))
        .into()),
    }
}

#[derive(Clone, Copy)]
enum ContainerKind {
    Mapping,
    Sequence,
}

impl ContainerKind {
    fn empty(&self) -> Value {
        match self {
            Self::Mapping => Value::Mapping(Mapping::new()),
            Self::Sequence => Value::Sequence(Vec::new()),
        }
    }
}

/// Create the containers a parent path names, returning its location
///
/// Only plain child and index segments can be synthesized; each missing
/// container's kind is inferred from the segment that follows it.
fn ensure_path(
    doc: &mut Value,
    segments: &[Segment],
    leaf: ContainerKind,
    path: &str,
) -> Result<Vec<Step>> {
    let mut location: Vec<Step> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let kind = match segments.get(i + 1) {
            Some(Segment::Index(_)) => ContainerKind::Sequence,
            Some(_) => ContainerKind::Mapping,
            None => leaf,
        };
        let node = get_mut(doc, &location)
            .ok_or_else(|| RigError::patch(format!("cannot resolve path: {path}")))?;
        if node.is_null() {
            *node = match segment {
                Segment::Index(_) => Value::Sequence(Vec::new()),
                _ => Value::Mapping(Mapping::new()),
            };
        }
        match segment {
            Segment::Child(name) => {
                let Value::Mapping(mapping) = node else {
                    return Err(RigError::patch(format!(
                        "attempting add operation for non array/object path '{path}' which already exists"
                    ))
                    .into());
                };
                let key = Value::String(name.clone());
                if !mapping.contains_key(&key) {
                    mapping.insert(key, kind.empty());
                }
                location.push(Step::Key(name.clone()));
            }
            Segment::Index(index) => {
                let Value::Sequence(sequence) = node else {
                    return Err(RigError::patch(format!(
                        "attempting add operation for non array/object path '{path}' which already exists"
                    ))
                    .into());
                };
                if *index > sequence.len() {
                    return Err(
                        RigError::patch(format!("could not add using path: {path}")).into()
                    );
                }
                if *index == sequence.len() {
                    sequence.push(kind.empty());
                }
                location.push(Step::Index(*index));
            }
            Segment::Wildcard | Segment::Filter { .. } => {
                return Err(RigError::patch(format!("could not add using path: {path}")).into());
            }
        }
    }

    Ok(location)
}

/// Apply a sequence of operations to a document, in order, fail fast
///
/// # Errors
///
/// Returns the first operation error, annotated with its index and path.
pub fn apply_patches(doc: &mut Value, operations: &[Operation]) -> Result<()> {
    for (i, operation) in operations.iter().enumerate() {
        operation.apply(doc).map_err(|err| {
            RigError::patch(format!(
                "error applying patch {i} with path '{}': {err}",
                operation.path
            ))
        })?;
    }
    Ok(())
}
