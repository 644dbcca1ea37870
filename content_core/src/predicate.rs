//! Predicate sets - partial constraints attached to content nodes.
//!
//! Every attribute a predicate set names must be present in the context and
//! satisfy its constraint; attributes it does not name are wildcards.

use game_state::{AttributeValue, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::NodeValidationError;

/// One constraint on one attribute.
///
/// Strings and booleans are compared for equality; integers are always
/// constrained by an inclusive range (an exact value is a range of width one).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Text(String),
    Flag(bool),
    Range { min: Option<i64>, max: Option<i64> },
}

impl Constraint {
    /// Check a context value against this constraint. Type mismatches fail.
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (Constraint::Text(expected), AttributeValue::Str(actual)) => expected == actual,
            (Constraint::Flag(expected), AttributeValue::Bool(actual)) => expected == actual,
            (Constraint::Range { min, max }, AttributeValue::Int(actual)) => {
                min.map_or(true, |lo| *actual >= lo) && max.map_or(true, |hi| *actual <= hi)
            }
            _ => false,
        }
    }

    /// The `(min, max)` pair if this is a range whose bounds are inverted.
    fn inverted_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Constraint::Range {
                min: Some(lo),
                max: Some(hi),
            } if lo > hi => Some((*lo, *hi)),
            _ => None,
        }
    }

    /// Decode an authored value: `"text"`, `true`, `3`, `[min, max]` or
    /// `{ "min": a, "max": b }` (one bound may be omitted or null, not both).
    ///
    /// `Ok(None)` means the attribute was explicitly left unconstrained.
    fn from_config(value: &Value) -> Result<Option<Self>, String> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(Constraint::Flag(*b))),
            Value::String(s) => Ok(Some(Constraint::Text(s.clone()))),
            Value::Number(n) => {
                let v = n
                    .as_i64()
                    .ok_or_else(|| format!("{} is not an integer", n))?;
                Ok(Some(Constraint::Range {
                    min: Some(v),
                    max: Some(v),
                }))
            }
            Value::Array(items) => match items.as_slice() {
                [lo, hi] => range(bound(lo)?, bound(hi)?).map(Some),
                _ => Err(format!("range needs exactly 2 entries, got {}", items.len())),
            },
            Value::Object(map) => {
                let min = map.get("min").map(bound).transpose()?.flatten();
                let max = map.get("max").map(bound).transpose()?.flatten();
                range(min, max).map(Some)
            }
        }
    }
}

/// A range with no bounds would count toward specificity while matching
/// every integer.
fn range(min: Option<i64>, max: Option<i64>) -> Result<Constraint, String> {
    if min.is_none() && max.is_none() {
        return Err("range needs 'min' or 'max'".to_string());
    }
    Ok(Constraint::Range { min, max })
}

fn bound(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("range bound {} is not an integer", n)),
        other => Err(format!("range bound {} is not a number", other)),
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Text(s) => write!(f, "== \"{}\"", s),
            Constraint::Flag(b) => write!(f, "== {}", b),
            Constraint::Range { min, max } => match (min, max) {
                (Some(lo), Some(hi)) if lo == hi => write!(f, "== {}", lo),
                (Some(lo), Some(hi)) => write!(f, "in [{}, {}]", lo, hi),
                (Some(lo), None) => write!(f, ">= {}", lo),
                (None, Some(hi)) => write!(f, "<= {}", hi),
                (None, None) => write!(f, "any"),
            },
        }
    }
}

/// The eligibility requirement of a content node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PredicateSet {
    constraints: BTreeMap<String, Constraint>,
}

impl PredicateSet {
    /// An empty set - the catch-all that matches every context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(attribute.into(), constraint);
        self
    }

    pub fn with_text(self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(attribute, Constraint::Text(value.into()))
    }

    pub fn with_flag(self, attribute: impl Into<String>, value: bool) -> Self {
        self.with(attribute, Constraint::Flag(value))
    }

    pub fn with_range(self, attribute: impl Into<String>, min: i64, max: i64) -> Self {
        self.with(
            attribute,
            Constraint::Range {
                min: Some(min),
                max: Some(max),
            },
        )
    }

    pub fn with_exact(self, attribute: impl Into<String>, value: i64) -> Self {
        self.with_range(attribute, value, value)
    }

    pub fn get(&self, attribute: &str) -> Option<&Constraint> {
        self.constraints.get(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when every constrained attribute is present in `context` and
    /// satisfies its constraint.
    pub fn matches(&self, context: &Context) -> bool {
        self.constraints.iter().all(|(attribute, constraint)| {
            context
                .get(attribute)
                .is_some_and(|value| constraint.accepts(value))
        })
    }

    /// Number of constrained attributes. Higher is more specific.
    pub fn specificity(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_catch_all(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Reject ranges whose minimum exceeds their maximum.
    pub fn validate(&self, node_id: &str) -> Result<(), NodeValidationError> {
        for (attribute, constraint) in &self.constraints {
            if let Some((min, max)) = constraint.inverted_bounds() {
                return Err(NodeValidationError::MalformedRange {
                    id: node_id.to_string(),
                    attribute: attribute.clone(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Build from the authored `predicates` table of a node.
    pub fn from_config(
        node_id: &str,
        raw: &BTreeMap<String, Value>,
    ) -> Result<Self, NodeValidationError> {
        let mut set = PredicateSet::new();
        for (attribute, value) in raw {
            let constraint = Constraint::from_config(value).map_err(|reason| {
                NodeValidationError::BadPredicateValue {
                    id: node_id.to_string(),
                    attribute: attribute.clone(),
                    reason,
                }
            })?;
            if let Some(constraint) = constraint {
                set.constraints.insert(attribute.clone(), constraint);
            }
        }
        set.validate(node_id)?;
        Ok(set)
    }
}

impl std::fmt::Display for PredicateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.constraints.is_empty() {
            return f.write_str("{*}");
        }
        f.write_str("{")?;
        for (i, (attribute, constraint)) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", attribute, constraint)?;
        }
        f.write_str("}")
    }
}
