//! Affinity constraint matching
//!
//! Constraints have the form `<key><op><value>`:
//!
//! - key: `label` (node labels) or `node` (node name or ID)
//! - op: `==`, `!=`, `=~` (regex match), `!~` (regex non-match)
//!
//! A node matches a constraint list when it satisfies every entry.
//! Constraints that fail to parse never match.

use crate::error::{GridError, Result};
use crate::grid::HostNode;
use regex::Regex;
use std::str::FromStr;

/// What a constraint is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKey {
    /// Node labels
    Label,
    /// Node name or ID
    Node,
}

/// Constraint operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Match,
    NotMatch,
}

impl Operator {
    const ALL: [(&'static str, Operator); 4] = [
        ("==", Operator::Eq),
        ("!=", Operator::NotEq),
        ("=~", Operator::Match),
        ("!~", Operator::NotMatch),
    ];
}

/// Parsed affinity constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    key: ConstraintKey,
    op: Operator,
    value: String,
    pattern: Option<Regex>,
}

impl Constraint {
    /// Constraint key
    pub fn key(&self) -> ConstraintKey {
        self.key
    }

    /// Constraint operator
    pub fn op(&self) -> Operator {
        self.op
    }

    /// Right-hand side as written
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Evaluate against a node
    pub fn matches(&self, node: &HostNode) -> bool {
        match self.op {
            Operator::Eq => self.any_equal(node),
            Operator::NotEq => !self.any_equal(node),
            Operator::Match => self.any_pattern(node),
            Operator::NotMatch => !self.any_pattern(node),
        }
    }

    fn any_equal(&self, node: &HostNode) -> bool {
        match self.key {
            ConstraintKey::Label => node.has_label(&self.value),
            ConstraintKey::Node => node.is_named(&self.value),
        }
    }

    fn any_pattern(&self, node: &HostNode) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        match self.key {
            ConstraintKey::Label => node.labels.iter().any(|l| pattern.is_match(l)),
            ConstraintKey::Node => [&node.name, &node.node_id, &node.id]
                .into_iter()
                .any(|ident| pattern.is_match(ident)),
        }
    }
}

impl FromStr for Constraint {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        let (pos, sym, op) = Operator::ALL
            .iter()
            .filter_map(|(sym, op)| s.find(sym).map(|pos| (pos, *sym, *op)))
            .min_by_key(|(pos, _, _)| *pos)
            .ok_or_else(|| GridError::InvalidConstraint(format!("missing operator in '{}'", s)))?;

        let key = match s[..pos].trim() {
            "label" => ConstraintKey::Label,
            "node" => ConstraintKey::Node,
            other => {
                return Err(GridError::InvalidConstraint(format!(
                    "unknown key '{}' in '{}'",
                    other, s
                )))
            }
        };

        let value = s[pos + sym.len()..].trim().to_string();
        if value.is_empty() {
            return Err(GridError::InvalidConstraint(format!("missing value in '{}'", s)));
        }

        let pattern = match op {
            Operator::Match | Operator::NotMatch => Some(Regex::new(&value).map_err(|e| {
                GridError::InvalidConstraint(format!("bad pattern in '{}': {}", s, e))
            })?),
            Operator::Eq | Operator::NotEq => None,
        };

        Ok(Self {
            key,
            op,
            value,
            pattern,
        })
    }
}

/// Check that every constraint parses. Meant for service-definition time.
pub fn validate<S: AsRef<str>>(constraints: &[S]) -> Result<()> {
    for constraint in constraints {
        constraint.as_ref().parse::<Constraint>()?;
    }
    Ok(())
}

/// Whether `node` satisfies every constraint
pub fn matches<S: AsRef<str>>(node: &HostNode, constraints: &[S]) -> bool {
    constraints.iter().all(|raw| match raw.as_ref().parse::<Constraint>() {
        Ok(constraint) => constraint.matches(node),
        Err(e) => {
            tracing::warn!("Ignoring node {} for unparsable affinity: {}", node.name, e);
            false
        }
    })
}
