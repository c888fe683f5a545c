//! Join Compiler - join fragments and ON-clause constraints for eager loading

use once_cell::sync::Lazy;
use regex::Regex;

use super::options::JoinEntry;
use crate::query::{JoinClause, JoinKind, WhereCondition};

static JOIN_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:(?:LEFT|RIGHT|INNER|OUTER|STRAIGHT)\s+)+JOIN\s+").expect("valid join keyword pattern")
});

static LEADING_INNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:LEFT\s+)?INNER\b").expect("valid inner join pattern"));

/// Compile one join fragment for the requested join kind.
///
/// A fragment without a join keyword is treated as a table reference and
/// prefixed; an authored INNER join is upgraded under an outer context. An
/// authored outer join is never downgraded. Blank fragments yield `None`.
pub fn compile_join(fragment: &str, kind: JoinKind) -> Option<String> {
    if fragment.trim().is_empty() {
        return None;
    }

    if !JOIN_KEYWORD.is_match(fragment) {
        let prefix = match kind {
            JoinKind::Outer => "LEFT OUTER",
            JoinKind::Inner => "INNER",
        };
        return Some(format!("{} JOIN {}", prefix, fragment));
    }

    match kind {
        JoinKind::Outer => Some(LEADING_INNER.replace(fragment, "LEFT OUTER").into_owned()),
        JoinKind::Inner => Some(fragment.to_string()),
    }
}

/// Compile every usable entry of a `joins` option, in order
pub fn compile_joins(entries: &[JoinEntry], kind: JoinKind) -> Vec<JoinClause> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            JoinEntry::Clause(fragment) => compile_join(fragment, kind),
            JoinEntry::Other(_) => None,
        })
        .map(JoinClause::Raw)
        .collect()
}

/// Constraint merged into the ON clause of an association join
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Contributes nothing: `Identity.and(c) == c`
    Identity,
    /// Conditions that precede any association conditions
    Conditions(Vec<WhereCondition>),
}

impl Constraint {
    pub fn and(self, conditions: Vec<WhereCondition>) -> Vec<WhereCondition> {
        match self {
            Constraint::Identity => conditions,
            Constraint::Conditions(mut constraint) => {
                constraint.extend(conditions);
                constraint
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Constraint::Identity)
    }
}

impl From<Option<WhereCondition>> for Constraint {
    fn from(condition: Option<WhereCondition>) -> Self {
        match condition {
            Some(condition) => Constraint::Conditions(vec![condition]),
            None => Constraint::Identity,
        }
    }
}
