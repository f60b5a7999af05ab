//! Limits checked on staged writes at save time

use crate::fact::value::{FactValue, ValueKind};
use crate::path::{AbstractPath, ConcretePath};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Limit as declared in a dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitDeclaration {
    Max(BoundDeclaration),
    Min(BoundDeclaration),
    MaxLength(usize),
    MinLength(usize),
    Match(String),
}

/// `{"value": "100.00"}` or `{"fact": "/maxContribution"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundDeclaration {
    Value(String),
    Fact(String),
}

#[derive(Debug, Clone)]
pub enum Bound {
    Value(FactValue),
    /// Another fact's value, bound to the written fact's item scope
    Fact(AbstractPath),
}

#[derive(Debug, Clone)]
pub enum Limit {
    Max(Bound),
    Min(Bound),
    MaxLength(usize),
    MinLength(usize),
    Match(Regex),
}

/// A well-typed staged value that breaks one of its fact's limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitViolation {
    pub path: ConcretePath,
    pub limit: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {} (got {})",
            self.path, self.limit, self.expected, self.actual
        )
    }
}

impl Limit {
    pub fn name(&self) -> &'static str {
        match self {
            Limit::Max(_) => "Max",
            Limit::Min(_) => "Min",
            Limit::MaxLength(_) => "MaxLength",
            Limit::MinLength(_) => "MinLength",
            Limit::Match(_) => "Match",
        }
    }

    /// Whether this limit can apply to values of `kind`
    pub fn applies_to(&self, kind: ValueKind) -> bool {
        match self {
            Limit::Max(_) | Limit::Min(_) => kind.is_ordered(),
            Limit::MaxLength(_) | Limit::MinLength(_) | Limit::Match(_) => kind.is_textual(),
        }
    }

    /// Check a value, returning a violation when the limit is broken.
    ///
    /// `resolve` yields the complete value of a fact bound; an unknown bound
    /// cannot be violated.
    pub fn check(
        &self,
        path: &ConcretePath,
        value: &FactValue,
        resolve: impl Fn(&AbstractPath) -> Option<FactValue>,
    ) -> Option<LimitViolation> {
        let violation = |expected: String, actual: String| LimitViolation {
            path: path.clone(),
            limit: self.name().to_string(),
            expected,
            actual,
        };
        match self {
            Limit::Max(bound) | Limit::Min(bound) => {
                let bound_value = match bound {
                    Bound::Value(v) => v.clone(),
                    Bound::Fact(p) => resolve(p)?,
                };
                let ordering = value.compare(&bound_value)?;
                let broken = match self {
                    Limit::Max(_) => ordering == Ordering::Greater,
                    _ => ordering == Ordering::Less,
                };
                broken.then(|| violation(bound_value.to_string(), value.to_string()))
            }
            Limit::MaxLength(max) => {
                let len = value.text_len()?;
                (len > *max).then(|| violation(max.to_string(), len.to_string()))
            }
            Limit::MinLength(min) => {
                let len = value.text_len()?;
                (len < *min).then(|| violation(min.to_string(), len.to_string()))
            }
            Limit::Match(regex) => {
                let text = value.text()?;
                (!regex.is_match(text)).then(|| {
                    let pattern = regex.as_str();
                    let pattern = pattern
                        .strip_prefix("^(?:")
                        .and_then(|p| p.strip_suffix(")$"))
                        .unwrap_or(pattern);
                    violation(pattern.to_string(), text.to_string())
                })
            }
        }
    }
}

/// Compile a `Match` pattern so it must cover the whole value
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}
