//! Evaluation results with completeness metadata

use crate::error::MissingValue;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a fact.
///
/// `Complete` carries a definite value. `Placeholder` carries a value that is
/// shown but not yet determined (`has_value` without `complete`).
/// `Incomplete` means the value cannot be determined yet; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum FactResult<T> {
    Complete(T),
    Placeholder(T),
    Incomplete,
}

impl<T> FactResult<T> {
    pub fn complete(&self) -> bool {
        matches!(self, FactResult::Complete(_))
    }

    pub fn has_value(&self) -> bool {
        !matches!(self, FactResult::Incomplete)
    }

    /// The value; an error when there is none
    pub fn get(&self) -> Result<&T, MissingValue> {
        self.value().ok_or(MissingValue)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FactResult::Complete(v) | FactResult::Placeholder(v) => Some(v),
            FactResult::Incomplete => None,
        }
    }

    /// The value only when complete
    pub fn complete_value(&self) -> Option<&T> {
        match self {
            FactResult::Complete(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FactResult::Complete(v) | FactResult::Placeholder(v) => Some(v),
            FactResult::Incomplete => None,
        }
    }

    pub fn as_ref(&self) -> FactResult<&T> {
        match self {
            FactResult::Complete(v) => FactResult::Complete(v),
            FactResult::Placeholder(v) => FactResult::Placeholder(v),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FactResult<U> {
        match self {
            FactResult::Complete(v) => FactResult::Complete(f(v)),
            FactResult::Placeholder(v) => FactResult::Placeholder(f(v)),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }

    /// Chain a computation; a placeholder input demotes the output
    pub fn and_then<U>(self, f: impl FnOnce(T) -> FactResult<U>) -> FactResult<U> {
        match self {
            FactResult::Complete(v) => f(v),
            FactResult::Placeholder(v) => f(v).demote(),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }

    /// Like [`FactResult::and_then`] for a fallible computation
    pub fn try_and_then<U, E>(
        self,
        f: impl FnOnce(T) -> Result<FactResult<U>, E>,
    ) -> Result<FactResult<U>, E> {
        match self {
            FactResult::Complete(v) => f(v),
            FactResult::Placeholder(v) => Ok(f(v)?.demote()),
            FactResult::Incomplete => Ok(FactResult::Incomplete),
        }
    }

    /// Combine two results; the weaker completeness wins
    pub fn zip<U>(self, other: FactResult<U>) -> FactResult<(T, U)> {
        match (self, other) {
            (FactResult::Complete(a), FactResult::Complete(b)) => FactResult::Complete((a, b)),
            (FactResult::Incomplete, _) | (_, FactResult::Incomplete) => FactResult::Incomplete,
            (FactResult::Complete(a) | FactResult::Placeholder(a), FactResult::Complete(b) | FactResult::Placeholder(b)) => {
                FactResult::Placeholder((a, b))
            }
        }
    }

    /// Downgrade a complete result to a placeholder
    pub fn demote(self) -> FactResult<T> {
        match self {
            FactResult::Complete(v) => FactResult::Placeholder(v),
            other => other,
        }
    }

    /// Use `fallback` when this result has no value
    pub fn or_placeholder(self, fallback: Option<T>) -> FactResult<T> {
        match (self, fallback) {
            (FactResult::Incomplete, Some(v)) => FactResult::Placeholder(v),
            (result, _) => result,
        }
    }
}

impl<T> FromIterator<FactResult<T>> for FactResult<Vec<T>> {
    /// Incomplete if any element is; placeholder if any element is
    fn from_iter<I: IntoIterator<Item = FactResult<T>>>(iter: I) -> Self {
        let mut values = Vec::new();
        let mut complete = true;
        for result in iter {
            match result {
                FactResult::Complete(v) => values.push(v),
                FactResult::Placeholder(v) => {
                    complete = false;
                    values.push(v);
                }
                FactResult::Incomplete => return FactResult::Incomplete,
            }
        }
        if complete {
            FactResult::Complete(values)
        } else {
            FactResult::Placeholder(values)
        }
    }
}
