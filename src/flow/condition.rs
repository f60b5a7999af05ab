//! Screen gating conditions
//!
//! Declared either as a bare fact path (`"/isBlind"`) or as
//! `{"operator": "isFalseOrIncomplete", "condition": "/isBlind"}`.

use crate::error::FlowError;
use crate::fact::FactResult;
use crate::fact::FactValue;
use crate::graph::FactGraph;
use crate::path::{AbstractPath, ItemId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Has a value and it is true
    IsTrue,
    /// Complete and true; used for bare paths
    IsTrueAndComplete,
    IsTrueOrIncomplete,
    /// Has a value and it is false
    IsFalse,
    IsFalseAndComplete,
    /// Complete and false, or not yet complete
    IsFalseOrIncomplete,
    IsComplete,
    IsIncomplete,
}

impl ConditionOperator {
    /// Operators that read the fact's boolean value
    pub fn reads_boolean(self) -> bool {
        !matches!(self, ConditionOperator::IsComplete | ConditionOperator::IsIncomplete)
    }

    fn test(self, result: &FactResult<FactValue>) -> bool {
        let complete = result.complete();
        let truth = result.value().and_then(FactValue::as_bool);
        match self {
            ConditionOperator::IsTrue => result.has_value() && truth == Some(true),
            ConditionOperator::IsTrueAndComplete => complete && truth == Some(true),
            ConditionOperator::IsTrueOrIncomplete => !complete || truth == Some(true),
            ConditionOperator::IsFalse => result.has_value() && truth == Some(false),
            ConditionOperator::IsFalseAndComplete => complete && truth == Some(false),
            ConditionOperator::IsFalseOrIncomplete => !complete || truth == Some(false),
            ConditionOperator::IsComplete => complete,
            ConditionOperator::IsIncomplete => !complete,
        }
    }
}

/// Condition as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCondition {
    Path(String),
    Operator {
        operator: ConditionOperator,
        condition: String,
    },
}

/// A parsed condition over a boolean fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct Condition {
    pub path: AbstractPath,
    pub operator: ConditionOperator,
}

impl Condition {
    pub fn new(path: AbstractPath, operator: ConditionOperator) -> Self {
        Self { path, operator }
    }

    /// Parse a bare path condition
    pub fn parse(raw: &str) -> Result<Self, FlowError> {
        Self::try_from(RawCondition::Path(raw.to_string()))
    }

    /// Evaluate against the graph.
    ///
    /// A wildcard in the path is resolved with `collection_id`. Without an
    /// id, or when the path still cannot be resolved, the condition is false.
    pub fn evaluate(&self, graph: &FactGraph, collection_id: Option<&ItemId>) -> bool {
        let path = if self.path.is_abstract() {
            match collection_id {
                Some(id) => self.path.as_fact_path().resolve_first(id).and_then(|p| p.into_concrete()),
                None => {
                    warn!(path = %self.path, "Condition path needs a collection item but none was given");
                    return false;
                }
            }
        } else {
            self.path.to_concrete()
        };
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Condition path could not be resolved");
                return false;
            }
        };
        let result = match graph.get(&path) {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path, error = %e, "Condition fact could not be read");
                return false;
            }
        };
        let holds = self.operator.test(&result);
        debug!(path = %path, operator = ?self.operator, holds, "Evaluated condition");
        holds
    }
}

/// True when every condition holds (vacuously true for none)
pub fn all_hold(conditions: &[Condition], graph: &FactGraph, collection_id: Option<&ItemId>) -> bool {
    conditions.iter().all(|c| c.evaluate(graph, collection_id))
}

impl TryFrom<RawCondition> for Condition {
    type Error = FlowError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let (path, operator) = match raw {
            RawCondition::Path(path) => (path, ConditionOperator::IsTrueAndComplete),
            RawCondition::Operator {
                operator,
                condition,
            } => (condition, operator),
        };
        let parsed = AbstractPath::parse(&path).map_err(|e| FlowError::InvalidCondition {
            condition: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Condition {
            path: parsed,
            operator,
        })
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        match condition.operator {
            ConditionOperator::IsTrueAndComplete => RawCondition::Path(condition.path.to_string()),
            operator => RawCondition::Operator {
                operator,
                condition: condition.path.to_string(),
            },
        }
    }
}
