//! JSON form of a graph's committed state.
//!
//! An object mapping concrete paths to wrapped values:
//!
//! ```json
//! {
//!   "/wages": {"$type": "gov.irs.factgraph.persisters.DollarWrapper", "item": "50.00"},
//!   "/formW2s": {"$type": "gov.irs.factgraph.persisters.CollectionWrapper", "item": {"items": ["A"]}}
//! }
//! ```

use super::FactGraph;
use crate::error::GraphError;
use crate::fact::{FactDictionary, FactValue};
use crate::path::ConcretePath;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

impl FactGraph {
    /// Serialize committed facts; staged writes are not included
    pub fn to_json(&self) -> Result<Value, GraphError> {
        let mut object = Map::new();
        for (path, value) in &self.committed {
            let wrapped = serde_json::to_value(value).map_err(|e| GraphError::Persistence {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            object.insert(path.to_string(), wrapped);
        }
        Ok(Value::Object(object))
    }

    pub fn to_json_string(&self) -> Result<String, GraphError> {
        let value = self.to_json()?;
        serde_json::to_string(&value).map_err(|e| GraphError::Persistence {
            path: "/".to_string(),
            reason: e.to_string(),
        })
    }

    /// Rebuild a graph from persisted facts.
    ///
    /// Paths the dictionary does not define, derived facts, facts of removed
    /// items and references to removed items are dropped with a warning. A malformed wrapper or a
    /// value of the wrong type is an error.
    pub fn from_json(dictionary: Arc<FactDictionary>, json: &Value) -> Result<Self, GraphError> {
        let object = json.as_object().ok_or(GraphError::NotAnObject)?;
        let mut graph = FactGraph::new(dictionary);
        let mut dropped = 0usize;

        for (raw_path, wrapped) in object {
            let malformed = |reason: String| GraphError::Persistence {
                path: raw_path.clone(),
                reason,
            };
            let path = ConcretePath::parse(raw_path).map_err(|e| malformed(e.to_string()))?;
            let fact_type = match graph.dictionary.definition(&path.to_abstract()) {
                Some(definition) => match definition.writable_type() {
                    Some(fact_type) => fact_type.clone(),
                    None => {
                        warn!(path = %path, "Dropping persisted value of a derived fact");
                        dropped += 1;
                        continue;
                    }
                },
                None => {
                    warn!(path = %path, "Dropping persisted fact unknown to the dictionary");
                    dropped += 1;
                    continue;
                }
            };
            let value: FactValue =
                serde_json::from_value(wrapped.clone()).map_err(|e| malformed(e.to_string()))?;
            fact_type
                .check(&value)
                .map_err(|e| malformed(e.to_string()))?;
            graph.committed.insert(path, value);
        }

        let orphans = graph.purge_orphans();
        if orphans > 0 {
            warn!(orphans, "Dropped persisted facts of items no longer in their collection");
            dropped += orphans;
        }
        debug!(
            facts = graph.committed.len(),
            dropped, "Loaded fact graph from JSON"
        );
        Ok(graph)
    }

    pub fn from_json_str(dictionary: Arc<FactDictionary>, json: &str) -> Result<Self, GraphError> {
        let value: Value = serde_json::from_str(json).map_err(|e| GraphError::Persistence {
            path: "/".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(dictionary, &value)
    }
}
