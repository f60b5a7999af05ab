//! Return Store
//!
//! Keeps the committed facts of each tax return between sessions. Records
//! hold the graph's persisted JSON, so a store outlives dictionary changes:
//! facts the dictionary no longer defines are dropped on load.

pub mod persistence;

pub use persistence::SledReturnStore;

use crate::error::{ApiError, StorageError};
use crate::fact::FactDictionary;
use crate::graph::FactGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A saved tax return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub return_id: String,
    /// Committed facts in the persisted JSON form
    pub facts: String,
    pub saved_at: DateTime<Utc>,
}

impl ReturnRecord {
    /// Snapshot a graph's committed facts; staged writes are not included
    pub fn from_graph(return_id: impl Into<String>, graph: &FactGraph) -> Result<Self, ApiError> {
        Ok(Self {
            return_id: return_id.into(),
            facts: graph.to_json_string()?,
            saved_at: Utc::now(),
        })
    }

    pub fn to_graph(&self, dictionary: Arc<FactDictionary>) -> Result<FactGraph, ApiError> {
        Ok(FactGraph::from_json_str(dictionary, &self.facts)?)
    }
}

/// Return Store interface
pub trait ReturnStore {
    fn get(&self, return_id: &str) -> Result<Option<ReturnRecord>, StorageError>;
    fn put(&self, record: &ReturnRecord) -> Result<(), StorageError>;

    /// Remove a return; false when it did not exist
    fn delete(&self, return_id: &str) -> Result<bool, StorageError>;

    /// Ids of every stored return, sorted
    fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Load a return's graph, or an empty graph when it has never been saved
    fn load_graph(
        &self,
        return_id: &str,
        dictionary: Arc<FactDictionary>,
    ) -> Result<FactGraph, ApiError> {
        match self.get(return_id)? {
            Some(record) => record.to_graph(dictionary),
            None => Ok(FactGraph::new(dictionary)),
        }
    }

    fn save_graph(&self, return_id: &str, graph: &FactGraph) -> Result<ReturnRecord, ApiError> {
        let record = ReturnRecord::from_graph(return_id, graph)?;
        self.put(&record)?;
        Ok(record)
    }
}
