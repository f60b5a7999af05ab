//! Fact graph: the mutable store of a single tax return.
//!
//! Writes are staged and become the committed baseline on [`FactGraph::save`].
//! Reads always see staged writes. Derived facts are evaluated on every read
//! and never stored.

mod eval;
pub mod persistence;

use crate::error::GraphError;
use crate::fact::{
    FactDefinition, FactDictionary, FactKind, FactResult, FactType, FactValue, LimitViolation,
};
use crate::fact::value::Collection;
use crate::path::{ConcretePath, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StagedWrite {
    Set(FactValue),
    Delete,
}

/// Result of [`FactGraph::save`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub valid: bool,
    pub limit_violations: Vec<LimitViolation>,
}

#[derive(Debug, Clone)]
pub struct FactGraph {
    dictionary: Arc<FactDictionary>,
    committed: BTreeMap<ConcretePath, FactValue>,
    staged: BTreeMap<ConcretePath, StagedWrite>,
}

impl FactGraph {
    /// Create an empty graph over a dictionary
    pub fn new(dictionary: Arc<FactDictionary>) -> Self {
        Self {
            dictionary,
            committed: BTreeMap::new(),
            staged: BTreeMap::new(),
        }
    }

    pub fn dictionary(&self) -> &FactDictionary {
        &self.dictionary
    }

    pub fn shared_dictionary(&self) -> Arc<FactDictionary> {
        Arc::clone(&self.dictionary)
    }

    /// Evaluate the fact at `path`
    pub fn get(&self, path: &ConcretePath) -> Result<FactResult<FactValue>, GraphError> {
        let definition = self.definition(path)?;
        self.check_membership(path)?;
        let result = match &definition.kind {
            FactKind::Writable(writable) => match self.current(path) {
                Some(value) => FactResult::Complete(value.clone()),
                None => match (&writable.default, &writable.placeholder) {
                    (Some(default), _) => FactResult::Complete(default.clone()),
                    (None, placeholder) => FactResult::Incomplete.or_placeholder(placeholder.clone()),
                },
            },
            FactKind::Collection => FactResult::Complete(
                self.current(path)
                    .cloned()
                    .unwrap_or_else(|| FactValue::Collection(Collection::default())),
            ),
            FactKind::Derived(derived) => eval::evaluate(self, &derived.expr, path)?
                .or_placeholder(derived.placeholder.clone()),
        };
        Ok(result)
    }

    /// Evaluate a fact given its path as text
    pub fn get_path(&self, raw: &str) -> Result<FactResult<FactValue>, GraphError> {
        let path = parse_concrete(raw)?;
        self.get(&path)
    }

    /// Stage a typed value
    pub fn set(&mut self, path: &ConcretePath, value: FactValue) -> Result<(), GraphError> {
        let fact_type = self.writable_type(path)?.clone();
        self.check_membership(path)?;
        fact_type.check(&value).map_err(|source| GraphError::Parse {
            path: path.to_string(),
            source,
        })?;
        if let (FactType::CollectionItem { collection }, FactValue::CollectionItem(item)) =
            (&fact_type, &value)
        {
            let collection = self.referenced_collection(path, collection)?;
            if !self.collection_items(&collection)?.contains(&item.id) {
                return Err(GraphError::UnknownItem {
                    collection: collection.to_string(),
                    item: item.id.to_string(),
                });
            }
        }
        debug!(path = %path, "Staged write");
        self.staged.insert(path.clone(), StagedWrite::Set(value));
        Ok(())
    }

    /// Parse user-entered text with the fact's type, then stage it
    pub fn set_raw(&mut self, path: &ConcretePath, raw: &str) -> Result<(), GraphError> {
        let value = self
            .writable_type(path)?
            .parse_raw(raw)
            .map_err(|source| GraphError::Parse {
                path: path.to_string(),
                source,
            })?;
        self.set(path, value)
    }

    /// Stage removal of a writable fact
    pub fn delete(&mut self, path: &ConcretePath) -> Result<(), GraphError> {
        self.writable_type(path)?;
        self.check_membership(path)?;
        debug!(path = %path, "Staged delete");
        self.staged.insert(path.clone(), StagedWrite::Delete);
        Ok(())
    }

    /// Validate staged writes against their limits and commit them.
    ///
    /// Any violation rejects the whole batch: nothing is committed and the
    /// staged writes are discarded.
    #[instrument(skip(self), fields(staged = self.staged.len()))]
    pub fn save(&mut self) -> SaveOutcome {
        let limit_violations = self.staged_violations();
        if !limit_violations.is_empty() {
            warn!(
                violations = limit_violations.len(),
                "Save rejected, staged writes discarded"
            );
            self.staged.clear();
            return SaveOutcome {
                valid: false,
                limit_violations,
            };
        }

        let staged = std::mem::take(&mut self.staged);
        let written = staged.len();
        for (path, write) in staged {
            match write {
                StagedWrite::Set(value) => {
                    self.committed.insert(path, value);
                }
                StagedWrite::Delete => {
                    self.committed.remove(&path);
                }
            }
        }
        let purged = self.purge_orphans();
        info!(written, purged, "Staged writes committed");
        SaveOutcome {
            valid: true,
            limit_violations: Vec::new(),
        }
    }

    fn staged_violations(&self) -> Vec<LimitViolation> {
        let mut violations = Vec::new();
        for (path, write) in &self.staged {
            let value = match write {
                StagedWrite::Set(value) => value,
                StagedWrite::Delete => continue,
            };
            if !self.is_live(path) {
                continue;
            }
            let definition = match self.definition(path) {
                Ok(definition) => definition,
                Err(_) => continue,
            };
            for limit in definition.limits() {
                let resolve = |bound: &crate::path::AbstractPath| {
                    bound
                        .bind(path)
                        .into_concrete()
                        .ok()
                        .and_then(|p| self.get(&p).ok())
                        .and_then(|r| r.complete_value().cloned())
                };
                if let Some(violation) = limit.check(path, value, resolve) {
                    debug!(%violation, "Limit violated");
                    violations.push(violation);
                }
            }
        }
        violations
    }

    /// Items of a collection, in order, as currently staged
    pub fn collection_items(&self, collection: &ConcretePath) -> Result<Vec<ItemId>, GraphError> {
        match self.get(collection)? {
            FactResult::Complete(FactValue::Collection(c)) => Ok(c.items),
            _ => Err(GraphError::NotACollection(collection.to_string())),
        }
    }

    /// Append an item, generating an id when none is given
    pub fn add_collection_item(
        &mut self,
        collection: &ConcretePath,
        id: Option<ItemId>,
    ) -> Result<ItemId, GraphError> {
        self.require_collection(collection)?;
        let mut items = self.collection_items(collection)?;
        let id = id.unwrap_or_else(ItemId::generate);
        if items.contains(&id) {
            return Err(GraphError::Parse {
                path: collection.to_string(),
                source: crate::error::ParseError::DuplicateItem(id.to_string()),
            });
        }
        items.push(id.clone());
        self.staged.insert(
            collection.clone(),
            StagedWrite::Set(FactValue::Collection(Collection { items })),
        );
        debug!(collection = %collection, item = %id, "Staged collection item");
        Ok(id)
    }

    /// Remove an item and stage removal of every fact under it
    pub fn remove_collection_item(
        &mut self,
        collection: &ConcretePath,
        id: &ItemId,
    ) -> Result<(), GraphError> {
        self.require_collection(collection)?;
        let mut items = self.collection_items(collection)?;
        let before = items.len();
        items.retain(|existing| existing != id);
        if items.len() == before {
            return Err(GraphError::UnknownItem {
                collection: collection.to_string(),
                item: id.to_string(),
            });
        }
        self.staged.insert(
            collection.clone(),
            StagedWrite::Set(FactValue::Collection(Collection { items })),
        );

        // Clear the item's sub-tree now, so re-adding the id starts empty
        let item_root = collection.item(id);
        let subtree: Vec<ConcretePath> = self
            .committed
            .keys()
            .chain(self.staged.keys())
            .filter(|path| path.starts_with(&item_root))
            .cloned()
            .collect();
        for path in subtree {
            self.staged.insert(path, StagedWrite::Delete);
        }
        debug!(collection = %collection, item = %id, "Staged collection item removal");
        Ok(())
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn pending_paths(&self) -> Vec<&ConcretePath> {
        self.staged.keys().collect()
    }

    /// Drop every staged write
    pub fn discard(&mut self) {
        if !self.staged.is_empty() {
            debug!(discarded = self.staged.len(), "Discarded staged writes");
        }
        self.staged.clear();
    }

    /// Paths with a committed value
    pub fn committed_paths(&self) -> impl Iterator<Item = &ConcretePath> {
        self.committed.keys()
    }

    /// True when every item segment of `path` names a current member
    pub fn is_live(&self, path: &ConcretePath) -> bool {
        self.check_membership(path).is_ok()
    }

    fn current(&self, path: &ConcretePath) -> Option<&FactValue> {
        match self.staged.get(path) {
            Some(StagedWrite::Set(value)) => Some(value),
            Some(StagedWrite::Delete) => None,
            None => self.committed.get(path),
        }
    }

    fn definition(&self, path: &ConcretePath) -> Result<&FactDefinition, GraphError> {
        self.dictionary
            .definition(&path.to_abstract())
            .ok_or_else(|| GraphError::UnknownFact(path.to_string()))
    }

    fn writable_type(&self, path: &ConcretePath) -> Result<&FactType, GraphError> {
        self.definition(path)?
            .writable_type()
            .ok_or_else(|| GraphError::NotWritable(path.to_string()))
    }

    fn require_collection(&self, path: &ConcretePath) -> Result<(), GraphError> {
        if self.definition(path)?.is_collection() {
            Ok(())
        } else {
            Err(GraphError::NotACollection(path.to_string()))
        }
    }

    fn check_membership(&self, path: &ConcretePath) -> Result<(), GraphError> {
        for (collection, id) in path.memberships() {
            let member = self
                .current(&collection)
                .and_then(FactValue::as_collection)
                .map_or(false, |c| c.contains(id));
            if !member {
                return Err(GraphError::UnknownItem {
                    collection: collection.to_string(),
                    item: id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Concrete path of the collection a `CollectionItem` fact refers to
    fn referenced_collection(
        &self,
        path: &ConcretePath,
        collection: &str,
    ) -> Result<ConcretePath, GraphError> {
        let owner = path.to_abstract();
        let target = owner.join_reference(collection)?;
        Ok(target.bind(path).into_concrete()?)
    }

    /// True when `value` references an item its collection no longer holds
    fn is_dangling_reference(&self, path: &ConcretePath, value: &FactValue) -> bool {
        let (collection, item) = match (self.writable_type(path), value) {
            (Ok(FactType::CollectionItem { collection }), FactValue::CollectionItem(item)) => {
                (collection, item)
            }
            _ => return false,
        };
        match self.referenced_collection(path, collection) {
            Ok(target) => !self
                .current(&target)
                .and_then(FactValue::as_collection)
                .map_or(false, |c| c.contains(&item.id)),
            Err(_) => true,
        }
    }

    /// Drop committed facts whose items are no longer members, and
    /// item references that point at removed items
    fn purge_orphans(&mut self) -> usize {
        let orphans: Vec<ConcretePath> = self
            .committed
            .iter()
            .filter(|(path, value)| !self.is_live(path) || self.is_dangling_reference(path, value))
            .map(|(path, _)| path.clone())
            .collect();
        for path in &orphans {
            debug!(path = %path, "Purged orphaned fact");
            self.committed.remove(path);
        }
        orphans.len()
    }
}

/// Parse a concrete path, reporting a leftover wildcard as [`GraphError::WildcardPath`]
pub fn parse_concrete(raw: &str) -> Result<ConcretePath, GraphError> {
    ConcretePath::parse(raw).map_err(|e| match e {
        crate::error::PathError::Unresolved(p) => GraphError::WildcardPath(p),
        other => GraphError::Path(other),
    })
}
