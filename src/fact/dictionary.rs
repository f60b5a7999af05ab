//! Fact dictionary: the static catalog of fact definitions.
//!
//! A dictionary is declared as a list of facts (JSON or [`DictionaryBuilder`])
//! and compiled once. Compilation resolves relative references, checks that
//! every reference exists and is reachable from the owner's item scope,
//! rejects cycles between derived facts and infers each derived fact's kind.

use crate::error::{DictionaryError, ParseError};
use crate::fact::expr::{Expr, ExprDecl, Reference};
use crate::fact::limits::{compile_pattern, Bound, BoundDeclaration, Limit, LimitDeclaration};
use crate::fact::types::FactType;
use crate::fact::value::{FactValue, ValueKind};
use crate::path::{AbstractPath, Segment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, instrument};

static COLLECTION_TYPE: FactType = FactType::Collection;

/// Declared dictionary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryDeclaration {
    pub facts: Vec<FactDeclaration>,
}

/// `{"path": "/wages", "kind": "writable", "type": "Dollar"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactDeclaration {
    pub path: String,
    #[serde(flatten)]
    pub definition: DefinitionDeclaration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DefinitionDeclaration {
    Writable(WritableDeclaration),
    Derived(DerivedDeclaration),
    Collection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritableDeclaration {
    #[serde(rename = "type")]
    pub fact_type: FactType,
    /// Raw text of a value used (as complete) while the fact is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Raw text of a value shown (as incomplete) while the fact is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<LimitDeclaration>,
}

impl WritableDeclaration {
    pub fn new(fact_type: FactType) -> Self {
        Self {
            fact_type,
            default: None,
            placeholder: None,
            limits: Vec::new(),
        }
    }

    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }

    pub fn with_placeholder(mut self, raw: impl Into<String>) -> Self {
        self.placeholder = Some(raw.into());
        self
    }

    pub fn with_limit(mut self, limit: LimitDeclaration) -> Self {
        self.limits.push(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedDeclaration {
    pub expr: ExprDecl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<FactValue>,
}

/// A compiled fact definition
#[derive(Debug, Clone)]
pub struct FactDefinition {
    pub path: AbstractPath,
    pub kind: FactKind,
}

#[derive(Debug, Clone)]
pub enum FactKind {
    Writable(WritableFact),
    Derived(DerivedFact),
    Collection,
}

#[derive(Debug, Clone)]
pub struct WritableFact {
    pub fact_type: FactType,
    pub default: Option<FactValue>,
    pub placeholder: Option<FactValue>,
    pub limits: Vec<Limit>,
}

#[derive(Debug, Clone)]
pub struct DerivedFact {
    pub expr: Expr<AbstractPath>,
    pub value_kind: ValueKind,
    pub placeholder: Option<FactValue>,
}

impl FactDefinition {
    pub fn value_kind(&self) -> ValueKind {
        match &self.kind {
            FactKind::Writable(w) => w.fact_type.kind(),
            FactKind::Derived(d) => d.value_kind,
            FactKind::Collection => ValueKind::Collection,
        }
    }

    /// Type accepted by `set`; `None` for derived facts
    pub fn writable_type(&self) -> Option<&FactType> {
        match &self.kind {
            FactKind::Writable(w) => Some(&w.fact_type),
            FactKind::Collection => Some(&COLLECTION_TYPE),
            FactKind::Derived(_) => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable_type().is_some()
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, FactKind::Collection)
    }

    pub fn limits(&self) -> &[Limit] {
        match &self.kind {
            FactKind::Writable(w) => &w.limits,
            _ => &[],
        }
    }
}

/// Compiled, read-only fact catalog
#[derive(Debug, Clone, Default)]
pub struct FactDictionary {
    facts: BTreeMap<AbstractPath, FactDefinition>,
    derived_order: Vec<AbstractPath>,
}

impl FactDictionary {
    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    pub fn from_json(json: &str) -> Result<Self, DictionaryError> {
        let declaration: DictionaryDeclaration =
            serde_json::from_str(json).map_err(|e| DictionaryError::Json(e.to_string()))?;
        Self::from_declaration(declaration)
    }

    #[instrument(skip(declaration), fields(facts = declaration.facts.len()))]
    pub fn from_declaration(declaration: DictionaryDeclaration) -> Result<Self, DictionaryError> {
        // Step 1: Parse paths and reject duplicates
        let mut declared: BTreeMap<AbstractPath, DefinitionDeclaration> = BTreeMap::new();
        for fact in declaration.facts {
            let path = AbstractPath::parse(&fact.path)?;
            if declared.contains_key(&path) {
                return Err(DictionaryError::DuplicateFact(path.to_string()));
            }
            declared.insert(path, fact.definition);
        }

        // Step 2: Every wildcard must follow a collection fact
        for path in declared.keys() {
            for prefix in path.wildcard_prefixes() {
                if !matches!(declared.get(&prefix), Some(DefinitionDeclaration::Collection)) {
                    return Err(DictionaryError::NotACollection {
                        fact: path.to_string(),
                        prefix: prefix.to_string(),
                    });
                }
            }
        }

        // Step 3: Resolve derived references and parse writable values
        let mut pending: BTreeMap<AbstractPath, PendingFact> = BTreeMap::new();
        for (path, definition) in &declared {
            let fact = match definition {
                DefinitionDeclaration::Collection => PendingFact::Collection,
                DefinitionDeclaration::Writable(w) => {
                    if let FactType::CollectionItem { collection } = &w.fact_type {
                        let target = path.join_reference(collection)?;
                        if !matches!(declared.get(&target), Some(DefinitionDeclaration::Collection))
                            || free_wildcards(&target, path) != 0
                        {
                            return Err(DictionaryError::NotACollection {
                                fact: path.to_string(),
                                prefix: target.to_string(),
                            });
                        }
                    }
                    let parse = |raw: &Option<String>| -> Result<Option<FactValue>, DictionaryError> {
                        raw.as_deref()
                            .map(|r| w.fact_type.parse_raw(r))
                            .transpose()
                            .map_err(|source| DictionaryError::InvalidDefault {
                                fact: path.to_string(),
                                source,
                            })
                    };
                    PendingFact::Writable(w.clone(), parse(&w.default)?, parse(&w.placeholder)?)
                }
                DefinitionDeclaration::Derived(d) => {
                    let expr = d
                        .expr
                        .clone()
                        .try_map_paths(&mut |reference: String| path.join_reference(&reference))?;
                    for (dependency, usage) in expr.references() {
                        check_reference(path, dependency, usage, &declared)?;
                    }
                    PendingFact::Derived(expr, d.placeholder.clone())
                }
            };
            pending.insert(path.clone(), fact);
        }

        // Step 4: Derived facts must form a DAG
        let derived_order = topological_order(&pending)?;
        debug!(derived = derived_order.len(), "Derived facts ordered");

        // Step 5: Infer derived kinds in dependency order
        let mut kinds: BTreeMap<AbstractPath, ValueKind> = BTreeMap::new();
        for (path, fact) in &pending {
            match fact {
                PendingFact::Collection => {
                    kinds.insert(path.clone(), ValueKind::Collection);
                }
                PendingFact::Writable(w, _, _) => {
                    kinds.insert(path.clone(), w.fact_type.kind());
                }
                PendingFact::Derived(..) => {}
            }
        }
        for path in &derived_order {
            if let Some(PendingFact::Derived(expr, placeholder)) = pending.get(path) {
                let kind = expr
                    .infer_kind(&|p: &AbstractPath| kinds.get(p).copied())
                    .map_err(|reason| DictionaryError::InvalidExpression {
                        fact: path.to_string(),
                        reason,
                    })?;
                if let Some(value) = placeholder {
                    if value.kind() != kind {
                        return Err(DictionaryError::InvalidDefault {
                            fact: path.to_string(),
                            source: ParseError::TypeMismatch {
                                expected: kind.to_string(),
                                actual: value.kind().to_string(),
                            },
                        });
                    }
                }
                kinds.insert(path.clone(), kind);
            }
        }

        // Step 6: Compile limits now that every kind is known
        let mut facts = BTreeMap::new();
        for (path, fact) in pending {
            let kind = match fact {
                PendingFact::Collection => FactKind::Collection,
                PendingFact::Derived(expr, placeholder) => FactKind::Derived(DerivedFact {
                    value_kind: kinds
                        .get(&path)
                        .copied()
                        .ok_or_else(|| DictionaryError::InvalidExpression {
                            fact: path.to_string(),
                            reason: "kind could not be inferred".to_string(),
                        })?,
                    expr,
                    placeholder,
                }),
                PendingFact::Writable(w, default, placeholder) => {
                    let limits = w
                        .limits
                        .iter()
                        .map(|l| compile_limit(&path, &w.fact_type, l, &kinds))
                        .collect::<Result<Vec<_>, _>>()?;
                    FactKind::Writable(WritableFact {
                        fact_type: w.fact_type,
                        default,
                        placeholder,
                        limits,
                    })
                }
            };
            facts.insert(path.clone(), FactDefinition { path, kind });
        }

        info!(facts = facts.len(), "Fact dictionary compiled");
        Ok(Self {
            facts,
            derived_order,
        })
    }

    pub fn definition(&self, path: &AbstractPath) -> Option<&FactDefinition> {
        self.facts.get(path)
    }

    pub fn contains(&self, path: &AbstractPath) -> bool {
        self.facts.contains_key(path)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FactDefinition> {
        self.facts.values()
    }

    pub fn value_kind(&self, path: &AbstractPath) -> Option<ValueKind> {
        self.definition(path).map(FactDefinition::value_kind)
    }

    /// Derived facts, each after everything it depends on
    pub fn derived_order(&self) -> &[AbstractPath] {
        &self.derived_order
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

enum PendingFact {
    Writable(WritableDeclaration, Option<FactValue>, Option<FactValue>),
    Derived(Expr<AbstractPath>, Option<FactValue>),
    Collection,
}

/// Wildcards of `dependency` not bound by the owner's item scope
pub fn free_wildcards(dependency: &AbstractPath, owner: &AbstractPath) -> usize {
    let dep = dependency.segments();
    let own = owner.segments();
    dep.iter()
        .enumerate()
        .filter(|(i, segment)| {
            matches!(segment, Segment::Wildcard)
                && !(own.get(*i) == Some(&Segment::Wildcard) && own[..*i] == dep[..*i])
        })
        .count()
}

fn check_reference(
    owner: &AbstractPath,
    dependency: &AbstractPath,
    usage: Reference,
    declared: &BTreeMap<AbstractPath, DefinitionDeclaration>,
) -> Result<(), DictionaryError> {
    let target = declared
        .get(dependency)
        .ok_or_else(|| DictionaryError::UnknownDependency {
            fact: owner.to_string(),
            dependency: dependency.to_string(),
        })?;
    let free = free_wildcards(dependency, owner);
    let scoped = match usage {
        Reference::Value | Reference::Collection => free == 0,
        Reference::PerItem => free == 1,
    };
    if !scoped {
        return Err(DictionaryError::UnscopedDependency {
            fact: owner.to_string(),
            dependency: dependency.to_string(),
        });
    }
    if usage == Reference::Collection && !matches!(target, DefinitionDeclaration::Collection) {
        return Err(DictionaryError::InvalidExpression {
            fact: owner.to_string(),
            reason: format!("{} is not a collection", dependency),
        });
    }
    Ok(())
}

/// Kahn's algorithm over derived facts; reports a cycle when one remains
fn topological_order(
    pending: &BTreeMap<AbstractPath, PendingFact>,
) -> Result<Vec<AbstractPath>, DictionaryError> {
    let mut dependencies: BTreeMap<&AbstractPath, BTreeSet<&AbstractPath>> = BTreeMap::new();
    for (path, fact) in pending {
        if let PendingFact::Derived(expr, _) = fact {
            let derived_deps = expr
                .references()
                .into_iter()
                .map(|(p, _)| p)
                .filter(|p| matches!(pending.get(*p), Some(PendingFact::Derived(..))))
                .collect();
            dependencies.insert(path, derived_deps);
        }
    }

    let mut dependents: BTreeMap<&AbstractPath, Vec<&AbstractPath>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&AbstractPath, usize> = BTreeMap::new();
    for (path, deps) in &dependencies {
        in_degree.insert(*path, deps.len());
        for dep in deps {
            dependents.entry(*dep).or_default().push(*path);
        }
    }

    let mut queue: VecDeque<&AbstractPath> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(path, _)| *path)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(path) = queue.pop_front() {
        order.push(path.clone());
        for dependent in dependents.get(path).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    if order.len() == dependencies.len() {
        return Ok(order);
    }

    // Walk unresolved dependencies until a fact repeats
    let remaining: BTreeSet<&AbstractPath> = in_degree
        .iter()
        .filter(|(_, degree)| **degree > 0)
        .map(|(path, _)| *path)
        .collect();
    let mut walk: Vec<&AbstractPath> = Vec::new();
    let mut current = remaining.iter().next().copied();
    while let Some(path) = current {
        if let Some(start) = walk.iter().position(|p| *p == path) {
            let mut cycle: Vec<String> = walk[start..].iter().map(|p| p.to_string()).collect();
            cycle.push(path.to_string());
            return Err(DictionaryError::Cycle(cycle));
        }
        walk.push(path);
        current = dependencies
            .get(path)
            .and_then(|deps| deps.iter().find(|d| remaining.contains(*d)).copied());
    }
    Err(DictionaryError::Cycle(
        remaining.iter().map(|p| p.to_string()).collect(),
    ))
}

fn compile_limit(
    owner: &AbstractPath,
    fact_type: &FactType,
    declaration: &LimitDeclaration,
    kinds: &BTreeMap<AbstractPath, ValueKind>,
) -> Result<Limit, DictionaryError> {
    let invalid = |reason: String| DictionaryError::InvalidLimit {
        fact: owner.to_string(),
        reason,
    };
    let bound = |b: &BoundDeclaration| -> Result<Bound, DictionaryError> {
        match b {
            BoundDeclaration::Value(raw) => fact_type
                .parse_raw(raw)
                .map(Bound::Value)
                .map_err(|e| invalid(e.to_string())),
            BoundDeclaration::Fact(reference) => {
                let path = owner.join_reference(reference)?;
                let kind = kinds
                    .get(&path)
                    .copied()
                    .ok_or_else(|| invalid(format!("bound fact {} is not defined", path)))?;
                if !kind.is_ordered() {
                    return Err(invalid(format!("bound fact {} is not comparable", path)));
                }
                if free_wildcards(&path, owner) != 0 {
                    return Err(invalid(format!("bound fact {} is outside the item scope", path)));
                }
                Ok(Bound::Fact(path))
            }
        }
    };
    let limit = match declaration {
        LimitDeclaration::Max(b) => Limit::Max(bound(b)?),
        LimitDeclaration::Min(b) => Limit::Min(bound(b)?),
        LimitDeclaration::MaxLength(n) => Limit::MaxLength(*n),
        LimitDeclaration::MinLength(n) => Limit::MinLength(*n),
        LimitDeclaration::Match(pattern) => {
            Limit::Match(compile_pattern(pattern).map_err(|e| invalid(e.to_string()))?)
        }
    };
    if !limit.applies_to(fact_type.kind()) {
        return Err(invalid(format!(
            "{} does not apply to {} facts",
            limit.name(),
            fact_type.kind()
        )));
    }
    Ok(limit)
}

/// Builds a dictionary in code
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    facts: Vec<FactDeclaration>,
}

impl DictionaryBuilder {
    pub fn writable(self, path: &str, fact_type: FactType) -> Self {
        self.writable_with(path, WritableDeclaration::new(fact_type))
    }

    pub fn writable_with(self, path: &str, declaration: WritableDeclaration) -> Self {
        self.declare(path, DefinitionDeclaration::Writable(declaration))
    }

    pub fn derived(self, path: &str, expr: ExprDecl) -> Self {
        self.declare(
            path,
            DefinitionDeclaration::Derived(DerivedDeclaration {
                expr,
                placeholder: None,
            }),
        )
    }

    pub fn collection(self, path: &str) -> Self {
        self.declare(path, DefinitionDeclaration::Collection)
    }

    pub fn declare(mut self, path: &str, definition: DefinitionDeclaration) -> Self {
        self.facts.push(FactDeclaration {
            path: path.to_string(),
            definition,
        });
        self
    }

    pub fn build(self) -> Result<FactDictionary, DictionaryError> {
        FactDictionary::from_declaration(DictionaryDeclaration { facts: self.facts })
    }
}
