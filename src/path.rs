//! Fact paths
//!
//! A path is a `/`-delimited sequence of segments. Dictionary paths are
//! *abstract*: a `*` segment stands for "any item of the collection named by
//! the preceding segments". Graph paths are *concrete*: every wildcard has
//! been replaced by an item segment written `#<id>`.
//!
//! ```text
//! /formW2s/*/wages        abstract
//! /formW2s/#A/wages       concrete
//! ```

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

const WILDCARD: &str = "*";
const ITEM_PREFIX: char = '#';

/// Opaque identifier of a collection item (typically a UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Result<Self, PathError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PathError::InvalidItemId {
                path: id,
                reason: "item id is empty".to_string(),
            });
        }
        if id.contains('/') || id.contains(WILDCARD) || id.chars().any(char::is_whitespace) {
            return Err(PathError::InvalidItemId {
                reason: "item id may not contain '/', '*' or whitespace".to_string(),
                path: id,
            });
        }
        Ok(Self(id))
    }

    /// Generate a fresh random item id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemId {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ItemId::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl FromStr for ItemId {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemId::new(s)
    }
}

/// A single path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Name(String),
    Wildcard,
    Item(ItemId),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => f.write_str(name),
            Segment::Wildcard => f.write_str(WILDCARD),
            Segment::Item(id) => write!(f, "{}{}", ITEM_PREFIX, id),
        }
    }
}

/// Normalize a path string before parsing
///
/// Normalizes Unicode to NFC and removes trailing slashes (except root).
pub fn normalize_path_string(path: &str) -> String {
    let mut result: String = path.trim().nfc().collect();
    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, PathError> {
    let normalized = normalize_path_string(raw);
    if normalized.is_empty() {
        return Err(PathError::Empty);
    }
    if !normalized.starts_with('/') {
        return Err(PathError::NotRooted(normalized));
    }
    if normalized == "/" {
        return Ok(Vec::new());
    }
    normalized[1..]
        .split('/')
        .map(|part| {
            if part.is_empty() {
                Err(PathError::EmptySegment(normalized.clone()))
            } else if part == WILDCARD {
                Ok(Segment::Wildcard)
            } else if let Some(id) = part.strip_prefix(ITEM_PREFIX) {
                ItemId::new(id)
                    .map(Segment::Item)
                    .map_err(|e| match e {
                        PathError::InvalidItemId { reason, .. } => PathError::InvalidItemId {
                            path: normalized.clone(),
                            reason,
                        },
                        other => other,
                    })
            } else {
                Ok(Segment::Name(part.to_string()))
            }
        })
        .collect()
}

fn write_segments(f: &mut fmt::Formatter<'_>, segments: &[Segment]) -> fmt::Result {
    if segments.is_empty() {
        return f.write_str("/");
    }
    for segment in segments {
        write!(f, "/{}", segment)?;
    }
    Ok(())
}

/// A path that may mix wildcards and item segments.
///
/// Only produced transiently while resolving an abstract path against a
/// collection context; the graph itself is keyed by [`ConcretePath`] and the
/// dictionary by [`AbstractPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactPath {
    segments: Vec<Segment>,
}

impl FactPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        Ok(Self {
            segments: parse_segments(raw)?,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_abstract(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count()
    }

    /// Replace the first wildcard with the given item
    pub fn resolve_first(&self, id: &ItemId) -> Result<FactPath, PathError> {
        let position = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Wildcard))
            .ok_or_else(|| PathError::NotAbstract(self.to_string()))?;
        let mut segments = self.segments.clone();
        segments[position] = Segment::Item(id.clone());
        Ok(FactPath { segments })
    }

    /// Segments before the first wildcard (the collection it iterates)
    pub fn wildcard_prefix(&self) -> Option<FactPath> {
        let position = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Wildcard))?;
        Some(FactPath {
            segments: self.segments[..position].to_vec(),
        })
    }

    /// Convert into a concrete path; fails while a wildcard remains
    pub fn into_concrete(self) -> Result<ConcretePath, PathError> {
        if self.is_abstract() {
            return Err(PathError::Unresolved(self.to_string()));
        }
        Ok(ConcretePath {
            segments: self.segments,
        })
    }
}

impl fmt::Display for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

/// Dictionary path: names and wildcards only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbstractPath {
    segments: Vec<Segment>,
}

impl AbstractPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = parse_segments(raw)?;
        if segments.iter().any(|s| matches!(s, Segment::Item(_))) {
            return Err(PathError::ItemInAbstract(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_abstract(&self) -> bool {
        self.wildcard_count() > 0
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count()
    }

    /// Last segment name, if any
    pub fn name(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Name(name)) => Some(name),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<AbstractPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(AbstractPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The collection path owning the first wildcard (`/formW2s` for
    /// `/formW2s/*/wages`)
    pub fn collection_prefix(&self) -> Option<AbstractPath> {
        self.wildcard_prefixes().into_iter().next()
    }

    /// Every collection path owning a wildcard, outermost first
    pub fn wildcard_prefixes(&self) -> Vec<AbstractPath> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Segment::Wildcard))
            .map(|(i, _)| AbstractPath {
                segments: self.segments[..i].to_vec(),
            })
            .collect()
    }

    /// True when `self` lies under `prefix` (or equals it)
    pub fn starts_with(&self, prefix: &AbstractPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Resolve a dependency reference relative to this path.
    ///
    /// Absolute references are parsed as-is; `../name` climbs from this
    /// path's parent (so `../wages` on `/formW2s/*/net` is `/formW2s/*/wages`).
    pub fn join_reference(&self, reference: &str) -> Result<AbstractPath, PathError> {
        if reference.starts_with('/') {
            return AbstractPath::parse(reference);
        }
        let mut base = self
            .parent()
            .map(|p| p.segments)
            .unwrap_or_default();
        for part in reference.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if base.pop().is_none() {
                        return Err(PathError::RelativeOverflow {
                            relative: reference.to_string(),
                            base: self.to_string(),
                        });
                    }
                }
                _ => {
                    let joined = format!("/{}", part);
                    let mut parsed = AbstractPath::parse(&joined)?;
                    base.append(&mut parsed.segments);
                }
            }
        }
        Ok(AbstractPath { segments: base })
    }

    /// Substitute the wildcards in order with the given items
    pub fn resolve_all(&self, ids: &[ItemId]) -> Result<ConcretePath, PathError> {
        let wildcards = self.wildcard_count();
        if wildcards != ids.len() {
            return Err(PathError::WildcardMismatch {
                path: self.to_string(),
                wildcards,
                ids: ids.len(),
            });
        }
        let mut ids = ids.iter();
        let segments = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Wildcard => ids
                    .next()
                    .map(|id| Segment::Item(id.clone()))
                    .unwrap_or(Segment::Wildcard),
                other => other.clone(),
            })
            .collect();
        Ok(ConcretePath { segments })
    }

    /// Bind wildcards to the items of a concrete context path.
    ///
    /// A wildcard at position `i` is bound when the context has an item at
    /// `i` and both paths agree on every segment before it. Unbound
    /// wildcards are kept, so the result may still be abstract.
    pub fn bind(&self, context: &ConcretePath) -> FactPath {
        let context_abstract = context.to_abstract();
        let segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| match (segment, context.segments.get(i)) {
                (Segment::Wildcard, Some(Segment::Item(id)))
                    if context_abstract.segments.len() > i
                        && context_abstract.segments[..i] == self.segments[..i] =>
                {
                    Segment::Item(id.clone())
                }
                _ => segment.clone(),
            })
            .collect();
        FactPath { segments }
    }

    pub fn as_fact_path(&self) -> FactPath {
        FactPath {
            segments: self.segments.clone(),
        }
    }

    /// Treat a wildcard-free abstract path as concrete
    pub fn to_concrete(&self) -> Result<ConcretePath, PathError> {
        self.as_fact_path().into_concrete()
    }
}

impl fmt::Display for AbstractPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

impl FromStr for AbstractPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbstractPath::parse(s)
    }
}

impl TryFrom<String> for AbstractPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AbstractPath::parse(&value)
    }
}

impl From<AbstractPath> for String {
    fn from(path: AbstractPath) -> Self {
        path.to_string()
    }
}

/// Graph path: names and item segments only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConcretePath {
    segments: Vec<Segment>,
}

impl ConcretePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        FactPath::parse(raw)?.into_concrete()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The dictionary path this concrete path instantiates
    pub fn to_abstract(&self) -> AbstractPath {
        AbstractPath {
            segments: self
                .segments
                .iter()
                .map(|s| match s {
                    Segment::Item(_) => Segment::Wildcard,
                    other => other.clone(),
                })
                .collect(),
        }
    }

    /// Items in order of appearance
    pub fn item_ids(&self) -> Vec<&ItemId> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Item(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Pairs of (collection path, item) for every item segment
    pub fn memberships(&self) -> Vec<(ConcretePath, &ItemId)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Segment::Item(id) => Some((
                    ConcretePath {
                        segments: self.segments[..i].to_vec(),
                    },
                    id,
                )),
                _ => None,
            })
            .collect()
    }

    pub fn parent(&self) -> Option<ConcretePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(ConcretePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// `/formW2s` + `A` -> `/formW2s/#A`
    pub fn item(&self, id: &ItemId) -> ConcretePath {
        let mut segments = self.segments.clone();
        segments.push(Segment::Item(id.clone()));
        ConcretePath { segments }
    }

    pub fn starts_with(&self, prefix: &ConcretePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_segments(f, &self.segments)
    }
}

impl FromStr for ConcretePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConcretePath::parse(s)
    }
}

impl TryFrom<String> for ConcretePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ConcretePath::parse(&value)
    }
}

impl From<ConcretePath> for String {
    fn from(path: ConcretePath) -> Self {
        path.to_string()
    }
}
