//! Error types for the factflow fact graph and flow navigator.
//!
//! Incompleteness is not represented here: a fact that cannot yet be
//! determined evaluates to [`crate::fact::FactResult::Incomplete`].

use thiserror::Error;

/// Path parsing and resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path must start with '/': {0}")]
    NotRooted(String),

    #[error("Path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("Invalid collection item id in path {path}: {reason}")]
    InvalidItemId { path: String, reason: String },

    #[error("Path {path} has {wildcards} wildcard(s) but {ids} item id(s) were supplied")]
    WildcardMismatch {
        path: String,
        wildcards: usize,
        ids: usize,
    },

    #[error("Path {0} has no wildcard to resolve")]
    NotAbstract(String),

    #[error("Path {0} still contains a wildcard")]
    Unresolved(String),

    #[error("Dictionary paths cannot name a collection item: {0}")]
    ItemInAbstract(String),

    #[error("Relative path {relative} climbs above the root of {base}")]
    RelativeOverflow { relative: String, base: String },
}

/// Value requested from a result that has none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Result has no value")]
pub struct MissingValue;

/// Raw input or a typed value rejected by a writable fact's type.
///
/// Reported synchronously from `set`/`set_raw`; the fact is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Expected a {expected} value, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid {kind}: {input}")]
    Malformed { kind: &'static str, input: String },

    #[error("'{value}' is not one of the options for {options_path}")]
    UnknownOption { value: String, options_path: String },

    #[error("Duplicate collection item id: {0}")]
    DuplicateItem(String),
}

/// Fact dictionary construction errors (configuration errors on the fact side)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("Fact {0} is defined more than once")]
    DuplicateFact(String),

    #[error("Fact {fact} depends on undefined fact {dependency}")]
    UnknownDependency { fact: String, dependency: String },

    #[error("Fact {fact} uses wildcard prefix {prefix}, which is not a collection fact")]
    NotACollection { fact: String, prefix: String },

    #[error("Fact {fact} depends on per-item fact {dependency} outside of its item scope")]
    UnscopedDependency { fact: String, dependency: String },

    #[error("Derived facts form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Invalid expression for {fact}: {reason}")]
    InvalidExpression { fact: String, reason: String },

    #[error("Invalid limit on {fact}: {reason}")]
    InvalidLimit { fact: String, reason: String },

    #[error("Invalid default or placeholder for {fact}: {source}")]
    InvalidDefault {
        fact: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid path in dictionary: {0}")]
    Path(#[from] PathError),

    #[error("Failed to read fact dictionary: {0}")]
    Json(String),
}

/// Fact graph runtime errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unknown fact: {0}")]
    UnknownFact(String),

    #[error("Fact {0} is derived and cannot be written")]
    NotWritable(String),

    #[error("Fact {0} is not a collection")]
    NotACollection(String),

    #[error("Item {item} is not a member of collection {collection}")]
    UnknownItem { collection: String, item: String },

    #[error("Path {0} contains a wildcard; a collection item id is required")]
    WildcardPath(String),

    #[error("Invalid value for {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error("Malformed persisted fact {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Persisted facts must be a JSON object")]
    NotAnObject,

    #[error("Arithmetic overflow in {operation} while evaluating {path}")]
    Arithmetic { path: String, operation: String },
}

/// Flow construction and navigation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Multiple screens are declared for route {0}")]
    DuplicateRoute(String),

    #[error("Multiple collection loops are named {0}")]
    DuplicateLoop(String),

    #[error("{kind} {route} has no screens")]
    Empty { kind: &'static str, route: String },

    #[error("Route must start with '/': {0}")]
    InvalidRoute(String),

    #[error("Collection loop {loop_name} iterates {collection}, which is not a collection path")]
    InvalidLoopCollection {
        loop_name: String,
        collection: String,
    },

    #[error("Collection loop {0} is nested inside another collection loop")]
    NestedLoop(String),

    #[error("Invalid condition {condition}: {reason}")]
    InvalidCondition { condition: String, reason: String },

    #[error("Path {0} needs a collection item but none was given")]
    MissingItem(String),

    #[error("Screen {route} could not apply its actions: {reason}")]
    Action { route: String, reason: String },

    #[error("Screen {0} does not exist in the flow")]
    UnknownRoute(String),

    #[error("Invalid path in flow: {0}")]
    Path(#[from] PathError),

    #[error("Failed to read flow declaration: {0}")]
    Json(String),
}

/// Static validation finding: a flow references something the fact
/// dictionary cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{location}: condition references undefined fact {path}")]
    UnknownConditionFact { location: String, path: String },

    #[error("{location}: condition fact {path} is not boolean")]
    NonBooleanCondition { location: String, path: String },

    #[error("{location}: content references undefined fact {path}")]
    UnknownContentFact { location: String, path: String },

    #[error("{location}: input fact {path} is derived and cannot be written")]
    DerivedInput { location: String, path: String },

    #[error("{location}: loop collection {path} is not a collection fact")]
    LoopNotCollection { location: String, path: String },

    #[error("{location}: fact {path} is outside the loop collection {collection}")]
    OutOfLoopScope {
        location: String,
        path: String,
        collection: String,
    },
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Tax return not found: {0}")]
    ReturnNotFound(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to encode stored record: {0}")]
    Encoding(String),
}

/// Top-level errors surfaced by the CLI and configuration layers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Fact dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("Fact graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Flow does not match the fact dictionary:\n{}", format_findings(.0))]
    Validation(Vec<ConfigurationError>),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn format_findings(findings: &[ConfigurationError]) -> String {
    findings
        .iter()
        .map(|f| format!("  - {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        ApiError::Graph(GraphError::Path(err))
    }
}
