//! Typed error hierarchy, one variant family per §7 error category.

use std::path::PathBuf;

/// A structural invariant was violated while building or mutating a tree.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("table cell count {actual} does not match rows*cols ({rows}*{cols})")]
    TableCellCountMismatch {
        rows: usize,
        cols: usize,
        actual: usize,
    },
    #[error("duplicate table coordinate (row={row}, col={col})")]
    DuplicateTableCoordinate { row: usize, col: usize },
    #[error("table coordinate (row={row}, col={col}) is out of bounds for a {rows}x{cols} table")]
    TableCoordinateOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("element kind {kind} cannot hold a child of kind {child_kind}")]
    InvalidChild { kind: &'static str, child_kind: &'static str },
}

/// A matcher-level or template-level evaluation error.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("element expression {expr:?} references missing field {field:?}")]
    MissingField { expr: String, field: String },
    #[error("element expression {expr:?} references element index {index} but only {available} elements are in scope")]
    IndexOutOfScope {
        expr: String,
        index: usize,
        available: usize,
    },
    #[error("template {template:?} references undefined variable {name:?}")]
    UndefinedVariable { template: String, name: String },
    #[error("template {template:?} references unknown key {key:?} on variable {name:?}")]
    UndefinedKey {
        template: String,
        name: String,
        key: String,
    },
    #[error("variable {name:?} could not be resolved: {reason}")]
    VariableResolution { name: String, reason: String },
}

/// A transformation pass failed to apply to a document.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("pass {pass:?}: {source}")]
    Matcher {
        pass: &'static str,
        #[source]
        source: MatcherError,
    },
    #[error("pass {pass:?}: {source}")]
    Structural {
        pass: &'static str,
        #[source]
        source: StructuralError,
    },
    #[error("split_text: regex {pattern:?} produced no matches and allow_no_matches is false")]
    NoMatches { pattern: String },
    #[error("pass {pass:?}: {message}")]
    Other { pass: &'static str, message: String },
}

/// Failure evaluating the embedded JQ-like query surface.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("query evaluation error: {message}")]
    Eval { message: String },
    #[error("undefined variable ${name}")]
    UndefinedVariable { name: String },
    #[error("undefined function {name}/{arity}")]
    UndefinedFunction { name: String, arity: usize },
}

/// Configuration document could not be bound to pipeline components.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown {stage} kind {kind:?}")]
    UnknownKind { stage: &'static str, kind: String },
    #[error("{stage} {kind:?} configuration is invalid: {message}")]
    InvalidConfig {
        stage: &'static str,
        kind: String,
        message: String,
    },
}

/// Failure acquiring a document or emitting output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("source {kind} failed: {message}")]
    Source { kind: String, message: String },
}

/// The top-level error type returned by every fallible entry point.
#[derive(Debug, thiserror::Error)]
pub enum DocScraperError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Io(#[from] IoError),
}

pub type Result<T, E = DocScraperError> = std::result::Result<T, E>;
