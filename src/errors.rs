//! Error types for parsing, feature extraction, persistence and corpus I/O.
//!
//! Each concern gets its own enum so callers can tell a classifier/engine
//! disagreement apart from a corrupt model archive or a malformed input
//! file.

use std::path::PathBuf;

use thiserror::Error;

use crate::transition::Action;

/// An illegal transition was requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Shift requested while the queue is empty.
    #[error("cannot shift: queue is empty")]
    ShiftOnEmptyQueue,

    /// Reduce requested with fewer than two spans on the stack.
    #[error("cannot reduce: stack holds {stack_len} span(s), need at least 2")]
    ReduceOnShortStack { stack_len: usize },
}

/// Feature extraction failed on malformed span data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// The span's text has no tokens left after cleaning.
    #[error("span {eduspan:?} has no tokens after removing markup and punctuation")]
    EmptySpanText { eduspan: (usize, usize) },
}

/// Parsing a single document failed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A document without EDUs can never reach a terminal configuration.
    #[error("document has no EDUs")]
    EmptyDocument,

    /// The parse tree was requested before the engine terminated.
    #[error("parser has not terminated (stack: {stack_len}, queue: {queue_len})")]
    NotTerminal { stack_len: usize, queue_len: usize },

    /// The decision model chose an action the engine rejected.
    #[error("illegal parsing action {action}: {source}")]
    IllegalAction {
        action: Action,
        #[source]
        source: ActionError,
    },

    /// Feature extraction failed for the current configuration.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The decision model could not produce an action.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Training, prediction or persistence of a parsing model failed.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode model archive: {0}")]
    Encode(#[from] ron::Error),

    #[error("failed to decode model archive: {0}")]
    Decode(#[from] ron::error::SpannedError),

    /// The archive decoded but its parts do not fit together.
    #[error("corrupt model archive: {message}")]
    Corrupt { message: String },

    #[error("unsupported model archive version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("cannot train on an empty sample set")]
    EmptyTrainingSet,

    #[error("got {vectors} feature vectors but {labels} labels")]
    LengthMismatch { vectors: usize, labels: usize },

    /// The classifier did not score every class in the label map.
    #[error("classifier returned {found} scores for {expected} classes")]
    ScoreCount { found: usize, expected: usize },

    /// A class id produced by the classifier has no action in the label map.
    #[error("class id {class} has no entry in the label map ({labels} labels)")]
    UnknownClass { class: usize, labels: usize },
}

/// Reading a bracket-annotated `.dis` gold tree failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisError {
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("malformed discourse tree: {message}")]
    Structure { message: String },
}

/// A `{index: [str, ...]}` literal dictionary could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct LiteralError {
    pub line: usize,
    pub message: String,
}

/// Loading or writing corpus files failed.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Literal {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{path}: {source}")]
    Dis {
        path: PathBuf,
        #[source]
        source: DisError,
    },

    #[error("no gold tree found at {path}")]
    MissingGold { path: PathBuf },
}

/// Why one document of a corpus run produced no tree.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Loading a run configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type ModelResult<T> = Result<T, ModelError>;
pub type CorpusResult<T> = Result<T, CorpusError>;
