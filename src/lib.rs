//! Shift-reduce discourse parsing in the RST style.
//!
//! A document arrives as a sequence of elementary discourse units
//! ([`Edu`]). The [`TransitionEngine`] combines them into one binary
//! [`RstTree`], choosing each step with a trained [`ParsingModel`]. Trees
//! are scored against gold trees bracket by bracket with [`Metrics`].
//!
//! ```no_run
//! use layered_rst::{Document, ParsingModel};
//!
//! let model: ParsingModel = ParsingModel::load("parsing-model.ron.gz")?;
//! let document = Document::load("corpus/wsj_0600.out.edus")?;
//! let tree = model.parse_document(&document)?;
//! println!("{}", tree.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod classifier;
pub mod config;
pub mod corpus;
pub mod dis;
mod display;
pub mod errors;
pub mod feature;
pub mod literal;
pub mod metrics;
pub mod model;
pub mod relation;
mod span;
pub mod transition;
mod tree;

pub use classifier::{Classifier, LinearSvm, LinearSvmParams, SparseVector};
pub use config::RunConfig;
pub use corpus::{
    parse_corpus, CorpusOptions, CorpusReport, Document, DocumentFailure, ParsedDocument,
};
pub use dis::parse_dis;
pub use display::RstTreeDisplay;
pub use errors::{
    ActionError, ConfigError, CorpusError, DisError, DocumentError, FeatureError, LiteralError,
    ModelError, ParseError,
};
pub use feature::{
    FeatureAtom, FeatureGenerator, FeatureKind, FeatureOptions, FeatureOrigin, FeatureValue,
};
pub use metrics::{BracketCounts, LevelScore, MetricLevel, Metrics, MetricsReport};
pub use model::{FallbackPolicy, FeatureSettings, LabelMap, ParsingModel, Vocabulary};
pub use relation::RelationLabels;
pub use span::{Edu, Nuclearity, NuclearityForm, SpanNode};
pub use transition::{Action, Configuration, TransitionEngine};
pub use tree::{Bracket, RstTree};
