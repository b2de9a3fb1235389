//! Run configuration read from TOML.
//!
//! ```toml
//! model = "parsing-model.ron.gz"
//! fallback = "best-legal"
//! levels = ["span", "nuclearity", "relation"]
//! write_brackets = true
//! report = false
//! relation_labels = "coarse"
//! ```
//!
//! Every field has a default, and a missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusOptions;
use crate::errors::ConfigError;
use crate::metrics::MetricLevel;
use crate::model::FallbackPolicy;
use crate::relation::RelationLabels;

pub const DEFAULT_MODEL_PATH: &str = "parsing-model.ron.gz";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Model archive to load
    pub model: PathBuf,
    pub fallback: FallbackPolicy,
    /// Metric levels reported by evaluation runs
    pub levels: Vec<MetricLevel>,
    /// Write `<name>.brackets` files
    pub write_brackets: bool,
    /// Score against gold trees and print the report
    pub report: bool,
    /// Granularity of gold relation labels
    pub relation_labels: RelationLabels,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            fallback: FallbackPolicy::default(),
            levels: MetricLevel::ALL.to_vec(),
            write_brackets: true,
            report: false,
            relation_labels: RelationLabels::default(),
        }
    }
}

impl RunConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions {
            write_brackets: self.write_brackets,
            evaluate: self.report,
            levels: self.levels.clone(),
            relation_labels: self.relation_labels,
        }
    }
}
