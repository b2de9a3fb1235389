//! The decision model: vocabulary, label map and classifier driving the
//! transition engine.
//!
//! A [`ParsingModel`] is built once (by [`ParsingModel::train`] or
//! [`ParsingModel::load`]) and then only read. Parsing takes `&self`, so a
//! single loaded model can be shared by every document of a corpus.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, LinearSvm, SparseVector};
use crate::corpus::Document;
use crate::errors::{ModelError, ModelResult, ParseError, ParseResult};
use crate::feature::{FeatureAtom, FeatureGenerator, FeatureOptions};
use crate::span::Edu;
use crate::transition::{Action, TransitionEngine};
use crate::tree::RstTree;

/// Current model archive layout.
pub const ARCHIVE_VERSION: u32 = 1;

/// Closed mapping from feature atoms to vector columns.
///
/// Fixed at training time; atoms unseen during training are dropped by
/// [`vectorize`]. Serialized as the atom list in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FeatureAtom>", into = "Vec<FeatureAtom>")]
pub struct Vocabulary {
    atoms: Vec<FeatureAtom>,
    index: HashMap<FeatureAtom, usize>,
}

impl Vocabulary {
    /// Assign columns in first-seen order.
    pub fn build<'a>(atom_sets: impl IntoIterator<Item = &'a [FeatureAtom]>) -> Self {
        let mut vocab = Self::default();
        for atoms in atom_sets {
            for atom in atoms {
                if !vocab.index.contains_key(atom) {
                    vocab.index.insert(atom.clone(), vocab.atoms.len());
                    vocab.atoms.push(atom.clone());
                }
            }
        }
        vocab
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn column(&self, atom: &FeatureAtom) -> Option<usize> {
        self.index.get(atom).copied()
    }

    pub fn atom(&self, column: usize) -> Option<&FeatureAtom> {
        self.atoms.get(column)
    }
}

impl From<Vec<FeatureAtom>> for Vocabulary {
    fn from(atoms: Vec<FeatureAtom>) -> Self {
        // Keep the first column for duplicated entries
        let mut index = HashMap::with_capacity(atoms.len());
        for (column, atom) in atoms.iter().enumerate() {
            index.entry(atom.clone()).or_insert(column);
        }
        Self { atoms, index }
    }
}

impl From<Vocabulary> for Vec<FeatureAtom> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.atoms
    }
}

/// Class id to parsing action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    actions: Vec<Action>,
}

impl LabelMap {
    /// Assign class ids to actions in first-seen order.
    pub fn build<'a>(actions: impl IntoIterator<Item = &'a Action>) -> Self {
        let mut map = Self::default();
        for action in actions {
            if map.id_of(action).is_none() {
                map.actions.push(action.clone());
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, class: usize) -> Option<&Action> {
        self.actions.get(class)
    }

    pub fn id_of(&self, action: &Action) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Turn feature atoms into a binary vector over the vocabulary.
pub fn vectorize(atoms: &[FeatureAtom], vocab: &Vocabulary) -> SparseVector {
    let columns = atoms.iter().filter_map(|atom| vocab.column(atom)).collect();
    SparseVector::new(vocab.len(), columns)
}

/// What to do when the predicted action is illegal in the current
/// configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Fail the document.
    Abort,
    /// Take the highest-scoring legal action instead.
    #[default]
    BestLegal,
}

/// Feature settings fixed at training time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSettings {
    /// Emit `Distance-To-End` atoms from the document length
    pub use_document_length: bool,
}

impl FeatureSettings {
    pub fn options_for(&self, doc_len: usize) -> FeatureOptions {
        FeatureOptions {
            doc_len: self.use_document_length.then_some(doc_len),
        }
    }
}

/// On-disk layout: everything a model needs, stored as one unit.
#[derive(Debug, Deserialize)]
struct ModelArchive<C> {
    version: u32,
    features: FeatureSettings,
    vocab: Vocabulary,
    labels: LabelMap,
    classifier: C,
}

/// Borrowed twin of [`ModelArchive`] used when saving.
#[derive(Serialize)]
struct ModelArchiveRef<'a, C> {
    version: u32,
    features: FeatureSettings,
    vocab: &'a Vocabulary,
    labels: &'a LabelMap,
    classifier: &'a C,
}

/// Classifier plus the vocabulary and label map it was trained with.
#[derive(Debug, Clone)]
pub struct ParsingModel<C = LinearSvm> {
    classifier: C,
    vocab: Vocabulary,
    labels: LabelMap,
    features: FeatureSettings,
    fallback: FallbackPolicy,
}

impl<C: Classifier> ParsingModel<C> {
    /// Assemble a model from already trained parts.
    pub fn from_parts(
        classifier: C,
        vocab: Vocabulary,
        labels: LabelMap,
        features: FeatureSettings,
    ) -> ModelResult<Self> {
        let model = Self {
            classifier,
            vocab,
            labels,
            features,
            fallback: FallbackPolicy::default(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Build vocabulary and label map from paired samples and fit `classifier`.
    pub fn train(
        samples: &[(Vec<FeatureAtom>, Action)],
        mut classifier: C,
        features: FeatureSettings,
    ) -> ModelResult<Self> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let vocab = Vocabulary::build(samples.iter().map(|(atoms, _)| atoms.as_slice()));
        let labels = LabelMap::build(samples.iter().map(|(_, action)| action));

        let vectors: Vec<SparseVector> = samples
            .iter()
            .map(|(atoms, _)| vectorize(atoms, &vocab))
            .collect();
        let class_ids: Vec<usize> = samples
            .iter()
            .filter_map(|(_, action)| labels.id_of(action))
            .collect();

        classifier.fit(&vectors, &class_ids, vocab.len(), labels.len())?;
        tracing::info!(
            samples = samples.len(),
            features = vocab.len(),
            actions = labels.len(),
            "trained parsing model"
        );
        Self::from_parts(classifier, vocab, labels, features)
    }

    /// Refit the classifier on already vectorized, already labelled data.
    pub fn fit_vectors(&mut self, vectors: &[SparseVector], labels: &[usize]) -> ModelResult<()> {
        self.classifier
            .fit(vectors, labels, self.vocab.len(), self.labels.len())
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn features(&self) -> FeatureSettings {
        self.features
    }

    /// Predict the action for one feature set.
    pub fn predict(&self, atoms: &[FeatureAtom]) -> ModelResult<Action> {
        let ranked = self.ranked_classes(&vectorize(atoms, &self.vocab))?;
        self.top_action(&ranked).cloned()
    }

    /// All known actions ordered by descending classifier score.
    pub fn ranked_actions(&self, atoms: &[FeatureAtom]) -> ModelResult<Vec<&Action>> {
        self.ranked_classes(&vectorize(atoms, &self.vocab))?
            .into_iter()
            .map(|class| self.action_for(class))
            .collect()
    }

    /// Class ids by descending score; the classifier must score every label.
    fn ranked_classes(&self, vector: &SparseVector) -> ModelResult<Vec<usize>> {
        let ranked = self.classifier.ranked_classes(vector);
        if ranked.len() != self.labels.len() {
            return Err(ModelError::ScoreCount {
                found: ranked.len(),
                expected: self.labels.len(),
            });
        }
        Ok(ranked)
    }

    fn top_action(&self, ranked: &[usize]) -> ModelResult<&Action> {
        let class = ranked.first().copied().ok_or(ModelError::ScoreCount {
            found: 0,
            expected: self.labels.len(),
        })?;
        self.action_for(class)
    }

    fn action_for(&self, class: usize) -> ModelResult<&Action> {
        self.labels.action(class).ok_or(ModelError::UnknownClass {
            class,
            labels: self.labels.len(),
        })
    }

    /// Parse a document's EDUs into a discourse tree.
    pub fn parse(&self, edus: Vec<Edu>) -> ParseResult<RstTree> {
        let mut engine = TransitionEngine::new(edus)?;
        let generator = FeatureGenerator::new(self.features.options_for(engine.doc_len()));

        while !engine.is_terminal() {
            let atoms = generator.generate(&engine.configuration())?;
            let action = self.choose_action(&engine, &atoms)?;
            engine
                .apply(&action)
                .map_err(|source| ParseError::IllegalAction { action, source })?;
        }

        tracing::debug!(
            edus = engine.doc_len(),
            transitions = engine.transitions(),
            "parse finished"
        );
        engine.into_tree()
    }

    pub fn parse_document(&self, document: &Document) -> ParseResult<RstTree> {
        self.parse(document.edus.clone())
    }

    fn choose_action(
        &self,
        engine: &TransitionEngine,
        atoms: &[FeatureAtom],
    ) -> ParseResult<Action> {
        let ranked = self.ranked_classes(&vectorize(atoms, &self.vocab))?;
        let predicted = self.top_action(&ranked)?.clone();

        if self.fallback == FallbackPolicy::Abort || engine.is_legal(&predicted) {
            return Ok(predicted);
        }

        let legal = ranked
            .iter()
            .filter_map(|&class| self.labels.action(class))
            .find(|action| engine.is_legal(action))
            .cloned();
        match legal {
            Some(action) => {
                tracing::warn!(
                    %predicted,
                    chosen = %action,
                    "predicted action is illegal, using best legal action"
                );
                Ok(action)
            }
            // No legal action in the label map; shifting is the only move left
            None if engine.is_legal(&Action::Shift) => Ok(Action::Shift),
            None => Ok(predicted),
        }
    }
}

impl<C> ParsingModel<C>
where
    C: Classifier + Serialize + DeserializeOwned,
{
    /// Write the model as one gzip-compressed RON archive.
    ///
    /// `.gz` is appended to the file name if missing. Returns the path
    /// actually written.
    pub fn save(&self, path: impl AsRef<Path>) -> ModelResult<PathBuf> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().map_or(true, |ext| ext != "gz") {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".gz");
            path.set_file_name(name);
        }

        let archive = ModelArchiveRef {
            version: ARCHIVE_VERSION,
            features: self.features,
            vocab: &self.vocab,
            labels: &self.labels,
            classifier: &self.classifier,
        };
        let encoded = ron::to_string(&archive)?;

        let io_err = |source| ModelError::Io {
            path: path.clone(),
            source,
        };
        let file = File::create(&path).map_err(io_err)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(encoded.as_bytes()).map_err(io_err)?;
        encoder
            .finish()
            .and_then(|mut writer| writer.flush())
            .map_err(io_err)?;

        tracing::info!(path = %path.display(), "saved parsing model");
        Ok(path)
    }

    /// Read a model archive written by [`ParsingModel::save`].
    ///
    /// The classifier, vocabulary and label map must agree with each other;
    /// anything else is reported as corruption before any parsing happens.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut decoded = String::new();
        GzDecoder::new(BufReader::new(file))
            .read_to_string(&mut decoded)
            .map_err(io_err)?;

        let archive: ModelArchive<C> = ron::from_str(&decoded)?;
        if archive.version != ARCHIVE_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: archive.version,
                expected: ARCHIVE_VERSION,
            });
        }

        let model = Self::from_parts(
            archive.classifier,
            archive.vocab,
            archive.labels,
            archive.features,
        )?;
        tracing::info!(
            path = %path.display(),
            features = model.vocab.len(),
            actions = model.labels.len(),
            "loaded parsing model"
        );
        Ok(model)
    }
}

impl<C: Classifier> ParsingModel<C> {
    fn validate(&self) -> ModelResult<()> {
        self.classifier.validate()?;
        if self.vocab.index.len() != self.vocab.atoms.len() {
            return Err(ModelError::Corrupt {
                message: format!(
                    "vocabulary lists {} atoms but only {} are distinct",
                    self.vocab.atoms.len(),
                    self.vocab.index.len()
                ),
            });
        }
        if self.labels.is_empty() {
            return Err(ModelError::Corrupt {
                message: "label map is empty".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(self.labels.len());
        if let Some(action) = self.labels.actions.iter().find(|action| !seen.insert(*action)) {
            return Err(ModelError::Corrupt {
                message: format!("label map lists {} more than once", action),
            });
        }
        if self.classifier.n_features() != self.vocab.len() {
            return Err(ModelError::Corrupt {
                message: format!(
                    "classifier expects {} features but vocabulary has {}",
                    self.classifier.n_features(),
                    self.vocab.len()
                ),
            });
        }
        if self.classifier.n_classes() != self.labels.len() {
            return Err(ModelError::Corrupt {
                message: format!(
                    "classifier has {} classes but label map has {}",
                    self.classifier.n_classes(),
                    self.labels.len()
                ),
            });
        }
        Ok(())
    }
}
