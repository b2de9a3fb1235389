//! Corpus I/O: `.edus` documents with their `.pos`/`.dep` side files, bracket
//! output and batch parsing over a directory.
//!
//! A corpus directory holds one `<name>.edus` file per document (one EDU per
//! line). Optional side files `<name>.edus.pos` and `<name>.edus.dep` carry
//! per-EDU annotations, and `<name>.dis` holds the gold tree when the corpus
//! is evaluated. Predicted brackets are written to `<name>.brackets`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::classifier::Classifier;
use crate::dis::parse_dis_with;
use crate::errors::{CorpusError, CorpusResult, DocumentError};
use crate::literal::parse_literal;
use crate::metrics::{MetricLevel, Metrics, MetricsReport};
use crate::model::ParsingModel;
use crate::relation::RelationLabels;
use crate::span::Edu;
use crate::tree::{Bracket, RstTree};

pub const EDUS_EXTENSION: &str = "edus";

/// One input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File stem of the `.edus` file
    pub id: String,
    pub path: PathBuf,
    pub edus: Vec<Edu>,
}

impl Document {
    /// Build a document from EDU texts, without annotations.
    pub fn from_texts(
        id: impl Into<String>,
        texts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let id = id.into();
        Self {
            path: PathBuf::from(format!("{}.{}", id, EDUS_EXTENSION)),
            edus: texts
                .into_iter()
                .enumerate()
                .map(|(index, text)| Edu::new(index, text))
                .collect(),
            id,
        }
    }

    /// Read a `.edus` file and its side files.
    ///
    /// Missing `.pos`/`.dep` files leave the annotations empty.
    pub fn load(path: impl AsRef<Path>) -> CorpusResult<Self> {
        let path = path.as_ref();
        let texts = read_edus(path)?;
        let mut pos = read_side_file(&side_path(path, "pos"))?;
        let mut dep = read_side_file(&side_path(path, "dep"))?;

        let edus = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                Edu::new(index, text)
                    .with_pos(pos.remove(&index).unwrap_or_default())
                    .with_dep(dep.remove(&index).unwrap_or_default())
            })
            .collect();

        Ok(Self {
            id: document_id(path),
            path: path.to_path_buf(),
            edus,
        })
    }

    pub fn len(&self) -> usize {
        self.edus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edus.is_empty()
    }
}

fn document_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CorpusError + '_ {
    move |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Newline separated EDUs; a single trailing empty line is ignored.
pub fn read_edus(path: impl AsRef<Path>) -> CorpusResult<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    let mut lines: Vec<String> = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

/// `<name>.edus` -> `<name>.edus.<kind>`
pub fn side_path(edus_path: &Path, kind: &str) -> PathBuf {
    let mut name = edus_path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(kind);
    edus_path.with_file_name(name)
}

fn read_side_file(path: &Path) -> CorpusResult<BTreeMap<usize, Vec<String>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no side file, annotations left empty");
            return Ok(BTreeMap::new());
        }
        Err(source) => return Err(io_error(path)(source)),
    };
    parse_literal(&content).map_err(|err| CorpusError::Literal {
        path: path.to_path_buf(),
        line: err.line,
        message: err.message,
    })
}

/// Replace `edus` in the file name with `replacement`.
fn sibling_path(edus_path: &Path, replacement: &str) -> PathBuf {
    let name = edus_path.file_name().unwrap_or_default().to_string_lossy();
    edus_path.with_file_name(name.replace(EDUS_EXTENSION, replacement))
}

/// Where predicted brackets for a document are written.
pub fn brackets_path(edus_path: &Path) -> PathBuf {
    sibling_path(edus_path, "brackets")
}

/// Where the gold tree for a document is read from.
pub fn gold_path(edus_path: &Path) -> PathBuf {
    sibling_path(edus_path, "dis")
}

/// Write one bracket per line.
pub fn write_brackets(path: impl AsRef<Path>, brackets: &[Bracket]) -> CorpusResult<()> {
    let path = path.as_ref();
    let file = fs::File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    for bracket in brackets {
        writeln!(writer, "{}", bracket).map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), brackets = brackets.len(), "wrote brackets");
    Ok(())
}

/// Read a gold `.dis` tree.
pub fn load_gold(path: impl AsRef<Path>, labels: RelationLabels) -> CorpusResult<RstTree> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CorpusError::MissingGold {
                path: path.to_path_buf(),
            })
        }
        Err(source) => return Err(io_error(path)(source)),
    };
    parse_dis_with(&content, labels).map_err(|source| CorpusError::Dis {
        path: path.to_path_buf(),
        source,
    })
}

/// All `.edus` files of a directory, sorted by path.
pub fn list_documents(dir: impl AsRef<Path>) -> CorpusResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == EDUS_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Settings for [`parse_corpus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusOptions {
    /// Write `<name>.brackets` next to every parsed document
    pub write_brackets: bool,
    /// Score against `<name>.dis` gold trees
    pub evaluate: bool,
    pub levels: Vec<MetricLevel>,
    pub relation_labels: RelationLabels,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            write_brackets: true,
            evaluate: false,
            levels: MetricLevel::ALL.to_vec(),
            relation_labels: RelationLabels::default(),
        }
    }
}

/// A successfully parsed document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub id: String,
    pub path: PathBuf,
    pub tree: RstTree,
    /// Set when brackets were written
    pub brackets_path: Option<PathBuf>,
    /// Gold tree, when the run evaluates
    pub gold: Option<RstTree>,
}

/// A document that could not be parsed or scored.
#[derive(Debug)]
pub struct DocumentFailure {
    pub document: String,
    pub error: DocumentError,
}

/// Outcome of a corpus run.
#[derive(Debug)]
pub struct CorpusReport {
    pub parsed: Vec<ParsedDocument>,
    pub failures: Vec<DocumentFailure>,
    /// Present when the run evaluates
    pub metrics: Option<MetricsReport>,
}

impl CorpusReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse every `.edus` document in `dir`.
///
/// Failures are collected per document; only an unreadable directory
/// fails the whole run. Documents are processed in parallel when the
/// `parallel` feature is enabled, and results keep path order either way.
pub fn parse_corpus<C: Classifier>(
    dir: impl AsRef<Path>,
    model: &ParsingModel<C>,
    options: &CorpusOptions,
) -> CorpusResult<CorpusReport> {
    let paths = list_documents(dir.as_ref())?;
    tracing::info!(dir = %dir.as_ref().display(), documents = paths.len(), "parsing corpus");

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Result<ParsedDocument, DocumentFailure>> = {
        use rayon::prelude::*;
        paths
            .par_iter()
            .map(|path| process_document(path, model, options))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Result<ParsedDocument, DocumentFailure>> = paths
        .iter()
        .map(|path| process_document(path, model, options))
        .collect();

    let mut metrics = options.evaluate.then(|| Metrics::new(&options.levels));
    let mut parsed = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(document) => {
                if let (Some(metrics), Some(gold)) = (metrics.as_mut(), document.gold.as_ref()) {
                    metrics.eval(gold, &document.tree);
                }
                parsed.push(document);
            }
            Err(failure) => {
                tracing::warn!(
                    document = %failure.document,
                    error = %failure.error,
                    "document failed"
                );
                failures.push(failure);
            }
        }
    }

    tracing::info!(parsed = parsed.len(), failed = failures.len(), "corpus finished");
    Ok(CorpusReport {
        parsed,
        failures,
        metrics: metrics.map(|metrics| metrics.report()),
    })
}

fn process_document<C: Classifier>(
    path: &Path,
    model: &ParsingModel<C>,
    options: &CorpusOptions,
) -> Result<ParsedDocument, DocumentFailure> {
    let id = document_id(path);
    let fail = |error: DocumentError| DocumentFailure {
        document: id.clone(),
        error,
    };

    let document = Document::load(path).map_err(|err| fail(err.into()))?;
    let tree = model.parse_document(&document).map_err(|err| fail(err.into()))?;

    let brackets_path = if options.write_brackets {
        let out = brackets_path(path);
        write_brackets(&out, &tree.bracketing()).map_err(|err| fail(err.into()))?;
        Some(out)
    } else {
        None
    };

    let gold = if options.evaluate {
        let gold = load_gold(gold_path(path), options.relation_labels)
            .map_err(|err| fail(err.into()))?;
        if gold.edu_count() != tree.edu_count() {
            tracing::warn!(
                document = %id,
                gold = gold.edu_count(),
                predicted = tree.edu_count(),
                "gold and predicted trees cover a different number of EDUs"
            );
        }
        Some(gold)
    } else {
        None
    };

    Ok(ParsedDocument {
        id,
        path: path.to_path_buf(),
        tree,
        brackets_path,
        gold,
    })
}
