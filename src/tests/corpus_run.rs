//! Batch parsing and evaluation over a corpus directory.

use std::fs;
use std::path::Path;

use super::support::{oracle, replay, training_documents, GOLD_TREES};
use crate::corpus::{gold_path, load_gold};
use crate::{
    parse_corpus, CorpusOptions, Document, DocumentError, FeatureSettings, LinearSvm, MetricLevel,
    ParseError,
    ParsingModel, RelationLabels,
};

/// Write the training documents and their gold trees into `dir`.
fn write_corpus(dir: &Path) {
    for ((id, dis), (texts, _)) in GOLD_TREES.iter().zip(training_documents()) {
        fs::write(dir.join(format!("{}.edus", id)), texts.join("\n") + "\n").unwrap();
        fs::write(dir.join(format!("{}.dis", id)), dis).unwrap();
    }
}

/// Train on the corpus itself, with gold actions read from the `.dis` files.
fn train_on_corpus(dir: &Path) -> ParsingModel {
    let settings = FeatureSettings::default();
    let mut samples = Vec::new();
    for (id, _) in GOLD_TREES {
        let path = dir.join(format!("{}.edus", id));
        let document = Document::load(&path).unwrap();
        let gold = load_gold(gold_path(&path), RelationLabels::Coarse).unwrap();
        let options = settings.options_for(document.len());
        samples.extend(replay(document.edus, &oracle(&gold), options));
    }
    ParsingModel::train(&samples, LinearSvm::default(), settings).unwrap()
}

#[test]
fn gold_trees_match_training_sequences() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    for ((id, _), (_, actions)) in GOLD_TREES.iter().zip(training_documents()) {
        let gold =
            load_gold(dir.path().join(format!("{}.dis", id)), RelationLabels::Coarse).unwrap();
        assert_eq!(oracle(&gold), actions, "document {}", id);
    }
}

#[test]
fn evaluating_training_corpus_scores_perfectly() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let model = train_on_corpus(dir.path());

    let options = CorpusOptions {
        evaluate: true,
        ..CorpusOptions::default()
    };
    let report = parse_corpus(dir.path(), &model, &options).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.parsed.iter().map(|doc| doc.id.as_str()).collect::<Vec<_>>(),
        vec!["wsj_a", "wsj_b", "wsj_c"]
    );

    let metrics = report.metrics.unwrap();
    assert_eq!(metrics.documents, 3);
    for level in MetricLevel::ALL {
        let row = metrics.level(level).unwrap();
        assert_eq!((row.precision, row.recall, row.f1), (1.0, 1.0, 1.0), "level {}", level);
    }

    let brackets = fs::read_to_string(dir.path().join("wsj_b.brackets")).unwrap();
    assert_eq!(brackets, "((1, 2), NS, explanation)\n((0, 2), SN, contrast)\n");
}

#[test]
fn failing_documents_do_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let model = train_on_corpus(dir.path());
    fs::write(dir.path().join("empty.edus"), "").unwrap();

    let report = parse_corpus(dir.path(), &model, &CorpusOptions::default()).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.parsed.len(), 3);
    assert!(report.metrics.is_none());

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.document, "empty");
    assert!(matches!(
        failure.error,
        DocumentError::Parse(ParseError::EmptyDocument)
    ));
    assert!(!dir.path().join("empty.brackets").exists());
}

#[test]
fn missing_gold_fails_only_that_document() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let model = train_on_corpus(dir.path());
    fs::remove_file(dir.path().join("wsj_c.dis")).unwrap();

    let options = CorpusOptions {
        evaluate: true,
        write_brackets: false,
        ..CorpusOptions::default()
    };
    let report = parse_corpus(dir.path(), &model, &options).unwrap();
    assert_eq!(report.parsed.len(), 2);
    assert_eq!(report.failures[0].document, "wsj_c");
    assert_eq!(report.metrics.map(|metrics| metrics.documents), Some(2));
    assert!(!dir.path().join("wsj_a.brackets").exists());
}

#[test]
fn unreadable_directory_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let model = train_on_corpus_from_fixtures();
    let result = parse_corpus(dir.path().join("missing"), &model, &CorpusOptions::default());
    assert!(result.is_err());
}

fn train_on_corpus_from_fixtures() -> ParsingModel {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    train_on_corpus(dir.path())
}
