//! End-to-end parsing: training on gold sequences, then driving the
//! transition engine with the trained model.

use super::support::{edus, oracle, replay, training_documents, training_samples};
use crate::{
    Action, Bracket, FeatureError, FeatureOptions, FeatureSettings, LinearSvm, NuclearityForm,
    ParseError, ParsingModel, TransitionEngine,
};

fn two_edu_model() -> (ParsingModel, Vec<(Vec<crate::FeatureAtom>, Action)>) {
    let samples = replay(
        edus(&["The cat sat.", "It was tired."]),
        &[
            Action::Shift,
            Action::Shift,
            Action::reduce(NuclearityForm::NS, "elaboration"),
        ],
        FeatureOptions::default(),
    );
    let model =
        ParsingModel::train(&samples, LinearSvm::default(), FeatureSettings::default()).unwrap();
    (model, samples)
}

#[test]
fn two_edu_document() {
    let (model, samples) = two_edu_model();
    assert_eq!(model.labels().len(), 2);
    for (atoms, action) in &samples {
        assert_eq!(&model.predict(atoms).unwrap(), action);
    }

    let tree = model.parse(edus(&["The cat sat.", "It was tired."])).unwrap();
    assert_eq!(tree.bracketing(), vec![Bracket::new((0, 1), NuclearityForm::NS, "elaboration")]);
    assert_eq!(tree.root().text, "The cat sat. It was tired.");

    insta::assert_snapshot!(tree.display().with_text(), @r###"
    The cat sat.  It was tired.
    ╰─────────────────────────╯ NS elaboration
    "###);
}

#[test]
fn trained_model_reproduces_training_trees() {
    for use_document_length in [false, true] {
        let model = ParsingModel::train(
            &training_samples(use_document_length),
            LinearSvm::default(),
            FeatureSettings { use_document_length },
        )
        .unwrap();

        for (texts, gold_actions) in training_documents() {
            let tree = model.parse(edus(&texts)).unwrap();
            assert_eq!(oracle(&tree), gold_actions, "document {:?}", texts);
        }
    }
}

#[test]
fn single_edu_document_has_no_brackets() {
    let (model, _) = two_edu_model();
    let tree = model.parse(edus(&["Alone."])).unwrap();
    assert_eq!(tree.edu_count(), 1);
    assert!(tree.bracketing().is_empty());
}

#[test]
fn empty_document_is_rejected() {
    let (model, _) = two_edu_model();
    assert!(matches!(model.parse(Vec::new()), Err(ParseError::EmptyDocument)));
}

#[test]
fn punctuation_only_edu_fails_feature_extraction() {
    let (model, _) = two_edu_model();
    let result = model.parse(edus(&["The cat sat.", "..."]));
    assert!(matches!(
        result,
        Err(ParseError::Feature(FeatureError::EmptySpanText { eduspan: (1, 1) }))
    ));
}

/// Small deterministic generator for action sequences.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn any_legal_sequence_builds_a_complete_tree() {
    let relations = ["elaboration", "joint", "attribution", "contrast"];
    for n in 1..=7 {
        for seed in 0..25 {
            let mut rng = Lcg(seed * 31 + n as u64);
            let texts: Vec<String> = (0..n).map(|i| format!("Unit {}.", i)).collect();
            let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let mut engine = TransitionEngine::new(edus(&text_refs)).unwrap();

            while !engine.is_terminal() {
                let reduce = Action::reduce(
                    NuclearityForm::ALL[(rng.next() % 3) as usize],
                    relations[(rng.next() % 4) as usize],
                );
                let action = match (engine.is_legal(&Action::Shift), engine.is_legal(&reduce)) {
                    (true, true) if rng.next() % 2 == 0 => Action::Shift,
                    (true, true) => reduce,
                    (true, false) => Action::Shift,
                    (false, _) => reduce,
                };
                let (stack, queue) = (engine.stack_len(), engine.queue_len());
                engine.apply(&action).unwrap();
                if action.is_shift() {
                    assert_eq!((engine.stack_len(), engine.queue_len()), (stack + 1, queue - 1));
                } else {
                    assert_eq!((engine.stack_len(), engine.queue_len()), (stack - 1, queue));
                }
            }

            assert_eq!(engine.transitions(), 2 * n - 1);
            let tree = engine.into_tree().unwrap();
            assert_eq!(tree.edu_count(), n);
            assert_eq!(tree.root().eduspan, (0, n - 1));

            let leaves: Vec<_> = tree.leaves().iter().map(|leaf| leaf.eduspan.0).collect();
            assert_eq!(leaves, (0..n).collect::<Vec<_>>());

            let brackets = tree.bracketing();
            assert_eq!(brackets.len(), n - 1);
            assert_eq!(brackets, tree.bracketing());
            assert!(brackets.iter().all(|b| b.eduspan.0 < b.eduspan.1));
        }
    }
}
