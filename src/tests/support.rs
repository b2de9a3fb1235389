//! Shared fixtures for the cross-module tests.

use crate::{
    Action, Edu, FeatureAtom, FeatureGenerator, FeatureOptions, NuclearityForm, RstTree, SpanNode,
    TransitionEngine,
};

pub(crate) fn edus(texts: &[&str]) -> Vec<Edu> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| Edu::new(index, *text))
        .collect()
}

/// Gold action sequence that rebuilds `tree` (post-order).
pub(crate) fn oracle(tree: &RstTree) -> Vec<Action> {
    let mut actions = Vec::new();
    oracle_node(tree.root(), &mut actions);
    actions
}

fn oracle_node(node: &SpanNode, out: &mut Vec<Action>) {
    match (node.children(), node.form) {
        (Some((left, right)), Some(form)) => {
            oracle_node(left, out);
            oracle_node(right, out);
            out.push(Action::reduce(form, node.construction_relation().unwrap_or_default()));
        }
        _ => out.push(Action::Shift),
    }
}

/// Run `actions` through a fresh engine, pairing each with the atoms of the
/// configuration it was taken from.
pub(crate) fn replay(
    edus: Vec<Edu>,
    actions: &[Action],
    options: FeatureOptions,
) -> Vec<(Vec<FeatureAtom>, Action)> {
    let generator = FeatureGenerator::new(options);
    let mut engine = TransitionEngine::new(edus).unwrap();
    let mut samples = Vec::new();
    for action in actions {
        let atoms = generator.generate(&engine.configuration()).unwrap();
        engine.apply(action).unwrap();
        samples.push((atoms, action.clone()));
    }
    assert!(engine.is_terminal(), "replayed actions must finish the parse");
    samples
}

/// Three small documents with their gold action sequences.
pub(crate) fn training_documents() -> Vec<(Vec<&'static str>, Vec<Action>)> {
    vec![
        (
            vec![
                "The company reported strong earnings,",
                "which surprised analysts,",
                "and its shares rose.",
            ],
            vec![
                Action::Shift,
                Action::Shift,
                Action::reduce(NuclearityForm::NS, "elaboration"),
                Action::Shift,
                Action::reduce(NuclearityForm::NN, "joint"),
            ],
        ),
        (
            vec!["Although sales fell,", "profits increased", "because costs were cut."],
            vec![
                Action::Shift,
                Action::Shift,
                Action::Shift,
                Action::reduce(NuclearityForm::NS, "explanation"),
                Action::reduce(NuclearityForm::SN, "contrast"),
            ],
        ),
        (
            vec!["He said", "the plan would work."],
            vec![
                Action::Shift,
                Action::Shift,
                Action::reduce(NuclearityForm::SN, "attribution"),
            ],
        ),
    ]
}

/// Samples from every training document.
pub(crate) fn training_samples(with_doc_len: bool) -> Vec<(Vec<FeatureAtom>, Action)> {
    training_documents()
        .into_iter()
        .flat_map(|(texts, actions)| {
            let options = FeatureOptions {
                doc_len: with_doc_len.then_some(texts.len()),
            };
            replay(edus(&texts), &actions, options)
        })
        .collect()
}

/// Gold `.dis` files matching [`training_documents`], keyed by document id.
pub(crate) const GOLD_TREES: [(&str, &str); 3] = [
    (
        "wsj_a",
        "( Root (span 1 3)
  ( Nucleus (span 1 2) (rel2par List)
    ( Nucleus (leaf 1) (rel2par span) (text _!The company reported strong earnings,_!) )
    ( Satellite (leaf 2) (rel2par elaboration-additional-e) (text _!which surprised analysts,_!) )
  )
  ( Nucleus (leaf 3) (rel2par List) (text _!and its shares rose._!) )
)",
    ),
    (
        "wsj_b",
        "( Root (span 1 3)
  ( Satellite (leaf 1) (rel2par Contrast) (text _!Although sales fell,_!) )
  ( Nucleus (span 2 3) (rel2par span)
    ( Nucleus (leaf 2) (rel2par span) (text _!profits increased_!) )
    ( Satellite (leaf 3) (rel2par reason) (text _!because costs were cut._!) )
  )
)",
    ),
    (
        "wsj_c",
        "( Root (span 1 2)
  ( Satellite (leaf 1) (rel2par attribution) (text _!He said_!) )
  ( Nucleus (leaf 2) (rel2par span) (text _!the plan would work._!) )
)",
    ),
];
