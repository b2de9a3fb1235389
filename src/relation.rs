//! Relation label normalization.
//!
//! Gold trees use the fine-grained RST-DT inventory (`elaboration-additional-e`,
//! `temporal-same-time`, ...). Parsers are usually trained and scored on the
//! coarse classes, so gold labels are mapped before brackets are compared.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Granularity of relation labels read from gold trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationLabels {
    /// Lowercased labels with embedding suffixes removed
    Fine,
    /// Coarse relation classes
    #[default]
    Coarse,
}

/// Fine label (without suffix) to coarse class.
static COARSE_CLASSES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let groups: &[(&str, &[&str])] = &[
        ("attribution", &["attribution", "attribution-negative"]),
        ("background", &["background", "circumstance"]),
        ("cause", &["cause", "result", "consequence"]),
        ("comparison", &["comparison", "preference", "analogy", "proportion"]),
        ("condition", &["condition", "hypothetical", "contingency", "otherwise"]),
        ("contrast", &["contrast", "concession", "antithesis"]),
        (
            "elaboration",
            &[
                "elaboration-additional",
                "elaboration-general-specific",
                "elaboration-part-whole",
                "elaboration-process-step",
                "elaboration-object-attribute",
                "elaboration-set-member",
                "example",
                "definition",
            ],
        ),
        ("enablement", &["purpose", "enablement"]),
        ("evaluation", &["evaluation", "interpretation", "conclusion", "comment"]),
        ("explanation", &["evidence", "explanation-argumentative", "reason"]),
        ("joint", &["list", "disjunction"]),
        ("manner-means", &["manner", "means"]),
        (
            "topic-comment",
            &[
                "problem-solution",
                "question-answer",
                "statement-response",
                "topic-comment",
                "comment-topic",
                "rhetorical-question",
            ],
        ),
        ("summary", &["summary", "restatement"]),
        (
            "temporal",
            &[
                "temporal-before",
                "temporal-after",
                "temporal-same-time",
                "sequence",
                "inverted-sequence",
            ],
        ),
        ("topic-change", &["topic-shift", "topic-drift"]),
        ("textual-organization", &["textualorganization", "textual-organization"]),
        ("same-unit", &["same-unit"]),
        ("span", &["span"]),
    ];
    groups
        .iter()
        .flat_map(|(class, members)| members.iter().map(move |fine| (*fine, *class)))
        .collect()
});

/// Lowercase a label and drop RST-DT embedding suffixes (`-e`, `-s`, `-n`).
pub fn strip_suffixes(label: &str) -> String {
    let mut label = label.trim().to_lowercase();
    while label.len() > 2
        && (label.ends_with("-e") || label.ends_with("-s") || label.ends_with("-n"))
    {
        label.truncate(label.len() - 2);
    }
    label
}

/// Coarse class for a fine label, if it is part of the known inventory.
pub fn coarse_class(label: &str) -> Option<&'static str> {
    COARSE_CLASSES.get(strip_suffixes(label).as_str()).copied()
}

/// Normalize a gold label at the requested granularity.
///
/// Labels outside the inventory are kept in their stripped form.
pub fn normalize(label: &str, labels: RelationLabels) -> String {
    let stripped = strip_suffixes(label);
    match labels {
        RelationLabels::Fine => stripped,
        RelationLabels::Coarse => match COARSE_CLASSES.get(stripped.as_str()) {
            Some(class) => (*class).to_string(),
            None => {
                tracing::debug!(label, "relation label has no coarse class");
                stripped
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_suffixes() {
        assert_eq!(strip_suffixes("Elaboration-Additional-e"), "elaboration-additional");
        assert_eq!(strip_suffixes("consequence-n-e"), "consequence");
        assert_eq!(strip_suffixes("same-unit"), "same-unit");
        assert_eq!(strip_suffixes("span"), "span");
    }

    #[test]
    fn test_coarse_class() {
        assert_eq!(coarse_class("elaboration-object-attribute-e"), Some("elaboration"));
        assert_eq!(coarse_class("List"), Some("joint"));
        assert_eq!(coarse_class("temporal-same-time"), Some("temporal"));
        assert_eq!(coarse_class("made-up"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Attribution-negative", RelationLabels::Coarse), "attribution");
        assert_eq!(normalize("Attribution-negative", RelationLabels::Fine), "attribution-negative");
        assert_eq!(normalize("Made-Up-s", RelationLabels::Coarse), "made-up");
    }
}
