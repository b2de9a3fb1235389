//! Discourse trees and bracket extraction.
//!
//! Trees are compared bracket by bracket: every internal node contributes
//! one [`Bracket`] holding its EDU range, the nuclearity form of the
//! construction and the construction relation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::{NuclearityForm, SpanNode};

/// Scoring unit for one internal node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bracket {
    pub eduspan: (usize, usize),
    pub form: NuclearityForm,
    pub relation: String,
}

impl Bracket {
    pub fn new(eduspan: (usize, usize), form: NuclearityForm, relation: impl Into<String>) -> Self {
        Self {
            eduspan,
            form,
            relation: relation.into(),
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(({}, {}), {}, {})",
            self.eduspan.0, self.eduspan.1, self.form, self.relation
        )
    }
}

/// A complete discourse tree over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RstTree {
    root: SpanNode,
}

impl RstTree {
    pub fn new(root: SpanNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &SpanNode {
        &self.root
    }

    pub fn into_root(self) -> SpanNode {
        self.root
    }

    /// Number of EDUs covered by the tree.
    pub fn edu_count(&self) -> usize {
        self.root.edu_len()
    }

    /// Leaves in document order.
    pub fn leaves(&self) -> Vec<&SpanNode> {
        let mut leaves = Vec::with_capacity(self.edu_count());
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node.children() {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => leaves.push(node),
            }
        }
        leaves
    }

    /// One bracket per internal node, in post-order.
    ///
    /// A tree over `n` EDUs yields exactly `n - 1` brackets.
    pub fn bracketing(&self) -> Vec<Bracket> {
        let mut brackets = Vec::with_capacity(self.edu_count().saturating_sub(1));
        collect_brackets(&self.root, &mut brackets);
        brackets
    }
}

fn collect_brackets(node: &SpanNode, out: &mut Vec<Bracket>) {
    let Some((left, right)) = node.children() else {
        return;
    };
    collect_brackets(left, out);
    collect_brackets(right, out);
    if let Some(form) = node.form {
        let relation = node.construction_relation().unwrap_or_default();
        out.push(Bracket::new(node.eduspan, form, relation));
    }
}
