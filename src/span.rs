//! EDUs and discourse tree nodes.
//!
//! A [`SpanNode`] either wraps a single [`Edu`] (a leaf) or owns two
//! adjacent children. Children are moved into their parent when a
//! construction is built and never touched again, so a finished tree is a
//! strict binary tree with exclusive top-down ownership.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Elementary discourse unit: the atomic text span the parser works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edu {
    /// 0-based position in the document
    pub index: usize,
    /// Raw EDU text, possibly carrying a `<P>` paragraph marker
    pub text: String,
    /// Part-of-speech tags, token aligned (may be empty)
    pub pos: Vec<String>,
    /// Dependency head words (may be empty)
    pub dep: Vec<String>,
}

impl Edu {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            pos: Vec::new(),
            dep: Vec::new(),
        }
    }

    /// Attach part-of-speech tags.
    pub fn with_pos(mut self, pos: Vec<String>) -> Self {
        self.pos = pos;
        self
    }

    /// Attach dependency head words.
    pub fn with_dep(mut self, dep: Vec<String>) -> Self {
        self.dep = dep;
        self
    }
}

/// Role of a node with respect to its parent construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nuclearity {
    /// Salient part of a mono-nuclear relation
    Nucleus,
    /// Supporting part of a mono-nuclear relation
    Satellite,
    /// One of the symmetric parts of a multi-nuclear relation
    MultiNuclear,
}

/// Shape of a binary construction, read left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NuclearityForm {
    /// Left nucleus, right satellite
    NS,
    /// Left satellite, right nucleus
    SN,
    /// Multi-nuclear
    NN,
}

impl NuclearityForm {
    pub const ALL: [NuclearityForm; 3] =
        [NuclearityForm::NS, NuclearityForm::SN, NuclearityForm::NN];

    /// Roles assigned to the `(left, right)` children.
    pub fn roles(self) -> (Nuclearity, Nuclearity) {
        match self {
            NuclearityForm::NS => (Nuclearity::Nucleus, Nuclearity::Satellite),
            NuclearityForm::SN => (Nuclearity::Satellite, Nuclearity::Nucleus),
            NuclearityForm::NN => (Nuclearity::MultiNuclear, Nuclearity::MultiNuclear),
        }
    }

    /// Recover the form from the children's roles.
    pub fn from_roles(left: Nuclearity, right: Nuclearity) -> Option<Self> {
        match (left, right) {
            (Nuclearity::Nucleus, Nuclearity::Satellite) => Some(NuclearityForm::NS),
            (Nuclearity::Satellite, Nuclearity::Nucleus) => Some(NuclearityForm::SN),
            (Nuclearity::MultiNuclear, Nuclearity::MultiNuclear) => Some(NuclearityForm::NN),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NuclearityForm::NS => "NS",
            NuclearityForm::SN => "SN",
            NuclearityForm::NN => "NN",
        }
    }
}

impl fmt::Display for NuclearityForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the discourse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanNode {
    /// Inclusive `(first, last)` EDU range covered by this node
    pub eduspan: (usize, usize),
    /// Concatenated text of the covered EDUs
    pub text: String,
    /// Concatenated POS tags of the covered EDUs
    pub pos: Vec<String>,
    /// Concatenated dependency head words of the covered EDUs
    pub dep: Vec<String>,
    /// Role within the parent construction, set on attachment
    pub nuclearity: Option<Nuclearity>,
    /// Relation carried by this node (satellite child, or multi-nuclear construction)
    pub relation: Option<String>,
    /// Shape of the construction rooted here (internal nodes only)
    pub form: Option<NuclearityForm>,
    pub left: Option<Box<SpanNode>>,
    pub right: Option<Box<SpanNode>>,
}

impl SpanNode {
    /// Wrap a single EDU.
    pub fn leaf(edu: Edu) -> Self {
        Self {
            eduspan: (edu.index, edu.index),
            text: edu.text,
            pos: edu.pos,
            dep: edu.dep,
            nuclearity: None,
            relation: None,
            form: None,
            left: None,
            right: None,
        }
    }

    /// Combine two adjacent spans into a new construction.
    ///
    /// The children receive their roles from `form`. The relation lands on
    /// the satellite for mono-nuclear forms and on the new node for `NN`.
    /// Callers guarantee `left.eduspan.1 + 1 == right.eduspan.0`.
    pub fn construct(
        mut left: SpanNode,
        mut right: SpanNode,
        form: NuclearityForm,
        relation: impl Into<String>,
    ) -> Self {
        debug_assert_eq!(left.eduspan.1 + 1, right.eduspan.0, "children must be adjacent");
        let relation = relation.into();
        let (left_role, right_role) = form.roles();
        left.nuclearity = Some(left_role);
        right.nuclearity = Some(right_role);

        let own_relation = match form {
            NuclearityForm::NS => {
                right.relation = Some(relation);
                None
            }
            NuclearityForm::SN => {
                left.relation = Some(relation);
                None
            }
            NuclearityForm::NN => Some(relation),
        };

        let mut text = String::with_capacity(left.text.len() + right.text.len() + 1);
        text.push_str(&left.text);
        text.push(' ');
        text.push_str(&right.text);

        Self {
            eduspan: (left.eduspan.0, right.eduspan.1),
            text,
            pos: left.pos.iter().chain(right.pos.iter()).cloned().collect(),
            dep: left.dep.iter().chain(right.dep.iter()).cloned().collect(),
            nuclearity: None,
            relation: own_relation,
            form: Some(form),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Number of EDUs covered.
    pub fn edu_len(&self) -> usize {
        self.eduspan.1 - self.eduspan.0 + 1
    }

    /// Relation label of the construction rooted at this node.
    ///
    /// Returns `None` for leaves.
    pub fn construction_relation(&self) -> Option<&str> {
        match self.form? {
            NuclearityForm::NN => self.relation.as_deref(),
            NuclearityForm::NS => self.right.as_ref()?.relation.as_deref(),
            NuclearityForm::SN => self.left.as_ref()?.relation.as_deref(),
        }
    }

    /// Children in document order, if this is an internal node.
    pub fn children(&self) -> Option<(&SpanNode, &SpanNode)> {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => Some((left, right)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(index: usize, text: &str) -> SpanNode {
        SpanNode::leaf(Edu::new(index, text))
    }

    #[test]
    fn test_leaf_covers_single_edu() {
        let node = leaf(3, "It was tired.");
        assert_eq!(node.eduspan, (3, 3));
        assert!(node.is_leaf());
        assert_eq!(node.edu_len(), 1);
        assert_eq!(node.construction_relation(), None);
    }

    #[test]
    fn test_construct_mono_nuclear() {
        let node = SpanNode::construct(
            leaf(0, "The cat sat."),
            leaf(1, "It was tired."),
            NuclearityForm::NS,
            "elaboration",
        );
        assert_eq!(node.eduspan, (0, 1));
        assert_eq!(node.text, "The cat sat. It was tired.");
        assert_eq!(node.relation, None);

        let (left, right) = node.children().unwrap();
        assert_eq!(left.nuclearity, Some(Nuclearity::Nucleus));
        assert_eq!(left.relation, None);
        assert_eq!(right.nuclearity, Some(Nuclearity::Satellite));
        assert_eq!(right.relation.as_deref(), Some("elaboration"));
        assert_eq!(node.construction_relation(), Some("elaboration"));
    }

    #[test]
    fn test_construct_satellite_first() {
        let node = SpanNode::construct(
            leaf(0, "If it rains,"),
            leaf(1, "we stay."),
            NuclearityForm::SN,
            "condition",
        );
        let (left, right) = node.children().unwrap();
        assert_eq!(left.relation.as_deref(), Some("condition"));
        assert_eq!(right.relation, None);
        assert_eq!(node.construction_relation(), Some("condition"));
    }

    #[test]
    fn test_construct_multi_nuclear() {
        let node =
            SpanNode::construct(leaf(0, "Red,"), leaf(1, "green."), NuclearityForm::NN, "joint");
        let (left, right) = node.children().unwrap();
        assert_eq!(left.nuclearity, Some(Nuclearity::MultiNuclear));
        assert_eq!(right.nuclearity, Some(Nuclearity::MultiNuclear));
        assert_eq!(left.relation, None);
        assert_eq!(right.relation, None);
        assert_eq!(node.relation.as_deref(), Some("joint"));
        assert_eq!(node.construction_relation(), Some("joint"));
    }

    #[test]
    fn test_construct_concatenates_annotations() {
        let a = SpanNode::leaf(
            Edu::new(0, "a b")
                .with_pos(vec!["DT".into(), "NN".into()])
                .with_dep(vec!["b".into()]),
        );
        let b = SpanNode::leaf(Edu::new(1, "c").with_pos(vec!["VB".into()]));
        let node = SpanNode::construct(a, b, NuclearityForm::NN, "list");
        assert_eq!(node.pos, vec!["DT", "NN", "VB"]);
        assert_eq!(node.dep, vec!["b"]);
    }

    #[test]
    fn test_form_roles_round_trip() {
        for form in NuclearityForm::ALL {
            let (left, right) = form.roles();
            assert_eq!(NuclearityForm::from_roles(left, right), Some(form));
        }
        assert_eq!(NuclearityForm::from_roles(Nuclearity::Nucleus, Nuclearity::Nucleus), None);
    }
}
