//! Shift-reduce transition system.
//!
//! The engine owns a stack of partially built spans and a queue of
//! unattached leaves. Every document is parsed in one forward pass: `n`
//! shifts and `n - 1` reduces bring an `n`-EDU document to a single root.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ActionError, ParseError};
use crate::span::{Edu, NuclearityForm, SpanNode};
use crate::tree::RstTree;

/// A parsing action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Move the queue front onto the stack
    Shift,
    /// Combine the two topmost stack spans
    Reduce {
        form: NuclearityForm,
        relation: String,
    },
}

impl Action {
    pub fn reduce(form: NuclearityForm, relation: impl Into<String>) -> Self {
        Action::Reduce {
            form,
            relation: relation.into(),
        }
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, Action::Shift)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift => f.write_str("Shift"),
            Action::Reduce { form, relation } => write!(f, "Reduce({}, {})", form, relation),
        }
    }
}

/// Read-only view of the parser state.
#[derive(Debug, Clone, Copy)]
pub struct Configuration<'a> {
    /// Partially built spans, top of stack last
    pub stack: &'a [SpanNode],
    /// Unattached leaves in document order
    pub queue: &'a VecDeque<SpanNode>,
}

impl<'a> Configuration<'a> {
    pub fn new(stack: &'a [SpanNode], queue: &'a VecDeque<SpanNode>) -> Self {
        Self { stack, queue }
    }

    /// Topmost stack span.
    pub fn stack_top1(&self) -> Option<&'a SpanNode> {
        self.stack.last()
    }

    /// Second stack span from the top.
    pub fn stack_top2(&self) -> Option<&'a SpanNode> {
        self.stack.len().checked_sub(2).map(|idx| &self.stack[idx])
    }

    pub fn queue_front(&self) -> Option<&'a SpanNode> {
        self.queue.front()
    }
}

/// Owns the stack/queue of one document and applies transitions.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    stack: Vec<SpanNode>,
    queue: VecDeque<SpanNode>,
    doc_len: usize,
    transitions: usize,
}

impl TransitionEngine {
    /// Start a parse with every EDU queued as a leaf.
    pub fn new(edus: Vec<Edu>) -> Result<Self, ParseError> {
        if edus.is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        let doc_len = edus.len();
        let queue: VecDeque<SpanNode> = edus.into_iter().map(SpanNode::leaf).collect();
        Ok(Self {
            stack: Vec::with_capacity(doc_len),
            queue,
            doc_len,
            transitions: 0,
        })
    }

    /// Number of EDUs in the document.
    pub fn doc_len(&self) -> usize {
        self.doc_len
    }

    /// Number of transitions applied so far.
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn configuration(&self) -> Configuration<'_> {
        Configuration::new(&self.stack, &self.queue)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue empty and a single span left on the stack.
    pub fn is_terminal(&self) -> bool {
        self.queue.is_empty() && self.stack.len() == 1
    }

    pub fn is_legal(&self, action: &Action) -> bool {
        match action {
            Action::Shift => !self.queue.is_empty(),
            Action::Reduce { .. } => self.stack.len() >= 2,
        }
    }

    pub fn shift(&mut self) -> Result<(), ActionError> {
        let node = self.queue.pop_front().ok_or(ActionError::ShiftOnEmptyQueue)?;
        self.stack.push(node);
        self.transitions += 1;
        Ok(())
    }

    pub fn reduce(
        &mut self,
        form: NuclearityForm,
        relation: impl Into<String>,
    ) -> Result<(), ActionError> {
        let stack_len = self.stack.len();
        let Some(at) = stack_len.checked_sub(2) else {
            return Err(ActionError::ReduceOnShortStack { stack_len });
        };
        let mut top_two = self.stack.split_off(at).into_iter();
        let (Some(left), Some(right)) = (top_two.next(), top_two.next()) else {
            return Err(ActionError::ReduceOnShortStack { stack_len });
        };
        self.stack.push(SpanNode::construct(left, right, form, relation));
        self.transitions += 1;
        Ok(())
    }

    pub fn apply(&mut self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::Shift => self.shift(),
            Action::Reduce { form, relation } => self.reduce(*form, relation.as_str()),
        }
    }

    /// Hand over the finished tree.
    pub fn into_tree(mut self) -> Result<RstTree, ParseError> {
        if !self.is_terminal() {
            return Err(ParseError::NotTerminal {
                stack_len: self.stack.len(),
                queue_len: self.queue.len(),
            });
        }
        let queue_len = self.queue.len();
        self.stack
            .pop()
            .map(RstTree::new)
            .ok_or(ParseError::NotTerminal {
                stack_len: 0,
                queue_len,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(n: usize) -> TransitionEngine {
        let edus = (0..n).map(|i| Edu::new(i, format!("Unit number {}.", i))).collect();
        TransitionEngine::new(edus).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let engine = engine(3);
        assert_eq!(engine.stack_len(), 0);
        assert_eq!(engine.queue_len(), 3);
        assert!(!engine.is_terminal());
        let config = engine.configuration();
        assert!(config.stack_top1().is_none());
        assert_eq!(config.queue_front().map(|n| n.eduspan), Some((0, 0)));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(
            TransitionEngine::new(Vec::new()),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn test_shift_moves_one_span() {
        let mut engine = engine(2);
        engine.shift().unwrap();
        assert_eq!(engine.stack_len(), 1);
        assert_eq!(engine.queue_len(), 1);
        engine.shift().unwrap();
        assert_eq!(engine.stack_len(), 2);
        assert_eq!(engine.queue_len(), 0);
        assert_eq!(engine.shift(), Err(ActionError::ShiftOnEmptyQueue));
        assert_eq!(engine.stack_len(), 2);
    }

    #[test]
    fn test_reduce_needs_two_spans() {
        let mut engine = engine(2);
        assert_eq!(
            engine.reduce(NuclearityForm::NS, "elaboration"),
            Err(ActionError::ReduceOnShortStack { stack_len: 0 })
        );
        engine.shift().unwrap();
        assert_eq!(
            engine.reduce(NuclearityForm::NS, "elaboration"),
            Err(ActionError::ReduceOnShortStack { stack_len: 1 })
        );
        assert_eq!(engine.transitions(), 1);
        assert_eq!(engine.stack_len(), 1);
        assert_eq!(engine.queue_len(), 1);
    }

    #[test]
    fn test_reduce_keeps_document_order() {
        let mut engine = engine(2);
        engine.shift().unwrap();
        engine.shift().unwrap();
        engine.reduce(NuclearityForm::SN, "attribution").unwrap();
        assert_eq!(engine.stack_len(), 1);

        let top = engine.configuration().stack_top1().unwrap();
        assert_eq!(top.eduspan, (0, 1));
        let (left, right) = top.children().unwrap();
        assert_eq!(left.eduspan, (0, 0));
        assert_eq!(right.eduspan, (1, 1));
    }

    #[test]
    fn test_into_tree_before_terminal_fails() {
        let mut engine = engine(2);
        engine.shift().unwrap();
        assert!(matches!(
            engine.into_tree(),
            Err(ParseError::NotTerminal {
                stack_len: 1,
                queue_len: 1
            })
        ));
    }

    #[test]
    fn test_single_edu_terminates_after_one_shift() {
        let mut engine = engine(1);
        engine.shift().unwrap();
        assert!(engine.is_terminal());
        let tree = engine.into_tree().unwrap();
        assert!(tree.bracketing().is_empty());
    }

    #[test]
    fn test_is_legal() {
        let mut engine = engine(1);
        let reduce = Action::reduce(NuclearityForm::NN, "joint");
        assert!(engine.is_legal(&Action::Shift));
        assert!(!engine.is_legal(&reduce));
        engine.apply(&Action::Shift).unwrap();
        assert!(!engine.is_legal(&Action::Shift));
        assert!(!engine.is_legal(&reduce));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Shift.to_string(), "Shift");
        assert_eq!(
            Action::reduce(NuclearityForm::NS, "elaboration").to_string(),
            "Reduce(NS, elaboration)"
        );
    }
}
