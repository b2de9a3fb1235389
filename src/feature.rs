//! Feature extraction from parser configurations.
//!
//! [`FeatureGenerator::generate`] is a pure function of a [`Configuration`]:
//! the same configuration always produces the same ordered atom list,
//! which keeps vectorization reproducible between training and parsing.
//!
//! Atom families are gated on the presence of the span they describe. When
//! the stack holds a single span there are no `StackTop2` atoms at all,
//! rather than atoms with some default value; absence is informative to
//! the classifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::errors::FeatureError;
use crate::span::SpanNode;
use crate::transition::Configuration;

/// Paragraph marker carried by segmented EDU text.
const PARAGRAPH_MARKERS: [&str; 2] = ["<P>", "<p>"];

/// Which part of the configuration an atom describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureOrigin {
    StackTop1,
    StackTop2,
    QueueFront,
    /// Relation between the two topmost stack spans
    StackTop2StackTop1,
    /// Relation between the queue front and the stack top
    QueueFrontStackTop1,
    /// Whole-configuration features
    Global,
}

impl FeatureOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureOrigin::StackTop1 => "StackTop1",
            FeatureOrigin::StackTop2 => "StackTop2",
            FeatureOrigin::QueueFront => "QueueFront",
            FeatureOrigin::StackTop2StackTop1 => "StackTop2-StackTop1",
            FeatureOrigin::QueueFrontStackTop1 => "QueueFront-StackTop1",
            FeatureOrigin::Global => "Global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    StackStatus,
    QueueStatus,
    BeginWord,
    EndWord,
    LengthToken,
    BeginPos,
    EndPos,
    HeadWord,
    LengthEdu,
    DistanceToBegin,
    DistanceToEnd,
    EduGap,
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::StackStatus => "Stack-Status",
            FeatureKind::QueueStatus => "Queue-Status",
            FeatureKind::BeginWord => "Begin-Word",
            FeatureKind::EndWord => "End-Word",
            FeatureKind::LengthToken => "Length-Token",
            FeatureKind::BeginPos => "Begin-POS",
            FeatureKind::EndPos => "End-POS",
            FeatureKind::HeadWord => "Head-Word",
            FeatureKind::LengthEdu => "Length-EDU",
            FeatureKind::DistanceToBegin => "Distance-To-Begin",
            FeatureKind::DistanceToEnd => "Distance-To-End",
            FeatureKind::EduGap => "EDU-Gap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureValue {
    Label(String),
    Count(usize),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Label(label) => f.write_str(label),
            FeatureValue::Count(count) => write!(f, "{}", count),
        }
    }
}

/// One `(origin, kind, value)` feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureAtom {
    pub origin: FeatureOrigin,
    pub kind: FeatureKind,
    pub value: FeatureValue,
}

impl FeatureAtom {
    pub fn label(origin: FeatureOrigin, kind: FeatureKind, value: impl Into<String>) -> Self {
        Self {
            origin,
            kind,
            value: FeatureValue::Label(value.into()),
        }
    }

    pub fn count(origin: FeatureOrigin, kind: FeatureKind, value: usize) -> Self {
        Self {
            origin,
            kind,
            value: FeatureValue::Count(value),
        }
    }
}

impl fmt::Display for FeatureAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.origin.as_str(), self.kind.as_str(), self.value)
    }
}

/// Inputs to feature extraction beyond the configuration itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureOptions {
    /// Document length in EDUs; `Distance-To-End` atoms need it
    pub doc_len: Option<usize>,
}

impl FeatureOptions {
    pub fn with_doc_len(doc_len: usize) -> Self {
        Self { doc_len: Some(doc_len) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureGenerator {
    options: FeatureOptions,
}

impl FeatureGenerator {
    pub fn new(options: FeatureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> FeatureOptions {
        self.options
    }

    /// Produce the ordered feature atoms for a configuration.
    pub fn generate(
        &self,
        config: &Configuration<'_>,
    ) -> Result<Vec<FeatureAtom>, FeatureError> {
        let top1 = config.stack_top1();
        let top2 = config.stack_top2();
        let front = config.queue_front();

        let mut atoms = status_features(config);

        for (origin, span) in [
            (FeatureOrigin::StackTop1, top1),
            (FeatureOrigin::StackTop2, top2),
            (FeatureOrigin::QueueFront, front),
        ] {
            if let Some(span) = span {
                self.span_features(origin, span, &mut atoms)?;
            }
        }

        // Engine configurations keep these spans adjacent, so each gap
        // equals the earlier span's Length-EDU
        if let (Some(top2), Some(top1)) = (top2, top1) {
            atoms.push(FeatureAtom::count(
                FeatureOrigin::StackTop2StackTop1,
                FeatureKind::EduGap,
                top1.eduspan.0.saturating_sub(top2.eduspan.0),
            ));
        }
        if let (Some(front), Some(top1)) = (front, top1) {
            atoms.push(FeatureAtom::count(
                FeatureOrigin::QueueFrontStackTop1,
                FeatureKind::EduGap,
                front.eduspan.0.saturating_sub(top1.eduspan.0),
            ));
        }

        Ok(atoms)
    }

    fn span_features(
        &self,
        origin: FeatureOrigin,
        span: &SpanNode,
        atoms: &mut Vec<FeatureAtom>,
    ) -> Result<(), FeatureError> {
        let tokens = tokenize(&span.text);
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return Err(FeatureError::EmptySpanText { eduspan: span.eduspan });
        };
        atoms.push(FeatureAtom::label(origin, FeatureKind::BeginWord, first.as_str()));
        atoms.push(FeatureAtom::label(origin, FeatureKind::EndWord, last.as_str()));
        atoms.push(FeatureAtom::count(origin, FeatureKind::LengthToken, tokens.len()));

        if let (Some(first), Some(last)) = (span.pos.first(), span.pos.last()) {
            atoms.push(FeatureAtom::label(origin, FeatureKind::BeginPos, first.as_str()));
            atoms.push(FeatureAtom::label(origin, FeatureKind::EndPos, last.as_str()));
        }

        for head in &span.dep {
            atoms.push(FeatureAtom::label(origin, FeatureKind::HeadWord, head.as_str()));
        }

        let (start, end) = span.eduspan;
        atoms.push(FeatureAtom::count(origin, FeatureKind::LengthEdu, end - start + 1));
        atoms.push(FeatureAtom::count(origin, FeatureKind::DistanceToBegin, start));
        if let Some(doc_len) = self.options.doc_len {
            atoms.push(FeatureAtom::count(
                origin,
                FeatureKind::DistanceToEnd,
                doc_len.saturating_sub(end + 1),
            ));
        }
        Ok(())
    }
}

fn status_features(config: &Configuration<'_>) -> Vec<FeatureAtom> {
    let stack_status = match config.stack.len() {
        0 => "Empty-Stack",
        1 => "One-Elem-Stack",
        _ => "More-Elem-Stack",
    };
    let queue_status = if config.queue.is_empty() {
        "Empty-Queue"
    } else {
        "NonEmpty-Queue"
    };
    vec![
        FeatureAtom::label(FeatureOrigin::Global, FeatureKind::StackStatus, stack_status),
        FeatureAtom::label(FeatureOrigin::Global, FeatureKind::QueueStatus, queue_status),
    ]
}

/// Split span text into word tokens.
///
/// Paragraph markers and ASCII punctuation are removed before Unicode word
/// segmentation, so `"Don't"` becomes the single token `Dont`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut cleaned = text.to_string();
    for marker in PARAGRAPH_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.retain(|c| !c.is_ascii_punctuation());
    cleaned.unicode_words().map(str::to_string).collect()
}
