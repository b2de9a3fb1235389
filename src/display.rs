use std::fmt::{self, Write};

use unicode_width::UnicodeWidthStr;

use crate::tree::RstTree;

/// Renders a discourse tree as an EDU header row followed by one line per
/// bracket.
pub struct RstTreeDisplay<'a> {
    tree: &'a RstTree,
    show_text: bool,
}

// 0,  1,  2 - EDU indexes
// 0  1  2
//    ╰──╯ NN joint
// ╰─────╯ NS elaboration
//
// with text:
// The cat sat.  It was tired,  because it ran.
//               ╰────────────────────────────╯ NS explanation
// ╰──────────────────────────────────────────╯ NS elaboration
impl<'a> fmt::Display for RstTreeDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SPACE_PADDING: usize = 2;
        let mut edu_idx_to_start_display_char_idx = Vec::new();
        let mut edu_idx_to_end_display_char_idx = Vec::new();

        let mut opening_line = String::new();
        for (idx, leaf) in self.tree.leaves().into_iter().enumerate() {
            if idx > 0 {
                opening_line.extend(std::iter::repeat(' ').take(SPACE_PADDING));
            }
            edu_idx_to_start_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
            if self.show_text {
                opening_line.push_str(&leaf.text);
            } else {
                write!(&mut opening_line, "{}", leaf.eduspan.0)?;
            }
            edu_idx_to_end_display_char_idx.push(UnicodeWidthStr::width(&*opening_line));
        }

        f.write_str(&opening_line)?;

        let first = self.tree.root().eduspan.0;
        for bracket in self.tree.bracketing() {
            f.write_char('\n')?;

            let start_char_idx = edu_idx_to_start_display_char_idx[bracket.eduspan.0 - first];
            for _ in 0..start_char_idx {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;

            let end_char_idx = edu_idx_to_end_display_char_idx[bracket.eduspan.1 - first];
            let char_len = end_char_idx - start_char_idx;
            for _ in (start_char_idx + 1)..end_char_idx.saturating_sub(1) {
                f.write_char('─')?;
            }

            if char_len > 1 {
                f.write_char('╯')?;
            }

            write!(f, " {} {}", bracket.form, bracket.relation)?;
        }

        Ok(())
    }
}

impl<'a> RstTreeDisplay<'a> {
    pub fn new(tree: &'a RstTree) -> Self {
        RstTreeDisplay {
            tree,
            show_text: false,
        }
    }

    /// Print EDU text instead of EDU indexes in the header row.
    pub fn with_text(mut self) -> Self {
        self.show_text = true;
        self
    }
}

impl RstTree {
    pub fn display(&self) -> RstTreeDisplay<'_> {
        RstTreeDisplay::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::span::{Edu, NuclearityForm, SpanNode};
    use crate::tree::RstTree;

    fn leaf(index: usize, text: &str) -> SpanNode {
        SpanNode::leaf(Edu::new(index, text))
    }

    #[test]
    fn test_display_indexes() {
        let inner = SpanNode::construct(leaf(1, "b"), leaf(2, "c"), NuclearityForm::NN, "joint");
        let tree = RstTree::new(SpanNode::construct(
            leaf(0, "a"),
            inner,
            NuclearityForm::NS,
            "elaboration",
        ));

        insta::assert_snapshot!(tree.display(), @r###"
        0  1  2
           ╰──╯ NN joint
        ╰─────╯ NS elaboration
        "###);
    }

    #[test]
    fn test_display_text() {
        let inner = SpanNode::construct(
            leaf(1, "It was tired,"),
            leaf(2, "because it ran."),
            NuclearityForm::NS,
            "explanation",
        );
        let tree = RstTree::new(SpanNode::construct(
            leaf(0, "The cat sat."),
            inner,
            NuclearityForm::NS,
            "elaboration",
        ));

        insta::assert_snapshot!(tree.display().with_text(), @r###"
        The cat sat.  It was tired,  because it ran.
                      ╰────────────────────────────╯ NS explanation
        ╰──────────────────────────────────────────╯ NS elaboration
        "###);
    }

    #[test]
    fn test_display_single_edu() {
        let tree = RstTree::new(leaf(0, "Alone."));
        assert_eq!(tree.display().with_text().to_string(), "Alone.");
    }
}
