//! Reader for bracket-annotated RST-DT gold trees (`.dis` files).
//!
//! ```text
//! ( Root (span 1 2)
//!   ( Nucleus (leaf 1) (rel2par span) (text _!The cat sat._!) )
//!   ( Satellite (leaf 2) (rel2par elaboration-additional) (text _!It was tired._!) )
//! )
//! ```
//!
//! EDU numbers are 1-based in the file and 0-based in the returned tree.
//! Nodes with more than two children are binarized: multi-nuclear nodes
//! branch to the right, and a nucleus with several satellites absorbs its
//! right satellites first and its left satellites afterwards.

use crate::errors::DisError;
use crate::relation::{normalize, RelationLabels};
use crate::span::{Edu, NuclearityForm, SpanNode};
use crate::tree::RstTree;

const TEXT_DELIMITER: &str = "_!";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open(usize),
    Close(usize),
    Atom(usize, String),
    Text(usize, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sexp {
    Atom(String),
    Text(String),
    List(usize, Vec<Sexp>),
}

/// Role written in the file for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisRole {
    Root,
    Nucleus,
    Satellite,
}

#[derive(Debug)]
struct DisNode {
    role: DisRole,
    span: (usize, usize),
    rel2par: Option<String>,
    text: Option<String>,
    children: Vec<DisNode>,
}

/// Parse a `.dis` document into a binary discourse tree with coarse
/// relation labels.
pub fn parse_dis(input: &str) -> Result<RstTree, DisError> {
    parse_dis_with(input, RelationLabels::Coarse)
}

/// Parse a `.dis` document, normalizing relations at the given granularity.
pub fn parse_dis_with(input: &str, labels: RelationLabels) -> Result<RstTree, DisError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let sexp = read_sexp(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(syntax(
            token_offset(&tokens[pos]),
            "trailing content after the root node",
        ));
    }
    let root = read_node(&sexp)?;
    if root.role != DisRole::Root {
        return Err(structure("top-level node is not Root"));
    }
    let node = build(root, labels)?;
    if node.eduspan.0 != 0 {
        return Err(structure(format!(
            "tree starts at EDU {} instead of 1",
            node.eduspan.0 + 1
        )));
    }
    Ok(RstTree::new(node.node))
}

fn syntax(offset: usize, message: impl Into<String>) -> DisError {
    DisError::Syntax {
        offset,
        message: message.into(),
    }
}

fn structure(message: impl Into<String>) -> DisError {
    DisError::Structure {
        message: message.into(),
    }
}

fn token_offset(token: &Token) -> usize {
    match token {
        Token::Open(offset)
        | Token::Close(offset)
        | Token::Atom(offset, _)
        | Token::Text(offset, _) => *offset,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, DisError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while let Some(ch) = rest.chars().next() {
        let consumed = if ch.is_whitespace() {
            ch.len_utf8()
        } else if ch == '(' {
            tokens.push(Token::Open(offset));
            1
        } else if ch == ')' {
            tokens.push(Token::Close(offset));
            1
        } else if rest.starts_with(TEXT_DELIMITER) {
            let body = &rest[TEXT_DELIMITER.len()..];
            let end = body
                .find(TEXT_DELIMITER)
                .ok_or_else(|| syntax(offset, "unterminated text"))?;
            tokens.push(Token::Text(offset, body[..end].to_string()));
            TEXT_DELIMITER.len() * 2 + end
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .unwrap_or(rest.len());
            tokens.push(Token::Atom(offset, rest[..end].to_string()));
            end
        };
        rest = &rest[consumed..];
        offset += consumed;
    }
    Ok(tokens)
}

fn read_sexp(tokens: &[Token], pos: &mut usize) -> Result<Sexp, DisError> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| syntax(tokens.last().map_or(0, token_offset), "unexpected end of input"))?;
    *pos += 1;
    match token {
        Token::Atom(_, atom) => Ok(Sexp::Atom(atom.clone())),
        Token::Text(_, text) => Ok(Sexp::Text(text.clone())),
        Token::Close(offset) => Err(syntax(*offset, "unbalanced ')'")),
        Token::Open(offset) => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::Close(_)) => {
                        *pos += 1;
                        return Ok(Sexp::List(*offset, items));
                    }
                    Some(_) => items.push(read_sexp(tokens, pos)?),
                    None => return Err(syntax(*offset, "unclosed '('")),
                }
            }
        }
    }
}

fn read_number(item: Option<&Sexp>) -> Result<usize, DisError> {
    match item {
        Some(Sexp::Atom(atom)) => atom
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| structure(format!("invalid EDU number '{}'", atom))),
        _ => Err(structure("missing EDU number")),
    }
}

fn read_node(sexp: &Sexp) -> Result<DisNode, DisError> {
    let Sexp::List(offset, items) = sexp else {
        return Err(structure("expected a node"));
    };
    let role = match items.first() {
        Some(Sexp::Atom(name)) if name == "Root" => DisRole::Root,
        Some(Sexp::Atom(name)) if name == "Nucleus" => DisRole::Nucleus,
        Some(Sexp::Atom(name)) if name == "Satellite" => DisRole::Satellite,
        _ => return Err(syntax(*offset, "expected Root, Nucleus or Satellite")),
    };

    let mut span = None;
    let mut rel2par = None;
    let mut text = None;
    let mut children = Vec::new();

    for item in &items[1..] {
        let Sexp::List(_, fields) = item else {
            return Err(syntax(*offset, "unexpected bare atom inside a node"));
        };
        match fields.first() {
            Some(Sexp::Atom(name)) if name == "span" => {
                span = Some((read_number(fields.get(1))?, read_number(fields.get(2))?));
            }
            Some(Sexp::Atom(name)) if name == "leaf" => {
                let edu = read_number(fields.get(1))?;
                span = Some((edu, edu));
            }
            Some(Sexp::Atom(name)) if name == "rel2par" => match fields.get(1) {
                Some(Sexp::Atom(label)) => rel2par = Some(label.clone()),
                _ => return Err(structure("rel2par without a label")),
            },
            Some(Sexp::Atom(name)) if name == "text" => match fields.get(1) {
                Some(Sexp::Text(body)) | Some(Sexp::Atom(body)) => text = Some(body.clone()),
                _ => text = Some(String::new()),
            },
            _ => children.push(read_node(item)?),
        }
    }

    let (first, last) = span.ok_or_else(|| structure("node without span or leaf"))?;
    Ok(DisNode {
        role,
        span: (first - 1, last - 1),
        rel2par,
        text,
        children,
    })
}

/// A converted subtree plus the role/relation it carries towards its parent.
struct Built {
    node: SpanNode,
    eduspan: (usize, usize),
    role: DisRole,
    relation: String,
}

fn build(dis: DisNode, labels: RelationLabels) -> Result<Built, DisError> {
    let relation = normalize(dis.rel2par.as_deref().unwrap_or("span"), labels);

    if dis.children.is_empty() {
        if dis.span.0 != dis.span.1 {
            return Err(structure(format!(
                "span ({}, {}) has no children",
                dis.span.0 + 1,
                dis.span.1 + 1
            )));
        }
        let leaf = SpanNode::leaf(Edu::new(dis.span.0, dis.text.unwrap_or_default()));
        return Ok(Built {
            eduspan: leaf.eduspan,
            node: leaf,
            role: dis.role,
            relation,
        });
    }
    if dis.children.len() == 1 {
        return Err(structure("node with a single child"));
    }

    let mut children = dis
        .children
        .into_iter()
        .map(|child| build(child, labels))
        .collect::<Result<Vec<_>, _>>()?;
    children.sort_by_key(|child| child.eduspan.0);

    let nuclei = children.iter().filter(|c| c.role == DisRole::Nucleus).count();
    let node = if nuclei == children.len() {
        binarize_multinuclear(children)?
    } else if nuclei == 1 {
        binarize_mononuclear(children)?
    } else {
        return Err(structure(format!(
            "span ({}, {}) mixes {} nuclei with satellites",
            dis.span.0 + 1,
            dis.span.1 + 1,
            nuclei
        )));
    };

    if node.eduspan != dis.span {
        return Err(structure(format!(
            "span ({}, {}) does not match its children",
            dis.span.0 + 1,
            dis.span.1 + 1
        )));
    }
    Ok(Built {
        eduspan: node.eduspan,
        node,
        role: dis.role,
        relation,
    })
}

fn join(
    left: SpanNode,
    right: SpanNode,
    form: NuclearityForm,
    relation: &str,
) -> Result<SpanNode, DisError> {
    if left.eduspan.1 + 1 != right.eduspan.0 {
        return Err(structure(format!(
            "spans ({}, {}) and ({}, {}) are not adjacent",
            left.eduspan.0 + 1,
            left.eduspan.1 + 1,
            right.eduspan.0 + 1,
            right.eduspan.1 + 1
        )));
    }
    Ok(SpanNode::construct(left, right, form, relation))
}

fn binarize_multinuclear(children: Vec<Built>) -> Result<SpanNode, DisError> {
    let relation = children[0].relation.clone();
    let mut iter = children.into_iter().rev();
    let mut acc = match iter.next() {
        Some(last) => last.node,
        None => return Err(structure("empty multi-nuclear node")),
    };
    for child in iter {
        acc = join(child.node, acc, NuclearityForm::NN, &relation)?;
    }
    Ok(acc)
}

fn binarize_mononuclear(children: Vec<Built>) -> Result<SpanNode, DisError> {
    let nucleus_idx = children
        .iter()
        .position(|c| c.role == DisRole::Nucleus)
        .ok_or_else(|| structure("mono-nuclear node without nucleus"))?;

    let mut left_satellites = Vec::new();
    let mut nucleus = None;
    let mut right_satellites = Vec::new();
    for (idx, child) in children.into_iter().enumerate() {
        match idx.cmp(&nucleus_idx) {
            std::cmp::Ordering::Less => left_satellites.push(child),
            std::cmp::Ordering::Equal => nucleus = Some(child),
            std::cmp::Ordering::Greater => right_satellites.push(child),
        }
    }
    let mut acc = nucleus
        .map(|n| n.node)
        .ok_or_else(|| structure("mono-nuclear node without nucleus"))?;

    for satellite in right_satellites {
        acc = join(acc, satellite.node, NuclearityForm::NS, &satellite.relation)?;
    }
    for satellite in left_satellites.into_iter().rev() {
        acc = join(satellite.node, acc, NuclearityForm::SN, &satellite.relation)?;
    }
    Ok(acc)
}
