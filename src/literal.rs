//! Reader for the `{index: [str, ...]}` dictionaries that carry per-EDU
//! part-of-speech tags and dependency heads next to a `.edus` file.
//!
//! ```text
//! {0: ['DT', 'NN', 'VBD'], 1: ["PRP", 'VBD', 'JJ'],}
//! ```
//!
//! Strings may use single or double quotes (with an optional `u` prefix),
//! and trailing commas are accepted. A repeated key keeps its last value.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::LiteralError;

/// Parse a literal dictionary into per-EDU string lists.
pub fn parse_literal(input: &str) -> Result<BTreeMap<usize, Vec<String>>, LiteralError> {
    let mut cursor = Cursor {
        input,
        chars: input.char_indices().peekable(),
    };
    let mut entries = BTreeMap::new();

    cursor.skip_ws();
    cursor.expect('{')?;
    loop {
        cursor.skip_ws();
        if cursor.eat('}') {
            break;
        }
        let key = cursor.integer()?;
        cursor.skip_ws();
        cursor.expect(':')?;
        cursor.skip_ws();
        let values = cursor.string_list()?;
        entries.insert(key, values);

        cursor.skip_ws();
        if cursor.eat(',') {
            continue;
        }
        cursor.expect('}')?;
        break;
    }

    cursor.skip_ws();
    if let Some((pos, ch)) = cursor.chars.peek().copied() {
        return Err(cursor.error(pos, format!("unexpected '{}' after closing brace", ch)));
    }
    Ok(entries)
}

struct Cursor<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Cursor<'a> {
    fn error(&self, byte_pos: usize, message: impl Into<String>) -> LiteralError {
        LiteralError {
            line: count_lines(self.input, byte_pos),
            message: message.into(),
        }
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(pos, _)| pos)
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|&(_, c)| c == expected).is_some()
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((pos, c)) => {
                Err(self.error(pos, format!("expected '{}', found '{}'", expected, c)))
            }
            None => Err(self.error(
                self.input.len(),
                format!("expected '{}', found end of input", expected),
            )),
        }
    }

    fn integer(&mut self) -> Result<usize, LiteralError> {
        let start = self.position();
        let mut digits = String::new();
        while let Some((_, c)) = self.chars.next_if(|&(_, c)| c.is_ascii_digit()) {
            digits.push(c);
        }
        if digits.is_empty() {
            return Err(self.error(start, "expected an integer key"));
        }
        digits
            .parse()
            .map_err(|_| self.error(start, format!("integer key '{}' out of range", digits)))
    }

    fn string_list(&mut self) -> Result<Vec<String>, LiteralError> {
        self.expect('[')?;
        let mut values = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(']') {
                return Ok(values);
            }
            values.push(self.string()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect(']')?;
            return Ok(values);
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let start = self.position();
        self.eat('u');
        let quote = match self.chars.next() {
            Some((_, c @ ('\'' | '"'))) => c,
            Some((pos, c)) => {
                return Err(self.error(pos, format!("expected a quoted string, found '{}'", c)))
            }
            None => return Err(self.error(start, "expected a quoted string, found end of input")),
        };

        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(value),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, c @ ('\\' | '\'' | '"'))) => value.push(c),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(self.error(start, "unterminated string")),
                },
                Some((_, c)) => value.push(c),
                None => return Err(self.error(start, "unterminated string")),
            }
        }
    }
}

/// Count lines up to a byte position (for error messages).
fn count_lines(input: &str, byte_pos: usize) -> usize {
    input[..byte_pos.min(input.len())]
        .chars()
        .filter(|&c| c == '\n')
        .count()
        + 1
}
