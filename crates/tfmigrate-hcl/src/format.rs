//! Layout of generated tokens.
//!
//! Parsed content is never reformatted. Content created by the document
//! editing operations is laid out with two rules:
//!
//! - every line is indented two spaces per nesting level, where the level
//!   is the body depth plus the number of open brackets, and a line that
//!   starts with a closing bracket is dedented by one;
//! - the `=` of consecutive `name = value` lines at the same level is
//!   aligned one space after the longest name. Blank lines and lines of
//!   any other shape end an alignment group.

use crate::tokens::{Token, TokenKind};

const INDENT: &str = "  ";

/// Indentation for the given nesting depth.
pub(crate) fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

/// One line of the formatted sequence.
struct Line {
    /// Index of the first token, `None` for a blank line
    first: Option<usize>,
    nesting: usize,
}

/// Lay out `tokens` nested at `base_depth`.
///
/// When `line_start` is `false` the first token continues a line that is
/// not part of the sequence; its lead is left alone and it does not take
/// part in alignment.
pub(crate) fn format_tokens(mut tokens: Vec<&mut Token>, base_depth: usize, line_start: bool) {
    let mut lines = Vec::new();
    let mut nesting = 0usize;
    let mut at_line_start = line_start;

    for (i, token) in tokens.iter_mut().enumerate() {
        let kind = token.kind();
        if matches!(kind, TokenKind::Newline | TokenKind::Eof) {
            if at_line_start {
                lines.push(Line {
                    first: None,
                    nesting,
                });
            }
            token.set_lead("");
            at_line_start = true;
            continue;
        }

        if kind.is_closer() {
            nesting = nesting.saturating_sub(1);
        }
        if at_line_start {
            token.set_lead(indent(base_depth + nesting));
            lines.push(Line {
                first: Some(i),
                nesting,
            });
            at_line_start = false;
        }
        if kind.is_opener() {
            nesting += 1;
        }
    }

    align_equals(&mut tokens, &lines);
}

fn is_assignment(tokens: &[&mut Token], first: usize) -> bool {
    tokens[first].kind() == TokenKind::Ident
        && tokens
            .get(first + 1)
            .is_some_and(|t| t.kind() == TokenKind::Equal)
}

fn align_equals(tokens: &mut [&mut Token], lines: &[Line]) {
    let mut group: Vec<usize> = Vec::new();
    let mut group_nesting = 0;

    for line in lines {
        match line.first {
            Some(first) if is_assignment(tokens, first) => {
                if group_nesting != line.nesting {
                    flush_group(&mut group, tokens);
                }
                group_nesting = line.nesting;
                group.push(first);
            }
            _ => flush_group(&mut group, tokens),
        }
    }
    flush_group(&mut group, tokens);
}

/// Pad the `=` following each name in `group` to a common column.
fn flush_group(group: &mut Vec<usize>, tokens: &mut [&mut Token]) {
    let width = group
        .iter()
        .map(|&i| tokens[i].text().chars().count())
        .max()
        .unwrap_or(0);
    for &i in group.iter() {
        let pad = width - tokens[i].text().chars().count() + 1;
        tokens[i + 1].set_lead(" ".repeat(pad));
    }
    group.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Tokens;
    use tfmigrate_core::value::Value;

    fn formatted(tokens: Tokens, depth: usize, line_start: bool) -> String {
        let mut tokens = tokens.into_vec();
        format_tokens(tokens.iter_mut().collect(), depth, line_start);
        Tokens::from(tokens).to_string()
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "    ");
    }

    #[test]
    fn test_object_is_indented_and_aligned() {
        let value = Value::object([
            ("hostname", Value::string("host.name")),
            ("organization", Value::string("org")),
            ("workspaces", Value::object([("name", Value::string("ws"))])),
        ]);
        assert_eq!(
            formatted(Tokens::from_value(&value), 1, false),
            "{\n    hostname     = \"host.name\"\n    organization = \"org\"\n    workspaces   = {\n      name = \"ws\"\n    }\n  }"
        );
    }

    #[test]
    fn test_blank_line_breaks_alignment() {
        let mut tokens = Tokens::new();
        tokens.open_brace();
        tokens.key_value("hostname", Tokens::quoted("h"));
        tokens.key_value("organization", Tokens::quoted("o"));
        tokens.newline();
        tokens.key_value("workspaces", Tokens::quoted("w"));
        tokens.close_brace();
        assert_eq!(
            formatted(tokens, 0, false),
            "{\n  hostname     = \"h\"\n  organization = \"o\"\n\n  workspaces = \"w\"\n}"
        );
    }

    #[test]
    fn test_trailing_whitespace_removed_before_newline() {
        let mut tokens = Tokens::new();
        tokens.push(Token::new(TokenKind::Ident, "a"));
        tokens.push(Token::new(TokenKind::Newline, "\n").with_lead("   "));
        assert_eq!(formatted(tokens, 1, true), "  a\n");
    }
}
