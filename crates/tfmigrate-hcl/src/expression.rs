//! Attribute expressions.
//!
//! An [`Expression`] is kept as the exact token sequence that follows an
//! attribute's `=`. Two derived views are supported: the list of qualified
//! references it contains ([`Expression::traversals`]) and in-place renaming
//! of a reference prefix ([`Expression::rename_traversal_prefix`]).

use std::{fmt, ops::Range};

use crate::{
    span::Span,
    tokens::{Token, TokenKind, Tokens},
};

/// Identifiers that are literal values rather than references.
const LITERAL_KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// A dotted reference such as `var.region` or `module.vpc.id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    segments: Vec<String>,
    tokens: Range<usize>,
}

impl Traversal {
    /// The dotted name segments, from the root name onwards.
    ///
    /// Collection stops at the first index or splat operator.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Indices of the tokens forming the traversal within its expression.
    pub fn token_range(&self) -> Range<usize> {
        self.tokens.clone()
    }

    /// Returns `true` if the leading segments equal `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        !prefix.is_empty()
            && self.segments.len() >= prefix.len()
            && self.segments.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// The token sequence of an attribute value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn tokens_mut(&mut self) -> &mut Vec<Token> {
        &mut self.tokens
    }

    /// Returns `true` if the expression has no significant tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.iter().all(|t| t.kind().is_trivia())
    }

    /// Source span from the first to the last token with a position.
    pub fn span(&self) -> Option<Span> {
        self.tokens
            .iter()
            .map(Token::span)
            .filter(|s| !s.is_empty())
            .reduce(|a, b| a.union(b))
    }

    /// The expression with its leading whitespace removed.
    pub fn to_tokens(&self) -> Tokens {
        let mut tokens = Tokens::from(self.tokens.clone());
        tokens.set_first_lead("");
        tokens
    }

    /// Extract every qualified reference, in source order.
    ///
    /// Object keys, function names and the literals `true`, `false` and
    /// `null` are not references.
    pub fn traversals(&self) -> Vec<Traversal> {
        let tokens = &self.tokens;
        let mut traversals = Vec::new();
        let mut previous: Option<TokenKind> = None;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            if token.is(TokenKind::Ident)
                && previous != Some(TokenKind::Dot)
                && !LITERAL_KEYWORDS.contains(&token.text())
                && !self.is_function_name(i)
                && !self.is_object_key(i)
            {
                let mut segments = vec![token.text().to_string()];
                let mut end = i + 1;
                while end + 1 < tokens.len()
                    && tokens[end].is(TokenKind::Dot)
                    && matches!(tokens[end + 1].kind(), TokenKind::Ident | TokenKind::Number)
                {
                    segments.push(tokens[end + 1].text().to_string());
                    end += 2;
                }
                traversals.push(Traversal {
                    segments,
                    tokens: i..end,
                });
                previous = Some(tokens[end - 1].kind());
                i = end;
                continue;
            }
            if !token.kind().is_trivia() {
                previous = Some(token.kind());
            }
            i += 1;
        }

        traversals
    }

    /// Returns `true` if any traversal starts with `prefix`.
    pub fn has_traversal_prefix(&self, prefix: &[&str]) -> bool {
        self.traversals().iter().any(|t| t.starts_with(prefix))
    }

    /// Replace the leading `from` segments of every matching traversal with
    /// `to`, returning the number of traversals rewritten.
    ///
    /// Trailing segments, template delimiters and whitespace around the
    /// traversal are left untouched. A second call with the same arguments
    /// is a no-op unless `to` itself starts with `from`.
    pub fn rename_traversal_prefix(&mut self, from: &[&str], to: &[&str]) -> usize {
        if from.is_empty() || to.is_empty() {
            return 0;
        }
        let matching: Vec<Traversal> = self
            .traversals()
            .into_iter()
            .filter(|t| t.starts_with(from))
            .collect();

        // Back to front so earlier token indices stay valid
        for traversal in matching.iter().rev() {
            let start = traversal.tokens.start;
            if from.len() == to.len() {
                for (n, segment) in to.iter().enumerate() {
                    self.tokens[start + 2 * n].set_text(*segment);
                }
                continue;
            }

            let lead = self.tokens[start].lead().to_string();
            let mut replacement = Vec::with_capacity(to.len() * 2);
            for (n, segment) in to.iter().enumerate() {
                if n > 0 {
                    replacement.push(Token::new(TokenKind::Dot, "."));
                }
                replacement.push(Token::new(TokenKind::Ident, *segment));
            }
            replacement[0].set_lead(lead);
            let end = start + 2 * from.len() - 1;
            self.tokens.splice(start..end, replacement);
        }

        if !matching.is_empty() {
            log::trace!(
                from = from.join("."),
                to = to.join("."),
                count = matching.len();
                "Renamed traversal prefix"
            );
        }
        matching.len()
    }

    fn next_significant(&self, i: usize) -> Option<&Token> {
        self.tokens[i + 1..].iter().find(|t| !t.kind().is_trivia())
    }

    fn is_function_name(&self, i: usize) -> bool {
        self.tokens
            .get(i + 1)
            .is_some_and(|t| t.is(TokenKind::OParen))
    }

    /// An identifier directly after `{`, `,` or a line break, followed by
    /// `=` or `:`, names an object attribute.
    fn is_object_key(&self, i: usize) -> bool {
        let followed_by_assignment = self
            .next_significant(i)
            .is_some_and(|t| matches!(t.kind(), TokenKind::Equal | TokenKind::Colon));
        if !followed_by_assignment {
            return false;
        }
        self.tokens[..i]
            .iter()
            .rev()
            .find(|t| !t.is(TokenKind::Comment))
            .is_some_and(|t| {
                matches!(
                    t.kind(),
                    TokenKind::OBrace | TokenKind::Comma | TokenKind::Newline
                )
            })
    }
}

impl From<Tokens> for Expression {
    fn from(tokens: Tokens) -> Self {
        Self::new(tokens.into_vec())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
