//! Parser from tokens to the document tree.
//!
//! The parser works on the lossless token stream produced by the
//! [`lexer`](crate::lexer) and never drops a token. Structural problems
//! produce error diagnostics and the offending tokens are kept verbatim in
//! the lead of the next item (or the body's tail), so even a malformed file
//! serializes back to its original bytes.

use std::{collections::VecDeque, mem, path::Path};

use crate::{
    document::{Attribute, Block, Body, Document, Item, Label},
    error::{Diagnostic, Diagnostics, ErrorCode},
    expression::Expression,
    lexer::tokenize,
    span::{SourceRange, Span},
    tokens::{Token, TokenKind},
};

/// Parse configuration source into a [`Document`].
///
/// Parsing always produces a document; errors are reported through the
/// returned diagnostics.
///
/// # Example
///
/// ```
/// # use tfmigrate_hcl::parse;
/// let src = "variable \"region\" {\n  default = \"us-east-1\"\n}\n";
/// let (doc, diagnostics) = parse(src, "variables.tf");
/// assert!(!diagnostics.has_errors());
/// assert_eq!(doc.to_string(), src);
/// ```
pub fn parse(src: &str, filename: impl AsRef<Path>) -> (Document, Diagnostics) {
    let filename = filename.as_ref();
    let (tokens, mut diagnostics) = tokenize(src, filename);

    let mut parser = Parser::new(tokens, filename);
    let body = parser.body(None, 0);
    let eof = parser
        .tokens
        .pop_front()
        .unwrap_or_else(|| Token::new(TokenKind::Eof, ""));
    diagnostics.append(parser.diagnostics);

    log::debug!(
        file = filename.display().to_string(),
        items = body.items().len(),
        errors = diagnostics.errors().count();
        "Parsed document"
    );

    (
        Document::from_parts(filename.to_path_buf(), body, eof),
        diagnostics,
    )
}

struct Parser<'a> {
    tokens: VecDeque<Token>,
    filename: &'a Path,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, filename: &'a Path) -> Self {
        Self {
            tokens: tokens.into(),
            filename,
            diagnostics: Diagnostics::new(),
        }
    }

    fn peek(&self) -> TokenKind {
        self.tokens.front().map_or(TokenKind::Eof, Token::kind)
    }

    fn peek_span(&self) -> Span {
        self.tokens.front().map(Token::span).unwrap_or_default()
    }

    /// Consume the next token. The final `Eof` is never consumed.
    fn bump(&mut self) -> Option<Token> {
        match self.peek() {
            TokenKind::Eof => None,
            _ => self.tokens.pop_front(),
        }
    }

    fn error(&mut self, code: ErrorCode, summary: &str, detail: String, span: Span) {
        self.diagnostics.emit(
            Diagnostic::error(summary)
                .with_code(code)
                .with_detail(detail)
                .with_subject(SourceRange::new(self.filename, span)),
        );
    }

    /// Parse items until `}` (nested bodies) or end of input.
    ///
    /// The returned body has no braces; the caller owns them.
    fn body(&mut self, open: Option<Token>, depth: usize) -> Body {
        let nested = open.is_some();
        let mut body = Body::root();
        body.open = open;
        body.depth = depth;
        if nested {
            body.open_trail = self.trail();
        }

        // Tokens skipped by error recovery stay in source order by joining
        // the lead of whatever follows them.
        let mut skipped = Vec::new();
        loop {
            let mut lead = mem::take(&mut skipped);
            while matches!(self.peek(), TokenKind::Newline | TokenKind::Comment) {
                lead.extend(self.bump());
            }

            match self.peek() {
                TokenKind::Eof => {
                    body.tail.append(&mut lead);
                    return body;
                }
                TokenKind::CBrace if nested => {
                    body.tail.append(&mut lead);
                    return body;
                }
                TokenKind::Ident => match self.item(lead, depth) {
                    Ok(item) => body.items.push(item),
                    Err(consumed) => {
                        skipped = consumed;
                        skipped.append(&mut self.recover(nested));
                    }
                },
                TokenKind::Invalid => {
                    // Already reported by the lexer
                    skipped = lead;
                    skipped.append(&mut self.recover(nested));
                }
                kind => {
                    let span = self.peek_span();
                    let text = self
                        .tokens
                        .front()
                        .map(|t| t.text().to_string())
                        .unwrap_or_default();
                    let detail = if kind == TokenKind::CBrace {
                        "Found a closing brace with no matching opening brace.".to_string()
                    } else {
                        format!(
                            "An argument or block definition is required here, found {text:?}."
                        )
                    };
                    self.error(
                        ErrorCode::E100,
                        "Argument or block definition required",
                        detail,
                        span,
                    );
                    skipped = lead;
                    skipped.append(&mut self.recover(nested));
                }
            }
        }
    }

    /// Skip to the end of the current line or bracket group, whichever is
    /// later. Inside a nested body an unmatched `}` is left for the caller.
    fn recover(&mut self, nested: bool) -> Vec<Token> {
        let mut skipped = Vec::new();
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            match kind {
                TokenKind::Eof => break,
                TokenKind::CBrace if depth == 0 && nested => break,
                TokenKind::Newline if depth == 0 => {
                    skipped.extend(self.bump());
                    break;
                }
                _ => {}
            }
            if kind.is_opener() {
                depth += 1;
            } else if kind.is_closer() {
                depth = depth.saturating_sub(1);
            }
            skipped.extend(self.bump());
        }
        skipped
    }

    /// Parse an attribute or block starting at an identifier.
    ///
    /// On failure the tokens consumed so far are returned so they can be
    /// kept in the body.
    fn item(&mut self, lead: Vec<Token>, depth: usize) -> Result<Item, Vec<Token>> {
        let Some(name) = self.bump() else {
            return Err(lead);
        };

        if self.peek() == TokenKind::Equal {
            let Some(equals) = self.bump() else {
                let mut consumed = lead;
                consumed.push(name);
                return Err(consumed);
            };
            return match self.expression() {
                Some(expr) => {
                    let trail = self.trail();
                    Ok(Item::Attribute(Attribute {
                        lead,
                        name,
                        equals,
                        expr,
                        trail,
                    }))
                }
                None => {
                    let mut consumed = lead;
                    consumed.push(name);
                    consumed.push(equals);
                    Err(consumed)
                }
            };
        }

        self.block(lead, name, depth)
    }

    /// Collect expression tokens up to the end of the line at bracket
    /// depth zero. Returns `None` if the expression is empty.
    fn expression(&mut self) -> Option<Expression> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            match kind {
                TokenKind::Eof => {
                    if depth > 0 {
                        let span = self.peek_span();
                        self.error(
                            ErrorCode::E101,
                            "Unclosed bracket",
                            "The expression ends before all of its brackets are closed."
                                .to_string(),
                            span,
                        );
                    }
                    break;
                }
                TokenKind::Newline | TokenKind::CBrace if depth == 0 => break,
                TokenKind::Comment if depth == 0 && self.comment_ends_line() => break,
                _ => {}
            }
            if kind.is_opener() {
                depth += 1;
            } else if kind.is_closer() {
                depth = depth.saturating_sub(1);
            }
            tokens.extend(self.bump());
        }

        if tokens.is_empty() {
            let span = self.peek_span();
            self.error(
                ErrorCode::E100,
                "Missing expression",
                "An attribute value is required after the equals sign.".to_string(),
                span,
            );
            return None;
        }
        Some(Expression::new(tokens))
    }

    fn block(&mut self, lead: Vec<Token>, kind: Token, depth: usize) -> Result<Item, Vec<Token>> {
        let mut consumed = lead;
        let mut labels = Vec::new();

        loop {
            match self.peek() {
                TokenKind::Ident => {
                    labels.extend(self.bump().map(|t| Label::from_tokens(vec![t])));
                }
                TokenKind::OQuote => {
                    let mut tokens = Vec::new();
                    tokens.extend(self.bump());
                    while self.peek() == TokenKind::QuotedLit {
                        tokens.extend(self.bump());
                    }
                    if self.peek() != TokenKind::CQuote {
                        let span = self.peek_span();
                        self.error(
                            ErrorCode::E100,
                            "Invalid block label",
                            "Block labels must be plain strings without interpolation."
                                .to_string(),
                            span,
                        );
                        consumed.push(kind);
                        consumed.extend(labels.into_iter().flat_map(Label::into_tokens));
                        consumed.append(&mut tokens);
                        return Err(consumed);
                    }
                    tokens.extend(self.bump());
                    labels.push(Label::from_tokens(tokens));
                }
                _ => break,
            }
        }

        if self.peek() != TokenKind::OBrace {
            let span = self.peek_span();
            self.error(
                ErrorCode::E100,
                "Invalid block definition",
                format!(
                    "Either a quoted string block label or an opening brace is expected after {:?}.",
                    kind.text()
                ),
                span,
            );
            consumed.push(kind);
            consumed.extend(labels.into_iter().flat_map(Label::into_tokens));
            return Err(consumed);
        }

        let open = self.bump();
        let mut body = self.body(open, depth + 1);
        if self.peek() == TokenKind::CBrace {
            body.close = self.bump();
        } else {
            let span = self.peek_span();
            self.error(
                ErrorCode::E101,
                "Unclosed block",
                format!("The {:?} block is missing its closing brace.", kind.text()),
                span,
            );
        }
        let trail = self.trail();

        Ok(Item::Block(Block {
            lead: consumed,
            kind,
            labels,
            body,
            trail,
        }))
    }

    /// Returns `true` if the next token is a comment that runs to the end
    /// of its line. Inline `/* */` comments belong to the expression.
    fn comment_ends_line(&self) -> bool {
        let Some(comment) = self.tokens.front() else {
            return false;
        };
        comment.text().starts_with('#')
            || comment.text().starts_with("//")
            || self
                .tokens
                .get(1)
                .is_none_or(|t| matches!(t.kind(), TokenKind::Newline | TokenKind::Eof))
    }

    /// An optional comment followed by an optional line break.
    fn trail(&mut self) -> Vec<Token> {
        let mut trail = Vec::new();
        if self.peek() == TokenKind::Comment {
            trail.extend(self.bump());
        }
        if self.peek() == TokenKind::Newline {
            trail.extend(self.bump());
        }
        trail
    }
}
