//! Token definitions for configuration documents.
//!
//! A [`Token`] keeps the exact horizontal whitespace that precedes it
//! (its `lead`) together with its exact text, so a document is serialized
//! by concatenating `lead + text` for every token in order.

use std::fmt;

use tfmigrate_core::value::{Value, format_number};

use crate::span::Span;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifiers and keywords (`resource`, `true`, `var`, `my-name`)
    Ident,
    Number,

    /// Opening `"` of a quoted template
    OQuote,
    /// Literal text inside a quoted template, escapes kept verbatim
    QuotedLit,
    /// Closing `"` of a quoted template
    CQuote,
    /// `${` or `${~`
    TemplateInterp,
    /// `%{` or `%{~`
    TemplateControl,
    /// `}` or `~}` closing a template sequence
    TemplateSeqEnd,

    /// `<<EOF` or `<<-EOF`, including the line break that ends it
    OHeredoc,
    /// Literal text inside a heredoc, line breaks included
    StringLit,
    /// The heredoc's closing marker
    CHeredoc,

    OBrace,
    CBrace,
    OBrack,
    CBrack,
    OParen,
    CParen,
    Equal,
    Comma,
    Dot,
    Colon,
    Question,
    FatArrow,
    Ellipsis,
    /// Arithmetic, comparison and logical operators
    Operator,

    Newline,
    /// `#`, `//` or `/* */` comment, without the line break that follows it
    Comment,
    /// Bytes the lexer could not classify
    Invalid,
    /// End of input; carries trailing whitespace as its lead
    Eof,
}

impl TokenKind {
    /// Returns `true` for tokens that open a bracketed region.
    pub fn is_opener(self) -> bool {
        matches!(
            self,
            TokenKind::OBrace
                | TokenKind::OBrack
                | TokenKind::OParen
                | TokenKind::TemplateInterp
                | TokenKind::TemplateControl
        )
    }

    /// Returns `true` for tokens that close a bracketed region.
    pub fn is_closer(self) -> bool {
        matches!(
            self,
            TokenKind::CBrace | TokenKind::CBrack | TokenKind::CParen | TokenKind::TemplateSeqEnd
        )
    }

    /// Newlines and comments.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Comment)
    }
}

/// A token with the whitespace that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    lead: String,
    text: String,
    span: Span,
}

impl Token {
    /// Create a generated token with no leading whitespace and no source span.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            lead: String::new(),
            text: text.into(),
            span: Span::default(),
        }
    }

    pub(crate) fn parsed(kind: TokenKind, lead: &str, text: &str, span: Span) -> Self {
        Self {
            kind,
            lead: lead.to_string(),
            text: text.to_string(),
            span,
        }
    }

    /// Replace the leading whitespace.
    pub fn with_lead(mut self, lead: impl Into<String>) -> Self {
        self.lead = lead.into();
        self
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn lead(&self) -> &str {
        &self.lead
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source span of the token text; empty for generated tokens.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn set_lead(&mut self, lead: impl Into<String>) {
        self.lead = lead.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub(crate) fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Returns `true` if this token is an identifier with the given text.
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        out.push_str(&self.lead);
        out.push_str(&self.text);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.lead, self.text)
    }
}

/// An owned token sequence, used for raw attribute values.
///
/// The builder methods add single-space separation the way generated
/// content is laid out; indentation and `=` alignment are applied when the
/// tokens are placed into a document.
///
/// # Example
///
/// ```
/// # use tfmigrate_hcl::tokens::Tokens;
/// # use tfmigrate_core::value::Value;
/// let mut tokens = Tokens::new();
/// tokens.open_brace();
/// tokens.key_value("name", Tokens::from_value(&Value::string("ws")));
/// tokens.close_brace();
/// assert_eq!(tokens.to_string(), "{\nname = \"ws\"\n}");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens(Vec<Token>);

impl Tokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a value as canonical tokens.
    pub fn from_value(value: &Value) -> Self {
        let mut tokens = Self::new();
        tokens.push_value(value);
        tokens
    }

    /// Tokens of a quoted string literal.
    pub fn quoted(text: &str) -> Self {
        let mut tokens = Self::new();
        tokens.push_quoted(text);
        tokens
    }

    pub fn push(&mut self, token: Token) {
        self.0.push(token);
    }

    /// Push a token separated from the previous one by a single space.
    pub fn push_spaced(&mut self, kind: TokenKind, text: impl Into<String>) {
        let lead = if self.0.is_empty() { "" } else { " " };
        self.0.push(Token::new(kind, text).with_lead(lead));
    }

    pub fn newline(&mut self) {
        self.0.push(Token::new(TokenKind::Newline, "\n"));
    }

    /// Open a multi-line object: `{` followed by a line break.
    pub fn open_brace(&mut self) {
        self.push_spaced(TokenKind::OBrace, "{");
        self.newline();
    }

    pub fn close_brace(&mut self) {
        self.0.push(Token::new(TokenKind::CBrace, "}"));
    }

    /// Push one `key = value` line of a multi-line object.
    pub fn key_value(&mut self, key: &str, value: Tokens) {
        self.0.push(Token::new(TokenKind::Ident, key));
        self.0.push(Token::new(TokenKind::Equal, "=").with_lead(" "));
        self.extend_spaced(value);
        self.newline();
    }

    /// Append tokens, separating them from what precedes by a single space.
    pub fn extend_spaced(&mut self, other: Tokens) {
        let mut other = other.0.into_iter();
        if let Some(first) = other.next() {
            let lead = if self.0.is_empty() { "" } else { " " };
            self.0.push(first.with_lead(lead));
        }
        self.0.extend(other);
    }

    pub fn push_quoted(&mut self, text: &str) {
        self.push_spaced(TokenKind::OQuote, "\"");
        if !text.is_empty() {
            self.0.push(Token::new(TokenKind::QuotedLit, escape_quoted(text)));
        }
        self.0.push(Token::new(TokenKind::CQuote, "\""));
    }

    pub fn push_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.push_spaced(TokenKind::Ident, "null"),
            Value::Bool(b) => self.push_spaced(TokenKind::Ident, b.to_string()),
            Value::Number(n) => self.push_spaced(TokenKind::Number, format_number(*n)),
            Value::String(s) => self.push_quoted(s),
            Value::List(items) => {
                self.push_spaced(TokenKind::OBrack, "[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.0.push(Token::new(TokenKind::Comma, ","));
                    }
                    let mut item_tokens = Tokens::from_value(item);
                    if i == 0 {
                        item_tokens.set_first_lead("");
                    } else {
                        item_tokens.set_first_lead(" ");
                    }
                    self.0.extend(item_tokens.0);
                }
                self.0.push(Token::new(TokenKind::CBrack, "]"));
            }
            Value::Object(map) if map.is_empty() => {
                self.push_spaced(TokenKind::OBrace, "{");
                self.0.push(Token::new(TokenKind::CBrace, "}"));
            }
            Value::Object(map) => {
                self.open_brace();
                for (key, value) in map {
                    if is_identifier(key) {
                        self.0.push(Token::new(TokenKind::Ident, key.as_str()));
                    } else {
                        let mut key_tokens = Tokens::quoted(key);
                        self.0.append(&mut key_tokens.0);
                    }
                    self.0.push(Token::new(TokenKind::Equal, "=").with_lead(" "));
                    self.extend_spaced(Tokens::from_value(value));
                    self.newline();
                }
                self.close_brace();
            }
        }
    }

    pub(crate) fn set_first_lead(&mut self, lead: &str) {
        if let Some(first) = self.0.first_mut() {
            first.set_lead(lead);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Token> {
        self.0
    }
}

impl From<Vec<Token>> for Tokens {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

impl Extend<Token> for Tokens {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Tokens {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Returns `true` if `s` can be written as a bare identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Escape text for use inside a quoted template.
///
/// Template introducers are doubled so the text is never interpolated.
pub fn escape_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Decode the literal text of a quoted template.
///
/// Returns `None` on a malformed escape sequence.
pub fn unescape_quoted(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                'u' => out.push(unicode_escape(&mut chars, 4)?),
                'U' => out.push(unicode_escape(&mut chars, 8)?),
                _ => return None,
            },
            '$' | '%' => {
                out.push(c);
                // `$${` and `%%{` stand for a literal `${` and `%{`
                if chars.peek() == Some(&c) {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'{') {
                        chars.next();
                    }
                }
            }
            c => out.push(c),
        }
    }
    Some(out)
}

fn unicode_escape(chars: &mut impl Iterator<Item = char>, digits: usize) -> Option<char> {
    let hex: String = chars.take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}
