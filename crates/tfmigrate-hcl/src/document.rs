//! Lossless document tree.
//!
//! A [`Document`] owns every token of its source. Structure is layered on
//! top of the tokens without discarding any of them:
//!
//! - a [`Body`] holds its braces, the line break after `{`, an ordered list
//!   of [`Item`]s and a `tail` of comments and blank lines before `}`;
//! - each item keeps a `lead` (blank lines and comments above it) and a
//!   `trail` (a trailing comment and the line break that ends it).
//!
//! Serializing concatenates the tokens in order, so an unmodified document
//! reproduces its source exactly and an edit only changes the bytes of the
//! items it touches.
//!
//! # Example
//!
//! ```
//! # use tfmigrate_hcl::{Block, parse};
//! # use tfmigrate_core::value::Value;
//! let src = "terraform {\n  backend \"local\" {}\n}\n";
//! let (mut doc, diagnostics) = parse(src, "backend.tf");
//! assert!(diagnostics.is_empty());
//!
//! let terraform = doc.body_mut().first_matching_block_mut("terraform", &[]).unwrap();
//! terraform.body_mut().remove_block("backend", &["local"]);
//!
//! let mut remote = Block::new("backend", &["remote"]);
//! remote.body_mut().set_attribute_value("organization", &Value::string("org"));
//! terraform.body_mut().append_block(remote);
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "terraform {\n  backend \"remote\" {\n    organization = \"org\"\n  }\n}\n"
//! );
//! ```

use std::{
    fmt,
    mem,
    path::{Path, PathBuf},
};

use tfmigrate_core::value::Value;

use crate::{
    expression::Expression,
    format::{format_tokens, indent},
    span::Span,
    tokens::{Token, TokenKind, Tokens, unescape_quoted},
};

/// A parsed or newly created configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    filename: PathBuf,
    body: Body,
    eof: Token,
}

impl Document {
    /// Create an empty document.
    pub fn new_empty(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            body: Body::root(),
            eof: Token::new(TokenKind::Eof, ""),
        }
    }

    pub(crate) fn from_parts(filename: PathBuf, body: Body, eof: Token) -> Self {
        Self {
            filename,
            body,
            eof,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The top-level body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Serialize the document.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.body.write_to(&mut out);
        self.eof.write_to(&mut out);
        f.write_str(&out)
    }
}

/// A body item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Attribute(Attribute),
    Block(Block),
}

impl Item {
    fn lead_mut(&mut self) -> &mut Vec<Token> {
        match self {
            Item::Attribute(attribute) => &mut attribute.lead,
            Item::Block(block) => &mut block.lead,
        }
    }

    fn trail(&self) -> &[Token] {
        match self {
            Item::Attribute(attribute) => &attribute.trail,
            Item::Block(block) => &block.trail,
        }
    }

    fn trail_mut(&mut self) -> &mut Vec<Token> {
        match self {
            Item::Attribute(attribute) => &mut attribute.trail,
            Item::Block(block) => &mut block.trail,
        }
    }

    fn first_token_mut(&mut self) -> &mut Token {
        match self {
            Item::Attribute(attribute) => &mut attribute.name,
            Item::Block(block) => &mut block.kind,
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Item::Attribute(attribute) => attribute.write_to(out),
            Item::Block(block) => block.write_to(out),
        }
    }
}

/// A `name = expression` item.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub(crate) lead: Vec<Token>,
    pub(crate) name: Token,
    pub(crate) equals: Token,
    pub(crate) expr: Expression,
    pub(crate) trail: Vec<Token>,
}

impl Attribute {
    fn new(name: &str, expr: Expression) -> Self {
        Self {
            lead: Vec::new(),
            name: Token::new(TokenKind::Ident, name),
            equals: Token::new(TokenKind::Equal, "=").with_lead(" "),
            expr,
            trail: vec![Token::new(TokenKind::Newline, "\n")],
        }
    }

    pub fn name(&self) -> &str {
        self.name.text()
    }

    pub fn expr(&self) -> &Expression {
        &self.expr
    }

    pub fn expr_mut(&mut self) -> &mut Expression {
        &mut self.expr
    }

    /// Source span from the name to the end of the expression.
    pub fn span(&self) -> Span {
        match self.expr.span() {
            Some(expr) => self.name.span().union(expr),
            None => self.name.span(),
        }
    }

    fn core_tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut tokens = vec![&mut self.name, &mut self.equals];
        tokens.extend(self.expr.tokens_mut().iter_mut());
        tokens
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.lead.iter_mut());
        out.push(&mut self.name);
        out.push(&mut self.equals);
        out.extend(self.expr.tokens_mut().iter_mut());
        out.extend(self.trail.iter_mut());
    }

    fn write_to(&self, out: &mut String) {
        self.lead.iter().for_each(|t| t.write_to(out));
        self.name.write_to(out);
        self.equals.write_to(out);
        self.expr.tokens().iter().for_each(|t| t.write_to(out));
        self.trail.iter().for_each(|t| t.write_to(out));
    }
}

/// A block label: a bare identifier or a quoted string.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    tokens: Vec<Token>,
}

impl Label {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub(crate) fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn quoted(value: &str) -> Self {
        let mut tokens = Tokens::quoted(value).into_vec();
        if let Some(first) = tokens.first_mut() {
            first.set_lead(" ");
        }
        Self { tokens }
    }

    /// The label's string value.
    pub fn value(&self) -> String {
        match self.tokens.as_slice() {
            [ident] if ident.is(TokenKind::Ident) => ident.text().to_string(),
            tokens => tokens
                .iter()
                .filter(|t| t.is(TokenKind::QuotedLit))
                .map(|t| unescape_quoted(t.text()).unwrap_or_else(|| t.text().to_string()))
                .collect(),
        }
    }
}

/// A `type "label" { ... }` item.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub(crate) lead: Vec<Token>,
    pub(crate) kind: Token,
    pub(crate) labels: Vec<Label>,
    pub(crate) body: Body,
    pub(crate) trail: Vec<Token>,
}

impl Block {
    /// Create an empty block with quoted labels.
    pub fn new(kind: &str, labels: &[&str]) -> Self {
        Self {
            lead: Vec::new(),
            kind: Token::new(TokenKind::Ident, kind),
            labels: labels.iter().map(|label| Label::quoted(label)).collect(),
            body: Body::nested(1),
            trail: vec![Token::new(TokenKind::Newline, "\n")],
        }
    }

    /// The block type, such as `resource` or `backend`.
    pub fn kind(&self) -> &str {
        self.kind.text()
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.iter().map(Label::value).collect()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Returns `true` if type and labels match exactly.
    pub fn matches(&self, kind: &str, labels: &[&str]) -> bool {
        self.kind() == kind
            && self.labels.len() == labels.len()
            && self
                .labels
                .iter()
                .zip(labels)
                .all(|(label, expected)| label.value() == *expected)
    }

    /// Source span of the block header and body.
    pub fn span(&self) -> Span {
        let end = self
            .body
            .close
            .as_ref()
            .map(Token::span)
            .filter(|s| !s.is_empty());
        match end {
            Some(end) => self.kind.span().union(end),
            None => self.kind.span(),
        }
    }

    /// Source span of the type and labels only.
    pub fn header_span(&self) -> Span {
        self.labels
            .iter()
            .flat_map(|label| label.tokens.iter().map(Token::span))
            .fold(self.kind.span(), |acc, span| acc.union(span))
    }

    fn core_tokens_mut(&mut self) -> Vec<&mut Token> {
        let mut tokens = vec![&mut self.kind];
        for label in &mut self.labels {
            tokens.extend(label.tokens.iter_mut());
        }
        self.body.collect_tokens_mut(&mut tokens);
        tokens
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.lead.iter_mut());
        out.push(&mut self.kind);
        for label in &mut self.labels {
            out.extend(label.tokens.iter_mut());
        }
        self.body.collect_tokens_mut(out);
        out.extend(self.trail.iter_mut());
    }

    fn write_to(&self, out: &mut String) {
        self.lead.iter().for_each(|t| t.write_to(out));
        self.kind.write_to(out);
        for label in &self.labels {
            label.tokens.iter().for_each(|t| t.write_to(out));
        }
        self.body.write_to(out);
        self.trail.iter().for_each(|t| t.write_to(out));
    }
}

/// The contents of a document or of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub(crate) open: Option<Token>,
    pub(crate) open_trail: Vec<Token>,
    pub(crate) items: Vec<Item>,
    pub(crate) tail: Vec<Token>,
    pub(crate) close: Option<Token>,
    pub(crate) depth: usize,
}

impl Body {
    pub(crate) fn root() -> Self {
        Self {
            open: None,
            open_trail: Vec::new(),
            items: Vec::new(),
            tail: Vec::new(),
            close: None,
            depth: 0,
        }
    }

    fn nested(depth: usize) -> Self {
        Self {
            open: Some(Token::new(TokenKind::OBrace, "{").with_lead(" ")),
            open_trail: vec![Token::new(TokenKind::Newline, "\n")],
            items: Vec::new(),
            tail: Vec::new(),
            close: Some(Token::new(TokenKind::CBrace, "}")),
            depth,
        }
    }

    /// Nesting depth of the body's items; zero for a document.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns `true` if the body has no attributes or blocks.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match item {
            Item::Attribute(attribute) => Some(attribute),
            Item::Block(_) => None,
        })
    }

    pub fn attributes_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.items.iter_mut().filter_map(|item| match item {
            Item::Attribute(attribute) => Some(attribute),
            Item::Block(_) => None,
        })
    }

    /// Find an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().find(|attribute| attribute.name() == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes_mut().find(|attribute| attribute.name() == name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Item::Block(block) => Some(block),
            Item::Attribute(_) => None,
        })
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.items.iter_mut().filter_map(|item| match item {
            Item::Block(block) => Some(block),
            Item::Attribute(_) => None,
        })
    }

    /// Find the first block with the given type and labels.
    pub fn first_matching_block(&self, kind: &str, labels: &[&str]) -> Option<&Block> {
        self.blocks().find(|block| block.matches(kind, labels))
    }

    pub fn first_matching_block_mut(&mut self, kind: &str, labels: &[&str]) -> Option<&mut Block> {
        self.blocks_mut().find(|block| block.matches(kind, labels))
    }

    /// Append a block at the end of the body.
    ///
    /// When the body already has content, a blank line separates the new
    /// block from it unless one is already present.
    pub fn append_block(&mut self, mut block: Block) -> &mut Block {
        self.ensure_multiline();
        let had_content = self.has_content();

        let mut lead = mem::take(&mut self.tail);
        if had_content && !ends_with_blank_line(&lead) {
            lead.push(Token::new(TokenKind::Newline, "\n"));
        }
        block.lead = lead;
        self.place_block(&mut block);

        self.items.push(Item::Block(block));
        match self.items.last_mut() {
            Some(Item::Block(block)) => block,
            _ => unreachable!("a block was just pushed"),
        }
    }

    /// Insert a block at the start of the body, followed by a blank line
    /// when the body already has content.
    pub fn prepend_block(&mut self, mut block: Block) -> &mut Block {
        self.ensure_multiline();
        if self.has_content() {
            match self.items.first_mut() {
                Some(first) => {
                    let lead = first.lead_mut();
                    if !lead.first().is_some_and(|t| t.is(TokenKind::Newline)) {
                        lead.insert(0, Token::new(TokenKind::Newline, "\n"));
                    }
                }
                None => {
                    if !self.tail.first().is_some_and(|t| t.is(TokenKind::Newline)) {
                        self.tail.insert(0, Token::new(TokenKind::Newline, "\n"));
                    }
                }
            }
        }
        block.lead = Vec::new();
        self.place_block(&mut block);

        self.items.insert(0, Item::Block(block));
        match self.items.first_mut() {
            Some(Item::Block(block)) => block,
            _ => unreachable!("a block was just inserted"),
        }
    }

    /// Remove the first block with the given type and labels, together with
    /// the comments and blank lines directly above it.
    pub fn remove_block(&mut self, kind: &str, labels: &[&str]) -> Option<Block> {
        let index = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Block(block) if block.matches(kind, labels)))?;
        match self.remove_item(index) {
            Item::Block(block) => Some(block),
            Item::Attribute(_) => None,
        }
    }

    /// Set an attribute to a value, replacing the expression of an existing
    /// attribute or appending a new one.
    pub fn set_attribute_value(&mut self, name: &str, value: &Value) -> &mut Attribute {
        self.set_attribute_raw(name, Tokens::from_value(value))
    }

    /// Set an attribute to a raw token sequence.
    ///
    /// An existing attribute keeps its position, name and trailing comment.
    pub fn set_attribute_raw(&mut self, name: &str, tokens: Tokens) -> &mut Attribute {
        let mut tokens = tokens.into_vec();
        if let Some(first) = tokens.first_mut() {
            first.set_lead(" ");
        }
        let depth = self.depth;

        if let Some(index) = self.attribute_index(name) {
            let Item::Attribute(attribute) = &mut self.items[index] else {
                unreachable!("attribute_index returns attributes only");
            };
            attribute.expr = Expression::new(tokens);
            format_tokens(attribute.expr.tokens_mut().iter_mut().collect(), depth, false);
            return attribute;
        }

        self.ensure_multiline();
        let mut attribute = Attribute::new(name, Expression::new(tokens));
        attribute.lead = mem::take(&mut self.tail);
        format_tokens(attribute.core_tokens_mut(), depth, true);

        self.items.push(Item::Attribute(attribute));
        match self.items.last_mut() {
            Some(Item::Attribute(attribute)) => attribute,
            _ => unreachable!("an attribute was just pushed"),
        }
    }

    /// Remove an attribute, returning its expression.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Expression> {
        let index = self.attribute_index(name)?;
        match self.remove_item(index) {
            Item::Attribute(attribute) => Some(attribute.expr),
            Item::Block(_) => None,
        }
    }

    /// Append a blank line at the end of the body.
    pub fn append_newline(&mut self) {
        self.ensure_multiline();
        self.tail.push(Token::new(TokenKind::Newline, "\n"));
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Attribute(a) if a.name() == name))
    }

    fn remove_item(&mut self, index: usize) -> Item {
        let item = self.items.remove(index);
        if index == 0 {
            if let Some(next) = self.items.first_mut() {
                let lead = next.lead_mut();
                let blank = lead.iter().take_while(|t| t.is(TokenKind::Newline)).count();
                lead.drain(..blank);
            }
        }
        item
    }

    /// Format a block for insertion into this body.
    fn place_block(&self, block: &mut Block) {
        block.trail = vec![Token::new(TokenKind::Newline, "\n")];
        block.body.set_depth(self.depth + 1);
        format_tokens(block.core_tokens_mut(), self.depth, true);
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for block in self.blocks_mut() {
            block.body.set_depth(depth + 1);
        }
    }

    fn has_content(&self) -> bool {
        !self.items.is_empty() || self.tail.iter().any(|t| t.is(TokenKind::Comment))
    }

    /// Returns `true` if the last token before `}` (or the end of the
    /// document) is a line break.
    fn ends_with_newline(&self) -> bool {
        let last = self
            .tail
            .last()
            .or_else(|| self.items.last().and_then(|item| item.trail().last()))
            .or_else(|| {
                if self.items.is_empty() {
                    self.open_trail.last()
                } else {
                    None
                }
            });
        match last {
            Some(token) => token.is(TokenKind::Newline),
            None => self.open.is_none() && self.items.is_empty(),
        }
    }

    /// Put `{` and `}` on their own lines so items can be added.
    fn ensure_multiline(&mut self) {
        let mut changed = false;

        if self.open.is_some() && self.open_trail.is_empty() {
            self.open_trail.push(Token::new(TokenKind::Newline, "\n"));
            if let Some(first) = self.items.first_mut() {
                first.first_token_mut().set_lead(indent(self.depth));
            }
            changed = true;
        }

        if !self.ends_with_newline() {
            let newline = Token::new(TokenKind::Newline, "\n");
            match self.items.last_mut() {
                Some(last) if self.tail.is_empty() => last.trail_mut().push(newline),
                _ => self.tail.push(newline),
            }
            changed = true;
        }

        if changed {
            let depth = self.depth.saturating_sub(1);
            if let Some(close) = &mut self.close {
                close.set_lead(indent(depth));
            }
        }
    }

    fn collect_tokens_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Token>) {
        out.extend(self.open.iter_mut());
        out.extend(self.open_trail.iter_mut());
        for item in &mut self.items {
            match item {
                Item::Attribute(attribute) => attribute.collect_tokens_mut(out),
                Item::Block(block) => block.collect_tokens_mut(out),
            }
        }
        out.extend(self.tail.iter_mut());
        out.extend(self.close.iter_mut());
    }

    fn write_to(&self, out: &mut String) {
        self.open.iter().for_each(|t| t.write_to(out));
        self.open_trail.iter().for_each(|t| t.write_to(out));
        self.items.iter().for_each(|item| item.write_to(out));
        self.tail.iter().for_each(|t| t.write_to(out));
        self.close.iter().for_each(|t| t.write_to(out));
    }
}

/// Whether a lead that follows a line break ends with an empty line.
fn ends_with_blank_line(lead: &[Token]) -> bool {
    match lead {
        [] => false,
        [.., last] if !last.is(TokenKind::Newline) => false,
        [_] => true,
        [.., before, _] => before.is(TokenKind::Newline),
    }
}
