//! Lexical analyzer for configuration documents.
//!
//! The lexer converts source text into a lossless stream of [`Token`]s:
//! every byte of the input ends up either in a token's `lead` (horizontal
//! whitespace) or in its `text`, and the stream always ends with an
//! [`TokenKind::Eof`] token carrying the trailing whitespace.
//!
//! Quoted templates and heredocs switch the lexer into template mode. A
//! stack of open frames tracks which `}` closes an interpolation and which
//! closes an ordinary brace.
//!
//! The public entry point is [`tokenize`], which never fails: bytes that
//! cannot be classified become [`TokenKind::Invalid`] tokens and produce an
//! error diagnostic.

use std::path::Path;

use winnow::{
    Parser as _,
    ascii::{digit1, line_ending},
    combinator::{alt, eof, not, opt, peek, repeat},
    error::{ContextError, ModalResult},
    stream::{LocatingSlice, Location, Stream as _},
    token::{any, literal, none_of, one_of, rest, take_till, take_until, take_while},
};

use crate::{
    error::{Diagnostic, Diagnostics, ErrorCode},
    span::{SourceRange, Span},
    tokens::{Token, TokenKind},
};

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError>;

/// Parse horizontal whitespace (spaces and tabs)
fn horizontal_space<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    take_while(0.., [' ', '\t']).parse_next(input)
}

/// Parse a `#`, `//` or `/* */` comment.
///
/// An unterminated block comment runs to the end of input.
fn comment<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    alt((
        ('#', take_till(0.., ['\n', '\r'])).take(),
        ("//", take_till(0.., ['\n', '\r'])).take(),
        ("/*", take_until(0.., "*/"), "*/").take(),
        ("/*", rest).take(),
    ))
    .parse_next(input)
}

/// Parse identifiers; HCL allows `-` after the first character
fn identifier<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

/// Parse a number literal, keeping its exact spelling
fn number<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)
}

/// Parse a heredoc introducer up to and including its line break
fn heredoc_open<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    ("<<", opt('-'), identifier, line_ending)
        .take()
        .parse_next(input)
}

/// Parse punctuation (order matters - longest first)
fn punctuation(input: &mut Input<'_>) -> IResult<TokenKind> {
    alt((
        alt((
            literal("...").value(TokenKind::Ellipsis),
            literal("=>").value(TokenKind::FatArrow),
            literal("==").value(TokenKind::Operator),
            '='.value(TokenKind::Equal),
            '{'.value(TokenKind::OBrace),
            '}'.value(TokenKind::CBrace),
            '['.value(TokenKind::OBrack),
        )),
        alt((
            ']'.value(TokenKind::CBrack),
            '('.value(TokenKind::OParen),
            ')'.value(TokenKind::CParen),
            ','.value(TokenKind::Comma),
            '.'.value(TokenKind::Dot),
            ':'.value(TokenKind::Colon),
            '?'.value(TokenKind::Question),
        )),
    ))
    .parse_next(input)
}

/// Parse arithmetic, comparison and logical operators
fn operator<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    alt((
        literal("!="),
        literal("<="),
        literal(">="),
        literal("&&"),
        literal("||"),
        one_of(['!', '+', '-', '*', '/', '%', '<', '>']).take(),
    ))
    .parse_next(input)
}

/// Parse one token outside of template mode
fn normal_token(input: &mut Input<'_>) -> IResult<TokenKind> {
    alt((
        line_ending.value(TokenKind::Newline),
        comment.value(TokenKind::Comment), // Must come before operators
        heredoc_open.value(TokenKind::OHeredoc), // Must come before operators
        number.value(TokenKind::Number),
        identifier.value(TokenKind::Ident),
        '"'.value(TokenKind::OQuote),
        literal("~}").value(TokenKind::TemplateSeqEnd),
        punctuation,
        operator.value(TokenKind::Operator),
    ))
    .parse_next(input)
}

/// Parse a template introducer: `${`, `${~`, `%{` or `%{~`
fn template_open(input: &mut Input<'_>) -> IResult<TokenKind> {
    alt((
        ("${", opt('~')).value(TokenKind::TemplateInterp),
        ("%{", opt('~')).value(TokenKind::TemplateControl),
    ))
    .parse_next(input)
}

/// Parse literal text of a quoted template.
///
/// `$${` and `%%{` are escapes for a literal `${` and `%{`; backslash
/// escapes are kept verbatim.
fn quoted_literal<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    repeat::<_, _, (), _, _>(
        1..,
        alt((
            literal("$${").void(),
            literal("%%{").void(),
            ('\\', none_of(['\n', '\r'])).void(),
            ('$', not('{')).void(),
            ('%', not('{')).void(),
            none_of(['"', '$', '%', '\\', '\n', '\r']).void(),
        )),
    )
    .take()
    .parse_next(input)
}

/// Parse heredoc text up to the next template introducer or through the
/// end of the current line.
fn heredoc_literal<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        repeat::<_, _, (), _, _>(
            0..,
            alt((
                literal("$${").void(),
                literal("%%{").void(),
                ('$', not('{')).void(),
                ('%', not('{')).void(),
                none_of(['$', '%', '\n', '\r']).void(),
            )),
        ),
        opt(line_ending),
    )
        .take()
        .verify(|s: &str| !s.is_empty())
        .parse_next(input)
}

/// Parse a heredoc's closing marker line (without its line break)
fn heredoc_close<'a>(input: &mut Input<'a>, marker: &str) -> IResult<(&'a str, &'a str)> {
    (
        horizontal_space,
        literal(marker),
        peek(alt((line_ending.void(), eof.void()))),
    )
        .map(|(lead, text, ())| (lead, text))
        .parse_next(input)
}

/// An open region the lexer is currently inside.
#[derive(Debug)]
enum Frame {
    /// An ordinary `{`
    Brace,
    /// A `${` or `%{` sequence inside a template
    Interp,
    /// A quoted template
    Quoted,
    /// A heredoc template
    Heredoc { marker: String, line_start: bool },
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    src: &'a str,
    input: Input<'a>,
    filename: &'a Path,
    frames: Vec<Frame>,
    tokens: Vec<Token>,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, filename: &'a Path) -> Self {
        Self {
            src,
            input: LocatingSlice::new(src),
            filename,
            frames: Vec::new(),
            tokens: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn offset(&self) -> usize {
        self.input.current_token_start()
    }

    /// Run a recognizer, rewinding the input when it does not match.
    fn attempt<O>(&mut self, mut parser: impl FnMut(&mut Input<'a>) -> IResult<O>) -> Option<O> {
        let checkpoint = self.input.checkpoint();
        match parser(&mut self.input) {
            Ok(output) => Some(output),
            Err(_) => {
                self.input.reset(&checkpoint);
                None
            }
        }
    }

    fn push(&mut self, kind: TokenKind, lead: &str, start: usize) {
        let end = self.offset();
        self.tokens.push(Token::parsed(
            kind,
            lead,
            &self.src[start..end],
            Span::new(start..end),
        ));
    }

    fn error(&mut self, code: ErrorCode, summary: &str, detail: &str, span: Span) {
        self.diagnostics.emit(
            Diagnostic::error(summary)
                .with_code(code)
                .with_detail(detail)
                .with_subject(SourceRange::new(self.filename, span)),
        );
    }

    /// Tokenize the whole input.
    fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        loop {
            let finished = match self.frames.last() {
                Some(Frame::Quoted) => {
                    self.quoted_step();
                    false
                }
                Some(Frame::Heredoc { .. }) => {
                    self.heredoc_step();
                    false
                }
                Some(Frame::Brace | Frame::Interp) | None => self.normal_step(),
            };
            if finished {
                break;
            }
        }
        (self.tokens, self.diagnostics)
    }

    /// Lex one token outside of template mode; returns `true` at end of input.
    fn normal_step(&mut self) -> bool {
        let lead = horizontal_space.parse_next(&mut self.input).unwrap_or("");
        let start = self.offset();

        if self.input.is_empty() {
            self.tokens
                .push(Token::parsed(TokenKind::Eof, lead, "", Span::new(start..start)));
            return true;
        }

        let Some(mut kind) = self.attempt(normal_token) else {
            // Keep the byte so the stream stays lossless
            let _ = any::<_, ContextError>.parse_next(&mut self.input);
            let span = Span::new(start..self.offset());
            self.error(
                ErrorCode::E002,
                "Invalid character",
                "This character is not used within the language.",
                span,
            );
            self.push(TokenKind::Invalid, lead, start);
            return false;
        };

        match kind {
            TokenKind::OQuote => self.frames.push(Frame::Quoted),
            TokenKind::OBrace => self.frames.push(Frame::Brace),
            TokenKind::CBrace | TokenKind::TemplateSeqEnd => match self.frames.last() {
                Some(Frame::Interp) => {
                    kind = TokenKind::TemplateSeqEnd;
                    self.frames.pop();
                }
                Some(Frame::Brace) if kind == TokenKind::CBrace => {
                    self.frames.pop();
                }
                _ => {}
            },
            TokenKind::OHeredoc => {
                let text = &self.src[start..self.offset()];
                let marker = text
                    .trim_start_matches("<<")
                    .trim_start_matches('-')
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                self.frames.push(Frame::Heredoc {
                    marker,
                    line_start: true,
                });
            }
            TokenKind::Comment => {
                let text = &self.src[start..self.offset()];
                if text.starts_with("/*") && (text.len() < 4 || !text.ends_with("*/")) {
                    self.error(
                        ErrorCode::E003,
                        "Unterminated comment",
                        "There is no closing marker for this multi-line comment.",
                        Span::new(start..start + 2),
                    );
                }
            }
            _ => {}
        }

        self.push(kind, lead, start);
        false
    }

    /// Lex one token inside a quoted template.
    fn quoted_step(&mut self) {
        let start = self.offset();

        if let Some(kind) = self.attempt(template_open) {
            self.frames.push(Frame::Interp);
            self.push(kind, "", start);
            return;
        }
        if self.attempt(|input| '"'.parse_next(input)).is_some() {
            self.frames.pop();
            self.push(TokenKind::CQuote, "", start);
            return;
        }
        if self.attempt(quoted_literal).is_some() {
            self.push(TokenKind::QuotedLit, "", start);
            return;
        }

        let at_line_end = self.input.is_empty()
            || peek(line_ending::<_, ContextError>)
                .parse_next(&mut self.input)
                .is_ok();
        if at_line_end {
            self.frames.pop();
            self.error(
                ErrorCode::E001,
                "Unterminated template string",
                "No closing marker was found for the string.",
                Span::new(start..start),
            );
        } else {
            // A lone `\` or `\r` inside the string
            let _ = any::<_, ContextError>.parse_next(&mut self.input);
            self.push(TokenKind::QuotedLit, "", start);
        }
    }

    /// Lex one token inside a heredoc template.
    fn heredoc_step(&mut self) {
        let start = self.offset();
        let Some(Frame::Heredoc { marker, line_start }) = self.frames.last() else {
            return;
        };

        if self.input.is_empty() {
            let detail = format!("The heredoc is missing its closing marker \"{marker}\".");
            self.frames.pop();
            self.error(
                ErrorCode::E004,
                "Unterminated template string",
                &detail,
                Span::new(start..start),
            );
            return;
        }

        if *line_start {
            let marker = marker.clone();
            if let Some((lead, text)) = self.attempt(|input| heredoc_close(input, &marker)) {
                let text_start = self.offset() - text.len();
                self.frames.pop();
                self.push(TokenKind::CHeredoc, lead, text_start);
                return;
            }
        }

        if let Some(kind) = self.attempt(template_open) {
            self.set_heredoc_line_start(false);
            self.frames.push(Frame::Interp);
            self.push(kind, "", start);
            return;
        }

        let text = match self.attempt(heredoc_literal) {
            Some(text) => text,
            None => any::<_, ContextError>
                .take()
                .parse_next(&mut self.input)
                .unwrap_or(""),
        };
        self.set_heredoc_line_start(text.ends_with('\n'));
        self.push(TokenKind::StringLit, "", start);
    }

    fn set_heredoc_line_start(&mut self, value: bool) {
        if let Some(Frame::Heredoc { line_start, .. }) = self.frames.last_mut() {
            *line_start = value;
        }
    }
}

/// Split source text into tokens, collecting diagnostics.
///
/// The returned tokens always reproduce `src` exactly when their leads and
/// texts are concatenated in order.
pub fn tokenize(src: &str, filename: &Path) -> (Vec<Token>, Diagnostics) {
    let (tokens, diagnostics) = Lexer::new(src, filename).tokenize();
    log::trace!(
        tokens = tokens.len(),
        diagnostics = diagnostics.len();
        "Tokenized document"
    );
    (tokens, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        let (tokens, diagnostics) = tokenize(src, Path::new("test.tf"));
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");
        tokens
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).iter().map(Token::kind).collect()
    }

    fn concat(tokens: &[Token]) -> String {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_attribute() {
        use TokenKind::*;
        assert_eq!(
            kinds("name = \"value\"\n"),
            [Ident, Equal, OQuote, QuotedLit, CQuote, Newline, Eof]
        );
    }

    #[test]
    fn test_leads_hold_whitespace() {
        let tokens = lex("  key   =\t1  ");
        assert_eq!(tokens[0].lead(), "  ");
        assert_eq!(tokens[1].lead(), "   ");
        assert_eq!(tokens[2].lead(), "\t");
        assert_eq!(tokens[3].kind(), TokenKind::Eof);
        assert_eq!(tokens[3].lead(), "  ");
    }

    #[test]
    fn test_identifiers_with_dashes() {
        let tokens = lex("my-resource_name2");
        assert_eq!(tokens[0].kind(), TokenKind::Ident);
        assert_eq!(tokens[0].text(), "my-resource_name2");
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("1 2.5 3e10 list.0");
        let texts: Vec<_> = tokens.iter().map(Token::text).collect();
        assert_eq!(texts, ["1", "2.5", "3e10", "list", ".", "0", ""]);
        assert_eq!(tokens[5].kind(), TokenKind::Number);
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a == b ? -1 : x... => !c"),
            [
                Ident, Operator, Ident, Question, Operator, Number, Colon, Ident, Ellipsis,
                FatArrow, Operator, Ident, Eof
            ]
        );
    }

    #[test]
    fn test_template_interpolation() {
        use TokenKind::*;
        let tokens = lex(r#""ws-${terraform.workspace}!""#);
        let kinds: Vec<_> = tokens.iter().map(Token::kind).collect();
        assert_eq!(
            kinds,
            [
                OQuote,
                QuotedLit,
                TemplateInterp,
                Ident,
                Dot,
                Ident,
                TemplateSeqEnd,
                QuotedLit,
                CQuote,
                Eof
            ]
        );
        assert_eq!(tokens[1].text(), "ws-");
    }

    #[test]
    fn test_braces_inside_interpolation() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#""${ {a = 1}.a }""#),
            [
                OQuote,
                TemplateInterp,
                OBrace,
                Ident,
                Equal,
                Number,
                CBrace,
                Dot,
                Ident,
                TemplateSeqEnd,
                CQuote,
                Eof
            ]
        );
    }

    #[test]
    fn test_template_escapes_stay_literal() {
        use TokenKind::*;
        let tokens = lex(r#""$${x} %%{y} \"q\" $5""#);
        assert_eq!(
            tokens.iter().map(Token::kind).collect::<Vec<_>>(),
            [OQuote, QuotedLit, CQuote, Eof]
        );
        assert_eq!(tokens[1].text(), r#"$${x} %%{y} \"q\" $5"#);
    }

    #[test]
    fn test_nested_template() {
        let src = r#""a${"b${c}"}d""#;
        assert_eq!(concat(&lex(src)), src);
    }

    #[test]
    fn test_heredoc() {
        use TokenKind::*;
        let src = "x = <<-EOT\n  hello ${name}\n  EOT\n";
        let tokens = lex(src);
        assert_eq!(
            tokens.iter().map(Token::kind).collect::<Vec<_>>(),
            [
                Ident,
                Equal,
                OHeredoc,
                StringLit,
                TemplateInterp,
                Ident,
                TemplateSeqEnd,
                StringLit,
                CHeredoc,
                Newline,
                Eof
            ]
        );
        assert_eq!(tokens[2].text(), "<<-EOT\n");
        assert_eq!(tokens[8].lead(), "  ");
        assert_eq!(tokens[8].text(), "EOT");
        assert_eq!(concat(&tokens), src);
    }

    #[test]
    fn test_heredoc_marker_must_fill_line() {
        let src = "x = <<EOT\nEOTX\nEOT\n";
        let tokens = lex(src);
        let closers = tokens
            .iter()
            .filter(|t| t.kind() == TokenKind::CHeredoc)
            .count();
        assert_eq!(closers, 1);
        assert_eq!(concat(&tokens), src);
    }

    #[test]
    fn test_comments() {
        use TokenKind::*;
        let tokens = lex("# hash\n// slashes\n/* block\nspans */ a = 1 // trailing\n");
        assert_eq!(
            tokens.iter().map(Token::kind).collect::<Vec<_>>(),
            [
                Comment, Newline, Comment, Newline, Comment, Ident, Equal, Number, Comment,
                Newline, Eof
            ]
        );
        assert_eq!(tokens[4].text(), "/* block\nspans */");
    }

    #[test]
    fn test_crlf_newlines() {
        let tokens = lex("a = 1\r\nb = 2\r\n");
        assert_eq!(tokens[3].kind(), TokenKind::Newline);
        assert_eq!(tokens[3].text(), "\r\n");
    }

    #[test]
    fn test_invalid_character() {
        let src = "a = 1 ; b";
        let (tokens, diagnostics) = tokenize(src, Path::new("test.tf"));
        assert_eq!(diagnostics.len(), 1);
        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E002));
        assert_eq!(diag.subject().unwrap().span(), Span::new(6..7));
        assert_eq!(tokens[3].kind(), TokenKind::Invalid);
        assert_eq!(concat(&tokens), src);
    }

    #[test]
    fn test_unterminated_string() {
        let src = "a = \"open\nb = 1\n";
        let (tokens, diagnostics) = tokenize(src, Path::new("test.tf"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().code(),
            Some(ErrorCode::E001)
        );
        // Lexing resumes normally on the next line
        assert!(tokens.iter().any(|t| t.is_ident("b")));
        assert_eq!(concat(&tokens), src);
    }

    #[test]
    fn test_unterminated_heredoc_and_comment() {
        let (tokens, diagnostics) = tokenize("x = <<EOT\nbody\n", Path::new("a.tf"));
        assert_eq!(diagnostics.iter().next().unwrap().code(), Some(ErrorCode::E004));
        assert_eq!(concat(&tokens), "x = <<EOT\nbody\n");

        let (tokens, diagnostics) = tokenize("/* never closed", Path::new("a.tf"));
        assert_eq!(diagnostics.iter().next().unwrap().code(), Some(ErrorCode::E003));
        assert_eq!(concat(&tokens), "/* never closed");
    }

    #[test]
    fn test_spans_cover_text() {
        let src = "resource \"a\" \"b\" {\n  count = 2\n}\n";
        for token in lex(src) {
            assert_eq!(&src[token.span().start()..token.span().end()], token.text());
        }
    }
}
