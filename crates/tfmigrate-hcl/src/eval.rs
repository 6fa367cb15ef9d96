//! Evaluation of constant expressions.
//!
//! Only expressions whose value is fully known from the source text are
//! evaluated: literals, quoted strings without interpolation, heredocs,
//! tuples, objects and parentheses, with unary `-` and `!`. Anything that
//! refers to a variable, calls a function or interpolates a template is
//! reported as [`EvalError::NonConstant`], as are binary operations and
//! conditionals, which are left for Terraform to evaluate.

use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use tfmigrate_core::value::Value;

use crate::{
    error::{Diagnostic, ErrorCode},
    expression::Expression,
    span::SourceRange,
    tokens::{Token, TokenKind, unescape_quoted},
};

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression depends on values only known at plan time.
    #[error("expression is not constant")]
    NonConstant,
    /// The expression is constant but malformed or unsupported.
    #[error("{0}")]
    Invalid(Diagnostic),
}

/// Evaluate a constant expression.
///
/// # Example
///
/// ```
/// # use tfmigrate_hcl::{eval::{EvalError, evaluate}, parse};
/// # use std::path::Path;
/// let (doc, _) = parse("a = { name = \"ws\" }\nb = var.x\n", "main.tf");
/// let a = doc.body().attribute("a").unwrap();
/// let value = evaluate(a.expr(), Path::new("main.tf")).unwrap();
/// assert_eq!(value.as_object().unwrap()["name"].as_str(), Some("ws"));
///
/// let b = doc.body().attribute("b").unwrap();
/// assert_eq!(evaluate(b.expr(), Path::new("main.tf")), Err(EvalError::NonConstant));
/// ```
pub fn evaluate(expr: &Expression, filename: &Path) -> Result<Value, EvalError> {
    if !expr.traversals().is_empty() || has_call_or_template(expr.tokens()) {
        return Err(EvalError::NonConstant);
    }

    let mut tokens = Vec::new();
    let mut line_starts = Vec::new();
    let mut line_start = false;
    for token in expr.tokens() {
        match token.kind() {
            TokenKind::Newline => line_start = true,
            TokenKind::Comment => {}
            _ => {
                tokens.push(token);
                line_starts.push(line_start);
                line_start = false;
            }
        }
    }
    let mut evaluator = Evaluator {
        tokens: &tokens,
        line_starts: &line_starts,
        pos: 0,
        filename,
    };
    let value = evaluator.value()?;
    if evaluator.pos < tokens.len() {
        return Err(evaluator.invalid("Unsupported expression"));
    }
    Ok(value)
}

fn has_call_or_template(tokens: &[Token]) -> bool {
    tokens.iter().enumerate().any(|(i, token)| match token.kind() {
        TokenKind::TemplateInterp | TokenKind::TemplateControl => true,
        TokenKind::Ident => tokens
            .get(i + 1)
            .is_some_and(|next| next.is(TokenKind::OParen)),
        _ => false,
    })
}

struct Evaluator<'a> {
    tokens: &'a [&'a Token],
    /// Whether each token is the first on its line.
    line_starts: &'a [bool],
    pos: usize,
    filename: &'a Path,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(Token::kind)
    }

    fn at_line_start(&self) -> bool {
        self.line_starts.get(self.pos).copied().unwrap_or(false)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), EvalError> {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.invalid("Unsupported expression"))
        }
    }

    fn invalid(&self, summary: &str) -> EvalError {
        let span = self
            .peek()
            .or_else(|| self.tokens.last().copied())
            .map(Token::span)
            .unwrap_or_default();
        let detail = match self.peek() {
            Some(token) => format!("Cannot evaluate a constant value at {:?}.", token.text()),
            None => "The expression ends unexpectedly.".to_string(),
        };
        EvalError::Invalid(
            Diagnostic::error(summary)
                .with_code(ErrorCode::E301)
                .with_detail(detail)
                .with_subject(SourceRange::new(self.filename, span)),
        )
    }

    fn value(&mut self) -> Result<Value, EvalError> {
        let value = self.operand()?;
        match self.peek_kind() {
            Some(TokenKind::Operator | TokenKind::Question) => Err(EvalError::NonConstant),
            _ => Ok(value),
        }
    }

    fn operand(&mut self) -> Result<Value, EvalError> {
        let Some(token) = self.peek() else {
            return Err(self.invalid("Missing expression"));
        };

        match token.kind() {
            TokenKind::Number => {
                let n = token
                    .text()
                    .parse::<f64>()
                    .map_err(|_| self.invalid("Invalid number"))?;
                self.pos += 1;
                Ok(Value::Number(n))
            }
            TokenKind::Ident => {
                let value = match token.text() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => return Err(EvalError::NonConstant),
                };
                self.pos += 1;
                Ok(value)
            }
            TokenKind::OQuote => self.quoted().map(Value::String),
            TokenKind::OHeredoc => self.heredoc().map(Value::String),
            TokenKind::OBrack => self.tuple(),
            TokenKind::OBrace => self.object(),
            TokenKind::OParen => {
                self.pos += 1;
                let value = self.value()?;
                self.expect(TokenKind::CParen)?;
                Ok(value)
            }
            TokenKind::Operator if token.text() == "-" => {
                self.pos += 1;
                match self.value()? {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    _ => Err(self.invalid("Invalid operand")),
                }
            }
            TokenKind::Operator if token.text() == "!" => {
                self.pos += 1;
                match self.value()? {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    _ => Err(self.invalid("Invalid operand")),
                }
            }
            _ => Err(self.invalid("Unsupported expression")),
        }
    }

    fn quoted(&mut self) -> Result<String, EvalError> {
        self.expect(TokenKind::OQuote)?;
        let mut out = String::new();
        while self.peek_kind() == Some(TokenKind::QuotedLit) {
            let Some(token) = self.next() else { break };
            let text = token.text();
            match unescape_quoted(text) {
                Some(s) => out.push_str(&s),
                None => {
                    self.pos -= 1;
                    return Err(self.invalid("Invalid escape sequence"));
                }
            }
        }
        self.expect(TokenKind::CQuote)?;
        Ok(out)
    }

    fn heredoc(&mut self) -> Result<String, EvalError> {
        let strip = self.peek().is_some_and(|t| t.text().starts_with("<<-"));
        self.expect(TokenKind::OHeredoc)?;
        let mut content = String::new();
        while self.peek_kind() == Some(TokenKind::StringLit) {
            if let Some(token) = self.next() {
                content.push_str(token.text());
            }
        }
        self.expect(TokenKind::CHeredoc)?;

        let content = content.replace("$${", "${").replace("%%{", "%{");
        Ok(if strip { strip_indent(&content) } else { content })
    }

    fn tuple(&mut self) -> Result<Value, EvalError> {
        self.expect(TokenKind::OBrack)?;
        let mut items = Vec::new();
        while self.peek_kind() != Some(TokenKind::CBrack) {
            items.push(self.value()?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::CBrack) => {}
                _ => return Err(self.invalid("Missing item separator")),
            }
        }
        self.expect(TokenKind::CBrack)?;
        Ok(Value::List(items))
    }

    fn object(&mut self) -> Result<Value, EvalError> {
        self.expect(TokenKind::OBrace)?;
        let mut map = IndexMap::new();
        while self.peek_kind() != Some(TokenKind::CBrace) {
            let key = self.object_key()?;
            match self.peek_kind() {
                Some(TokenKind::Equal | TokenKind::Colon) => self.pos += 1,
                _ => return Err(self.invalid("Missing key/value separator")),
            }
            let value = self.value()?;
            map.insert(key, value);
            match self.peek_kind() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::CBrace) => {}
                _ if self.at_line_start() => {}
                _ => return Err(self.invalid("Missing attribute separator")),
            }
        }
        self.expect(TokenKind::CBrace)?;
        Ok(Value::Object(map))
    }

    fn object_key(&mut self) -> Result<String, EvalError> {
        match self.peek_kind() {
            Some(TokenKind::Ident | TokenKind::Number) => match self.next() {
                Some(token) => Ok(token.text().to_string()),
                None => Err(self.invalid("Invalid object key")),
            },
            Some(TokenKind::OQuote) => self.quoted(),
            Some(TokenKind::OParen) => {
                self.pos += 1;
                let key = self.value()?;
                self.expect(TokenKind::CParen)?;
                key.to_primitive_string()
                    .ok_or_else(|| self.invalid("Invalid object key"))
            }
            _ => Err(self.invalid("Invalid object key")),
        }
    }
}

/// Remove the common leading whitespace of non-blank lines.
fn strip_indent(content: &str) -> String {
    let indent = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    content
        .split_inclusive('\n')
        .map(|line| {
            let strip = line
                .char_indices()
                .take_while(|&(i, c)| i < indent && (c == ' ' || c == '\t'))
                .count();
            &line[strip..]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, span::Span};

    fn eval(src: &str) -> Result<Value, EvalError> {
        let (doc, diagnostics) = parse(&format!("v = {src}\n"), "test.tf");
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");
        let attribute = doc.body().attribute("v").expect("attribute v");
        evaluate(attribute.expr(), Path::new("test.tf"))
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("1.5"), Ok(Value::Number(1.5)));
        assert_eq!(eval("-3"), Ok(Value::Number(-3.0)));
        assert_eq!(eval("true"), Ok(Value::Bool(true)));
        assert_eq!(eval("!false"), Ok(Value::Bool(true)));
        assert_eq!(eval("null"), Ok(Value::Null));
        assert_eq!(eval("(\"x\")"), Ok(Value::string("x")));
    }

    #[test]
    fn test_strings_are_unescaped() {
        assert_eq!(eval(r#""a\"b\n""#), Ok(Value::string("a\"b\n")));
        assert_eq!(eval(r#""$${literal}""#), Ok(Value::string("${literal}")));
        assert_eq!(eval(r#""""#), Ok(Value::string("")));
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            eval("[1, \"two\", [],]"),
            Ok(Value::List(vec![
                Value::Number(1.0),
                Value::string("two"),
                Value::List(Vec::new()),
            ]))
        );
        assert_eq!(
            eval("{\n  name = \"ws\"\n  \"quoted key\": 1,\n  nested = { a = true }\n}"),
            Ok(Value::object([
                ("name", Value::string("ws")),
                ("quoted key", Value::Number(1.0)),
                ("nested", Value::object([("a", Value::Bool(true))])),
            ]))
        );
    }

    #[test]
    fn test_heredoc() {
        assert_eq!(eval("<<EOT\nhello\n  world\nEOT"), Ok(Value::string("hello\n  world\n")));
        assert_eq!(eval("<<-EOT\n    a\n      b\n    EOT"), Ok(Value::string("a\n  b\n")));
    }

    #[test]
    fn test_non_constant() {
        assert_eq!(eval("var.region"), Err(EvalError::NonConstant));
        assert_eq!(eval("\"${terraform.workspace}\""), Err(EvalError::NonConstant));
        assert_eq!(eval("upper(\"a\")"), Err(EvalError::NonConstant));
        assert_eq!(eval("{ name = local.name }"), Err(EvalError::NonConstant));
    }

    #[test]
    fn test_operations_are_not_evaluated() {
        assert_eq!(eval("1 + 2"), Err(EvalError::NonConstant));
        assert_eq!(eval("-1 * 3"), Err(EvalError::NonConstant));
        assert_eq!(eval("\"a\" == \"b\""), Err(EvalError::NonConstant));
        assert_eq!(eval("true ? \"a\" : \"b\""), Err(EvalError::NonConstant));
        assert_eq!(eval("{ count = 2 * 3 }"), Err(EvalError::NonConstant));
    }

    #[test]
    fn test_object_items_need_separator() {
        let Err(EvalError::Invalid(diagnostic)) = eval("{ a = 1 b = 2 }") else {
            panic!("expected an invalid expression");
        };
        assert_eq!(diagnostic.summary(), "Missing attribute separator");
        assert_eq!(diagnostic.detail(), Some("Cannot evaluate a constant value at \"b\"."));
        assert_eq!(diagnostic.subject().unwrap().span(), Span::new(12..13));

        let expected = Value::object([("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        assert_eq!(eval("{\n  a = 1\n  b = 2\n}"), Ok(expected.clone()));
        assert_eq!(eval("{ a = 1, b = 2 }"), Ok(expected.clone()));
        assert_eq!(eval("{\n  a = 1 # one\n  b = 2\n}"), Ok(expected));
    }

    #[test]
    fn test_invalid() {
        let Err(EvalError::Invalid(diagnostic)) = eval("[1, 2] [0]") else {
            panic!("expected an invalid expression");
        };
        assert_eq!(diagnostic.code(), Some(ErrorCode::E301));
        assert!(diagnostic.subject().is_some());

        assert!(matches!(eval("-true"), Err(EvalError::Invalid(_))));
        assert!(matches!(eval("[1 2]"), Err(EvalError::Invalid(_))));
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("  a\n\n    b\n"), "a\n\n  b\n");
        assert_eq!(strip_indent(""), "");
    }
}
