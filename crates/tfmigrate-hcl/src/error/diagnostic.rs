//! The core diagnostic type for the tfmigrate error system.
//!
//! A [`Diagnostic`] represents a single error or warning with an optional
//! error code, a summary, a longer detail, an optional source range, and
//! help text.

use std::fmt;

use crate::{
    error::{Severity, error_code::ErrorCode},
    span::SourceRange,
};

/// A diagnostic record with optional source location information.
///
/// # Example
///
/// ```text
/// error[E202]: Duplicate backend configuration
///   --> modules/app/backend.tf
///    |
///  3 |   backend "s3" {
///    |   ^^^^^^^^^^^^^^ duplicate backend
///    |
///    = help: remove one of the backend blocks
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    summary: String,
    detail: Option<String>,
    subject: Option<SourceRange>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfmigrate_hcl::error::{Diagnostic, ErrorCode};
    /// let diag = Diagnostic::error("Not a module directory")
    ///     .with_code(ErrorCode::E200)
    ///     .with_detail("Directory modules/empty does not contain configuration files.");
    /// assert!(diag.severity().is_error());
    /// ```
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary)
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the one-line summary.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Get the detail text, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Get the source range the diagnostic is about, if any.
    pub fn subject(&self) -> Option<&SourceRange> {
        self.subject.as_ref()
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the source range.
    pub fn with_subject(mut self, subject: SourceRange) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Create a new diagnostic with the given severity and summary.
    fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            summary: summary.into(),
            detail: None,
            subject: None,
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: summary; detail" or "error: summary"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, "; {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert!(!diag.severity().is_warning());
        assert_eq!(diag.summary(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.detail().is_none());
        assert!(diag.subject().is_none());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let subject = SourceRange::new("main.tf", Span::new(4..9));
        let diag = Diagnostic::warning("Rename skipped due to conflict")
            .with_code(ErrorCode::E500)
            .with_detail("previous step already renamed this file")
            .with_subject(subject.clone())
            .with_help("rename the file manually");

        assert!(diag.severity().is_warning());
        assert_eq!(diag.code(), Some(ErrorCode::E500));
        assert_eq!(diag.detail(), Some("previous step already renamed this file"));
        assert_eq!(diag.subject(), Some(&subject));
        assert_eq!(diag.help(), Some("rename the file manually"));
    }

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::error("Unexpected token").with_code(ErrorCode::E100);
        assert_eq!(diag.to_string(), "error[E100]: Unexpected token");
    }

    #[test]
    fn test_diagnostic_display_with_detail() {
        let diag = Diagnostic::warning("Skipped").with_detail("not constant");
        assert_eq!(diag.to_string(), "warning: Skipped; not constant");
    }
}
