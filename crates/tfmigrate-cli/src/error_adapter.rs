//! Error adapter for converting diagnostics and [`MigrateError`] to miette
//! reports.
//!
//! This module provides the bridge between the library's diagnostics and
//! miette's rich diagnostic formatting used in the CLI. Each diagnostic is
//! rendered independently, with a snippet of the file it points at.

use std::{fmt, fs};

use miette::{
    Diagnostic as MietteDiagnostic, GraphicalReportHandler, LabeledSpan, NamedSource,
    Severity as MietteSeverity, SourceSpan,
};

use tfmigrate::MigrateError;
use tfmigrate_hcl::{Span, error::Diagnostic};

/// Adapter for a single tfmigrate diagnostic.
///
/// The source of the file the diagnostic points at is read when the adapter
/// is created. Diagnostics without a subject, or whose file cannot be read,
/// are rendered without a snippet.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    src: Option<NamedSource<String>>,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic) -> Self {
        let src = diag
            .subject()
            .filter(|subject| !subject.span().is_empty())
            .and_then(|subject| {
                let source = fs::read_to_string(subject.filename()).ok()?;
                Some(NamedSource::new(
                    subject.filename().display().to_string(),
                    source,
                ))
            });
        Self { diag, src }
    }

    /// Create an adapter with the source already loaded.
    pub fn with_source(diag: &'a Diagnostic, src: impl Into<String>) -> Self {
        let name = diag
            .subject()
            .map(|subject| subject.filename().display().to_string())
            .unwrap_or_default();
        Self {
            diag,
            src: Some(NamedSource::new(name, src.into())),
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.summary())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        if self.diag.severity().is_warning() {
            Some(MietteSeverity::Warning)
        } else {
            Some(MietteSeverity::Error)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.src.as_ref().map(|src| src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.src.as_ref()?;
        let subject = self.diag.subject()?;
        let message = self.diag.detail().map(str::to_string);
        let label = LabeledSpan::new_primary_with_span(message, span_to_miette(subject.span()));
        Some(Box::new(std::iter::once(label)))
    }
}

/// Adapter for non-diagnostic [`MigrateError`] variants.
pub struct ErrorAdapter<'a>(pub &'a MigrateError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            MigrateError::Io(_) => "tfmigrate::io",
            MigrateError::Config(_) => "tfmigrate::config",
            MigrateError::Diagnostics { .. } => return None,
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`MigrateError`] into a list of reportable errors.
///
/// For [`MigrateError::Diagnostics`], this returns one [`Reportable`] for
/// each diagnostic. For other error variants, this returns a single
/// [`Reportable`].
pub fn to_reportables(err: &MigrateError) -> Vec<Reportable<'_>> {
    match err {
        MigrateError::Diagnostics { diagnostics } => diagnostics
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Render a report with miette's graphical handler.
pub fn render(report: &dyn MietteDiagnostic) -> String {
    let mut out = String::new();
    match GraphicalReportHandler::new().render_report(&mut out, report) {
        Ok(()) => out,
        Err(_) => report.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use tfmigrate_hcl::{
        SourceRange,
        error::{Diagnostics, ErrorCode},
    };

    use super::*;

    #[test]
    fn test_diagnostics_are_separate() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.emit(Diagnostic::error("first error").with_code(ErrorCode::E100));
        diagnostics.emit(Diagnostic::warning("second warning"));
        let err = MigrateError::Diagnostics { diagnostics };

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "first error");
        assert_eq!(reportables[1].to_string(), "second warning");
        assert_eq!(reportables[0].severity(), Some(MietteSeverity::Error));
        assert_eq!(reportables[1].severity(), Some(MietteSeverity::Warning));
        assert_eq!(reportables[0].code().unwrap().to_string(), "E100");
    }

    #[test]
    fn test_non_diagnostic_error() {
        let err = MigrateError::Config("no organization".to_string());

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "Configuration error: no organization");
                assert_eq!(e.code().unwrap().to_string(), "tfmigrate::config");
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_label_points_at_subject() {
        let diag = Diagnostic::error("Unclosed bracket")
            .with_detail("The expression ends before all of its brackets are closed.")
            .with_subject(SourceRange::new("main.tf", Span::new(4..9)));
        let adapter = DiagnosticAdapter::with_source(&diag, "a = [1, 2\n");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].primary());
        assert_eq!(labels[0].offset(), 4);
        assert_eq!(labels[0].len(), 5);
        assert_eq!(
            labels[0].label(),
            Some("The expression ends before all of its brackets are closed.")
        );
        assert!(render(&adapter).contains("Unclosed bracket"));
    }

    #[test]
    fn test_missing_source_has_no_labels() {
        let diag = Diagnostic::error("file read error")
            .with_subject(SourceRange::new("does/not/exist.tf", Span::new(0..3)));
        let adapter = DiagnosticAdapter::new(&diag);
        assert!(adapter.source_code().is_none());
        assert!(adapter.labels().is_none());
    }
}
