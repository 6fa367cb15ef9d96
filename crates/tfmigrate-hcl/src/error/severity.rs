//! Severity levels for diagnostics.
//!
//! This module defines the severity of diagnostic messages,
//! distinguishing between fatal errors and advisory warnings.

use std::fmt;

/// The severity level of a diagnostic.
///
/// Severity determines how the diagnostic should be handled:
/// - [`Severity::Error`] marks the affected document or directory as unusable
/// - [`Severity::Warning`] is advisory and never stops a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A fatal error for the affected document, directory or path.
    ///
    /// Callers decide whether accumulated errors should stop further
    /// action, such as writing a change set.
    Error,

    /// A non-fatal warning about a skipped or downgraded action.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}
