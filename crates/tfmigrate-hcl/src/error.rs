//! Error and diagnostic system for tfmigrate.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - A source range pointing at the offending file and bytes
//! - Severity levels
//! - A [`Diagnostics`] collector for accumulating records across phases
//!
//! # Overview
//!
//! Nothing in the rewriting engine signals failure by unwinding. Every
//! fallible operation returns its result alongside a [`Diagnostics`]
//! collection, and callers decide whether accumulated error-severity
//! diagnostics should halt further action.
//!
//! # Example
//!
//! ```
//! # use tfmigrate_hcl::error::{Diagnostic, Diagnostics, ErrorCode};
//! # use tfmigrate_hcl::{SourceRange, Span};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.emit(
//!     Diagnostic::error("Duplicate backend configuration")
//!         .with_code(ErrorCode::E202)
//!         .with_detail("A module may have only one backend configuration.")
//!         .with_subject(SourceRange::new("backend.tf", Span::new(10..30))),
//! );
//! assert!(diagnostics.has_errors());
//! ```

mod diagnostic;
mod diagnostics;
mod error_code;
mod severity;

pub use diagnostic::Diagnostic;
pub use diagnostics::Diagnostics;
pub use error_code::ErrorCode;
pub use severity::Severity;
