//! Error types for migration operations.
//!
//! Problems found in configuration files are reported as
//! [`Diagnostics`] alongside results. [`MigrateError`] is for failures that
//! stop a migration outright.

use std::io;

use thiserror::Error;

use tfmigrate_hcl::error::Diagnostics;

/// The main error type for migration operations.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Diagnostics containing at least one error.
    #[error("{diagnostics}")]
    Diagnostics { diagnostics: Diagnostics },
}

impl MigrateError {
    /// Fail with `diagnostics` if they contain errors.
    pub fn check(diagnostics: &Diagnostics) -> Result<(), MigrateError> {
        if diagnostics.has_errors() {
            Err(Self::Diagnostics {
                diagnostics: diagnostics.clone(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfmigrate_hcl::error::Diagnostic;

    #[test]
    fn test_check() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.emit(Diagnostic::warning("only a warning"));
        assert!(MigrateError::check(&diagnostics).is_ok());

        diagnostics.emit(Diagnostic::error("broken"));
        let err = MigrateError::check(&diagnostics).unwrap_err();
        assert!(matches!(err, MigrateError::Diagnostics { diagnostics } if diagnostics.len() == 2));
    }
}
