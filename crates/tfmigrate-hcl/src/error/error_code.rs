//! Error codes for the tfmigrate diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Module errors
//! - `E3xx` - Evaluation errors
//! - `E4xx` - I/O errors
//! - `E5xx` - Pipeline errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A quoted string reached the end of the line before its closing quote.
    E001,

    /// Unexpected character.
    ///
    /// A character was encountered that is not valid in this context.
    E002,

    /// Unterminated comment.
    ///
    /// A `/*` comment was never closed.
    E003,

    /// Unterminated heredoc.
    ///
    /// The input ended before the heredoc's closing marker line.
    E004,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser encountered a token it did not expect at this position.
    E100,

    /// Incomplete input.
    ///
    /// The input ended before a block was closed.
    E101,

    // =========================================================================
    // Module Errors (E2xx)
    // =========================================================================
    /// Not a configuration directory.
    ///
    /// The directory does not contain any configuration files.
    E200,

    /// Duplicate variable declaration.
    E201,

    /// Duplicate backend configuration.
    ///
    /// A module may declare at most one backend.
    E202,

    /// Wrong number of block labels.
    E203,

    // =========================================================================
    // Evaluation Errors (E3xx)
    // =========================================================================
    /// Unsupported or malformed constant expression.
    E301,

    /// Unexpected value type.
    E302,

    // =========================================================================
    // I/O Errors (E4xx)
    // =========================================================================
    /// File could not be read.
    E400,

    /// File is not valid UTF-8.
    ///
    /// The file is left out of the migration so that none of its bytes are
    /// rewritten.
    E401,

    // =========================================================================
    // Pipeline Errors (E5xx)
    // =========================================================================
    /// Two steps proposed different renames for the same file.
    E500,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E500 => "E500",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "unterminated comment",
            ErrorCode::E004 => "unterminated heredoc",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E200 => "not a configuration directory",
            ErrorCode::E201 => "duplicate variable",
            ErrorCode::E202 => "duplicate backend",
            ErrorCode::E203 => "wrong number of labels",
            ErrorCode::E301 => "unsupported expression",
            ErrorCode::E302 => "unexpected value type",
            ErrorCode::E400 => "file read error",
            ErrorCode::E401 => "invalid file encoding",
            ErrorCode::E500 => "rename conflict",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
