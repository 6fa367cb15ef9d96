//! # tfmigrate HCL
//!
//! Lossless reading and editing of Terraform configuration files.
//!
//! A file is parsed into a [`Document`] that keeps every byte of the source:
//! whitespace, comments and formatting survive a parse/serialize round trip
//! unchanged. Editing operations on [`Body`] insert, replace and remove
//! attributes and blocks; only the content they create is laid out with
//! canonical indentation and alignment.
//!
//! ## Usage
//!
//! ```
//! # use tfmigrate_hcl::parse;
//! let src = "locals {\n  # the environment\n  env = terraform.workspace\n}\n";
//! let (mut doc, diagnostics) = parse(src, "locals.tf");
//! assert!(!diagnostics.has_errors());
//!
//! let locals = doc.body_mut().first_matching_block_mut("locals", &[]).unwrap();
//! let env = locals.body_mut().attribute_mut("env").unwrap();
//! env.expr_mut()
//!     .rename_traversal_prefix(&["terraform", "workspace"], &["var", "environment"]);
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "locals {\n  # the environment\n  env = var.environment\n}\n"
//! );
//! ```

mod document;
pub mod error;
pub mod eval;
pub mod expression;
mod format;
pub mod lexer;
mod parser;
mod span;
pub mod tokens;

pub use document::{Attribute, Block, Body, Document, Item, Label};
pub use expression::{Expression, Traversal};
pub use parser::parse;
pub use span::{SourceRange, Span};
pub use tokens::{Token, TokenKind, Tokens};
