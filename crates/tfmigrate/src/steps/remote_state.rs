//! Point remote state data sources at the migrated state.
//!
//! Other modules may read the migrated module's state through
//! `data "terraform_remote_state"` blocks. Every module under a directory is
//! scanned, the `backend` and `config` arguments of those blocks are
//! evaluated, and the blocks whose settings match the module's current
//! backend are rewritten to read from the remote backend instead.

use std::path::{Path, PathBuf};

use log::{debug, info};

use tfmigrate_core::{
    backend::{BACKEND_TYPE_REMOTE, RemoteBackendConfig, WorkspaceConfig},
    value::Value,
};
use tfmigrate_hcl::{
    Expression, SourceRange, Token, TokenKind, Tokens,
    error::{Diagnostic, Diagnostics, ErrorCode},
    eval::{EvalError, evaluate},
    tokens::escape_quoted,
};

use crate::{
    changes::ChangeSet,
    correlate::{StateLocation, correlates},
    module::{DataResource, ModuleView, REMOTE_STATE_DATA_TYPE, is_config_dir},
    steps::Step,
    store::{DocumentStore, read_error},
    writer::Writer,
};

/// Workspace assumed when a data source does not set one.
const DEFAULT_WORKSPACE: &str = "default";

/// A remote state data source that reads the migrated module's state.
struct Source {
    path: PathBuf,
    name: String,
    workspace: Option<Expression>,
}

/// Rewrites matching `terraform_remote_state` data sources under a
/// directory.
pub struct RemoteState {
    config: RemoteBackendConfig,
    path: PathBuf,
}

impl RemoteState {
    /// `path` is the directory holding the modules to scan.
    pub fn new(config: RemoteBackendConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the data sources reading the module's state.
    ///
    /// The other modules are loaded through `store`.
    fn sources(
        &self,
        writer: &Writer<'_>,
        store: &DocumentStore<'_>,
    ) -> (Vec<Source>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut sources = Vec::new();

        let Some(backend) = writer.module().backend() else {
            debug!(dir = writer.dir().display().to_string(); "Module has no backend, skipping remote state");
            return (sources, diagnostics);
        };
        let primary = StateLocation::from_backend(backend);

        let dirs = match writer.fs().walk_dirs(&self.path) {
            Ok(dirs) => dirs,
            Err(err) => {
                diagnostics.emit(read_error(&self.path, &err));
                return (sources, diagnostics);
            }
        };

        for dir in dirs {
            if !is_config_dir(writer.fs(), &dir) {
                continue;
            }
            let (module, module_diagnostics) = ModuleView::load(store, &dir);
            diagnostics.append(module_diagnostics);
            let Some(module) = module else {
                continue;
            };

            for data in module.remote_state_data_blocks() {
                let Some(data_backend) = self.evaluate_string(data, "backend", &mut diagnostics)
                else {
                    continue;
                };
                let Some(config) = self.evaluate_config(data, &mut diagnostics) else {
                    continue;
                };

                if correlates(backend, &primary, &data_backend, &config) {
                    debug!(
                        path = data.filename().display().to_string(),
                        name = data.name();
                        "Found remote state data source"
                    );
                    sources.push(Source {
                        path: data.filename().to_path_buf(),
                        name: data.name().to_string(),
                        workspace: data.attribute("workspace").cloned(),
                    });
                }
            }
        }

        (sources, diagnostics)
    }

    /// Evaluate an attribute of a data source.
    ///
    /// Missing and non-constant attributes yield `None` without a
    /// diagnostic; other failures add a warning.
    fn evaluate(
        &self,
        data: &DataResource,
        attribute: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Value> {
        let Some(expr) = data.attribute(attribute) else {
            debug!(name = data.name(), attribute = attribute; "Remote state attribute missing");
            return None;
        };
        match evaluate(expr, data.filename()) {
            Ok(value) => Some(value),
            Err(EvalError::NonConstant) => {
                debug!(name = data.name(), attribute = attribute; "Remote state attribute is not constant");
                None
            }
            Err(EvalError::Invalid(error)) => {
                let mut warning = skipped(data, attribute)
                    .with_code(error.code().unwrap_or(ErrorCode::E301))
                    .with_detail(format!(
                        "The {attribute:?} argument of data source {:?} could not be evaluated: {}",
                        data.name(),
                        error.detail().unwrap_or(error.summary())
                    ));
                if let Some(subject) = error.subject() {
                    warning = warning.with_subject(subject.clone());
                }
                diagnostics.emit(warning);
                None
            }
        }
    }

    fn evaluate_string(
        &self,
        data: &DataResource,
        attribute: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let value = self.evaluate(data, attribute, diagnostics)?;
        match value {
            Value::String(s) => Some(s),
            other => {
                diagnostics.emit(unexpected_type(data, attribute, "string", &other));
                None
            }
        }
    }

    fn evaluate_config(
        &self,
        data: &DataResource,
        diagnostics: &mut Diagnostics,
    ) -> Option<StateLocation> {
        let value = self.evaluate(data, "config", diagnostics)?;
        match value.as_object() {
            Some(object) => Some(StateLocation::from_object(object)),
            None => {
                diagnostics.emit(unexpected_type(data, "config", "object", &value));
                None
            }
        }
    }

    /// The `config` object pointing at the remote backend.
    fn config_tokens(&self, workspace: Option<&Expression>) -> Tokens {
        let mut workspaces = Tokens::new();
        workspaces.open_brace();
        workspaces.key_value("name", self.workspace_name(workspace));
        workspaces.close_brace();

        let mut tokens = Tokens::new();
        tokens.open_brace();
        tokens.key_value("hostname", Tokens::quoted(self.config.hostname()));
        tokens.key_value("organization", Tokens::quoted(self.config.organization()));
        tokens.newline();
        tokens.key_value("workspaces", workspaces);
        tokens.close_brace();
        tokens
    }

    /// The workspace name a data source reads.
    ///
    /// With a single workspace this is its name. With a prefix the name is
    /// the prefix followed by the data source's workspace, which is inlined
    /// when constant and interpolated otherwise.
    fn workspace_name(&self, workspace: Option<&Expression>) -> Tokens {
        let prefix = match self.config.workspaces() {
            WorkspaceConfig::Name(name) => return Tokens::quoted(name),
            WorkspaceConfig::Prefix(prefix) => prefix,
        };
        let Some(workspace) = workspace else {
            return Tokens::quoted(&format!("{prefix}{DEFAULT_WORKSPACE}"));
        };

        if let Ok(value) = evaluate(workspace, Path::new("")) {
            if let Some(value) = value.to_primitive_string() {
                return Tokens::quoted(&format!("{prefix}{value}"));
            }
        }

        let mut tokens = Tokens::new();
        tokens.push(Token::new(TokenKind::OQuote, "\""));
        if !prefix.is_empty() {
            tokens.push(Token::new(TokenKind::QuotedLit, escape_quoted(prefix)));
        }
        match template_parts(workspace) {
            Some(parts) => tokens.extend(parts),
            None => {
                tokens.push(Token::new(TokenKind::TemplateInterp, "${"));
                tokens.extend(workspace.to_tokens());
                tokens.push(Token::new(TokenKind::TemplateSeqEnd, "}"));
            }
        }
        tokens.push(Token::new(TokenKind::CQuote, "\""));
        tokens
    }
}

/// The tokens between the quotes of an expression that is a single quoted
/// template, such as `"${var.env}"`.
fn template_parts(expr: &Expression) -> Option<Vec<Token>> {
    let tokens = expr.to_tokens().into_vec();
    let (first, rest) = tokens.split_first()?;
    let (last, inner) = rest.split_last()?;
    if first.kind() != TokenKind::OQuote || last.kind() != TokenKind::CQuote {
        return None;
    }

    // Nested quotes must close before the end
    let mut depth = 0usize;
    for token in inner {
        match token.kind() {
            TokenKind::OQuote => depth += 1,
            TokenKind::CQuote if depth == 0 => return None,
            TokenKind::CQuote => depth -= 1,
            _ => {}
        }
    }
    Some(inner.to_vec())
}

fn skipped(data: &DataResource, attribute: &str) -> Diagnostic {
    Diagnostic::warning("Remote state data source skipped").with_subject(
        data.attribute(attribute)
            .and_then(Expression::span)
            .map_or_else(
                || data.range().clone(),
                |span| SourceRange::new(data.filename(), span),
            ),
    )
}

fn unexpected_type(data: &DataResource, attribute: &str, expected: &str, found: &Value) -> Diagnostic {
    skipped(data, attribute)
        .with_code(ErrorCode::E302)
        .with_detail(format!(
            "The {attribute:?} argument of data source {:?} must be a {expected}, found a {}.",
            data.name(),
            found.type_name()
        ))
}

impl Step for RemoteState {
    fn name(&self) -> &str {
        "Remote State"
    }

    fn description(&self) -> &str {
        "Remote state data sources reading this module's state should use the \"remote\" backend (https://www.terraform.io/docs/backends/types/remote.html)"
    }

    fn complete(&self, writer: &Writer<'_>) -> bool {
        // Parse errors of the other modules are reported by `changes`
        let scratch = DocumentStore::new(writer.fs());
        let (sources, _) = self.sources(writer, &scratch);
        sources.is_empty()
    }

    fn changes(&self, writer: &Writer<'_>) -> (ChangeSet, Diagnostics) {
        let mut changes = ChangeSet::new();
        let (sources, mut diagnostics) = self.sources(writer, writer.store());

        for source in sources {
            let (doc, file_diagnostics) = writer.file(&source.path);
            diagnostics.append(file_diagnostics);
            let Some(doc) = doc else {
                continue;
            };

            {
                let mut doc = doc.borrow_mut();
                let labels = [REMOTE_STATE_DATA_TYPE, source.name.as_str()];
                let Some(block) = doc.body_mut().first_matching_block_mut("data", &labels) else {
                    continue;
                };
                let body = block.body_mut();
                body.remove_attribute("workspace");
                body.set_attribute_value("backend", &Value::string(BACKEND_TYPE_REMOTE));
                body.set_attribute_raw("config", self.config_tokens(source.workspace.as_ref()));
            }

            info!(
                path = source.path.display().to_string(),
                name = source.name.as_str();
                "Rewrote remote state data source"
            );
            changes.update(source.path, doc);
        }

        (changes, diagnostics)
    }
}
