//! Read-only semantic view of a module directory.
//!
//! A [`ModuleView`] is computed from the documents of every configuration
//! file in a directory, loaded through the run's [`DocumentStore`], by
//! collecting the declarations the migration cares about:
//! variables, the backend and data resources. It is a snapshot; edits made
//! to documents afterwards are not reflected until the view is loaded again.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;

use tfmigrate_hcl::{
    Block, Body, Expression, SourceRange,
    error::{Diagnostic, Diagnostics, ErrorCode},
};

use crate::{fs::FileSystem, store::DocumentStore};

/// Block type of remote state data sources.
pub const REMOTE_STATE_DATA_TYPE: &str = "terraform_remote_state";

/// A declared input variable.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    range: SourceRange,
    type_expr: Option<Expression>,
    default: Option<Expression>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the variable is declared.
    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    /// The `type` constraint, if any.
    pub fn type_expr(&self) -> Option<&Expression> {
        self.type_expr.as_ref()
    }

    /// The `default` value, if any.
    pub fn default(&self) -> Option<&Expression> {
        self.default.as_ref()
    }
}

/// The module's state backend configuration.
#[derive(Debug, Clone)]
pub struct Backend {
    kind: String,
    range: SourceRange,
    config: IndexMap<String, Expression>,
}

impl Backend {
    /// The backend type, such as `s3` or `remote`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    /// The file declaring the backend.
    pub fn filename(&self) -> &Path {
        self.range.filename()
    }

    /// The backend's attributes in declaration order.
    ///
    /// Nested blocks such as `workspaces` are not included.
    pub fn config(&self) -> &IndexMap<String, Expression> {
        &self.config
    }
}

/// A `data` block.
#[derive(Debug, Clone)]
pub struct DataResource {
    kind: String,
    name: String,
    range: SourceRange,
    attributes: IndexMap<String, Expression>,
}

impl DataResource {
    /// The data source type, the block's first label.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    pub fn filename(&self) -> &Path {
        self.range.filename()
    }

    pub fn attribute(&self, name: &str) -> Option<&Expression> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &IndexMap<String, Expression> {
        &self.attributes
    }
}

/// Declarations of one module directory.
#[derive(Debug, Clone)]
pub struct ModuleView {
    dir: PathBuf,
    files: Vec<PathBuf>,
    backend: Option<Backend>,
    variables: IndexMap<String, Variable>,
    data_resources: Vec<DataResource>,
}

impl ModuleView {
    /// Load and validate every configuration file in `dir`.
    ///
    /// Documents come from `store`, so a file is parsed once per run and
    /// its parse diagnostics are reported by whichever caller loads it
    /// first. Returns `None` only when `dir` is not a configuration
    /// directory. Parse and validation errors are reported through the
    /// diagnostics and still produce a view of whatever could be read.
    pub fn load(store: &DocumentStore<'_>, dir: &Path) -> (Option<ModuleView>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        let files = config_files(store.fs(), dir);
        if files.is_empty() {
            diagnostics.emit(
                Diagnostic::error("Not a module directory")
                    .with_code(ErrorCode::E200)
                    .with_detail(format!(
                        "Directory {} does not contain Terraform configuration files.",
                        dir.display()
                    ))
                    .with_subject(SourceRange::file(dir)),
            );
            return (None, diagnostics);
        }

        let mut module = ModuleView {
            dir: dir.to_path_buf(),
            files: files.clone(),
            backend: None,
            variables: IndexMap::new(),
            data_resources: Vec::new(),
        };

        for path in &files {
            let (doc, file_diagnostics) = store.get(path);
            diagnostics.append(file_diagnostics);
            if let Some(doc) = doc {
                module.collect(path, doc.borrow().body(), &mut diagnostics);
            }
        }

        debug!(
            dir = dir.display().to_string(),
            files = module.files.len(),
            variables = module.variables.len(),
            backend = module.backend.as_ref().map(|b| b.kind.clone());
            "Loaded module"
        );

        (Some(module), diagnostics)
    }

    fn collect(&mut self, path: &Path, body: &Body, diagnostics: &mut Diagnostics) {
        for block in body.blocks() {
            if !has_valid_labels(path, block, diagnostics) {
                continue;
            }
            let range = SourceRange::new(path, block.span());
            let labels = block.labels();

            match block.kind() {
                "variable" => {
                    let name = labels[0].clone();
                    if let Some(previous) = self.variables.get(&name) {
                        diagnostics.emit(
                            Diagnostic::error("Duplicate variable declaration")
                                .with_code(ErrorCode::E201)
                                .with_detail(format!(
                                    "A variable named {name:?} was already declared at {}. Variable names must be unique within a module.",
                                    previous.range
                                ))
                                .with_subject(SourceRange::new(path, block.header_span())),
                        );
                        continue;
                    }
                    let body = block.body();
                    self.variables.insert(
                        name.clone(),
                        Variable {
                            name,
                            range,
                            type_expr: body.attribute("type").map(|a| a.expr().clone()),
                            default: body.attribute("default").map(|a| a.expr().clone()),
                        },
                    );
                }
                "terraform" => {
                    for backend in block.body().blocks().filter(|b| b.kind() == "backend") {
                        self.collect_backend(path, backend, diagnostics);
                    }
                }
                "data" => self.data_resources.push(DataResource {
                    kind: labels[0].clone(),
                    name: labels[1].clone(),
                    range,
                    attributes: attributes_of(block.body()),
                }),
                _ => {}
            }
        }
    }

    fn collect_backend(&mut self, path: &Path, block: &Block, diagnostics: &mut Diagnostics) {
        if !has_valid_labels(path, block, diagnostics) {
            return;
        }
        if let Some(previous) = &self.backend {
            diagnostics.emit(
                Diagnostic::error("Duplicate backend configuration")
                    .with_code(ErrorCode::E202)
                    .with_detail(format!(
                        "A module may have only one backend configuration. The backend was previously configured at {}.",
                        previous.range
                    ))
                    .with_subject(SourceRange::new(path, block.header_span())),
            );
            return;
        }
        self.backend = Some(Backend {
            kind: block.labels()[0].clone(),
            range: SourceRange::new(path, block.span()),
            config: attributes_of(block.body()),
        });
    }

    /// The module directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configuration files of the module, sorted.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Declared variables in declaration order.
    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    /// All `data` blocks in declaration order.
    pub fn data_resources(&self) -> &[DataResource] {
        &self.data_resources
    }

    /// The `data "terraform_remote_state"` blocks in declaration order.
    pub fn remote_state_data_blocks(&self) -> impl Iterator<Item = &DataResource> {
        self.data_resources
            .iter()
            .filter(|data| data.kind == REMOTE_STATE_DATA_TYPE)
    }
}

fn attributes_of(body: &Body) -> IndexMap<String, Expression> {
    body.attributes()
        .map(|a| (a.name().to_string(), a.expr().clone()))
        .collect()
}

/// Number of labels a block type requires, for the types with a fixed count.
fn expected_labels(kind: &str) -> Option<usize> {
    match kind {
        "terraform" | "locals" => Some(0),
        "variable" | "output" | "module" | "provider" | "backend" => Some(1),
        "resource" | "data" => Some(2),
        _ => None,
    }
}

fn has_valid_labels(path: &Path, block: &Block, diagnostics: &mut Diagnostics) -> bool {
    let Some(expected) = expected_labels(block.kind()) else {
        return true;
    };
    let found = block.labels().len();
    if found == expected {
        return true;
    }
    diagnostics.emit(
        Diagnostic::error("Wrong number of block labels")
            .with_code(ErrorCode::E203)
            .with_detail(format!(
                "A {:?} block requires {expected} label(s), found {found}.",
                block.kind()
            ))
            .with_subject(SourceRange::new(path, block.header_span())),
    );
    false
}

/// Returns `true` if `name` is a configuration file name.
///
/// Hidden files, editor backups and JSON configuration are ignored.
pub fn is_config_file(name: &str) -> bool {
    !name.starts_with('.')
        && !name.starts_with('#')
        && !name.ends_with('~')
        && name.ends_with(".tf")
}

/// The configuration files directly inside `dir`, sorted.
///
/// An unreadable directory has no configuration files.
pub fn config_files(fs: &dyn FileSystem, dir: &Path) -> Vec<PathBuf> {
    fs.read_dir(dir)
        .unwrap_or_default()
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_config_file)
        })
        .collect()
}

/// Returns `true` if `dir` holds at least one configuration file.
pub fn is_config_dir(fs: &dyn FileSystem, dir: &Path) -> bool {
    !config_files(fs, dir).is_empty()
}
