//! Shared state handed to every step.

use std::path::{Path, PathBuf};

use tfmigrate_hcl::error::Diagnostics;

use crate::{
    fs::FileSystem,
    module::ModuleView,
    store::{DocumentStore, SharedDocument},
};

/// A module being migrated: its view, its documents and the file system.
///
/// Steps read the [`ModuleView`] snapshot taken when the writer was created
/// and edit documents obtained through [`Writer::file`].
pub struct Writer<'fs> {
    module: ModuleView,
    store: DocumentStore<'fs>,
}

impl<'fs> Writer<'fs> {
    /// Load the module in `dir`.
    ///
    /// Returns `None` if `dir` is not a module directory.
    pub fn new(fs: &'fs dyn FileSystem, dir: &Path) -> (Option<Self>, Diagnostics) {
        let store = DocumentStore::new(fs);
        let (module, diagnostics) = ModuleView::load(&store, dir);
        (module.map(|module| Self { module, store }), diagnostics)
    }

    /// The documents of this run.
    ///
    /// Modules loaded through it share their documents with
    /// [`Writer::file`], and each file is parsed and reported once.
    pub fn store(&self) -> &DocumentStore<'fs> {
        &self.store
    }

    /// The module directory.
    pub fn dir(&self) -> &Path {
        self.module.dir()
    }

    /// The module as loaded when the writer was created.
    pub fn module(&self) -> &ModuleView {
        &self.module
    }

    pub fn fs(&self) -> &'fs dyn FileSystem {
        self.store.fs()
    }

    /// The shared document for `path`.
    pub fn file(&self, path: &Path) -> (Option<SharedDocument>, Diagnostics) {
        self.store.get(path)
    }

    /// Path of a file in the module directory.
    pub fn module_path(&self, filename: &str) -> PathBuf {
        self.dir().join(filename)
    }
}
