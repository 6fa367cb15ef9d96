//! Run-scoped cache of loaded documents.
//!
//! Every step of a migration edits documents through the same
//! [`DocumentStore`], so two steps touching one file see each other's edits
//! and the final change set holds exactly one document per path.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, trace};

use tfmigrate_hcl::{
    Document, SourceRange,
    error::{Diagnostic, Diagnostics, ErrorCode},
    parse,
};

use crate::fs::FileSystem;

/// A document shared between the store, the steps and the change set.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Path-keyed cache of documents for one migration run.
pub struct DocumentStore<'fs> {
    fs: &'fs dyn FileSystem,
    documents: RefCell<HashMap<PathBuf, SharedDocument>>,
    rejected: RefCell<HashSet<PathBuf>>,
}

impl<'fs> DocumentStore<'fs> {
    pub fn new(fs: &'fs dyn FileSystem) -> Self {
        Self {
            fs,
            documents: RefCell::new(HashMap::new()),
            rejected: RefCell::new(HashSet::new()),
        }
    }

    /// Returns the document for `path`, loading it on first use.
    ///
    /// A missing file yields an empty document that will be created when
    /// written. Any other read failure yields `None` and an error diagnostic,
    /// and the path is not cached so a later request tries again.
    ///
    /// A file that is not valid UTF-8 is never loaded, so it can never be
    /// rewritten. It is reported on the first request only.
    pub fn get(&self, path: &Path) -> (Option<SharedDocument>, Diagnostics) {
        if let Some(doc) = self.documents.borrow().get(path) {
            trace!(path = path.display().to_string(); "Document cache hit");
            return (Some(Rc::clone(doc)), Diagnostics::new());
        }
        if self.rejected.borrow().contains(path) {
            return (None, Diagnostics::new());
        }

        let (doc, diagnostics) = match self.fs.read(path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(src) => parse(&src, path),
                Err(err) => {
                    self.rejected.borrow_mut().insert(path.to_path_buf());
                    return (None, encoding_error(path, &err).into());
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = path.display().to_string(); "Creating new document");
                (Document::new_empty(path), Diagnostics::new())
            }
            Err(err) => return (None, read_error(path, &err).into()),
        };

        let doc = Rc::new(RefCell::new(doc));
        self.documents
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&doc));
        (Some(doc), diagnostics)
    }

    /// Returns `true` if the document has been loaded.
    pub fn contains(&self, path: &Path) -> bool {
        self.documents.borrow().contains_key(path)
    }

    /// The file system backing this store.
    pub fn fs(&self) -> &'fs dyn FileSystem {
        self.fs
    }
}

/// Diagnostic for a file that exists but could not be read.
pub(crate) fn read_error(path: &Path, err: &io::Error) -> Diagnostic {
    Diagnostic::error("file read error")
        .with_code(ErrorCode::E400)
        .with_detail(format!(
            "file {} could not be read: {err}",
            path.display()
        ))
}

fn encoding_error(path: &Path, err: &std::string::FromUtf8Error) -> Diagnostic {
    Diagnostic::error("Invalid UTF-8")
        .with_code(ErrorCode::E401)
        .with_detail(format!(
            "file {} is not valid UTF-8 (invalid byte at offset {}), it will not be migrated",
            path.display(),
            err.utf8_error().valid_up_to()
        ))
        .with_subject(SourceRange::file(path))
}
