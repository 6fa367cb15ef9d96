//! Proposed file changes.
//!
//! Steps describe their edits as a [`ChangeSet`]: the documents they
//! modified, keyed by the file they were loaded from, with an optional new
//! filename. Nothing is written until [`ChangeSet::write_files`] is called.

use std::{
    collections::{BTreeMap, btree_map},
    io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::{fs::FileSystem, store::SharedDocument};

/// An edited document and where it should be written.
#[derive(Debug, Clone)]
pub struct Change {
    document: SharedDocument,
    rename: Option<String>,
}

impl Change {
    pub fn new(document: SharedDocument) -> Self {
        Self {
            document,
            rename: None,
        }
    }

    /// Write the document under `filename`, in the same directory, and
    /// remove the original file.
    pub fn with_rename(mut self, filename: impl Into<String>) -> Self {
        self.rename = Some(filename.into());
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// The new filename, if the file is renamed.
    pub fn rename(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// The path the document is written to.
    pub fn destination(&self, path: &Path) -> PathBuf {
        match &self.rename {
            Some(rename) => path.with_file_name(rename),
            None => path.to_path_buf(),
        }
    }

    /// The serialized document.
    pub fn bytes(&self) -> Vec<u8> {
        self.document.borrow().to_bytes()
    }
}

/// Two different renames were proposed for the same file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path} is already renamed to {existing}, cannot rename it to {proposed}")]
pub struct RenameCollision {
    pub path: String,
    pub existing: String,
    pub proposed: String,
}

/// Changes keyed by original path, sorted.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: BTreeMap<PathBuf, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A change set holding a single change.
    pub fn single(path: impl Into<PathBuf>, change: Change) -> Self {
        let mut changes = BTreeMap::new();
        changes.insert(path.into(), change);
        Self { changes }
    }

    /// Record an edited document without renaming its file.
    ///
    /// Unlike [`ChangeSet::add`] this cannot collide.
    pub fn update(&mut self, path: impl Into<PathBuf>, document: SharedDocument) {
        match self.changes.entry(path.into()) {
            btree_map::Entry::Occupied(mut entry) => entry.get_mut().document = document,
            btree_map::Entry::Vacant(entry) => {
                entry.insert(Change::new(document));
            }
        }
    }

    /// Merge a change for `path` into the set.
    ///
    /// The incoming document replaces the recorded one. An existing rename
    /// is kept; if the incoming change proposes a different one it is
    /// dropped and reported as a collision.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        change: Change,
    ) -> Result<(), RenameCollision> {
        let path = path.into();
        let Some(existing) = self.changes.get_mut(&path) else {
            self.changes.insert(path, change);
            return Ok(());
        };

        if let Some(proposed) = change.rename {
            match existing.rename.clone() {
                Some(current) if current != proposed => {
                    return Err(RenameCollision {
                        path: path.display().to_string(),
                        existing: current,
                        proposed,
                    });
                }
                Some(_) => {}
                None => existing.rename = Some(proposed),
            }
        }
        existing.document = change.document;
        Ok(())
    }

    /// Add every change of `other`, collecting collisions.
    pub fn merge(&mut self, other: ChangeSet) -> Vec<RenameCollision> {
        other
            .changes
            .into_iter()
            .filter_map(|(path, change)| self.add(path, change).err())
            .collect()
    }

    pub fn get(&self, path: &Path) -> Option<&Change> {
        self.changes.get(path)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, Change> {
        self.changes.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.changes.keys().map(PathBuf::as_path)
    }

    /// Drop changes that would leave the file system as it is.
    ///
    /// A change is kept if it renames its file or if the serialized document
    /// differs from the file's contents. A new file that would be empty is
    /// dropped.
    pub fn drop_unchanged(&mut self, fs: &dyn FileSystem) {
        self.changes.retain(|path, change| {
            if change.rename.is_some() {
                return true;
            }
            let bytes = change.bytes();
            let keep = match fs.read(path) {
                Ok(original) => original != bytes,
                Err(_) => !bytes.is_empty(),
            };
            if !keep {
                debug!(path = path.display().to_string(); "Dropping unchanged file");
            }
            keep
        });
    }

    /// Write every change to `fs`.
    ///
    /// Renamed files are written to their destination and the original is
    /// removed. Stops at the first I/O error.
    pub fn write_files(&self, fs: &dyn FileSystem) -> io::Result<()> {
        for (path, change) in &self.changes {
            let destination = change.destination(path);
            fs.write(&destination, &change.bytes())?;
            if destination != *path {
                fs.remove(path)?;
            }
            info!(
                path = path.display().to_string(),
                destination = destination.display().to_string();
                "Wrote file"
            );
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = (&'a PathBuf, &'a Change);
    type IntoIter = btree_map::Iter<'a, PathBuf, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
