//! File-system access used by the migration.
//!
//! Everything that touches the disk goes through the [`FileSystem`] trait so
//! the pipeline can run against an in-memory tree in tests.
//!
//! - [`OsFileSystem`] - the real file system, walked with `walkdir`.
//! - [`MemoryFileSystem`] - a sorted map of paths to contents.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

/// Byte-level access to configuration files and directories.
pub trait FileSystem {
    /// Read the full contents of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or overwrite a file.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove a file.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// The files directly inside `dir`, sorted by path.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// `root` and every directory below it in lexical walk order.
    ///
    /// Hidden directories and everything beneath them are skipped.
    fn walk_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(is_hidden)
}

/// The operating system's file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn walk_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_entry(e));
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
        Ok(dirs)
    }
}

/// An in-memory file system.
///
/// Directories exist implicitly as the ancestors of stored files.
///
/// # Example
///
/// ```
/// # use std::path::Path;
/// # use tfmigrate::fs::{FileSystem, MemoryFileSystem};
/// let fs = MemoryFileSystem::new();
/// fs.insert("app/main.tf", "locals {}\n");
///
/// assert_eq!(fs.read_dir(Path::new("app")).unwrap(), [Path::new("app/main.tf")]);
/// assert_eq!(fs.contents("app/main.tf").as_deref(), Some("locals {}\n"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a file system from `(path, contents)` pairs.
    pub fn with_files<P, C, I>(files: I) -> Self
    where
        P: Into<PathBuf>,
        C: Into<Vec<u8>>,
        I: IntoIterator<Item = (P, C)>,
    {
        let fs = Self::new();
        for (path, contents) in files {
            fs.insert(path, contents);
        }
        fs
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// The file's contents as UTF-8 text, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .borrow()
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.files.borrow().contains_key(path.as_ref())
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.insert(path, contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let files: Vec<PathBuf> = self
            .files
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect();
        if files.is_empty() && !self.walk_dirs(dir)?.contains(&dir.to_path_buf()) {
            return Err(not_found(dir));
        }
        Ok(files)
    }

    fn walk_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs = BTreeSet::new();
        for path in self.files.borrow().keys() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            dirs.insert(root.to_path_buf());

            let mut dir = root.to_path_buf();
            let mut components = relative.components().peekable();
            while let Some(component) = components.next() {
                // The last component is the file itself
                if components.peek().is_none() {
                    break;
                }
                let name = component.as_os_str().to_string_lossy();
                if is_hidden(&name) {
                    break;
                }
                dir.push(component);
                dirs.insert(dir.clone());
            }
        }
        if dirs.is_empty() {
            return Err(not_found(root));
        }
        Ok(dirs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            ("root/main.tf", "a = 1\n"),
            ("root/b/main.tf", "b = 1\n"),
            ("root/a/nested/main.tf", "c = 1\n"),
            ("root/.terraform/modules/x.tf", "d = 1\n"),
            ("other/main.tf", "e = 1\n"),
        ])
    }

    #[test]
    fn test_memory_read_write_remove() {
        let fs = sample();
        assert_eq!(fs.read(Path::new("root/main.tf")).unwrap(), b"a = 1\n");

        fs.write(Path::new("root/new.tf"), b"x").unwrap();
        assert!(fs.exists("root/new.tf"));

        fs.remove(Path::new("root/new.tf")).unwrap();
        assert!(!fs.exists("root/new.tf"));

        let err = fs.read(Path::new("root/missing.tf")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(fs.remove(Path::new("root/missing.tf")).is_err());
    }

    #[test]
    fn test_memory_read_dir() {
        let fs = sample();
        assert_eq!(
            fs.read_dir(Path::new("root")).unwrap(),
            [PathBuf::from("root/main.tf")]
        );
        // Directories that only hold subdirectories exist but are empty
        assert!(fs.read_dir(Path::new("root/a")).unwrap().is_empty());
        assert!(fs.read_dir(Path::new("missing")).is_err());
    }

    #[test]
    fn test_memory_walk_dirs() {
        let fs = sample();
        let dirs = fs.walk_dirs(Path::new("root")).unwrap();
        assert_eq!(
            dirs,
            [
                PathBuf::from("root"),
                PathBuf::from("root/a"),
                PathBuf::from("root/a/nested"),
                PathBuf::from("root/b"),
            ]
        );
    }

    #[test]
    fn test_os_file_system() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a/nested")).unwrap();
        fs::create_dir_all(root.join(".hidden/inner")).unwrap();

        let os = OsFileSystem;
        os.write(&root.join("main.tf"), b"a = 1\n").unwrap();
        os.write(&root.join("b/main.tf"), b"b = 1\n").unwrap();

        assert_eq!(os.read_dir(root).unwrap(), [root.join("main.tf")]);
        assert_eq!(
            os.walk_dirs(root).unwrap(),
            [
                root.to_path_buf(),
                root.join("a"),
                root.join("a/nested"),
                root.join("b"),
            ]
        );

        os.remove(&root.join("main.tf")).unwrap();
        assert!(os.read_dir(root).unwrap().is_empty());
    }
}
