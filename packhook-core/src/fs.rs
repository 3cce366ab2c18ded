//! Filesystem seams used by build cores.
//!
//! Cores read sources through an [`InputFileSystem`] and write emitted
//! assets through an [`OutputFileSystem`]. Child compilers share the parent's
//! input filesystem and never get an output filesystem.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;

/// Read access to module sources.
pub trait InputFileSystem: Send + Sync {
    /// Read a whole file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Whether a regular file exists at `path`.
    fn is_file(&self, path: &Path) -> bool;
}

/// Write access for emitted assets.
pub trait OutputFileSystem: Send + Sync {
    /// Create a directory and all of its parents.
    fn mkdirp(&self, path: &Path) -> io::Result<()>;

    /// Write a whole file, replacing any previous content.
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl InputFileSystem for DiskFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

impl OutputFileSystem for DiskFileSystem {
    fn mkdirp(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }
}

/// An in-memory filesystem keyed by path.
///
/// Directories are implicit: `mkdirp` always succeeds.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// Remove a file, returning whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Read a file as UTF-8 text.
    pub fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files
            .read()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.read().keys().cloned().collect()
    }
}

impl InputFileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}

impl OutputFileSystem for MemoryFileSystem {
    fn mkdirp(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        self.insert(path, content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_roundtrip() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/dist/main.js"), b"1").unwrap();
        assert!(fs.is_file(Path::new("/dist/main.js")));
        assert_eq!(fs.read_file(Path::new("/dist/main.js")).unwrap(), b"1");
        assert_eq!(fs.paths(), vec![PathBuf::from("/dist/main.js")]);
    }

    #[test]
    fn test_memory_fs_missing_file() {
        let fs = MemoryFileSystem::new();
        let err = fs.read_file(Path::new("/nope.js")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!fs.remove(Path::new("/nope.js")));
    }

    #[test]
    fn test_disk_fs_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/main.js");
        DiskFileSystem.write_file(&path, b"ok").unwrap();
        assert!(DiskFileSystem.is_file(&path));
        assert_eq!(DiskFileSystem.read_file(&path).unwrap(), b"ok");
    }
}
