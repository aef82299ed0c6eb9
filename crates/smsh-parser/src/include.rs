//! Source loading for `!` file inclusion.
//!
//! The compiler never touches the filesystem directly; it asks a
//! [`SourceLoader`] to resolve a path to a canonical identity (used for
//! cycle detection) and to read it.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Extension every included file must carry; added when missing.
pub const SOURCE_EXTENSION: &str = "smsh";

/// Resolves and reads included sources.
pub trait SourceLoader {
    /// Canonical identity of `path`. Fails if the source does not exist.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf>;

    /// Read a path previously returned by [`SourceLoader::resolve`].
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Loads sources from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Serves sources from memory, keyed by lexically normalized path.
///
/// Used by the WebAssembly build and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), source.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let path = normalize(path);
        if self.files.contains_key(&path) {
            Ok(path)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        }
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}

/// Add the default extension to an include target, or reject a foreign one.
pub fn with_source_extension(target: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(target);
    match path.extension().and_then(|ext| ext.to_str()) {
        None => Ok(path.with_extension(SOURCE_EXTENSION)),
        Some(SOURCE_EXTENSION) => Ok(path),
        Some(other) => Err(format!(
            "Invalid file extension '.{other}' (expected .{SOURCE_EXTENSION})."
        )),
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
