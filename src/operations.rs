//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that templates and file resources
//! can be unit-tested without touching the real filesystem.  Production code
//! uses [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.

use std::path::Path;

/// Abstraction over the filesystem calls made by templates and providers.
///
/// Implement this trait to swap in a mock during unit tests.  The production
/// implementation is [`SystemFileSystemOps`].
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole file at `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or not UTF-8.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Write `content` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or the file cannot
    /// be written.
    fn write(&self, path: &Path, content: &str) -> std::io::Result<()>;

    /// Remove the file or empty directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        }
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// Files live in an in-memory table.  Every read is recorded so tests can
/// assert which paths a template lookup touched.
///
/// # Example
///
/// ```ignore
/// use marionette::operations::MockFileSystemOps;
///
/// let fs = MockFileSystemOps::new()
///     .with_file("my/templates/motd.erb", "hello <%= user %>");
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, String>>,
    reads: std::sync::Mutex<Vec<std::path::PathBuf>>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file at `path` holding `content`.
    #[must_use]
    pub fn with_file(self, path: impl Into<std::path::PathBuf>, content: &str) -> Self {
        self.lock_files().insert(path.into(), content.to_string());
        self
    }

    /// Current content of `path`, if the mock holds it.
    #[must_use]
    pub fn content(&self, path: &Path) -> Option<String> {
        self.lock_files().get(path).cloned()
    }

    /// Paths passed to [`FileSystemOps::read_to_string`], in call order.
    #[must_use]
    pub fn reads(&self) -> Vec<std::path::PathBuf> {
        self.reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_files(
        &self,
    ) -> std::sync::MutexGuard<'_, std::collections::HashMap<std::path::PathBuf, String>> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.lock_files().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_path_buf());
        self.lock_files()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        self.lock_files()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        self.lock_files()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}
