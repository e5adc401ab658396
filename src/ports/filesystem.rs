//! Filesystem port for file I/O operations.

use std::path::Path;

/// Provides filesystem access for the task graph, its lock marker, and
/// artifact existence checks.
///
/// Abstracting the filesystem allows testing the store and validators
/// without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Replaces the file's contents, creating parent directories as needed.
    ///
    /// Readers must never observe a partially written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Atomically creates `path` with `contents` only if it does not exist yet.
    ///
    /// Returns `Ok(false)` when the file already exists.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the file already existing.
    fn create_new(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Removes a file. Removing a file that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn remove(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}
