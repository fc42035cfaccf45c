//! Storage traits and error types
//!
//! This module defines the trait interface the crawler writes mirrored content through, and the
//! associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Directories are named by `/`-separated paths relative to the backend's root. The crawler only
/// ever calls these through a downloader's save operations.
pub trait Storage {
    /// Handle to a directory that exists
    type Directory;

    /// Handle to a file open for writing
    type File;

    /// Creates the directory (and its parents) if needed
    ///
    /// # Arguments
    ///
    /// * `path` - `/`-separated directory path relative to the root
    fn ensure_directory(&mut self, path: &str) -> StorageResult<Self::Directory>;

    /// Creates `name` inside `directory`, truncating an existing file
    fn create_or_replace_file(
        &mut self,
        directory: &Self::Directory,
        name: &str,
    ) -> StorageResult<Self::File>;

    /// Writes text (UTF-8) to the file
    fn write_text(&mut self, file: &mut Self::File, text: &str) -> StorageResult<()>;

    /// Writes raw bytes to the file
    fn write_bytes(&mut self, file: &mut Self::File, bytes: &[u8]) -> StorageResult<()>;
}

/// Rejects path segments that would leave the storage root
pub(crate) fn check_segment(segment: &str) -> StorageResult<()> {
    if segment == ".." || segment == "." || segment.contains('\\') {
        return Err(StorageError::InvalidPath(segment.to_string()));
    }
    Ok(())
}
