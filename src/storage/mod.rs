//! Storage module for persisting mirrored content
//!
//! This module handles writing what the crawler fetches:
//! - The [`Storage`] trait the crawler writes through
//! - [`FsStorage`], a local directory tree under the mirror's base directory
//! - [`MemoryStorage`], an in-memory tree for tests and embedders

mod fs;
mod memory;
mod traits;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::url::FilePath;

/// Writes text to the file a URL maps to
///
/// # Arguments
///
/// * `storage` - The storage backend
/// * `location` - Directory and file name derived from the URL
/// * `text` - Content to write
pub fn save_text<S: Storage>(storage: &mut S, location: &FilePath, text: &str) -> StorageResult<()> {
    let directory = storage.ensure_directory(&location.directory)?;
    let mut file = storage.create_or_replace_file(&directory, &location.file_name)?;
    storage.write_text(&mut file, text)
}

/// Writes bytes to the file a URL maps to
pub fn save_bytes<S: Storage>(
    storage: &mut S,
    location: &FilePath,
    bytes: &[u8],
) -> StorageResult<()> {
    let directory = storage.ensure_directory(&location.directory)?;
    let mut file = storage.create_or_replace_file(&directory, &location.file_name)?;
    storage.write_bytes(&mut file, bytes)
}
