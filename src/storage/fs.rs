use crate::storage::traits::{check_segment, Storage, StorageResult};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage backed by the local filesystem, rooted at the mirror's base directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Creates a storage rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    type Directory = PathBuf;
    type File = File;

    fn ensure_directory(&mut self, path: &str) -> StorageResult<PathBuf> {
        let mut directory = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            check_segment(segment)?;
            directory.push(segment);
        }
        std::fs::create_dir_all(&directory)?;
        Ok(directory)
    }

    fn create_or_replace_file(&mut self, directory: &PathBuf, name: &str) -> StorageResult<File> {
        check_segment(name)?;
        let path = directory.join(name);
        tracing::trace!("Writing {}", path.display());
        Ok(File::create(path)?)
    }

    fn write_text(&mut self, file: &mut File, text: &str) -> StorageResult<()> {
        self.write_bytes(file, text.as_bytes())
    }

    fn write_bytes(&mut self, file: &mut File, bytes: &[u8]) -> StorageResult<()> {
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use tempfile::TempDir;

    #[test]
    fn test_write_nested_file() {
        let dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(dir.path());

        let directory = storage.ensure_directory("x.com/a/b").unwrap();
        let mut file = storage
            .create_or_replace_file(&directory, "index.html")
            .unwrap();
        storage.write_text(&mut file, "<html></html>").unwrap();

        let written = std::fs::read_to_string(dir.path().join("x.com/a/b/index.html")).unwrap();
        assert_eq!(written, "<html></html>");
    }

    #[test]
    fn test_replace_truncates() {
        let dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(dir.path());
        let directory = storage.ensure_directory("x.com").unwrap();

        let mut file = storage.create_or_replace_file(&directory, "a.bin").unwrap();
        storage.write_bytes(&mut file, &[1, 2, 3, 4]).unwrap();
        let mut file = storage.create_or_replace_file(&directory, "a.bin").unwrap();
        storage.write_bytes(&mut file, &[9]).unwrap();

        assert_eq!(std::fs::read(dir.path().join("x.com/a.bin")).unwrap(), vec![9]);
    }

    #[test]
    fn test_parent_segments_rejected() {
        let dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(dir.path());
        assert!(matches!(
            storage.ensure_directory("x.com/../../etc"),
            Err(StorageError::InvalidPath(_))
        ));
    }
}
