use crate::storage::traits::{check_segment, Storage, StorageResult};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory storage, keyed by `/`-separated paths
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    directories: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes stored at `path`
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Returns the text stored at `path`, if it is valid UTF-8
    pub fn get_text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns every stored file path in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemoryStorage {
    type Directory = String;
    type File = String;

    fn ensure_directory(&mut self, path: &str) -> StorageResult<String> {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            check_segment(segment)?;
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.directories.insert(current.clone());
        }
        Ok(current)
    }

    fn create_or_replace_file(&mut self, directory: &String, name: &str) -> StorageResult<String> {
        check_segment(name)?;
        let path = if directory.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", directory, name)
        };
        self.files.insert(path.clone(), Vec::new());
        Ok(path)
    }

    fn write_text(&mut self, file: &mut String, text: &str) -> StorageResult<()> {
        self.write_bytes(file, text.as_bytes())
    }

    fn write_bytes(&mut self, file: &mut String, bytes: &[u8]) -> StorageResult<()> {
        self.files
            .entry(file.clone())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut storage = MemoryStorage::new();
        let dir = storage.ensure_directory("x.com/img").unwrap();
        let mut file = storage.create_or_replace_file(&dir, "a.png").unwrap();
        storage.write_bytes(&mut file, &[1, 2]).unwrap();
        storage.write_bytes(&mut file, &[3]).unwrap();

        assert_eq!(storage.get("x.com/img/a.png"), Some(&[1u8, 2, 3][..]));
        assert!(storage.has_directory("x.com"));
        assert!(storage.has_directory("x.com/img"));
    }

    #[test]
    fn test_replace_clears_content() {
        let mut storage = MemoryStorage::new();
        let dir = storage.ensure_directory("x.com").unwrap();
        let mut file = storage.create_or_replace_file(&dir, "index.html").unwrap();
        storage.write_text(&mut file, "old").unwrap();
        let mut file = storage.create_or_replace_file(&dir, "index.html").unwrap();
        storage.write_text(&mut file, "new").unwrap();

        assert_eq!(storage.get_text("x.com/index.html"), Some("new"));
        assert_eq!(storage.len(), 1);
    }
}
