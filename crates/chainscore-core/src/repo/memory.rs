use super::RepoFiles;
use crate::error::{CheckError, Result};
use std::collections::BTreeMap;

/// A repository held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepo {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl InMemoryRepo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn remove_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }
}

impl RepoFiles for InMemoryRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| CheckError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        })
    }
}
