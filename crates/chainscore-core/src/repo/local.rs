use super::RepoFiles;
use crate::error::{CheckError, Result};
use std::path::{Path, PathBuf};

/// A repository checked out on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalRepo {
    root: PathBuf,
    name: String,
}

impl LocalRepo {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        if !root.exists() {
            anyhow::bail!("Path '{}' does not exist", root.display());
        }
        if !root.is_dir() {
            anyhow::bail!("'{}' is not a directory", root.display());
        }
        let name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| root.display().to_string());
        Ok(Self {
            root: root.to_path_buf(),
            name,
        })
    }
}

impl RepoFiles for LocalRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        walk(&self.root, &self.root, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|source| CheckError::Io {
            path: path.to_string(),
            source,
        })
    }
}

fn walk(root: &Path, current: &Path, files: &mut Vec<String>) -> Result<()> {
    let entries = std::fs::read_dir(current).map_err(|source| CheckError::Io {
        path: current.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| CheckError::Io {
            path: current.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name();

        // Git internals are never repository content
        if name == ".git" {
            continue;
        }

        let file_type = entry.file_type().map_err(|source| CheckError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            files.push(parts.join("/"));
        }
    }

    Ok(())
}
