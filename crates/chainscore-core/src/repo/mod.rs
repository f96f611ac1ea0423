pub mod iteration;
pub mod local;
pub mod memory;

pub use iteration::{check_files_content, check_if_file_exists, file_contains_commands};
pub use local::LocalRepo;
pub use memory::InMemoryRepo;

use crate::config::Config;
use crate::error::Result;
use crate::shell::{DownloadDetector, ShellDownloadDetector};

/// Read access to the files of a repository.
pub trait RepoFiles {
    /// Human-readable name used in reports.
    fn name(&self) -> &str;

    /// All file paths, relative to the repository root, `/`-separated.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Content of one file from `list_files`.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
}

/// Everything a check needs to run against one repository.
pub struct CheckRequest<'a> {
    pub repo: &'a dyn RepoFiles,
    pub config: &'a Config,
    pub detector: &'a dyn DownloadDetector,
}

impl<'a> CheckRequest<'a> {
    pub fn new(repo: &'a dyn RepoFiles, config: &'a Config) -> Self {
        Self {
            repo,
            config,
            detector: &ShellDownloadDetector,
        }
    }

    pub fn with_detector(mut self, detector: &'a dyn DownloadDetector) -> Self {
        self.detector = detector;
        self
    }
}
