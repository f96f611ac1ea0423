pub mod checks;
pub mod config;
pub mod error;
pub mod logger;
pub mod parser;
pub mod repo;
pub mod report;
pub mod result;
pub mod shell;

pub use checks::{registry, run_checks, CHECK_PINNED_DEPENDENCIES, CHECK_TOKEN_PERMISSIONS};
pub use config::Config;
pub use error::CheckError;
pub use logger::{Detail, DetailLevel, DetailLogger};
pub use repo::{CheckRequest, InMemoryRepo, LocalRepo, RepoFiles};
pub use report::ScanReport;
pub use result::{CheckResult, SubScore};
pub use shell::{DownloadDetector, ShellDownloadDetector};
