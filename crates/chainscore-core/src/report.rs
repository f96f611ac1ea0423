use crate::result::CheckResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Results of every check run against one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub repo: String,
    pub date: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
}

impl ScanReport {
    pub fn new(repo: impl Into<String>, checks: Vec<CheckResult>) -> Self {
        Self {
            repo: repo.into(),
            date: Utc::now(),
            checks,
        }
    }

    /// Lowest score among checks that reached a result.
    pub fn lowest_score(&self) -> Option<i32> {
        self.checks
            .iter()
            .filter(|c| !c.is_runtime_error())
            .map(|c| c.score)
            .min()
    }

    pub fn has_runtime_errors(&self) -> bool {
        self.checks.iter().any(CheckResult::is_runtime_error)
    }

    /// Checks scoring below `threshold`, runtime errors excluded.
    pub fn below(&self, threshold: i32) -> impl Iterator<Item = &CheckResult> {
        self.checks
            .iter()
            .filter(move |c| !c.is_runtime_error() && c.score < threshold)
    }
}
