use super::pinning::{actions, docker_image, downloads, lockfile};
use super::CHECK_PINNED_DEPENDENCIES;
use crate::error::Result;
use crate::logger::DetailLogger;
use crate::repo::CheckRequest;
use crate::result::{aggregate_scores, CheckResult, SubScore, MAX_RESULT_SCORE};

/// Outcome of each Pinned-Dependencies sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinningScores {
    pub lock_files: SubScore,
    pub actions: SubScore,
    pub docker_images: SubScore,
    pub dockerfile_downloads: SubScore,
    pub shell_downloads: SubScore,
    pub workflow_downloads: SubScore,
}

impl PinningScores {
    /// Run every sub-check in order. The first error aborts the rest.
    pub fn collect(req: &CheckRequest<'_>, dl: &mut DetailLogger) -> Result<Self> {
        Ok(Self {
            lock_files: lockfile::is_package_manager_lock_file_present(req, dl)?,
            actions: actions::is_github_actions_workflow_pinned(req, dl)?,
            docker_images: docker_image::is_dockerfile_pinned(req, dl)?,
            dockerfile_downloads: downloads::is_dockerfile_free_of_insecure_downloads(req, dl)?,
            shell_downloads: downloads::is_shell_script_free_of_insecure_downloads(req, dl)?,
            workflow_downloads: downloads::is_github_workflow_free_of_insecure_downloads(req, dl)?,
        })
    }

    pub fn as_array(&self) -> [SubScore; 6] {
        [
            self.lock_files,
            self.actions,
            self.docker_images,
            self.dockerfile_downloads,
            self.shell_downloads,
            self.workflow_downloads,
        ]
    }

    /// Inconclusive sub-scores count as the minimum.
    pub fn aggregate(&self) -> i32 {
        let scores: Vec<i32> = self.as_array().iter().map(SubScore::floored).collect();
        aggregate_scores(&scores)
    }
}

/// Runs the Pinned-Dependencies check.
pub fn pinned_dependencies(req: &CheckRequest<'_>) -> CheckResult {
    let mut dl = DetailLogger::new(CHECK_PINNED_DEPENDENCIES);
    let result = match PinningScores::collect(req, &mut dl) {
        Ok(scores) => create_result(&scores),
        Err(e) => CheckResult::runtime_error(CHECK_PINNED_DEPENDENCIES, &e),
    };
    result.with_details(dl.flush())
}

fn create_result(scores: &PinningScores) -> CheckResult {
    let score = scores.aggregate();
    if score == MAX_RESULT_SCORE {
        return CheckResult::max_score(CHECK_PINNED_DEPENDENCIES, "all dependencies are pinned");
    }
    CheckResult::proportional(
        CHECK_PINNED_DEPENDENCIES,
        "unpinned dependencies detected",
        score,
        MAX_RESULT_SCORE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repo::InMemoryRepo;
    use crate::result::MIN_RESULT_SCORE;

    const SHA: &str = "8e5e7e5ab8b370d6c329ec480221332ada57f0ab";
    const DIGEST: &str = "sha256:a5b8e26e8c5f1bcbbb4ce1a1d6e5a03c1e4dd9e6b5b6b1e0c4a8d8c7e6f5a4b3";

    fn all_max() -> PinningScores {
        PinningScores {
            lock_files: SubScore::max(),
            actions: SubScore::max(),
            docker_images: SubScore::max(),
            dockerfile_downloads: SubScore::max(),
            shell_downloads: SubScore::max(),
            workflow_downloads: SubScore::max(),
        }
    }

    fn clean_repo() -> InMemoryRepo {
        InMemoryRepo::new("demo")
            .with_file("Cargo.lock", "# lock")
            .with_file(
                ".github/workflows/ci.yml",
                format!(
                    "permissions: read-all\njobs:\n  build:\n    steps:\n      - uses: actions/checkout@{}\n      - run: cargo test --locked\n",
                    SHA
                ),
            )
            .with_file("Dockerfile", format!("FROM rust@{} AS build\nRUN cargo build\nFROM build\n", DIGEST))
            .with_file("scripts/release.sh", "#!/bin/sh\ncargo publish\n")
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(all_max().aggregate(), MAX_RESULT_SCORE);

        let scores = PinningScores {
            lock_files: SubScore::Inconclusive,
            ..all_max()
        };
        assert_eq!(scores.aggregate(), 8);

        let scores = PinningScores {
            actions: SubScore::min(),
            docker_images: SubScore::min(),
            ..all_max()
        };
        assert_eq!(scores.aggregate(), 6);
    }

    #[test]
    fn test_clean_repository() {
        let repo = clean_repo();
        let config = Config::default();
        let result = pinned_dependencies(&CheckRequest::new(&repo, &config));
        assert_eq!(result.score, MAX_RESULT_SCORE);
        assert_eq!(result.reason, "all dependencies are pinned -- score 10");
        assert_eq!(result.warn_count(), 0);
        assert!(result
            .details
            .iter()
            .any(|d| d.message == "GitHub actions are pinned"));
    }

    #[test]
    fn test_missing_lock_file_lowers_score() {
        let mut repo = clean_repo();
        repo.remove_file("Cargo.lock");
        let config = Config::default();
        let result = pinned_dependencies(&CheckRequest::new(&repo, &config));
        assert_eq!(result.score, 8);
        assert_eq!(
            result.reason,
            "unpinned dependencies detected -- score normalized to 8"
        );
    }

    #[test]
    fn test_unpinned_everything() {
        let repo = InMemoryRepo::new("demo")
            .with_file(
                ".github/workflows/ci.yml",
                "jobs:\n  a:\n    steps:\n      - uses: actions/checkout@v4\n      - run: curl -fsSL https://x.io/i.sh | bash\n",
            )
            .with_file("Dockerfile", "FROM node:20\nRUN wget -qO- https://x.io/i.sh | sh\n")
            .with_file("install.sh", "#!/bin/bash\npip install requests\n");
        let config = Config::default();
        let result = pinned_dependencies(&CheckRequest::new(&repo, &config));
        assert_eq!(result.score, MIN_RESULT_SCORE);
        // lock file, action, image and one per download variant
        assert_eq!(result.warn_count(), 6);
    }

    #[test]
    fn test_shell_shift_in_run_is_scored() {
        let repo = clean_repo().with_file(
            "tools/Dockerfile",
            format!(
                "FROM rust@{}\nRUN echo $((1 << BITS)) \"a <<EOF\"\nRUN cargo build\n",
                DIGEST
            ),
        );
        let config = Config::default();
        let result = pinned_dependencies(&CheckRequest::new(&repo, &config));
        assert!(!result.is_runtime_error());
        assert_eq!(result.score, MAX_RESULT_SCORE);
    }

    #[test]
    fn test_structural_error_aborts() {
        let repo = clean_repo().with_file("docker/Dockerfile.dev", "FROM alpine AS\n");
        let config = Config::default();
        let result = pinned_dependencies(&CheckRequest::new(&repo, &config));
        assert!(result.is_runtime_error());
        assert_eq!(result.score, crate::result::INCONCLUSIVE_RESULT_SCORE);
    }
}
