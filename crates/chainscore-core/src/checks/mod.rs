pub mod packaging;
pub mod permissions;
pub mod pinned_dependencies;
pub mod pinning;

use crate::error::{CheckError, Result};
use crate::repo::CheckRequest;
use crate::result::CheckResult;

pub const CHECK_TOKEN_PERMISSIONS: &str = "Token-Permissions";
pub const CHECK_PINNED_DEPENDENCIES: &str = "Pinned-Dependencies";

/// Files treated as GitHub Actions workflows.
pub const WORKFLOW_PATTERN: &str = ".github/workflows/*";
/// Files treated as Dockerfiles: `Dockerfile`, `Dockerfile.prod`, `app.dockerfile`, ...
pub const DOCKERFILE_PATTERN: &str = "*Dockerfile*";

/// A named check that can be run against a repository.
pub struct CheckDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&CheckRequest<'_>) -> CheckResult,
}

static REGISTRY: [CheckDefinition; 2] = [
    CheckDefinition {
        name: CHECK_TOKEN_PERMISSIONS,
        description: "Workflow tokens follow the principle of least privilege",
        run: permissions::token_permissions,
    },
    CheckDefinition {
        name: CHECK_PINNED_DEPENDENCIES,
        description: "Actions, images and downloaded dependencies are pinned by hash",
        run: pinned_dependencies::pinned_dependencies,
    },
];

/// Every registered check, in run order.
pub fn registry() -> &'static [CheckDefinition] {
    &REGISTRY
}

/// Look up a check by name, ignoring case.
pub fn find_check(name: &str) -> Option<&'static CheckDefinition> {
    REGISTRY.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Run the named checks, or every check when `names` is empty.
///
/// Checks run in registry order whatever order they are named in. Unknown
/// names are rejected before anything runs.
pub fn run_checks(req: &CheckRequest<'_>, names: &[String]) -> Result<Vec<CheckResult>> {
    for name in names {
        if find_check(name).is_none() {
            return Err(CheckError::UnknownCheck(name.clone()));
        }
    }

    let results = REGISTRY
        .iter()
        .filter(|check| names.is_empty() || names.iter().any(|n| check.name.eq_ignore_ascii_case(n)))
        .map(|check| {
            tracing::debug!(check = check.name, repo = req.repo.name(), "running check");
            (check.run)(req)
        })
        .collect();
    Ok(results)
}
