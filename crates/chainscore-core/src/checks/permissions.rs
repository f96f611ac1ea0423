use super::packaging::{is_codeql_analysis_workflow, is_packaging_workflow};
use super::{CHECK_TOKEN_PERMISSIONS, WORKFLOW_PATTERN};
use crate::error::Result;
use crate::logger::DetailLogger;
use crate::parser::github::{GitHubActionsParser, Permissions};
use crate::repo::{check_files_content, file_contains_commands, CheckRequest};
use crate::result::{CheckResult, MAX_RESULT_SCORE, MIN_RESULT_SCORE};
use std::collections::BTreeSet;

/// Marker recorded when every permission must be treated as write: no
/// `permissions` block at all, or a bulk grant other than `read-all`.
pub const ALL_PERMISSIONS: &str = "all";

/// Token permissions whose write access lowers the score, with the
/// deduction each one costs.
const PERMISSION_DEDUCTIONS: &[(&str, f32)] = &[
    // Can flip the result of pre-submit statuses
    ("statuses", 0.5),
    ("checks", 0.5),
    // Early read access to vulnerability reports
    ("security-events", 1.0),
    ("deployments", 1.0),
    // Unreviewed commits
    ("contents", 10.0),
    // Package publishing
    ("packages", 10.0),
    // Workflow edits, secret exfiltration
    ("actions", 10.0),
];

/// Write permissions observed across every workflow of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionScanState {
    pub top_level: BTreeSet<String>,
    pub run_level: BTreeSet<String>,
}

impl PermissionScanState {
    /// Whether `name` was recorded as write at either scope.
    pub fn is_present(&self, name: &str) -> bool {
        self.top_level.contains(name) || self.run_level.contains(name)
    }
}

/// Runs the Token-Permissions check over `.github/workflows/*`.
pub fn token_permissions(req: &CheckRequest<'_>) -> CheckResult {
    let mut dl = DetailLogger::new(CHECK_TOKEN_PERMISSIONS);
    let mut state = PermissionScanState::default();
    let outcome = check_files_content(
        WORKFLOW_PATTERN,
        false,
        req,
        &mut dl,
        validate_workflow_permissions,
        &mut state,
    );
    create_result(&state, outcome).with_details(dl.flush())
}

/// File callback: record the write permissions one workflow grants.
///
/// Empty and comment-only files are skipped without being parsed. Files
/// that do not decode as a workflow abort the check.
pub fn validate_workflow_permissions(
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    state: &mut PermissionScanState,
) -> Result<bool> {
    if !file_contains_commands(content, "#") {
        return Ok(true);
    }

    let workflow = GitHubActionsParser::parse(content, path)?;
    let ignored = ignored_permissions(&String::from_utf8_lossy(content), path, dl);

    // Top level
    if workflow.permissions == Permissions::Absent {
        dl.warn(format!("no permission defined in {}", path));
        state.top_level.insert(ALL_PERMISSIONS.to_string());
    } else {
        validate_permissions(
            &workflow.permissions,
            path,
            dl,
            &mut state.top_level,
            &ignored,
        );
    }

    // Run level: a job without permissions inherits the top-level block
    for (id, job) in &workflow.jobs {
        if job.permissions == Permissions::Absent {
            dl.debug(format!("no permission defined for job '{}' in {}", id, path));
            continue;
        }
        validate_permissions(&job.permissions, path, dl, &mut state.run_level, &ignored);
    }

    Ok(true)
}

/// Permissions exempted for this file: publishing workflows need
/// `packages`, CodeQL analysis needs `security-events`.
pub fn ignored_permissions(
    text: &str,
    path: &str,
    dl: &mut DetailLogger,
) -> BTreeSet<&'static str> {
    let mut ignored = BTreeSet::new();
    if is_packaging_workflow(text, path, dl) {
        ignored.insert("packages");
    }
    if is_codeql_analysis_workflow(text, path, dl) {
        ignored.insert("security-events");
    }
    ignored
}

fn validate_permissions(
    permissions: &Permissions,
    path: &str,
    dl: &mut DetailLogger,
    recorded: &mut BTreeSet<String>,
    ignored: &BTreeSet<&'static str>,
) {
    match permissions {
        Permissions::Absent => {}
        Permissions::Empty => dl.info(format!("permissions set to 'none' in {}", path)),
        Permissions::Level(level) if level.eq_ignore_ascii_case("read-all") => {
            dl.info(format!("permissions set to '{}' in {}", level, path));
        }
        Permissions::Level(level) => {
            dl.warn(format!("permissions set to '{}' in {}", level, path));
            recorded.insert(ALL_PERMISSIONS.to_string());
        }
        Permissions::Map(entries) => {
            for (name, value) in entries {
                validate_permission(name, value, path, dl, recorded, ignored);
            }
        }
    }
}

fn validate_permission(
    name: &str,
    value: &str,
    path: &str,
    dl: &mut DetailLogger,
    recorded: &mut BTreeSet<String>,
    ignored: &BTreeSet<&'static str>,
) {
    let message = format!("'{}' permission set to '{}' in {}", name, value, path);
    if !value.eq_ignore_ascii_case("write") {
        dl.info(message);
        return;
    }

    let name = name.to_lowercase();
    if is_permission_of_interest(&name, ignored) {
        dl.warn(message);
        recorded.insert(name);
    } else {
        // Kept out of the warnings to avoid noise from harmless scopes
        dl.debug(message);
    }
}

fn is_permission_of_interest(name: &str, ignored: &BTreeSet<&'static str>) -> bool {
    PERMISSION_DEDUCTIONS
        .iter()
        .any(|(p, _)| *p == name && !ignored.contains(p))
}

/// Score the accumulated state: `all` means the minimum, otherwise each
/// write permission present at either scope is deducted once.
pub fn calculate_score(state: &PermissionScanState) -> i32 {
    if state.is_present(ALL_PERMISSIONS) {
        return MIN_RESULT_SCORE;
    }

    let mut score = MAX_RESULT_SCORE as f32;
    for (name, deduction) in PERMISSION_DEDUCTIONS {
        if state.is_present(name) {
            score -= deduction;
        }
    }

    if score < MIN_RESULT_SCORE as f32 {
        return MIN_RESULT_SCORE;
    }
    score as i32
}

fn create_result(state: &PermissionScanState, outcome: Result<()>) -> CheckResult {
    if let Err(e) = outcome {
        return CheckResult::runtime_error(CHECK_TOKEN_PERMISSIONS, &e);
    }

    let score = calculate_score(state);
    if score != MAX_RESULT_SCORE {
        return CheckResult::with_score(
            CHECK_TOKEN_PERMISSIONS,
            "non read-only tokens detected in GitHub workflows",
            score,
        );
    }
    CheckResult::max_score(
        CHECK_TOKEN_PERMISSIONS,
        "tokens are read-only in GitHub workflows",
    )
}
