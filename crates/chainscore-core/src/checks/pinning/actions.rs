use super::create_return_values;
use crate::checks::WORKFLOW_PATTERN;
use crate::error::Result;
use crate::logger::DetailLogger;
use crate::parser::github::GitHubActionsParser;
use crate::repo::{check_files_content, file_contains_commands, CheckRequest};
use crate::result::SubScore;
use regex::Regex;
use std::sync::LazyLock;

/// A commit-grade reference: `@` and at least 40 hex digits at the end.
static ACTION_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-f0-9]{40,}$").unwrap());

/// Whether every `uses:` reference in the repository's workflows is pinned
/// to a commit hash. Stops at the first workflow with an unpinned action.
pub fn is_github_actions_workflow_pinned(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
) -> Result<SubScore> {
    let mut pinned = true;
    check_files_content(
        WORKFLOW_PATTERN,
        true,
        req,
        dl,
        validate_github_action_workflow,
        &mut pinned,
    )?;
    Ok(create_return_values(pinned, "GitHub actions are pinned", dl))
}

/// File callback. Returns the file's own outcome so a short-circuiting
/// walk stops on the first unpinned workflow.
pub fn validate_github_action_workflow(
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    pinned: &mut bool,
) -> Result<bool> {
    if !file_contains_commands(content, "#") {
        return Ok(true);
    }

    let workflow = GitHubActionsParser::parse(content, path)?;

    let mut file_pinned = true;
    for (id, job) in &workflow.jobs {
        let job_name = job.display_name(id);
        for uses in job.steps.iter().filter_map(|s| s.uses.as_deref()) {
            if uses.is_empty() || is_pinned_action(uses) {
                continue;
            }
            file_pinned = false;
            dl.warn(format!(
                "unpinned dependency detected in {}: '{}' (job '{}')",
                path, uses, job_name
            ));
        }
    }

    *pinned &= file_pinned;
    Ok(file_pinned)
}

pub fn is_pinned_action(uses: &str) -> bool {
    ACTION_HASH.is_match(uses)
}
