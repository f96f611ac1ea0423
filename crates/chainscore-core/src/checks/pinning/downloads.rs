use super::create_return_values;
use crate::checks::{DOCKERFILE_PATTERN, WORKFLOW_PATTERN};
use crate::error::{CheckError, Result};
use crate::logger::DetailLogger;
use crate::parser::dockerfile::Dockerfile;
use crate::parser::github::{GitHubActionsParser, WorkflowDocument};
use crate::repo::{check_files_content, file_contains_commands, CheckRequest};
use crate::result::SubScore;
use crate::shell::{is_shell_script_file, is_supported_shell, DownloadDetector};
use regex::Regex;
use std::sync::LazyLock;

/// Expression interpolation such as `${{ github.ref }}`.
static GITHUB_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());

/// Stand-in for workflow expressions, so the detector sees plain shell.
pub const REDACTED_VARIABLE: &str = "GITHUB_REDACTED_VAR";

/// Shell GitHub uses for `run` steps when nothing else is configured.
const DEFAULT_WORKFLOW_SHELL: &str = "bash";

pub fn is_shell_script_free_of_insecure_downloads(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
) -> Result<SubScore> {
    let mut pinned = true;
    check_files_content(
        "*",
        false,
        req,
        dl,
        |path, content, dl, pinned| {
            validate_shell_script_downloads(req.detector, path, content, dl, pinned)
        },
        &mut pinned,
    )?;
    Ok(create_return_values(
        pinned,
        "no insecure (unpinned) dependency downloads found in shell scripts",
        dl,
    ))
}

pub fn is_dockerfile_free_of_insecure_downloads(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
) -> Result<SubScore> {
    let mut pinned = true;
    check_files_content(
        DOCKERFILE_PATTERN,
        false,
        req,
        dl,
        |path, content, dl, pinned| {
            validate_dockerfile_downloads(req.detector, path, content, dl, pinned)
        },
        &mut pinned,
    )?;
    Ok(create_return_values(
        pinned,
        "no insecure (unpinned) dependency downloads found in Dockerfiles",
        dl,
    ))
}

pub fn is_github_workflow_free_of_insecure_downloads(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
) -> Result<SubScore> {
    let mut pinned = true;
    check_files_content(
        WORKFLOW_PATTERN,
        false,
        req,
        dl,
        |path, content, dl, pinned| {
            validate_workflow_downloads(req.detector, path, content, dl, pinned)
        },
        &mut pinned,
    )?;
    Ok(create_return_values(
        pinned,
        "no insecure (unpinned) dependency downloads found in GitHub workflows",
        dl,
    ))
}

/// Shell scripts go to the detector verbatim; every other file is
/// vacuously pinned.
pub fn validate_shell_script_downloads(
    detector: &dyn DownloadDetector,
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    pinned: &mut bool,
) -> Result<bool> {
    if !is_shell_script_file(path, content) {
        return Ok(true);
    }
    *pinned &= detector.validate(path, content, dl)?;
    Ok(true)
}

/// All `RUN` bodies of a Dockerfile, checked as one synthetic script.
pub fn validate_dockerfile_downloads(
    detector: &dyn DownloadDetector,
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    pinned: &mut bool,
) -> Result<bool> {
    if is_shell_script_file(path, content) {
        return Ok(true);
    }
    if !file_contains_commands(content, "#") {
        return Ok(true);
    }

    let dockerfile = Dockerfile::parse(&String::from_utf8_lossy(content), path)?;
    let script = dockerfile_run_script(&dockerfile, path)?;

    *pinned &= detector.validate(path, script.as_bytes(), dl)?;
    Ok(true)
}

/// Inline `run` steps of a workflow, checked as one synthetic script.
pub fn validate_workflow_downloads(
    detector: &dyn DownloadDetector,
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    pinned: &mut bool,
) -> Result<bool> {
    if !file_contains_commands(content, "#") {
        return Ok(true);
    }

    let workflow = GitHubActionsParser::parse(content, path)?;
    let script = workflow_inline_script(&workflow);
    if script.trim().is_empty() {
        return Ok(true);
    }

    *pinned &= detector.validate(path, script.as_bytes(), dl)?;
    Ok(true)
}

/// Join every `RUN` instruction's arguments with spaces, one line each.
pub fn dockerfile_run_script(dockerfile: &Dockerfile, path: &str) -> Result<String> {
    let mut script = String::new();
    for run in dockerfile.instructions_of("run") {
        if run.args.is_empty() {
            return Err(CheckError::invalid_dockerfile(
                path,
                format!("RUN without arguments at line {}", run.line_number),
            ));
        }
        script.push_str(&run.args.join(" "));
        script.push('\n');
    }
    Ok(script)
}

/// Newline-joined `run` bodies of every step executed by a POSIX shell,
/// with workflow expressions redacted.
///
/// The shell of a step is its own `shell`, else the job's
/// `defaults.run.shell`, else the workflow's, else bash.
pub fn workflow_inline_script(workflow: &WorkflowDocument) -> String {
    let workflow_shell = workflow
        .defaults
        .as_ref()
        .and_then(|d| d.run_shell())
        .unwrap_or(DEFAULT_WORKFLOW_SHELL);

    let mut bodies = Vec::new();
    for job in workflow.jobs.values() {
        let default_shell = job.default_shell().unwrap_or(workflow_shell);
        for step in &job.steps {
            let Some(run) = step.run.as_deref().filter(|r| !r.is_empty()) else {
                continue;
            };
            let shell = step
                .shell
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(default_shell);
            // Windows shells and script interpreters are out of reach
            if !is_supported_shell(shell) {
                continue;
            }
            bodies.push(GITHUB_EXPRESSION.replace_all(run, REDACTED_VARIABLE).into_owned());
        }
    }
    bodies.join("\n")
}
