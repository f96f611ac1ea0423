use super::create_return_values;
use crate::checks::DOCKERFILE_PATTERN;
use crate::error::{CheckError, Result};
use crate::logger::DetailLogger;
use crate::parser::dockerfile::Dockerfile;
use crate::repo::{check_files_content, file_contains_commands, CheckRequest};
use crate::result::SubScore;
use crate::shell::is_shell_script_file;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static IMAGE_DIGEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@sha256:[a-f0-9]{64}").unwrap());

/// Build stages of one Dockerfile whose base image was verified pinned.
/// Stage names are matched case-insensitively, as Docker does.
#[derive(Debug, Default)]
pub struct StageAliasTable {
    pinned: HashSet<String>,
}

impl StageAliasTable {
    pub fn record(&mut self, alias: &str) {
        self.pinned.insert(alias.to_lowercase());
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pinned.contains(&name.to_lowercase())
    }
}

pub fn is_dockerfile_pinned(req: &CheckRequest<'_>, dl: &mut DetailLogger) -> Result<SubScore> {
    let mut pinned = true;
    check_files_content(
        DOCKERFILE_PATTERN,
        false,
        req,
        dl,
        validate_dockerfile_is_pinned,
        &mut pinned,
    )?;
    Ok(create_return_values(
        pinned,
        "Dockerfile dependencies are pinned",
        dl,
    ))
}

/// File callback: every `FROM` must name a digest, `scratch` or a stage
/// built from a pinned image.
pub fn validate_dockerfile_is_pinned(
    path: &str,
    content: &[u8],
    dl: &mut DetailLogger,
    pinned: &mut bool,
) -> Result<bool> {
    // Scripts such as build_dockerfile.sh match the file pattern too
    if is_shell_script_file(path, content) {
        return Ok(true);
    }
    if !file_contains_commands(content, "#") {
        return Ok(true);
    }

    let dockerfile = Dockerfile::parse(&String::from_utf8_lossy(content), path)?;

    let mut aliases = StageAliasTable::default();
    let mut file_pinned = true;
    for from in dockerfile.instructions_of("from") {
        match from.args.as_slice() {
            [image] => {
                if !is_pinned_base(image, &aliases) {
                    file_pinned = false;
                    warn_unpinned(dl, path, image);
                }
            }
            [image, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
                if is_pinned_base(image, &aliases) {
                    aliases.record(alias);
                } else {
                    file_pinned = false;
                    warn_unpinned(dl, path, image);
                }
            }
            args => {
                return Err(CheckError::invalid_dockerfile(
                    path,
                    format!(
                        "unexpected FROM arguments at line {}: '{}'",
                        from.line_number,
                        args.join(" ")
                    ),
                ));
            }
        }
    }

    *pinned &= file_pinned;
    Ok(true)
}

fn is_pinned_base(image: &str, aliases: &StageAliasTable) -> bool {
    image.eq_ignore_ascii_case("scratch") || IMAGE_DIGEST.is_match(image) || aliases.is_pinned(image)
}

fn warn_unpinned(dl: &mut DetailLogger, path: &str, image: &str) {
    dl.warn(format!("unpinned dependency detected in {}: '{}'", path, image));
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:a5b8e26e8c5f1bcbbb4ce1a1d6e5a03c1e4dd9e6b5b6b1e0c4a8d8c7e6f5a4b3";

    fn validate(content: &str) -> Result<(bool, DetailLogger)> {
        let mut dl = DetailLogger::new("test");
        let mut pinned = true;
        validate_dockerfile_is_pinned("Dockerfile", content.as_bytes(), &mut dl, &mut pinned)?;
        Ok((pinned, dl))
    }

    #[test]
    fn test_tag_is_unpinned() {
        let (pinned, dl) = validate("FROM alpine:3.14\n").unwrap();
        assert!(!pinned);
        let warnings: Vec<&str> = dl.warnings().map(|d| d.message.as_str()).collect();
        assert_eq!(
            warnings,
            vec!["unpinned dependency detected in Dockerfile: 'alpine:3.14'"]
        );
    }

    #[test]
    fn test_digest_is_pinned() {
        let (pinned, dl) = validate(&format!("FROM alpine@{}\n", DIGEST)).unwrap();
        assert!(pinned);
        assert_eq!(dl.warnings().count(), 0);

        let (pinned, _) =
            validate(&format!("FROM --platform=linux/amd64 python:3.12@{}\n", DIGEST)).unwrap();
        assert!(pinned);
    }

    #[test]
    fn test_pinned_stage_alias_is_reusable() {
        let content = format!(
            "FROM golang@{} AS build\nRUN go build ./...\nFROM build\nFROM build as final\nFROM scratch\n",
            DIGEST
        );
        let (pinned, dl) = validate(&content).unwrap();
        assert!(pinned);
        assert_eq!(dl.warnings().count(), 0);
    }

    #[test]
    fn test_unpinned_stage_does_not_pin_alias() {
        let content = "FROM golang:1.22 AS build\nFROM build\n";
        let (pinned, dl) = validate(content).unwrap();
        assert!(!pinned);
        assert_eq!(dl.warnings().count(), 2);
    }

    #[test]
    fn test_scratch_stage_alias() {
        let (pinned, _) = validate("FROM SCRATCH AS base\nFROM base\n").unwrap();
        assert!(pinned);
    }

    #[test]
    fn test_no_from_is_pinned() {
        let (pinned, dl) = validate("RUN echo partial\n").unwrap();
        assert!(pinned);
        assert!(dl.details().is_empty());
    }

    #[test]
    fn test_bad_arity_is_structural_error() {
        let err = validate("FROM alpine AS\n").unwrap_err();
        assert!(matches!(err, CheckError::InvalidDockerfile { .. }));

        let err = validate("FROM a b c d\n").unwrap_err();
        assert!(err.is_structural());

        let err = validate("FROM alpine FOR base\n").unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_scripts_and_empty_files_are_skipped() {
        let mut dl = DetailLogger::new("test");
        let mut pinned = true;
        validate_dockerfile_is_pinned(
            "build_dockerfile.sh",
            b"FROM alpine\n",
            &mut dl,
            &mut pinned,
        )
        .unwrap();
        assert!(pinned);

        let (pinned, _) = validate("# just a comment\n\n").unwrap();
        assert!(pinned);
    }

    #[test]
    fn test_accumulates_across_files() {
        let mut dl = DetailLogger::new("test");
        let mut pinned = true;
        validate_dockerfile_is_pinned("a/Dockerfile", b"FROM ubuntu\n", &mut dl, &mut pinned)
            .unwrap();
        validate_dockerfile_is_pinned("b/Dockerfile", b"FROM scratch\n", &mut dl, &mut pinned)
            .unwrap();
        assert!(!pinned);
    }
}
