use super::CheckRequest;
use crate::error::{CheckError, Result};
use crate::logger::DetailLogger;
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Feed every file matching `pattern` to `on_file`, threading `data` through.
///
/// The callback returns whether iteration should continue. A `false` only
/// stops the walk when `short_circuit` is set; otherwise every matching
/// file is visited. Errors abort immediately and are returned unchanged.
pub fn check_files_content<T, F>(
    pattern: &str,
    short_circuit: bool,
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
    mut on_file: F,
    data: &mut T,
) -> Result<()>
where
    F: FnMut(&str, &[u8], &mut DetailLogger, &mut T) -> Result<bool>,
{
    let pattern = compile(pattern)?;
    for path in candidate_files(req)? {
        if !is_matching_path(&pattern, &path) {
            continue;
        }
        let content = req.repo.read_file(&path)?;
        let keep_going = on_file(&path, &content, dl, data)?;
        if short_circuit && !keep_going {
            break;
        }
    }
    Ok(())
}

/// Like [`check_files_content`], but over paths only: no content is read.
/// Every file is offered to the callback until it returns `false`.
pub fn check_if_file_exists<T, F>(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
    mut on_path: F,
    data: &mut T,
) -> Result<()>
where
    F: FnMut(&str, &mut DetailLogger, &mut T) -> Result<bool>,
{
    for path in candidate_files(req)? {
        if !on_path(&path, dl, data)? {
            break;
        }
    }
    Ok(())
}

/// Whether `content` has at least one line that is neither blank nor a
/// comment starting with `comment`.
pub fn file_contains_commands(content: &[u8], comment: &str) -> bool {
    String::from_utf8_lossy(content).lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with(comment)
    })
}

/// Case-insensitive match against either the full path or its base name.
pub fn is_matching_path(pattern: &Pattern, path: &str) -> bool {
    if pattern.matches_with(path, MATCH_OPTIONS) {
        return true;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    pattern.matches_with(file_name, MATCH_OPTIONS)
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|source| CheckError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn candidate_files(req: &CheckRequest<'_>) -> Result<Vec<String>> {
    let excludes = req
        .config
        .exclude
        .iter()
        .map(|p| compile(p))
        .collect::<Result<Vec<_>>>()?;

    let files = req.repo.list_files()?;
    Ok(files
        .into_iter()
        .filter(|path| !excludes.iter().any(|p| p.matches_with(path, MATCH_OPTIONS)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repo::InMemoryRepo;

    fn repo() -> InMemoryRepo {
        InMemoryRepo::new("demo")
            .with_file(".github/workflows/ci.yml", "name: ci")
            .with_file(".github/workflows/release.yaml", "name: release")
            .with_file("docker/Dockerfile.prod", "FROM scratch")
            .with_file("testdata/Dockerfile", "FROM alpine")
            .with_file("README.md", "# readme")
    }

    #[test]
    fn test_matches_full_path_and_base_name() {
        let workflows = Pattern::new(".github/workflows/*").unwrap();
        assert!(is_matching_path(&workflows, ".github/workflows/ci.yml"));
        assert!(!is_matching_path(&workflows, ".github/workflows/nested/ci.yml"));

        let dockerfiles = Pattern::new("*Dockerfile*").unwrap();
        assert!(is_matching_path(&dockerfiles, "docker/Dockerfile.prod"));
        assert!(is_matching_path(&dockerfiles, "build/app.dockerfile"));
        assert!(!is_matching_path(&dockerfiles, "README.md"));
    }

    #[test]
    fn test_visits_all_matching_files() {
        let repo = repo();
        let config = Config::default();
        let req = CheckRequest::new(&repo, &config);
        let mut dl = DetailLogger::new("test");
        let mut seen: Vec<String> = Vec::new();
        check_files_content(
            "*Dockerfile*",
            false,
            &req,
            &mut dl,
            |path, _content, _dl, seen: &mut Vec<String>| {
                seen.push(path.to_string());
                Ok(false)
            },
            &mut seen,
        )
        .unwrap();
        assert_eq!(seen, vec!["docker/Dockerfile.prod", "testdata/Dockerfile"]);
    }

    #[test]
    fn test_short_circuit_stops_on_false() {
        let repo = repo();
        let config = Config::default();
        let req = CheckRequest::new(&repo, &config);
        let mut dl = DetailLogger::new("test");
        let mut count = 0usize;
        check_files_content(
            ".github/workflows/*",
            true,
            &req,
            &mut dl,
            |_path, _content, _dl, count: &mut usize| {
                *count += 1;
                Ok(false)
            },
            &mut count,
        )
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_excluded_paths_are_skipped() {
        let repo = repo();
        let config = Config {
            exclude: vec!["testdata/**".to_string()],
            ..Config::default()
        };
        let req = CheckRequest::new(&repo, &config);
        let mut dl = DetailLogger::new("test");
        let mut seen: Vec<String> = Vec::new();
        check_files_content(
            "*Dockerfile*",
            false,
            &req,
            &mut dl,
            |path, _content, _dl, seen: &mut Vec<String>| {
                seen.push(path.to_string());
                Ok(true)
            },
            &mut seen,
        )
        .unwrap();
        assert_eq!(seen, vec!["docker/Dockerfile.prod"]);
    }

    #[test]
    fn test_callback_error_propagates() {
        let repo = repo();
        let config = Config::default();
        let req = CheckRequest::new(&repo, &config);
        let mut dl = DetailLogger::new("test");
        let err = check_files_content(
            ".github/workflows/*",
            false,
            &req,
            &mut dl,
            |path, _content, _dl, _data: &mut ()| {
                Err(CheckError::invalid_workflow(path, "boom"))
            },
            &mut (),
        )
        .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_file_contains_commands() {
        assert!(!file_contains_commands(b"", "#"));
        assert!(!file_contains_commands(b"# only\n   # comments\n\n", "#"));
        assert!(file_contains_commands(b"# header\nFROM scratch\n", "#"));
    }
}
