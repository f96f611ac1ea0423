use crate::error::Result;
use crate::logger::DetailLogger;
use crate::repo::{check_if_file_exists, CheckRequest};
use crate::result::SubScore;
use std::collections::BTreeSet;

/// Lock files recognized at the repository root, lower-cased, with the
/// ecosystem named in the detail line.
const LOCK_FILES: &[(&str, &str)] = &[
    ("go.sum", "go"),
    ("package-lock.json", "javascript"),
    ("npm-shrinkwrap.json", "javascript"),
    // requirements.txt pins no transitive dependencies, so it does not count
    ("pipfile.lock", "python"),
    ("gemfile.lock", "ruby"),
    ("cargo.lock", "rust"),
    ("yarn.lock", "yarn"),
    ("composer.lock", "composer"),
];

const VENDOR_DIRECTORIES: &[&str] = &["vendor/", "third_party/", "third-party/"];

/// State of one lock-file scan.
#[derive(Debug, Default)]
pub struct LockFileSearch {
    /// Additional lock-file names, lower-cased.
    extra: Vec<String>,
    /// Vendoring directories already reported.
    vendored: BTreeSet<&'static str>,
    pub found: bool,
}

impl LockFileSearch {
    pub fn new(extra: &[String]) -> Self {
        Self {
            extra: extra.iter().map(|name| name.to_lowercase()).collect(),
            ..Self::default()
        }
    }
}

/// Whether the repository commits a lock file or vendors its
/// dependencies. Absence is inconclusive: libraries often ship without one.
pub fn is_package_manager_lock_file_present(
    req: &CheckRequest<'_>,
    dl: &mut DetailLogger,
) -> Result<SubScore> {
    let mut search = LockFileSearch::new(&req.config.lock_files);
    check_if_file_exists(req, dl, validate_package_manager_file, &mut search)?;

    if !search.found {
        dl.warn("no lock files detected for a package manager");
        return Ok(SubScore::Inconclusive);
    }
    Ok(SubScore::max())
}

/// Path callback. Every path is visited so each ecosystem gets reported.
pub fn validate_package_manager_file(
    path: &str,
    dl: &mut DetailLogger,
    search: &mut LockFileSearch,
) -> Result<bool> {
    let name = path.to_lowercase();

    if let Some((_, ecosystem)) = LOCK_FILES.iter().find(|(file, _)| *file == name) {
        dl.info(format!("{} lock file detected: {}", ecosystem, path));
        search.found = true;
    } else if search.extra.contains(&name) {
        dl.info(format!("lock file detected: {}", path));
        search.found = true;
    } else if let Some(dir) = VENDOR_DIRECTORIES.iter().find(|d| name.starts_with(**d)) {
        if search.vendored.insert(*dir) {
            dl.info(format!("vendoring detected in: {}", dir));
        }
        search.found = true;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repo::InMemoryRepo;

    fn run(repo: &InMemoryRepo, config: &Config) -> (SubScore, DetailLogger) {
        let mut dl = DetailLogger::new("test");
        let score =
            is_package_manager_lock_file_present(&CheckRequest::new(repo, config), &mut dl)
                .unwrap();
        (score, dl)
    }

    #[test]
    fn test_lock_file_found() {
        let repo = InMemoryRepo::new("demo")
            .with_file("Cargo.lock", "")
            .with_file("src/main.rs", "")
            .with_file("web/yarn.lock", "");
        let (score, dl) = run(&repo, &Config::default());
        assert_eq!(score, SubScore::max());
        let messages: Vec<&str> = dl.details().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["rust lock file detected: Cargo.lock"]);
    }

    #[test]
    fn test_missing_lock_file_is_inconclusive() {
        let repo = InMemoryRepo::new("demo")
            .with_file("requirements.txt", "flask")
            .with_file("nested/go.sum", "");
        let (score, dl) = run(&repo, &Config::default());
        assert_eq!(score, SubScore::Inconclusive);
        assert_eq!(score.floored(), 0);
        assert_eq!(
            dl.warnings().next().map(|d| d.message.as_str()),
            Some("no lock files detected for a package manager")
        );
    }

    #[test]
    fn test_vendoring_is_reported_once() {
        let repo = InMemoryRepo::new("demo")
            .with_file("vendor/github.com/a/a.go", "")
            .with_file("vendor/github.com/b/b.go", "")
            .with_file("Third_Party/lib/lib.c", "");
        let (score, dl) = run(&repo, &Config::default());
        assert_eq!(score, SubScore::max());
        assert_eq!(dl.details().len(), 2);
    }

    #[test]
    fn test_configured_lock_files() {
        let repo = InMemoryRepo::new("demo").with_file("pnpm-lock.yaml", "");
        let (score, _) = run(&repo, &Config::default());
        assert_eq!(score, SubScore::Inconclusive);

        let config = Config {
            lock_files: vec!["PNPM-lock.yaml".to_string()],
            ..Config::default()
        };
        let (score, _) = run(&repo, &config);
        assert_eq!(score, SubScore::max());
    }
}
