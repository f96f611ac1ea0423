use crate::logger::DetailLogger;
use regex::Regex;
use std::sync::LazyLock;

/// Substring identifying the CodeQL analysis action in a workflow.
pub const CODEQL_ANALYZE_ACTION: &str = "github/codeql-action/analyze@";

struct PackagingRule {
    ecosystem: &'static str,
    /// Every pattern must match somewhere in the workflow text.
    patterns: Vec<Regex>,
}

fn rule(ecosystem: &'static str, patterns: &[&str]) -> PackagingRule {
    PackagingRule {
        ecosystem,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect(),
    }
}

static PACKAGING_RULES: LazyLock<Vec<PackagingRule>> = LazyLock::new(|| {
    vec![
        rule(
            "npm",
            &[
                r"actions/setup-node@",
                r"registry-url:\s*['\x22]?https://registry\.npmjs\.org",
                r"(?m)npm.*\bpublish\b",
            ],
        ),
        rule("maven", &[r"actions/setup-java@", r"(?m)\bmvn\b.*\bdeploy\b"]),
        rule("gradle", &[r"actions/setup-java@", r"(?m)\bgradle\w*\b.*\bpublish"]),
        rule("rubygems", &[r"(?m)\bgem\b.*\bpush\b"]),
        rule("nuget", &[r"(?m)\bnuget\b.*\bpush\b"]),
        rule("docker", &[r"docker/build-push-action@"]),
        rule("docker", &[r"(?m)\bdocker\b.*\bpush\b"]),
        rule(
            "pypi",
            &[r"actions/setup-python@", r"pypa/gh-action-pypi-publish@"],
        ),
        rule(
            "go",
            &[r"actions/setup-go@", r"goreleaser/goreleaser-action@"],
        ),
    ]
});

/// Whether the workflow text publishes a package to one of the supported
/// registries. Detection is textual, so it also works on workflows that
/// fail to decode.
pub fn is_packaging_workflow(text: &str, path: &str, dl: &mut DetailLogger) -> bool {
    for rule in PACKAGING_RULES.iter() {
        if rule.patterns.iter().all(|p| p.is_match(text)) {
            dl.debug(format!(
                "candidate {} publishing workflow detected: {}",
                rule.ecosystem, path
            ));
            return true;
        }
    }
    dl.debug(format!("not a publishing workflow: {}", path));
    false
}

pub fn is_codeql_analysis_workflow(text: &str, path: &str, dl: &mut DetailLogger) -> bool {
    if text.contains(CODEQL_ANALYZE_ACTION) {
        dl.debug(format!("codeql workflow detected: {}", path));
        return true;
    }
    dl.debug(format!("not a codeql workflow: {}", path));
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packaging(text: &str) -> bool {
        let mut dl = DetailLogger::new("test");
        is_packaging_workflow(text, "release.yml", &mut dl)
    }

    #[test]
    fn test_npm_publish_workflow() {
        let text = r#"
jobs:
  publish:
    steps:
      - uses: actions/setup-node@v4
        with:
          registry-url: 'https://registry.npmjs.org'
      - run: npm ci && npm publish --access public
"#;
        assert!(packaging(text));
        // Without the registry the same steps are just a build
        assert!(!packaging(&text.replace("registry.npmjs.org", "example.com")));
    }

    #[test]
    fn test_other_ecosystems() {
        assert!(packaging("uses: docker/build-push-action@v5"));
        assert!(packaging("run: gem push pkg/*.gem"));
        assert!(packaging(
            "uses: actions/setup-python@v5\nuses: pypa/gh-action-pypi-publish@release/v1"
        ));
        assert!(packaging(
            "uses: actions/setup-go@v5\nuses: goreleaser/goreleaser-action@v6"
        ));
        assert!(packaging("uses: actions/setup-java@v4\nrun: mvn -B deploy"));
        assert!(!packaging("uses: actions/setup-java@v4\nrun: mvn -B verify"));
        assert!(!packaging("run: cargo test"));
    }

    #[test]
    fn test_codeql_detection() {
        let mut dl = DetailLogger::new("test");
        assert!(is_codeql_analysis_workflow(
            "- uses: github/codeql-action/analyze@v3",
            "codeql.yml",
            &mut dl
        ));
        assert!(!is_codeql_analysis_workflow(
            "- uses: github/codeql-action/init@v3",
            "codeql.yml",
            &mut dl
        ));
        assert_eq!(dl.details().len(), 2);
    }
}
