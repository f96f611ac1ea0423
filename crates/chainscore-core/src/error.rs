use thiserror::Error;

/// Errors raised while running a check.
///
/// None of these are security findings: an unpinned dependency or a write
/// permission lowers a score, it never produces a `CheckError`. These
/// signal that a file did not have the shape the analysis expects, or
/// that the repository could not be read.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid GitHub workflow '{path}': {reason}")]
    InvalidWorkflow { path: String, reason: String },

    #[error("invalid Dockerfile '{path}': {reason}")]
    InvalidDockerfile { path: String, reason: String },

    #[error("failed to parse YAML in '{path}'")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unknown check '{0}'")]
    UnknownCheck(String),
}

impl CheckError {
    pub fn invalid_workflow(path: &str, reason: impl Into<String>) -> Self {
        CheckError::InvalidWorkflow {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_dockerfile(path: &str, reason: impl Into<String>) -> Self {
        CheckError::InvalidDockerfile {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from a file whose decoded shape violated
    /// the parser contract, as opposed to an I/O or setup failure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CheckError::InvalidWorkflow { .. }
                | CheckError::InvalidDockerfile { .. }
                | CheckError::Yaml { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
