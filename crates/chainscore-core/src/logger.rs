use serde::{Deserialize, Serialize};

/// Level of a diagnostic detail attached to a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Warn,
    Info,
    Debug,
}

impl DetailLevel {
    pub fn symbol(&self) -> &str {
        match self {
            DetailLevel::Warn => "Warn",
            DetailLevel::Info => "Info",
            DetailLevel::Debug => "Debug",
        }
    }
}

/// A single diagnostic line produced while running a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub level: DetailLevel,
    pub message: String,
}

/// Collects the details of one check and mirrors each one as a `tracing`
/// event, so they show up both in the result and in the process log.
#[derive(Debug, Clone)]
pub struct DetailLogger {
    check: String,
    details: Vec<Detail>,
}

impl DetailLogger {
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            details: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(check = %self.check, "{message}");
        self.push(DetailLevel::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(check = %self.check, "{message}");
        self.push(DetailLevel::Info, message);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(check = %self.check, "{message}");
        self.push(DetailLevel::Debug, message);
    }

    pub fn check(&self) -> &str {
        &self.check
    }

    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Detail> {
        self.details
            .iter()
            .filter(|d| d.level == DetailLevel::Warn)
    }

    /// Consume the logger, returning everything recorded so far.
    pub fn flush(self) -> Vec<Detail> {
        self.details
    }

    fn push(&mut self, level: DetailLevel, message: String) {
        self.details.push(Detail { level, message });
    }
}
