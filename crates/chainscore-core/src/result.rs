use crate::error::CheckError;
use crate::logger::{Detail, DetailLevel};
use serde::{Deserialize, Serialize};

/// Best score a check can report.
pub const MAX_RESULT_SCORE: i32 = 10;
/// Worst score a check can report.
pub const MIN_RESULT_SCORE: i32 = 0;
/// Score used when a check could not reach a conclusion.
pub const INCONCLUSIVE_RESULT_SCORE: i32 = -1;

/// Outcome of one sub-check before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubScore {
    Score(i32),
    /// No evidence either way, e.g. no lock file in the repository.
    Inconclusive,
}

impl SubScore {
    pub fn max() -> Self {
        SubScore::Score(MAX_RESULT_SCORE)
    }

    pub fn min() -> Self {
        SubScore::Score(MIN_RESULT_SCORE)
    }

    /// Raw value, with the inconclusive sentinel kept as-is.
    pub fn value(&self) -> i32 {
        match self {
            SubScore::Score(s) => *s,
            SubScore::Inconclusive => INCONCLUSIVE_RESULT_SCORE,
        }
    }

    /// Value used for aggregation: missing evidence counts as the worst case.
    pub fn floored(&self) -> i32 {
        self.value().max(MIN_RESULT_SCORE)
    }
}

/// The result of running one named check against a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub score: i32,
    pub reason: String,
    pub details: Vec<Detail>,
    pub error: Option<String>,
}

impl CheckResult {
    /// A result with an explicit score in `[MIN_RESULT_SCORE, MAX_RESULT_SCORE]`.
    pub fn with_score(name: &str, reason: &str, score: i32) -> Self {
        Self {
            name: name.to_string(),
            score,
            reason: format!("{} -- score {}", reason, score),
            details: Vec::new(),
            error: None,
        }
    }

    pub fn max_score(name: &str, reason: &str) -> Self {
        Self::with_score(name, reason, MAX_RESULT_SCORE)
    }

    /// A result whose score is `points / total` scaled onto the score range.
    pub fn proportional(name: &str, reason: &str, points: i32, total: i32) -> Self {
        let score = if total <= 0 {
            MIN_RESULT_SCORE
        } else {
            (MAX_RESULT_SCORE * points / total).clamp(MIN_RESULT_SCORE, MAX_RESULT_SCORE)
        };
        Self {
            name: name.to_string(),
            score,
            reason: format!("{} -- score normalized to {}", reason, score),
            details: Vec::new(),
            error: None,
        }
    }

    pub fn runtime_error(name: &str, err: &CheckError) -> Self {
        Self {
            name: name.to_string(),
            score: INCONCLUSIVE_RESULT_SCORE,
            reason: format!("internal error: {}", error_chain(err)),
            details: Vec::new(),
            error: Some(error_chain(err)),
        }
    }

    pub fn with_details(mut self, details: Vec<Detail>) -> Self {
        self.details = details;
        self
    }

    pub fn is_runtime_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn warn_count(&self) -> usize {
        self.details
            .iter()
            .filter(|d| d.level == DetailLevel::Warn)
            .count()
    }
}

/// Floored arithmetic mean of `scores`.
///
/// Non-decreasing in every input and equal to `MAX_RESULT_SCORE` only when
/// every input is.
pub fn aggregate_scores(scores: &[i32]) -> i32 {
    if scores.is_empty() {
        return MIN_RESULT_SCORE;
    }
    let total: i32 = scores.iter().sum();
    (total as f64 / scores.len() as f64).floor() as i32
}

/// Floored weighted mean over `(score, weight)` pairs.
pub fn aggregate_scores_with_weight(scores: &[(i32, u32)]) -> i32 {
    let total_weight: u32 = scores.iter().map(|(_, w)| *w).sum();
    if total_weight == 0 {
        return MIN_RESULT_SCORE;
    }
    let weighted: f64 = scores.iter().map(|(s, w)| *s as f64 * *w as f64).sum();
    (weighted / total_weight as f64).floor() as i32
}

fn error_chain(err: &CheckError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_all_max() {
        assert_eq!(aggregate_scores(&[10, 10, 10, 10, 10, 10]), MAX_RESULT_SCORE);
    }

    #[test]
    fn test_aggregate_one_floored_inconclusive() {
        let scores: Vec<i32> = [
            SubScore::Inconclusive,
            SubScore::max(),
            SubScore::max(),
            SubScore::max(),
            SubScore::max(),
            SubScore::max(),
        ]
        .iter()
        .map(SubScore::floored)
        .collect();
        let score = aggregate_scores(&scores);
        assert_eq!(score, 8);
        assert!(score < MAX_RESULT_SCORE);
    }

    #[test]
    fn test_aggregate_is_monotone() {
        let low = aggregate_scores(&[0, 10, 10]);
        let high = aggregate_scores(&[10, 10, 10]);
        assert!(low <= high);
        assert_eq!(aggregate_scores(&[]), MIN_RESULT_SCORE);
    }

    #[test]
    fn test_weighted_aggregate() {
        assert_eq!(aggregate_scores_with_weight(&[(10, 3), (0, 1)]), 7);
        assert_eq!(aggregate_scores_with_weight(&[(10, 0)]), MIN_RESULT_SCORE);
    }

    #[test]
    fn test_proportional_result() {
        let result = CheckResult::proportional("Pinned-Dependencies", "unpinned", 8, 10);
        assert_eq!(result.score, 8);
        assert!(result.reason.contains("normalized to 8"));

        let clamped = CheckResult::proportional("X", "r", 30, 10);
        assert_eq!(clamped.score, MAX_RESULT_SCORE);
    }

    #[test]
    fn test_runtime_error_result() {
        let err = CheckError::invalid_dockerfile("Dockerfile", "empty RUN");
        let result = CheckResult::runtime_error("Pinned-Dependencies", &err);
        assert_eq!(result.score, INCONCLUSIVE_RESULT_SCORE);
        assert!(result.is_runtime_error());
        assert!(result.reason.contains("empty RUN"));
    }

    #[test]
    fn test_sub_score_values() {
        assert_eq!(SubScore::Inconclusive.value(), INCONCLUSIVE_RESULT_SCORE);
        assert_eq!(SubScore::Inconclusive.floored(), MIN_RESULT_SCORE);
        assert_eq!(SubScore::max().floored(), MAX_RESULT_SCORE);
    }
}
