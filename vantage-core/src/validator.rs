//! Research quality scoring and the proceed/retry/fail gate.
//!
//! Two pure functions: `score` keeps every non-null artifact but flags the
//! under-sourced ones, and `decide` applies the coverage thresholds that
//! gate progression to synthesis. The thresholds are asymmetric on purpose:
//! 70% coverage proceeds, 50% earns a retry, and a single-subject run
//! proceeds with any one valid result.

use crate::types::ResearchArtifact;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Minimum confidence for an artifact to count toward coverage.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Outcome of the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Enough coverage; continue to synthesis.
    Proceed,
    /// Marginal coverage; rerun research once.
    Retry,
    /// Insufficient coverage; abort the run.
    Fail,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Proceed => "proceed",
            Decision::Retry => "retry",
            Decision::Fail => "fail",
        };
        write!(f, "{s}")
    }
}

/// Result of scoring a research batch.
#[derive(Debug, Clone)]
pub struct ValidatedSet {
    /// Every artifact, in input order. Under-sourced results are retained.
    pub artifacts: Vec<ResearchArtifact>,
    /// Subjects whose artifact fell below the `min_sources` threshold.
    pub flagged: Vec<String>,
}

/// Score a batch of artifacts against the source-count threshold.
///
/// Under-sourced artifacts are flagged and logged but never dropped; the
/// coverage decision is made separately by [`decide`].
pub fn score(artifacts: Vec<ResearchArtifact>, min_sources: usize) -> ValidatedSet {
    let mut flagged = Vec::new();

    for artifact in &artifacts {
        if artifact.sources.len() < min_sources {
            warn!(
                subject = %artifact.competitor,
                sources = artifact.sources.len(),
                min_sources,
                "subject has fewer sources than the minimum, keeping anyway"
            );
            flagged.push(artifact.competitor.clone());
        }
    }

    ValidatedSet { artifacts, flagged }
}

/// Decide whether a research batch is good enough to synthesize.
///
/// `target_count` is the number of subjects the run was asked to cover.
pub fn decide(artifacts: &[ResearchArtifact], target_count: usize) -> Decision {
    let valid = artifacts
        .iter()
        .filter(|a| a.confidence_score >= MIN_CONFIDENCE)
        .count();
    let total_sources: usize = artifacts
        .iter()
        .filter(|a| a.confidence_score >= MIN_CONFIDENCE)
        .map(|a| a.sources.len())
        .sum();

    let decision = if target_count == 1 && valid >= 1 {
        // A single-subject run succeeds with its one result regardless of
        // the percentage thresholds.
        Decision::Proceed
    } else if valid as f64 >= 0.7 * target_count as f64 {
        Decision::Proceed
    } else if valid as f64 >= 0.5 * target_count as f64 {
        Decision::Retry
    } else {
        Decision::Fail
    };

    match decision {
        Decision::Proceed => {
            info!(valid, target_count, total_sources, "validation passed")
        }
        Decision::Retry => {
            warn!(valid, target_count, "validation marginal, considering retry")
        }
        Decision::Fail => {
            warn!(valid, target_count, "validation failed")
        }
    }

    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResearchSource, SourceKind};
    use chrono::Utc;

    fn artifact(subject: &str, confidence: f64, source_count: usize) -> ResearchArtifact {
        let sources = (0..source_count)
            .map(|i| ResearchSource {
                url: format!("https://example.com/{subject}/{i}"),
                title: format!("{subject} source {i}"),
                kind: SourceKind::News,
                publication_date: Utc::now(),
                author: None,
                credibility_score: 0.8,
            })
            .collect();
        ResearchArtifact {
            competitor: subject.to_string(),
            ai_narrative: "narrative".into(),
            key_initiatives: vec!["initiative".into()],
            investment_data: None,
            market_positioning: "positioning".into(),
            sources,
            generated_at: Utc::now(),
            confidence_score: confidence,
        }
    }

    fn batch(valid: usize, invalid: usize) -> Vec<ResearchArtifact> {
        let mut artifacts = Vec::new();
        for i in 0..valid {
            artifacts.push(artifact(&format!("valid{i}"), 0.8, 3));
        }
        for i in 0..invalid {
            artifacts.push(artifact(&format!("weak{i}"), 0.3, 1));
        }
        artifacts
    }

    #[test]
    fn test_decide_70_percent_proceeds() {
        // target 8, 6 valid: 6 >= 5.6
        assert_eq!(decide(&batch(6, 2), 8), Decision::Proceed);
    }

    #[test]
    fn test_decide_50_percent_retries() {
        // target 8, 4 valid: 4 >= 4.0 but < 5.6
        assert_eq!(decide(&batch(4, 4), 8), Decision::Retry);
    }

    #[test]
    fn test_decide_below_50_percent_fails() {
        // target 8, 3 valid: 3 < 4.0
        assert_eq!(decide(&batch(3, 5), 8), Decision::Fail);
    }

    #[test]
    fn test_decide_single_subject_exception() {
        assert_eq!(decide(&batch(1, 0), 1), Decision::Proceed);
        assert_eq!(decide(&batch(0, 1), 1), Decision::Fail);
    }

    #[test]
    fn test_decide_exact_boundary_confidence_counts() {
        let artifacts = vec![artifact("edge", MIN_CONFIDENCE, 3)];
        assert_eq!(decide(&artifacts, 1), Decision::Proceed);
    }

    #[test]
    fn test_decide_empty_batch_fails() {
        assert_eq!(decide(&[], 3), Decision::Fail);
    }

    #[test]
    fn test_score_retains_under_sourced_artifacts() {
        let artifacts = vec![artifact("rich", 0.9, 5), artifact("thin", 0.9, 1)];
        let validated = score(artifacts, 3);
        assert_eq!(validated.artifacts.len(), 2);
        assert_eq!(validated.flagged, vec!["thin".to_string()]);
    }

    #[test]
    fn test_score_no_flags_when_all_sufficient() {
        let artifacts = vec![artifact("a", 0.9, 3), artifact("b", 0.9, 4)];
        let validated = score(artifacts, 3);
        assert!(validated.flagged.is_empty());
    }
}
