//! Per-run workflow state: the unit of persistence and of consistency.
//!
//! The controller owns all mutations; the session store publishes whole
//! snapshots so pollers never observe a half-updated record.

use crate::types::{ExecutiveReport, ResearchArtifact, RunStatus, StepKind, StepProgress};
use crate::validator::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Opaque unique run identifier.
    pub session_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Ordered, deduplicated subject names; fixed for the run's lifetime.
    pub subjects: Vec<String>,
    /// The research angle applied across all subjects.
    pub topic: String,
    pub max_age_days: u32,
    pub min_sources: usize,

    /// Per-step progress, keyed by step kind.
    pub steps: BTreeMap<StepKind, StepProgress>,

    /// Artifacts committed by the research step.
    pub artifacts: Vec<ResearchArtifact>,
    /// Report committed by the synthesis step, exactly once per run.
    pub report: Option<ExecutiveReport>,

    /// Every recoverable failure encountered, in order.
    pub error_messages: Vec<String>,
    /// Progress log for pollers.
    pub messages: Vec<String>,

    /// Last validation decision, if validation has run.
    pub decision: Option<Decision>,
    /// Number of research retries consumed (0 or 1).
    pub retry_count: u32,
}

impl WorkflowState {
    /// Create the initial state for a new run.
    pub fn new(
        session_id: impl Into<String>,
        subjects: Vec<String>,
        topic: impl Into<String>,
        max_age_days: u32,
        min_sources: usize,
    ) -> Self {
        let now = Utc::now();
        let mut steps = BTreeMap::new();
        steps.insert(StepKind::Research, StepProgress::pending(StepKind::Research));
        steps.insert(
            StepKind::Synthesis,
            StepProgress::pending(StepKind::Synthesis),
        );

        Self {
            session_id: session_id.into(),
            status: RunStatus::Pending,
            created_at: now,
            updated_at: now,
            subjects,
            topic: topic.into(),
            max_age_days,
            min_sources,
            steps,
            artifacts: Vec::new(),
            report: None,
            error_messages: Vec::new(),
            messages: Vec::new(),
            decision: None,
            retry_count: 0,
        }
    }

    /// Bump the updated-at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Mutable access to a step's progress record.
    pub fn step_mut(&mut self, kind: StepKind) -> &mut StepProgress {
        self.steps
            .entry(kind)
            .or_insert_with(|| StepProgress::pending(kind))
    }

    /// Append a progress message.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
        self.touch();
    }

    /// Record a recoverable failure.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.error_messages.push(message.into());
        self.touch();
    }

    /// The last `limit` progress messages, oldest first.
    pub fn recent_messages(&self, limit: usize) -> Vec<String> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages[skip..].to_vec()
    }

    /// Condense into a listing summary.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            subjects: self.subjects.clone(),
            topic: self.topic.clone(),
        }
    }
}

/// Summary of one run for session listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub subjects: Vec<String>,
    pub topic: String,
}
