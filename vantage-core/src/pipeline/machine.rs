//! Workflow controller: the state machine driving a run end to end.
//!
//! Node order is Research -> Validate -> Synthesis -> Finalize, with a single
//! bounded retry back to Research when validation asks for one. Every
//! transition commits a full state snapshot to the session store before the
//! next node executes, so pollers always see consistent progress.

use crate::cache::{CacheStats, ResearchCache};
use crate::error::{ConfigError, SessionError};
use crate::pipeline::research::ResearchStep;
use crate::pipeline::synthesis::SynthesisStep;
use crate::pipeline::{SessionSummary, WorkflowState};
use crate::session_store::SessionStore;
use crate::types::{ExecutiveReport, RunStatus, StepKind, StepProgress};
use crate::validator::{self, Decision, MIN_CONFIDENCE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum number of research retries per run.
const MAX_RETRIES: u32 = 1;

/// Nodes of the workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkflowNode {
    Research,
    Validate,
    Synthesis,
    Finalize,
}

/// Acknowledgement returned when a run is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct RunHandle {
    pub session_id: String,
    pub status: RunStatus,
    pub message: String,
}

/// Point-in-time view of a run for pollers.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub session_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub subjects: Vec<String>,
    /// Per-step progress keyed by step name.
    pub agents_state: BTreeMap<StepKind, StepProgress>,
    /// The last few progress messages, oldest first.
    pub recent_messages: Vec<String>,
    pub error_messages: Vec<String>,
}

/// Drives runs through the research and synthesis steps.
pub struct WorkflowController {
    research: ResearchStep,
    synthesis: SynthesisStep,
    store: Arc<dyn SessionStore>,
    cache: Arc<ResearchCache>,
}

impl WorkflowController {
    pub fn new(
        research: ResearchStep,
        synthesis: SynthesisStep,
        store: Arc<dyn SessionStore>,
        cache: Arc<ResearchCache>,
    ) -> Self {
        Self {
            research,
            synthesis,
            store,
            cache,
        }
    }

    /// Register a new run. Validates inputs and commits the initial pending
    /// snapshot; the caller then invokes [`run`](Self::run) to execute it.
    pub fn start(
        &self,
        session_id: impl Into<String>,
        subjects: Vec<String>,
        topic: impl Into<String>,
        max_age_days: u32,
        min_sources: usize,
    ) -> Result<RunHandle, ConfigError> {
        let subjects = dedup_preserving_order(subjects);
        if subjects.is_empty() {
            return Err(ConfigError::Invalid {
                message: "at least one research subject is required".into(),
            });
        }
        if !(1..=365).contains(&max_age_days) {
            return Err(ConfigError::Invalid {
                message: format!("max_age_days must be between 1 and 365, got {max_age_days}"),
            });
        }

        let session_id = session_id.into();
        let subject_count = subjects.len();
        let mut state = WorkflowState::new(&session_id, subjects, topic, max_age_days, min_sources);
        state.push_message(format!("Research initiated for {subject_count} competitors"));
        self.store.put(&state);

        info!(%session_id, subjects = subject_count, "run registered");
        Ok(RunHandle {
            session_id,
            status: RunStatus::Pending,
            message: format!("Research initiated for {subject_count} competitors"),
        })
    }

    /// Execute a registered run to completion. Always terminates in a
    /// `Completed` or `Failed` status; the error cases are limited to an
    /// unknown session id.
    pub async fn run(&self, session_id: &str) -> Result<WorkflowState, SessionError> {
        let mut state = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;

        state.status = RunStatus::InProgress;
        state.touch();
        self.store.put(&state);

        let mut node = WorkflowNode::Research;
        loop {
            match node {
                WorkflowNode::Research => {
                    self.research.execute(&mut state, self.store.as_ref()).await;
                    node = WorkflowNode::Validate;
                }
                WorkflowNode::Validate => {
                    node = self.validate(&mut state);
                }
                WorkflowNode::Synthesis => {
                    match self.synthesis.execute(&mut state, self.store.as_ref()).await {
                        Ok(()) => {}
                        Err(e) => {
                            state.push_error(format!("Synthesis failed: {e}"));
                            state.status = RunStatus::Failed;
                        }
                    }
                    node = WorkflowNode::Finalize;
                }
                WorkflowNode::Finalize => {
                    self.finalize(&mut state);
                    self.store.put(&state);
                    return Ok(state);
                }
            }
            self.store.put(&state);
        }
    }

    /// Decide where to go after research based on artifact quality.
    fn validate(&self, state: &mut WorkflowState) -> WorkflowNode {
        if state.artifacts.is_empty() {
            state.push_error("No research data found".to_string());
            state.decision = Some(Decision::Fail);
            self.store.put(state);
            return WorkflowNode::Finalize;
        }

        let decision = validator::decide(&state.artifacts, state.subjects.len());
        let valid = state
            .artifacts
            .iter()
            .filter(|a| a.confidence_score >= MIN_CONFIDENCE)
            .count();
        let sources: usize = state.artifacts.iter().map(|a| a.sources.len()).sum();

        state.decision = Some(decision);
        state.push_message(format!(
            "Research validation: {valid} valid competitors with {sources} sources"
        ));
        info!(
            session_id = %state.session_id,
            %decision,
            valid,
            "research validated"
        );

        match decision {
            Decision::Proceed => WorkflowNode::Synthesis,
            Decision::Retry if state.retry_count < MAX_RETRIES => {
                state.retry_count += 1;
                state.push_message("Retrying research for low-quality results".to_string());
                WorkflowNode::Research
            }
            Decision::Retry => {
                warn!(
                    session_id = %state.session_id,
                    "maximum retries reached, proceeding with available data"
                );
                state.push_message(
                    "Maximum retries reached, proceeding with available data".to_string(),
                );
                WorkflowNode::Synthesis
            }
            Decision::Fail => {
                state.push_error("Research quality below acceptable threshold".to_string());
                WorkflowNode::Finalize
            }
        }
    }

    /// Settle the terminal status. A run completes only with a report.
    fn finalize(&self, state: &mut WorkflowState) {
        if !state.status.is_terminal() {
            state.status = if state.report.is_some() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
        }
        state.push_message(format!("Workflow finished with status: {}", state.status));
        info!(
            session_id = %state.session_id,
            status = %state.status,
            "run finalized"
        );
    }

    /// Last committed snapshot for a session, trimmed for polling.
    pub fn poll(&self, session_id: &str) -> Result<PollSnapshot, SessionError> {
        let state = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;

        Ok(PollSnapshot {
            session_id: state.session_id.clone(),
            status: state.status,
            created_at: state.created_at,
            updated_at: state.updated_at,
            subjects: state.subjects.clone(),
            agents_state: state.steps.clone(),
            recent_messages: state.recent_messages(5),
            error_messages: state.error_messages.clone(),
        })
    }

    /// The compiled report of a completed run.
    pub fn report(&self, session_id: &str) -> Result<ExecutiveReport, SessionError> {
        let state = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;

        if state.status != RunStatus::Completed {
            return Err(SessionError::NotReady {
                session_id: session_id.to_string(),
                status: state.status.to_string(),
            });
        }
        state.report.ok_or_else(|| SessionError::ReportNotFound {
            session_id: session_id.to_string(),
        })
    }

    /// Summaries of all known sessions, newest first.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.store.list()
    }

    /// Remove a session. Returns whether it existed.
    pub fn delete_session(&self, session_id: &str) -> bool {
        self.store.delete(session_id)
    }

    /// Current research cache contents.
    pub fn cache_info(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Evict cache entries, optionally limited to one subject. Returns the
    /// number of entries removed.
    pub fn cache_clear(&self, subject: Option<&str>) -> usize {
        self.cache.evict(subject)
    }

    /// Delete expired cache entries. Returns the number removed.
    pub fn cache_sweep_expired(&self) -> usize {
        self.cache.sweep_expired()
    }
}

/// Drop repeated subjects, keeping the first occurrence's position.
fn dedup_preserving_order(subjects: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    subjects
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
