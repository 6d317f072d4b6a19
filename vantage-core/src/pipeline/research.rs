//! Research step: produces one artifact per subject, cache-first.
//!
//! Subjects are researched strictly in target-list order; progress reserves
//! the final 20% for post-loop validation bookkeeping. A subject whose
//! primary and fallback calls both fail is recorded as missing and the loop
//! continues. Nothing in this step fails the run.

use crate::cache::ResearchCache;
use crate::error::ProviderError;
use crate::parse::ResponseParser;
use crate::pipeline::WorkflowState;
use crate::providers::ResearchProvider;
use crate::session_store::SessionStore;
use crate::types::{ResearchArtifact, StepKind};
use crate::validator;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Executes the research pass over a run's subject list.
pub struct ResearchStep {
    provider: Arc<dyn ResearchProvider>,
    parser: Arc<dyn ResponseParser>,
    cache: Arc<ResearchCache>,
}

impl ResearchStep {
    pub fn new(
        provider: Arc<dyn ResearchProvider>,
        parser: Arc<dyn ResponseParser>,
        cache: Arc<ResearchCache>,
    ) -> Self {
        Self {
            provider,
            parser,
            cache,
        }
    }

    /// Run the step, publishing progress to `store` as it goes.
    pub async fn execute(&self, state: &mut WorkflowState, store: &dyn SessionStore) {
        info!(session_id = %state.session_id, "starting deep research");

        state
            .step_mut(StepKind::Research)
            .begin("Initializing research");
        state.touch();
        store.put(state);

        let subjects = state.subjects.clone();
        let total = subjects.len();
        let mut results: Vec<ResearchArtifact> = Vec::new();

        for (i, subject) in subjects.iter().enumerate() {
            info!(subject, index = i + 1, total, "researching subject");

            // Final 20% is reserved for post-loop bookkeeping.
            let progress = (i * 80 / total.max(1)) as u8;
            state
                .step_mut(StepKind::Research)
                .update(format!("Checking cache for {subject}"), progress);
            state.touch();
            store.put(state);

            if let Some(cached) = self.cache.lookup(subject, &state.topic) {
                state.step_mut(StepKind::Research).update(
                    format!(
                        "Used cached data for {subject} - {} sources",
                        cached.sources.len()
                    ),
                    progress,
                );
                results.push(cached);
                state.touch();
                store.put(state);
                continue;
            }

            state
                .step_mut(StepKind::Research)
                .update(format!("Searching sources for {subject}"), progress);
            state.touch();
            store.put(state);

            match self
                .research_subject(subject, &state.topic, state.max_age_days)
                .await
            {
                Ok(artifact) => {
                    self.cache.store(subject, &state.topic, &artifact);
                    state.step_mut(StepKind::Research).update(
                        format!(
                            "Completed fresh research for {subject} - found {} sources",
                            artifact.sources.len()
                        ),
                        progress,
                    );
                    results.push(artifact);
                }
                Err(e) => {
                    warn!(subject, error = %e, "research failed for subject, continuing");
                    state.push_error(format!("Research failed for {subject}: {e}"));
                    state
                        .step_mut(StepKind::Research)
                        .update(format!("No data found for {subject}"), progress);
                }
            }
            state.touch();
            store.put(state);
        }

        state
            .step_mut(StepKind::Research)
            .update("Processing research results", 90);
        state.touch();
        store.put(state);

        let validated = validator::score(results, state.min_sources);
        let artifact_count = validated.artifacts.len();
        let source_total: usize = validated.artifacts.iter().map(|a| a.sources.len()).sum();
        state.artifacts = validated.artifacts;

        state
            .step_mut(StepKind::Research)
            .complete("Research completed");
        state.push_message(format!(
            "Deep research completed for {artifact_count} subjects with {source_total} total sources"
        ));
        store.put(state);

        info!(
            session_id = %state.session_id,
            artifacts = artifact_count,
            "deep research completed"
        );
    }

    /// Research one subject: primary deep-research call with one automatic
    /// fallback to the lower-capability mode.
    async fn research_subject(
        &self,
        subject: &str,
        topic: &str,
        max_age_days: u32,
    ) -> Result<ResearchArtifact, ProviderError> {
        let query = build_research_query(subject, topic, max_age_days);

        let content = match self.provider.deep_research(&query).await {
            Ok(content) => content,
            Err(primary) => {
                warn!(subject, error = %primary, "primary research call failed, trying fallback");
                self.provider.fallback_research(&query).await?
            }
        };

        Ok(self.parser.artifact(subject, &content))
    }
}

/// Build the extraction query for one subject.
fn build_research_query(subject: &str, topic: &str, max_age_days: u32) -> String {
    let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
    let cutoff = cutoff.format("%Y-%m-%d");

    format!(
        "Research {subject} with a focus on: {topic}.\n\
         \n\
         Find recent information about:\n\
         1. {subject} AI strategy and narrative announcements\n\
         2. New AI product launches and service offerings by {subject}\n\
         3. {subject} AI partnerships, acquisitions, and investments\n\
         4. {subject} market positioning in AI and IT services\n\
         5. Leadership statements from {subject} executives about AI direction\n\
         \n\
         Search official press releases, earnings calls, analyst reports, and\n\
         technology news published since {cutoff}.\n\
         \n\
         Provide specific initiatives with their business impact, market\n\
         positioning insights, and source URLs with publication dates."
    )
}
