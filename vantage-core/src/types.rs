//! Fundamental types for the Vantage intelligence pipeline.
//!
//! Defines the run/step status model, research artifacts with their cited
//! sources, executive insights, and the compiled report. Serde field names on
//! `ResearchArtifact` and `ResearchSource` are a compatibility surface: cache
//! files written by earlier deployments must keep deserializing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a run or of a single step executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet picked up.
    Pending,
    /// Actively executing.
    InProgress,
    /// Finished with a report.
    Completed,
    /// Finished without a report.
    Failed,
}

impl RunStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The two step executors in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Research,
    Synthesis,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Research => "research",
            StepKind::Synthesis => "synthesis",
        }
    }
}

/// Progress record for one step executor.
///
/// Mutated only by the owning step; read by the controller and by pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    pub step: StepKind,
    pub status: RunStatus,
    /// Free-text description of what the step is doing right now.
    pub current_task: Option<String>,
    /// Completion percentage, 0..=100.
    pub progress_percentage: u8,
    pub error_message: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl StepProgress {
    /// A fresh record in the pending state.
    pub fn pending(step: StepKind) -> Self {
        Self {
            step,
            status: RunStatus::Pending,
            current_task: None,
            progress_percentage: 0,
            error_message: None,
            last_updated: Utc::now(),
        }
    }

    /// Mark the step as started.
    pub fn begin(&mut self, task: impl Into<String>) {
        self.status = RunStatus::InProgress;
        self.current_task = Some(task.into());
        self.progress_percentage = 0;
        self.last_updated = Utc::now();
    }

    /// Update the current task and percentage.
    pub fn update(&mut self, task: impl Into<String>, percentage: u8) {
        self.current_task = Some(task.into());
        self.progress_percentage = percentage.min(100);
        self.last_updated = Utc::now();
    }

    /// Mark the step as completed.
    pub fn complete(&mut self, task: impl Into<String>) {
        self.status = RunStatus::Completed;
        self.current_task = Some(task.into());
        self.progress_percentage = 100;
        self.last_updated = Utc::now();
    }

    /// Mark the step as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error_message = Some(error.into());
        self.last_updated = Utc::now();
    }
}

/// Category of a cited research source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Report,
    PressRelease,
    EarningsCall,
    News,
    Research,
    Whitepaper,
}

/// A source backing a research artifact. Owned by its parent artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSource {
    pub url: String,
    pub title: String,
    #[serde(rename = "source_type")]
    pub kind: SourceKind,
    pub publication_date: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<String>,
    /// How trustworthy the source is, 0.0..=1.0.
    pub credibility_score: f64,
}

/// Structured output of researching one subject. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchArtifact {
    /// The subject this artifact describes.
    pub competitor: String,
    /// Narrative summary of the subject's AI strategy.
    pub ai_narrative: String,
    /// Ordered initiative strings extracted from the research.
    pub key_initiatives: Vec<String>,
    #[serde(default)]
    pub investment_data: Option<serde_json::Value>,
    pub market_positioning: String,
    pub sources: Vec<ResearchSource>,
    #[serde(rename = "research_timestamp")]
    pub generated_at: DateTime<Utc>,
    /// Overall confidence in the extraction, 0.0..=1.0.
    pub confidence_score: f64,
}

impl ResearchArtifact {
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

/// Category of an executive insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Threat,
    Opportunity,
    Trend,
    Action,
}

/// Priority of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Suggested action horizon for an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Immediate,
    ShortTerm,
    LongTerm,
}

/// A single categorized insight in the executive report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "insight_type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub business_impact: String,
    pub recommended_action: String,
    pub priority: Priority,
    pub timeline: Timeline,
}

/// The compiled report for one run. Produced exactly once, immutable after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub report_id: Uuid,
    #[serde(rename = "generation_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub executive_summary: String,
    pub key_insights: Vec<Insight>,
    /// The full artifact collection the report was derived from.
    pub competitor_analysis: Vec<ResearchArtifact>,
    pub market_opportunities: Vec<String>,
    pub strategic_recommendations: Vec<String>,
    pub data_sources_count: usize,
    /// Human-readable label like "Last 60 days".
    pub research_timeframe: String,
}
