//! The two-step intelligence pipeline and its controlling state machine.

pub mod machine;
pub mod research;
pub mod state;
pub mod synthesis;

pub use machine::{PollSnapshot, RunHandle, WorkflowController};
pub use research::ResearchStep;
pub use state::{SessionSummary, WorkflowState};
pub use synthesis::SynthesisStep;
