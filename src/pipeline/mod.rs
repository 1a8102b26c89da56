//! Analytics pipeline
//!
//! Stages run in dependency order (degree, PageRank, betweenness, community
//! detection, bottleneck scoring). Each stage commits atomically; a failed
//! stage stops the pipeline but keeps what earlier stages committed.

pub mod orchestrator;
pub mod report;
pub mod stage;

pub use orchestrator::{PipelineOrchestrator, PipelineState, RunOptions};
pub use report::{AlgorithmRunReport, PipelineReport, RunStatus, StageOutcome};
pub use stage::{available_algorithms, AlgorithmInfo, Stage};
