//! Error taxonomy for the analytics engine

use crate::pipeline::Stage;
use thiserror::Error;

/// Errors raised by the graph store, the pipeline and the read path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// An operation referenced an account that does not exist
    #[error("Invalid reference: account {0} does not exist")]
    InvalidReference(String),

    #[error("Account {0} already exists")]
    DuplicateAccount(String),

    #[error("Account {0} cannot follow itself")]
    SelfLoop(String),

    #[error("Invalid value for {field} on account {account}: {reason}")]
    InvalidAttribute {
        account: String,
        field: &'static str,
        reason: String,
    },

    /// A stage was run before its prerequisite produced fresh results
    #[error("Missing dependency: {stage} requires {missing} ({reason})")]
    MissingDependency {
        stage: Stage,
        missing: Stage,
        reason: String,
    },

    #[error("Unknown algorithm: {0}. Available: degree, pagerank, betweenness, louvain, bottleneck")]
    UnknownAlgorithm(String),

    /// Another run holds the graph's write lease
    #[error("Pipeline busy: {0}")]
    PipelineBusy(String),

    /// Structural or attribute mutation attempted while a run holds the write lease
    #[error("Graph locked: {0}")]
    GraphLocked(String),

    /// An internal invariant does not hold; the run halts
    #[error("Graph corrupted: {0}")]
    GraphCorrupted(String),

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

impl AnalyticsError {
    /// Stable snake_case name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsError::InvalidReference(_) => "invalid_reference",
            AnalyticsError::DuplicateAccount(_) => "duplicate_account",
            AnalyticsError::SelfLoop(_) => "self_loop",
            AnalyticsError::InvalidAttribute { .. } => "invalid_attribute",
            AnalyticsError::MissingDependency { .. } => "missing_dependency",
            AnalyticsError::UnknownAlgorithm(_) => "unknown_algorithm",
            AnalyticsError::PipelineBusy(_) => "pipeline_busy",
            AnalyticsError::GraphLocked(_) => "graph_locked",
            AnalyticsError::GraphCorrupted(_) => "graph_corrupted",
            AnalyticsError::Cancelled(_) => "cancelled",
            AnalyticsError::InvalidConfig(_) => "invalid_config",
            AnalyticsError::Io(_) => "io",
        }
    }

    /// Contention errors are safe to retry; everything else is not
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalyticsError::PipelineBusy(_) | AnalyticsError::GraphLocked(_)
        )
    }

    /// Errors caused by the caller's input rather than the engine
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::UnknownAlgorithm(_)
                | AnalyticsError::InvalidReference(_)
                | AnalyticsError::DuplicateAccount(_)
                | AnalyticsError::SelfLoop(_)
                | AnalyticsError::InvalidAttribute { .. }
                | AnalyticsError::InvalidConfig(_)
        )
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(err: std::io::Error) -> Self {
        AnalyticsError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for AnalyticsError {
    fn from(err: serde_yaml::Error) -> Self {
        AnalyticsError::InvalidConfig(err.to_string())
    }
}

impl From<chokepoint_algorithms::AlgorithmError> for AnalyticsError {
    fn from(err: chokepoint_algorithms::AlgorithmError) -> Self {
        AnalyticsError::GraphCorrupted(err.to_string())
    }
}
