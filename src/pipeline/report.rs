//! Run reports
//!
//! Every run produces a report, successful or not; failures are data.

use super::stage::Stage;
use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Outcome of a single committed stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub nodes_processed: usize,
    pub summary: Map<String, Value>,
    pub topology_version: u64,
}

/// Result of `run_algorithm`
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmRunReport {
    pub run_id: Uuid,
    pub algorithm: String,
    pub status: RunStatus,
    pub execution_time_ms: u64,
    pub nodes_processed: usize,
    pub summary: Map<String, Value>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    pub retryable: bool,
    /// Unix milliseconds
    pub started_at: i64,
    #[serde(skip)]
    pub error: Option<AnalyticsError>,
}

impl AlgorithmRunReport {
    pub(crate) fn completed(run_id: Uuid, outcome: StageOutcome, execution_time_ms: u64, started_at: i64) -> Self {
        AlgorithmRunReport {
            run_id,
            algorithm: outcome.stage.name().to_string(),
            status: RunStatus::Completed,
            execution_time_ms,
            nodes_processed: outcome.nodes_processed,
            message: format!(
                "{} completed for {} accounts",
                outcome.stage, outcome.nodes_processed
            ),
            summary: outcome.summary,
            error_kind: None,
            retryable: false,
            started_at,
            error: None,
        }
    }

    pub(crate) fn failed(
        run_id: Uuid,
        algorithm: impl Into<String>,
        error: AnalyticsError,
        execution_time_ms: u64,
        started_at: i64,
    ) -> Self {
        AlgorithmRunReport {
            run_id,
            algorithm: algorithm.into(),
            status: RunStatus::Failed,
            execution_time_ms,
            nodes_processed: 0,
            summary: Map::new(),
            message: error.to_string(),
            error_kind: Some(error.kind()),
            retryable: error.is_retryable(),
            started_at,
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Result of `run_all`
///
/// Stages committed before a failure stay committed and are listed in
/// `completed`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub stages: Vec<AlgorithmRunReport>,
    pub completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub execution_time_ms: u64,
    pub message: String,
}

impl PipelineReport {
    pub(crate) fn finish(run_id: Uuid, stages: Vec<AlgorithmRunReport>, execution_time_ms: u64) -> Self {
        let completed: Vec<String> = stages
            .iter()
            .filter(|s| s.is_completed())
            .map(|s| s.algorithm.clone())
            .collect();
        let failure = stages.iter().find(|s| !s.is_completed());

        let (status, failed_stage, message) = match failure {
            None => (
                RunStatus::Completed,
                None,
                format!("Pipeline completed: {} stages", completed.len()),
            ),
            Some(failed) => (
                RunStatus::Failed,
                Some(failed.algorithm.clone()),
                format!(
                    "Pipeline stopped at {}: {} ({} stage(s) committed)",
                    failed.algorithm,
                    failed.message,
                    completed.len()
                ),
            ),
        };

        PipelineReport {
            run_id,
            status,
            stages,
            completed,
            failed_stage,
            execution_time_ms,
            message,
        }
    }

    /// Report for a run that never reached its first stage
    pub(crate) fn not_started(run_id: Uuid, error: &AnalyticsError, execution_time_ms: u64) -> Self {
        PipelineReport {
            run_id,
            status: RunStatus::Failed,
            stages: Vec::new(),
            completed: Vec::new(),
            failed_stage: None,
            execution_time_ms,
            message: format!("Pipeline not started: {}", error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Report of a given stage, if it ran
    pub fn stage(&self, stage: Stage) -> Option<&AlgorithmRunReport> {
        self.stages.iter().find(|s| s.algorithm == stage.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_report_serialises_as_data() {
        let report = AlgorithmRunReport::failed(
            Uuid::new_v4(),
            "closeness",
            AnalyticsError::UnknownAlgorithm("closeness".into()),
            0,
            0,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "unknown_algorithm");
        assert_eq!(json["retryable"], false);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_pipeline_report_partial_success() {
        let run_id = Uuid::new_v4();
        let ok = AlgorithmRunReport::completed(
            run_id,
            StageOutcome {
                stage: Stage::Degree,
                nodes_processed: 3,
                summary: Map::new(),
                topology_version: 1,
            },
            1,
            0,
        );
        let failed = AlgorithmRunReport::failed(
            run_id,
            "pagerank",
            AnalyticsError::Cancelled("before pagerank".into()),
            0,
            0,
        );
        let report = PipelineReport::finish(run_id, vec![ok, failed], 2);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.completed, vec!["degree".to_string()]);
        assert_eq!(report.failed_stage.as_deref(), Some("pagerank"));
        assert!(report.stage(Stage::Degree).unwrap().is_completed());
        assert!(report.message.contains("1 stage(s) committed"));
    }
}
