//! Pipeline orchestrator
//!
//! Sequences the stages over a shared graph. Each stage snapshots the graph
//! under the read lock, computes outside any lock, then commits all of its
//! attributes in one write critical section. A run holds the graph's write
//! lease from start to finish, so two runs never interleave commits and
//! ingestion cannot change the topology underneath a run.

use super::report::{AlgorithmRunReport, PipelineReport, StageOutcome};
use super::stage::{available_algorithms, AlgorithmInfo, Stage};
use crate::algo;
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::graph::{AttributesUpdated, SharedGraph, UpdateScope, WriteLease};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Orchestrator state machine: `Idle -> Running(stage) -> Idle | Failed`
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Failed { stage: Stage, message: String },
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Iteration count for PageRank and label propagation
    pub iterations: Option<usize>,
    pub damping: Option<f64>,
    pub threshold: Option<f64>,
    /// Queue behind an active run for at most this long instead of failing fast
    pub wait: Option<Duration>,
    /// Checked between stages and while queued
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = Some(damping);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn wait_for(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(CancellationToken::is_cancelled).unwrap_or(false)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

pub struct PipelineOrchestrator {
    graph: SharedGraph,
    config: AnalyticsConfig,
    state: Mutex<PipelineState>,
    /// Cache invalidation signal, one event per committed stage
    notifier: Option<UnboundedSender<AttributesUpdated>>,
}

impl PipelineOrchestrator {
    pub fn new(graph: SharedGraph, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(PipelineOrchestrator {
            graph,
            config,
            state: Mutex::new(PipelineState::Idle),
            notifier: None,
        })
    }

    /// Emit an `AttributesUpdated` event after every successful commit
    pub fn with_invalidation_channel(mut self) -> (Self, UnboundedReceiver<AttributesUpdated>) {
        let (tx, rx) = unbounded_channel();
        self.notifier = Some(tx);
        (self, rx)
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = next;
    }

    pub fn available_algorithms(&self) -> Vec<AlgorithmInfo> {
        available_algorithms()
    }

    fn effective_config(&self, options: &RunOptions) -> AnalyticsResult<AnalyticsConfig> {
        let mut config = self.config.clone();
        if let Some(iterations) = options.iterations {
            config.pagerank.iterations = iterations;
            config.community.iterations = iterations;
        }
        if let Some(damping) = options.damping {
            config.pagerank.damping_factor = damping;
        }
        if let Some(threshold) = options.threshold {
            config.bottleneck.threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }

    fn acquire(&self, holder: &str, options: &RunOptions) -> AnalyticsResult<WriteLease> {
        self.graph.lease(
            holder,
            options.wait,
            self.config.pipeline.lock_poll_interval(),
            options.cancel.as_ref(),
        )
    }

    /// Snapshot, compute and commit one stage under an already held lease
    fn execute_stage(
        &self,
        lease: &WriteLease,
        stage: Stage,
        config: &AnalyticsConfig,
    ) -> AnalyticsResult<StageOutcome> {
        let span = info_span!("stage", stage = %stage);
        let _enter = span.enter();
        self.set_state(PipelineState::Running(stage));
        info!("stage started");

        let snapshot = self.graph.read()?.snapshot()?;
        debug!(
            accounts = snapshot.node_count(),
            topology_version = snapshot.topology_version,
            "snapshot taken"
        );
        let output = algo::compute_stage(stage, &snapshot, config)?;
        let nodes_processed = output.nodes_processed();
        let committed_at = chrono::Utc::now().timestamp_millis();
        self.graph
            .write()?
            .commit_stage(lease, stage, output.patches, snapshot.topology_version)?;
        info!(accounts = nodes_processed, "stage committed");

        if let Some(tx) = &self.notifier {
            let event = AttributesUpdated {
                algorithm: stage,
                scope: UpdateScope::All,
                topology_version: snapshot.topology_version,
                committed_at,
            };
            if tx.send(event).is_err() {
                debug!("invalidation receiver dropped");
            }
        }

        Ok(StageOutcome {
            stage,
            nodes_processed,
            summary: output.summary,
            topology_version: snapshot.topology_version,
        })
    }

    fn record_failure(&self, stage: Stage, error: &AnalyticsError) {
        warn!(stage = %stage, kind = error.kind(), "stage failed: {}", error);
        self.set_state(PipelineState::Failed {
            stage,
            message: error.to_string(),
        });
    }

    /// Run one stage, holding the write lease for its duration
    pub fn run(&self, stage: Stage, options: &RunOptions) -> AnalyticsResult<StageOutcome> {
        let config = self.effective_config(options)?;
        if options.is_cancelled() {
            return Err(AnalyticsError::Cancelled(format!("before {}", stage)));
        }
        let lease = self.acquire(stage.name(), options)?;
        let result = self.execute_stage(&lease, stage, &config);
        drop(lease);

        match &result {
            Ok(_) => self.set_state(PipelineState::Idle),
            Err(error) => self.record_failure(stage, error),
        }
        result
    }

    /// Run an algorithm by name. Never fails; errors are reported in the result.
    pub fn run_algorithm(&self, name: &str, options: &RunOptions) -> AlgorithmRunReport {
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now().timestamp_millis();
        let timer = Instant::now();

        let stage = match name.parse::<Stage>() {
            Ok(stage) => stage,
            Err(error) => {
                warn!(algorithm = name, "unknown algorithm requested");
                return AlgorithmRunReport::failed(run_id, name, error, elapsed_ms(timer), started_at);
            }
        };

        match self.run(stage, options) {
            Ok(outcome) => AlgorithmRunReport::completed(run_id, outcome, elapsed_ms(timer), started_at),
            Err(error) => AlgorithmRunReport::failed(run_id, stage.name(), error, elapsed_ms(timer), started_at),
        }
    }

    /// Run every stage in dependency order under one lease
    ///
    /// Stops at the first failure; stages committed before it stay committed.
    /// Cancellation is honoured between stages.
    pub fn run_all(&self, options: &RunOptions) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let timer = Instant::now();
        let span = info_span!("pipeline", run_id = %run_id);
        let _enter = span.enter();

        let prepared = self
            .effective_config(options)
            .and_then(|config| self.acquire("pipeline", options).map(|lease| (config, lease)));
        let (config, lease) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(kind = error.kind(), "pipeline not started: {}", error);
                return PipelineReport::not_started(run_id, &error, elapsed_ms(timer));
            }
        };

        let mut stages = Vec::with_capacity(Stage::COUNT);
        for stage in Stage::ALL {
            let started_at = chrono::Utc::now().timestamp_millis();
            let stage_timer = Instant::now();

            let result = if options.is_cancelled() {
                Err(AnalyticsError::Cancelled(format!("before {}", stage)))
            } else {
                self.execute_stage(&lease, stage, &config)
            };

            match result {
                Ok(outcome) => stages.push(AlgorithmRunReport::completed(
                    run_id,
                    outcome,
                    elapsed_ms(stage_timer),
                    started_at,
                )),
                Err(error) => {
                    self.record_failure(stage, &error);
                    stages.push(AlgorithmRunReport::failed(
                        run_id,
                        stage.name(),
                        error,
                        elapsed_ms(stage_timer),
                        started_at,
                    ));
                    break;
                }
            }
        }
        drop(lease);

        let report = PipelineReport::finish(run_id, stages, elapsed_ms(timer));
        if report.is_completed() {
            self.set_state(PipelineState::Idle);
            info!(elapsed_ms = report.execution_time_ms, "pipeline completed");
        }
        report
    }

    /// Run the full pipeline on the blocking thread pool
    pub async fn spawn_run_all(self: Arc<Self>, options: RunOptions) -> PipelineReport {
        let run_id = Uuid::new_v4();
        match tokio::task::spawn_blocking(move || self.run_all(&options)).await {
            Ok(report) => report,
            Err(join_error) => {
                let error = AnalyticsError::GraphCorrupted(format!("pipeline task aborted: {}", join_error));
                PipelineReport::not_started(run_id, &error, 0)
            }
        }
    }
}
