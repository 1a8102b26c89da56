//! Record of the last commit of every stage
//!
//! Freshness is judged against the store's topology version: a stage output
//! is fresh when it was computed from the topology that is current now.

use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub topology_version: u64,
    /// Unix milliseconds
    pub committed_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageLedger {
    records: [Option<StageRecord>; Stage::COUNT],
}

impl StageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, topology_version: u64, committed_at: i64) {
        self.records[stage.ordinal()] = Some(StageRecord {
            topology_version,
            committed_at,
        });
    }

    pub fn last(&self, stage: Stage) -> Option<StageRecord> {
        self.records[stage.ordinal()]
    }

    pub fn is_fresh(&self, stage: Stage, topology_version: u64) -> bool {
        self.last(stage)
            .map(|record| record.topology_version == topology_version)
            .unwrap_or(false)
    }

    pub(crate) fn forget(&mut self, stage: Stage) {
        self.records[stage.ordinal()] = None;
    }
}
