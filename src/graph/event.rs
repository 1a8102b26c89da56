//! Graph events for async processing
//!
//! Emitted after every successful stage commit so a cache in front of the
//! read path can drop results keyed on the stage's outputs.

use super::types::AccountId;
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};

/// Which accounts a commit touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    All,
    Accounts(Vec<AccountId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributesUpdated {
    pub algorithm: Stage,
    pub scope: UpdateScope,
    /// Topology version the committed values were computed from
    pub topology_version: u64,
    /// Commit time (Unix milliseconds)
    pub committed_at: i64,
}
