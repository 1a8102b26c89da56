//! Follow graph storage
//!
//! This module implements the account/follow data model with:
//! - Accounts in a handle-indexed arena with a descriptive profile
//! - Directed follows with set semantics, indexed in both directions
//! - Computed attributes written by whole-stage atomic commits
//! - A shared handle with a single-writer lease for pipeline runs

pub mod attributes;
pub mod edge;
pub mod event;
pub mod ledger;
pub mod node;
pub mod property;
pub mod shared;
pub mod store;
pub mod types;

// Re-export main types
pub use attributes::{AttributePatch, Metric, NodeAttributes};
pub use edge::Follows;
pub use event::{AttributesUpdated, UpdateScope};
pub use ledger::{StageLedger, StageRecord};
pub use node::Account;
pub use property::{PropertyMap, PropertyValue};
pub use shared::{SharedGraph, WriteLease};
pub use store::{GraphSnapshot, GraphStore};
pub use types::{AccountId, Direction, NodeId};
