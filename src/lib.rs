//! Chokepoint
//!
//! In-memory analytics over a directed social graph (accounts and follows)
//! that finds "bottleneck" accounts: the ones structurally critical for
//! connecting otherwise separate clusters.
//!
//! # Architecture
//!
//! - [`graph`]: the account/follow store, computed attributes, snapshots and
//!   the single-writer lease
//! - [`algo`]: adapter from store snapshots to the `chokepoint-algorithms`
//!   kernels (degree, PageRank, approximate betweenness, label propagation,
//!   bottleneck scoring)
//! - [`pipeline`]: stage sequencing, dependency checks, atomic commits and
//!   run reports
//! - [`query`]: read-only attribute queries and analysis reports
//!
//! # Example
//!
//! ```rust
//! use chokepoint::{AnalyticsConfig, GraphStore, NodeQuery, PipelineOrchestrator, PropertyMap, RunOptions, SharedGraph};
//!
//! let mut store = GraphStore::new();
//! for key in ["ada", "grace", "alan"] {
//!     store.add_account(key, PropertyMap::new()).unwrap();
//! }
//! store.add_follow("ada", "grace").unwrap();
//! store.add_follow("grace", "alan").unwrap();
//!
//! let graph = SharedGraph::new(store);
//! let orchestrator = PipelineOrchestrator::new(graph.clone(), AnalyticsConfig::default()).unwrap();
//! let report = orchestrator.run_all(&RunOptions::default());
//! assert!(report.is_completed());
//!
//! let top = NodeQuery::top_bottlenecks(1).run(&graph).unwrap();
//! assert_eq!(top[0].key.as_str(), "grace");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod query;

// Re-export main types for convenience
pub use config::{AnalyticsConfig, PipelineSettings};
pub use error::{AnalyticsError, AnalyticsResult};
pub use graph::{
    Account, AccountId, AttributePatch, AttributesUpdated, Direction, Follows, GraphSnapshot, GraphStore,
    Metric, NodeAttributes, NodeId, PropertyMap, PropertyValue, SharedGraph, UpdateScope, WriteLease,
};
pub use pipeline::{
    AlgorithmRunReport, PipelineOrchestrator, PipelineReport, PipelineState, RunOptions, RunStatus, Stage,
};
pub use query::{AccountSnapshot, Filter, NodeQuery, SortDirection};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
