//! Graph analytics kernels for the bottleneck pipeline
//!
//! Every function here is pure: it takes a dense [`GraphView`] (plus, for the
//! scorer, per-node inputs) and returns per-node values indexed by the view's
//! dense indices. Locking, identifiers and persistence live in the caller.

pub mod common;
pub mod pagerank;
pub mod degree;
pub mod betweenness;
pub mod community;
pub mod bottleneck;

pub use common::{AlgorithmError, AlgorithmResult, GraphView, NodeId, UndirectedView};
pub use pagerank::{page_rank, PageRankConfig};
pub use degree::{degree_centrality, DegreeCounts};
pub use betweenness::{approximate_betweenness, approximate_betweenness_of};
pub use community::{label_propagation, LabelPropagationConfig, LabelPropagationResult};
pub use bottleneck::{
    bottleneck_scores, bridge_score, BottleneckConfig, BottleneckScore, BottleneckWeights,
    ScoreInput,
};
