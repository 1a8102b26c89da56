//! Degree centrality
//!
//! Single O(E) pass over the CSR offsets.

use super::common::GraphView;

/// Per-node degree counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeCounts {
    pub out_degree: u64,
    pub in_degree: u64,
    /// `out_degree + in_degree` as a float
    pub centrality: f64,
}

/// Count distinct outgoing and incoming follows for every node.
pub fn degree_centrality(view: &GraphView) -> Vec<DegreeCounts> {
    (0..view.node_count)
        .map(|idx| {
            let out_degree = view.out_degree(idx) as u64;
            let in_degree = view.in_degree(idx) as u64;
            DegreeCounts {
                out_degree,
                in_degree,
                centrality: (out_degree + in_degree) as f64,
            }
        })
        .collect()
}
