//! Approximate betweenness centrality
//!
//! A structural proxy rather than shortest-path betweenness:
//! `out * in / (out + in)^2`, or 0 for isolated nodes. It peaks at 0.25 when a
//! node follows as many accounts as follow it, which is the hub-and-bridge
//! shape the bottleneck score looks for.

use super::common::GraphView;

/// Approximate betweenness for a single node given its degrees
pub fn approximate_betweenness_of(out_degree: u64, in_degree: u64) -> f64 {
    let degree = out_degree + in_degree;
    if degree == 0 {
        return 0.0;
    }
    (out_degree * in_degree) as f64 / (degree * degree) as f64
}

/// Approximate betweenness for every node of the view
pub fn approximate_betweenness(view: &GraphView) -> Vec<f64> {
    (0..view.node_count)
        .map(|idx| approximate_betweenness_of(view.out_degree(idx) as u64, view.in_degree(idx) as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::view_from_edges;

    #[test]
    fn test_balanced_node_hits_maximum() {
        assert_eq!(approximate_betweenness_of(3, 3), 0.25);
        assert_eq!(approximate_betweenness_of(0, 0), 0.0);
        assert_eq!(approximate_betweenness_of(4, 0), 0.0);
        assert!((approximate_betweenness_of(1, 3) - 3.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_chain_middle_scores_highest() {
        // 0 -> 1 -> 2
        let view = view_from_edges(3, &[(0, 1), (1, 2)]);
        let scores = approximate_betweenness(&view);
        assert_eq!(scores, vec![0.0, 0.25, 0.0]);
    }
}
