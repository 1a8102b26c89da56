//! Property tests for the per-node invariants of the analytics kernels

use chokepoint_algorithms::{
    approximate_betweenness, degree_centrality, label_propagation, page_rank, GraphView,
    LabelPropagationConfig, PageRankConfig,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Random simple digraph: distinct edges, no self-loops
fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let edges = proptest::collection::vec((0..n, 0..n), 0..(n * 3));
        (Just(n), edges).prop_map(|(n, raw)| {
            let set: BTreeSet<(usize, usize)> = raw.into_iter().filter(|(s, t)| s != t).collect();
            (n, set.into_iter().collect())
        })
    })
}

fn build(n: usize, edges: &[(usize, usize)]) -> GraphView {
    let mut outgoing = vec![Vec::new(); n];
    for &(s, t) in edges {
        outgoing[s].push(t);
    }
    GraphView::from_adjacency_list((0..n as u64).collect(), outgoing).unwrap()
}

proptest! {
    #[test]
    fn degrees_match_edge_counts((n, edges) in arb_graph()) {
        let view = build(n, &edges);
        let degrees = degree_centrality(&view);
        for u in 0..n {
            let out = edges.iter().filter(|(s, _)| *s == u).count() as u64;
            let inc = edges.iter().filter(|(_, t)| *t == u).count() as u64;
            prop_assert_eq!(degrees[u].out_degree, out);
            prop_assert_eq!(degrees[u].in_degree, inc);
            prop_assert_eq!(degrees[u].centrality, (out + inc) as f64);
        }
    }

    #[test]
    fn pagerank_never_below_base_term((n, edges) in arb_graph(), damping in 0.0f64..1.0) {
        let view = build(n, &edges);
        let config = PageRankConfig { damping_factor: damping, iterations: 20 };
        for score in page_rank(&view, &config) {
            prop_assert!(score >= (1.0 - damping) - 1e-12);
        }
    }

    #[test]
    fn betweenness_within_quarter((n, edges) in arb_graph()) {
        let view = build(n, &edges);
        for score in approximate_betweenness(&view) {
            prop_assert!((0.0..=0.25).contains(&score));
        }
    }

    #[test]
    fn kernels_are_deterministic((n, edges) in arb_graph()) {
        let view = build(n, &edges);
        let config = PageRankConfig::default();
        prop_assert_eq!(page_rank(&view, &config), page_rank(&view, &config));

        let lp = LabelPropagationConfig::default();
        prop_assert_eq!(label_propagation(&view, &lp).labels, label_propagation(&view, &lp).labels);
    }
}
