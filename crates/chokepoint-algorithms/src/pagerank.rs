//! PageRank algorithm implementation
//!
//! Fixed-iteration power method with synchronous updates. Ranks start at
//! `1/N` and every iteration computes
//! `rank(u) = (1 - d) + d * Σ rank(v) / max(out_degree(v), 1)` over followers
//! `v` of `u`. The result is not renormalised, so scores do not sum to 1.
//!
//! Dangling nodes (no outgoing follows) have nobody to pass rank to; their
//! mass is simply not redistributed. This under-counts their influence and is
//! a known limitation of the damped-sum formula.

use super::common::GraphView;
use rayon::prelude::*;

/// PageRank configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping_factor: f64,
    /// Number of iterations; there is no convergence early-exit
    pub iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            iterations: 20,
        }
    }
}

/// Calculate PageRank for the graph view.
///
/// Returns one score per dense index of `view`.
pub fn page_rank(view: &GraphView, config: &PageRankConfig) -> Vec<f64> {
    let n = view.node_count;

    if n == 0 {
        return Vec::new();
    }

    let mut scores = vec![1.0 / n as f64; n];
    let mut next_scores = vec![0.0; n];

    let d = config.damping_factor;
    let base_score = 1.0 - d;

    for _ in 0..config.iterations {
        let previous = &scores;
        next_scores
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| {
                let sum_incoming: f64 = view
                    .predecessors(i)
                    .iter()
                    .map(|&source_idx| {
                        previous[source_idx] / view.out_degree(source_idx).max(1) as f64
                    })
                    .sum();
                *slot = base_score + d * sum_incoming;
            });

        // Swap buffers
        std::mem::swap(&mut scores, &mut next_scores);
    }

    scores
}
