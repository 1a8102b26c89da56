//! Composite bottleneck scoring
//!
//! Combines normalised betweenness, normalised PageRank and a bridge score
//! (how many foreign communities a node touches) into one number per node:
//!
//! `score = w_b * betweenness/max_betweenness + w_p * pagerank/max_pagerank + w_r * bridge`
//!
//! with `bridge = min(bridged, cap) / cap`. Normalisation needs the global
//! maxima, so scoring is two passes: a reduction, then the per-node pass.

use super::common::{AlgorithmError, AlgorithmResult, GraphView};
use rayon::prelude::*;

/// Relative weights of the three score components
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BottleneckWeights {
    pub betweenness: f64,
    pub pagerank: f64,
    pub bridge: f64,
}

impl Default for BottleneckWeights {
    fn default() -> Self {
        Self {
            betweenness: 0.4,
            pagerank: 0.3,
            bridge: 0.3,
        }
    }
}

/// Bottleneck scoring configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BottleneckConfig {
    /// A node is a bottleneck when its score is strictly above this value.
    /// Historically both 0.5 (batch API) and 0.3 (offline script) were used.
    pub threshold: f64,
    /// Number of bridged communities at which the bridge score saturates
    pub bridge_cap: usize,
    pub weights: BottleneckWeights,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            bridge_cap: 5,
            weights: BottleneckWeights::default(),
        }
    }
}

/// Per-node inputs to the scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub pagerank: f64,
    pub betweenness: f64,
    /// Community label; only equality between labels matters
    pub community: u64,
}

/// Per-node scorer output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BottleneckScore {
    /// Distinct foreign communities among the node's neighbours (uncapped)
    pub bridged_communities: usize,
    pub bridge_score: f64,
    pub bottleneck_score: f64,
    pub is_bottleneck: bool,
}

/// Bridge score for a raw count of bridged communities
pub fn bridge_score(bridged: usize, cap: usize) -> f64 {
    let cap = cap.max(1);
    bridged.min(cap) as f64 / cap as f64
}

fn normalise(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Score every node of the view.
///
/// `inputs` must hold exactly one entry per dense index.
pub fn bottleneck_scores(
    view: &GraphView,
    inputs: &[ScoreInput],
    config: &BottleneckConfig,
) -> AlgorithmResult<Vec<BottleneckScore>> {
    if inputs.len() != view.node_count {
        return Err(AlgorithmError::LengthMismatch {
            expected: view.node_count,
            actual: inputs.len(),
        });
    }

    let max_betweenness = inputs.iter().map(|i| i.betweenness).fold(0.0, f64::max);
    let max_pagerank = inputs.iter().map(|i| i.pagerank).fold(0.0, f64::max);
    let undirected = view.undirected();
    let weights = &config.weights;

    let scores = (0..view.node_count)
        .into_par_iter()
        .map(|idx| {
            let own = inputs[idx].community;
            let mut foreign: Vec<u64> = undirected
                .neighbors(idx)
                .iter()
                .map(|&v| inputs[v].community)
                .filter(|&label| label != own)
                .collect();
            foreign.sort_unstable();
            foreign.dedup();

            let bridged_communities = foreign.len();
            let bridge = bridge_score(bridged_communities, config.bridge_cap);
            let score = weights.betweenness * normalise(inputs[idx].betweenness, max_betweenness)
                + weights.pagerank * normalise(inputs[idx].pagerank, max_pagerank)
                + weights.bridge * bridge;

            BottleneckScore {
                bridged_communities,
                bridge_score: bridge,
                bottleneck_score: score,
                is_bottleneck: score > config.threshold,
            }
        })
        .collect();

    Ok(scores)
}
