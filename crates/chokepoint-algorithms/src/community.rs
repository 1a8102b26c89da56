//! Community detection by label propagation
//!
//! Every node starts in its own community (label = its own dense index). Each
//! iteration, every node tallies the labels around it and adopts the heaviest
//! one. Updates are synchronous: all nodes read the labelling produced by the
//! previous iteration. The loop runs a fixed number of iterations; there is no
//! early exit on stability.
//!
//! Tally rules:
//! - neighbours in either direction count once per follow relationship, so a
//!   mutual follow weighs 2 and a one-way follow weighs 1;
//! - the node's current label votes with the weight of its strongest single
//!   relationship, otherwise a mutually-following pair swaps labels on every
//!   iteration;
//! - ties go to the smallest label, which is also the smallest node handle.

use super::common::{GraphView, UndirectedView};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Label propagation configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LabelPropagationConfig {
    /// Number of synchronous iterations
    pub iterations: usize,
}

impl Default for LabelPropagationConfig {
    fn default() -> Self {
        Self { iterations: 10 }
    }
}

/// Result of label propagation
#[derive(Debug, Clone)]
pub struct LabelPropagationResult {
    /// Label per dense index; a label is the dense index of the node it started from
    pub labels: Vec<usize>,
    /// Iterations executed
    pub iterations: usize,
    /// Number of nodes whose label changed in the final iteration
    pub changed_last_iteration: usize,
}

impl LabelPropagationResult {
    /// Map of label -> member dense indices
    pub fn communities(&self) -> FxHashMap<usize, Vec<usize>> {
        let mut communities: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (idx, &label) in self.labels.iter().enumerate() {
            communities.entry(label).or_default().push(idx);
        }
        communities
    }

    /// Number of distinct labels
    pub fn community_count(&self) -> usize {
        self.communities().len()
    }
}

/// Pick the winning label for one node from the previous labelling.
fn dominant_label(idx: usize, undirected: &UndirectedView, labels: &[usize]) -> usize {
    let neighbors = undirected.neighbors(idx);
    if neighbors.is_empty() {
        return labels[idx];
    }

    let multiplicity = undirected.multiplicity(idx);
    let mut tally: FxHashMap<usize, u32> = FxHashMap::default();
    for (&v, &weight) in neighbors.iter().zip(multiplicity) {
        *tally.entry(labels[v]).or_insert(0) += weight;
    }
    let self_weight = multiplicity.iter().copied().max().unwrap_or(0);
    *tally.entry(labels[idx]).or_insert(0) += self_weight;

    tally
        .into_iter()
        .fold(None, |best: Option<(usize, u32)>, (label, weight)| match best {
            Some((best_label, best_weight))
                if best_weight > weight || (best_weight == weight && best_label < label) =>
            {
                Some((best_label, best_weight))
            }
            _ => Some((label, weight)),
        })
        .map(|(label, _)| label)
        .unwrap_or(labels[idx])
}

/// Run synchronous label propagation over the view.
pub fn label_propagation(view: &GraphView, config: &LabelPropagationConfig) -> LabelPropagationResult {
    let n = view.node_count;
    let undirected = view.undirected();

    let mut labels: Vec<usize> = (0..n).collect();
    let mut next_labels = labels.clone();
    let mut changed_last_iteration = 0;

    for _ in 0..config.iterations {
        let previous = &labels;
        next_labels
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, slot)| {
                *slot = dominant_label(idx, &undirected, previous);
            });

        changed_last_iteration = labels
            .iter()
            .zip(&next_labels)
            .filter(|(old, new)| old != new)
            .count();
        std::mem::swap(&mut labels, &mut next_labels);
    }

    LabelPropagationResult {
        labels,
        iterations: config.iterations,
        changed_last_iteration,
    }
}
