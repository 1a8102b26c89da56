//! Shared utilities for graph algorithms
//!
//! Provides a read-only, dense view of the follow graph for algorithm execution.

use std::collections::HashMap;
use thiserror::Error;

/// Node handle type (u64), stable for the lifetime of a graph
pub type NodeId = u64;

/// Errors raised when algorithm inputs do not line up with the view
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("input length mismatch: view has {expected} nodes, got {actual} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("edge references index {index} outside of view with {node_count} nodes")]
    IndexOutOfRange { index: usize, node_count: usize },
}

pub type AlgorithmResult<T> = Result<T, AlgorithmError>;

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
///
/// Dense indices are assigned in ascending handle order, so comparing two
/// indices orders the underlying handles the same way.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Outgoing edges CSR structure
    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Incoming edges CSR structure (Compressed Sparse Column effectively)
    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,
}

impl GraphView {
    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (accounts this node follows)
    pub fn successors(&self, idx: usize) -> &[usize] {
        let start = self.out_offsets[idx];
        let end = self.out_offsets[idx + 1];
        &self.out_targets[start..end]
    }

    /// Get incoming neighbors (followers of this node)
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        let start = self.in_offsets[idx];
        let end = self.in_offsets[idx + 1];
        &self.in_sources[start..end]
    }

    /// Number of directed edges in the view
    pub fn edge_count(&self) -> usize {
        self.out_targets.len()
    }

    /// Build a view from per-node adjacency lists.
    ///
    /// `outgoing[i]` holds the dense target indices of node `i`; the incoming
    /// side is derived. Targets outside `0..node_count` are rejected.
    pub fn from_adjacency_list(
        index_to_node: Vec<NodeId>,
        outgoing: Vec<Vec<usize>>,
    ) -> AlgorithmResult<Self> {
        let node_count = index_to_node.len();
        if outgoing.len() != node_count {
            return Err(AlgorithmError::LengthMismatch {
                expected: node_count,
                actual: outgoing.len(),
            });
        }

        let node_to_index = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();

        out_offsets.push(0);
        for (source, neighbors) in outgoing.into_iter().enumerate() {
            for &target in &neighbors {
                if target >= node_count {
                    return Err(AlgorithmError::IndexOutOfRange {
                        index: target,
                        node_count,
                    });
                }
                incoming[target].push(source);
            }
            out_targets.extend(neighbors);
            out_offsets.push(out_targets.len());
        }

        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::with_capacity(out_targets.len());
        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        Ok(GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
        })
    }

    /// Project the directed view onto an undirected neighbourhood.
    ///
    /// Each neighbour appears once, sorted by index, together with the number
    /// of follow relationships (1 or 2) connecting it to the node.
    pub fn undirected(&self) -> UndirectedView {
        let mut offsets = Vec::with_capacity(self.node_count + 1);
        let mut neighbors = Vec::with_capacity(self.edge_count() * 2);
        let mut multiplicity = Vec::with_capacity(self.edge_count() * 2);
        let mut scratch: Vec<usize> = Vec::new();

        offsets.push(0);
        for idx in 0..self.node_count {
            scratch.clear();
            scratch.extend_from_slice(self.successors(idx));
            scratch.extend_from_slice(self.predecessors(idx));
            scratch.sort_unstable();

            let mut i = 0;
            while i < scratch.len() {
                let v = scratch[i];
                let mut count = 0u32;
                while i < scratch.len() && scratch[i] == v {
                    count += 1;
                    i += 1;
                }
                neighbors.push(v);
                multiplicity.push(count);
            }
            offsets.push(neighbors.len());
        }

        UndirectedView {
            offsets,
            neighbors,
            multiplicity,
        }
    }
}

/// Undirected, de-duplicated neighbourhood of a [`GraphView`]
#[derive(Debug, Clone)]
pub struct UndirectedView {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
    multiplicity: Vec<u32>,
}

impl UndirectedView {
    /// Distinct neighbours of a node, ascending by index
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.neighbors[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Relationship counts aligned with [`UndirectedView::neighbors`]
    pub fn multiplicity(&self, idx: usize) -> &[u32] {
        &self.multiplicity[self.offsets[idx]..self.offsets[idx + 1]]
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.offsets[idx + 1] - self.offsets[idx]
    }
}
