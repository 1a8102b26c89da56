//! Follow relationships
//!
//! A follow is a value record over two account handles. Adjacency is kept by
//! the store as per-account handle sets, so there are no node-to-node
//! references and duplicates collapse to one relationship.

use super::types::NodeId;
use serde::{Deserialize, Serialize};

/// A directed `source FOLLOWS target` relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Follows {
    /// The follower
    pub source: NodeId,
    /// The followed account
    pub target: NodeId,
}

impl Follows {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Follows { source, target }
    }

    /// Check if this relationship touches the given account
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }

    /// The opposite endpoint, if `id` is one of the endpoints
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }

    /// The same relationship pointing the other way
    pub fn reversed(&self) -> Self {
        Follows {
            source: self.target,
            target: self.source,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
