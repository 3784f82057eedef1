//! Graph Snapshots
//!
//! A snapshot is a detached, serializable copy of a channel's routing table.
//! It is meant for debugging and tooling; nothing in the engine reads it back.

use serde::{Deserialize, Serialize};

use super::channel::GraphId;
use super::node::{NodeId, NodeKind, Rank};
use crate::config::Propagation;
use crate::error::Result;

/// One registered node as seen by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub rank: Rank,

    /// Nodes this node is subscribed to (constants are omitted).
    pub dependencies: Vec<NodeId>,

    /// Nodes subscribed to this node, in subscription order.
    pub subscribers: Vec<NodeId>,
}

/// All live registered nodes of one graph, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub graph: GraphId,
    pub propagation: Propagation,
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|index| &self.nodes[index])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deepest rank in the graph, or `None` for an empty graph.
    pub fn depth(&self) -> Option<Rank> {
        self.nodes.iter().map(|node| node.rank).max()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
