//! Dependency Graph
//!
//! This module implements the routing side of the reactive engine: node
//! identity and ranks, the per-graph [`Channel`], and the wave scheduler that
//! orders delivery.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are signals, triggers, and sinks
//! - Edges are dependencies: if A depends on B, B publishes to A
//!
//! Edges only ever point from a node to nodes constructed before it, and a
//! node's dependency set never changes, so the graph cannot contain a cycle.
//!
//! # Design Decisions
//!
//! 1. The channel stores back-edges (dependency -> dependents) as ids in a
//!    table, never as owning references. A node's lifetime is governed only
//!    by the handles that depend on it.
//!
//! 2. Every node is ranked at construction, which turns glitch-free ordering
//!    into a priority-queue traversal with no per-wave sorting.
//!
//! 3. There is one channel per factory. Graphs from different factories
//!    never interact.

mod channel;
mod node;
mod scheduler;
mod snapshot;

pub use channel::{Channel, GraphId};
pub use node::{rank_after, CacheState, NodeId, NodeKind, Rank};
pub use snapshot::{GraphSnapshot, NodeSnapshot};

pub(crate) use channel::Registration;
pub(crate) use node::{Action, Reaction};
