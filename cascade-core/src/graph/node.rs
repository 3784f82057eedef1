//! Graph Nodes
//!
//! This module defines the identity, kind, and rank of nodes in a signal
//! graph, plus the record a channel keeps for every registered node.

use std::cell::Cell;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::Result;

/// Unique identifier for a node in a signal graph.
///
/// Identifiers are handed out from a monotonic counter, so comparing two ids
/// also compares construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the signal graph.
///
/// The set is closed: the channel and the wave scheduler reason about
/// exactly these behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An immutable value. Never publishes, never subscribes.
    Constant,

    /// A mutable leaf. Publishes on every `set`.
    Variable,

    /// A valueless event source. Publishes on every `fire`.
    Trigger,

    /// A derived value recomputed on every read.
    /// Forwards every invalidation it receives.
    Stateless,

    /// A derived value recomputed lazily after invalidation.
    /// Marks itself dirty and forwards.
    Cached,

    /// A terminal side effect. Runs its action when reached by a wave.
    Sink,
}

impl NodeKind {
    /// Whether nodes of this kind are roots of the graph.
    pub fn is_source(self) -> bool {
        matches!(self, Self::Constant | Self::Variable | Self::Trigger)
    }

    /// Whether nodes of this kind pass invalidations on to their subscribers.
    pub fn forwards(self) -> bool {
        matches!(self, Self::Stateless | Self::Cached)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Variable => "variable",
            Self::Trigger => "trigger",
            Self::Stateless => "stateless",
            Self::Cached => "cached",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topological depth of a node: one more than the deepest dependency.
pub type Rank = u32;

/// Compute the rank of a node from the ranks of its dependencies.
///
/// Nodes without dependencies sit at rank 0.
pub fn rank_after<I>(dependency_ranks: I) -> Rank
where
    I: IntoIterator<Item = Rank>,
{
    dependency_ranks
        .into_iter()
        .max()
        .map_or(0, |deepest| deepest.saturating_add(1))
}

/// Cache state of a [`Cached`](crate::Cached) signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// The stored value reflects the current dependency values.
    Clean,

    /// A dependency published since the last successful computation,
    /// or the value was never computed.
    Dirty,
}

/// Sink action as shared between the sink handle and its channel entry.
pub(crate) type Action = dyn Fn() -> Result<()>;

/// What a registered node does when one of its dependencies publishes.
///
/// The channel only ever holds weak references, so an entry never keeps
/// node state alive.
#[derive(Clone)]
pub(crate) enum Reaction {
    /// Sources: nothing subscribes them to anything.
    Inert,

    /// Stateless signals: republish unconditionally.
    Forward,

    /// Cached signals: mark dirty, then republish.
    Invalidate(Weak<Cell<CacheState>>),

    /// Sinks: run the action.
    Run(Weak<Action>),
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inert => "Inert",
            Self::Forward => "Forward",
            Self::Invalidate(_) => "Invalidate",
            Self::Run(_) => "Run",
        };
        f.write_str(name)
    }
}

/// A channel's record of one registered node.
#[derive(Debug)]
pub(crate) struct Node {
    /// Unique identifier for this node.
    pub(crate) id: NodeId,

    /// What kind of node this is.
    pub(crate) kind: NodeKind,

    /// Position in the topological order.
    pub(crate) rank: Rank,

    /// Nodes this node subscribed to, in declaration order.
    pub(crate) dependencies: SmallVec<[NodeId; 4]>,

    pub(crate) reaction: Reaction,
}
