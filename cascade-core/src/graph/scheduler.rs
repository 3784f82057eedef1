//! Wave Scheduler
//!
//! The scheduler decides the order in which nodes reached by one propagation
//! wave are processed.
//!
//! # Algorithm
//!
//! Under [`Propagation::Ranked`] every node carries a rank (one more than the
//! deepest of its dependencies). Reached nodes go into a min-heap keyed by
//! `(rank, id)`:
//!
//! 1. The publishing node's subscribers are pushed.
//! 2. The lowest-ranked node is popped and reacts.
//! 3. If it forwards, its own subscribers are pushed, unless they were
//!    already pushed during this wave.
//! 4. Repeat until the heap is empty.
//!
//! Every edge goes from a lower rank to a strictly higher one, so by the time
//! a node is popped all of its dependencies reached by the wave have been
//! processed. Ties are broken by id, which is construction order.
//!
//! Under [`Propagation::Direct`] reached nodes go into a FIFO queue with no
//! deduplication. A node reachable along two paths is processed twice.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use super::node::{NodeId, Rank};
use crate::config::Propagation;

/// Delivery queue for a single propagation wave.
#[derive(Debug)]
pub(crate) enum WaveQueue {
    Direct {
        queue: VecDeque<NodeId>,
    },
    Ranked {
        heap: BinaryHeap<Reverse<(Rank, NodeId)>>,
        scheduled: HashSet<NodeId>,
    },
}

impl WaveQueue {
    /// Create an empty queue for the given strategy.
    pub(crate) fn new(propagation: Propagation) -> Self {
        match propagation {
            Propagation::Direct => Self::Direct {
                queue: VecDeque::new(),
            },
            Propagation::Ranked => Self::Ranked {
                heap: BinaryHeap::new(),
                scheduled: HashSet::new(),
            },
        }
    }

    /// Schedule a node. Returns `false` if the node was already scheduled
    /// during this wave and will not be processed again.
    pub(crate) fn push(&mut self, id: NodeId, rank: Rank) -> bool {
        match self {
            Self::Direct { queue } => {
                queue.push_back(id);
                true
            }
            Self::Ranked { heap, scheduled } => {
                if !scheduled.insert(id) {
                    return false;
                }
                heap.push(Reverse((rank, id)));
                true
            }
        }
    }

    /// Take the next node to process.
    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        match self {
            Self::Direct { queue } => queue.pop_front(),
            Self::Ranked { heap, .. } => heap.pop().map(|Reverse((_, id))| id),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Direct { queue } => queue.is_empty(),
            Self::Ranked { heap, .. } => heap.is_empty(),
        }
    }
}
