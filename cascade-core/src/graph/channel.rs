//! Channel
//!
//! The channel is the routing table shared by every node built from one
//! factory. It maps a node's id to the ids of its current subscribers and
//! drives propagation waves through that table.
//!
//! # Ownership
//!
//! Dependents own their dependencies (they hold strong handles to them). The
//! channel only owns ids plus weak references to cache flags and sink
//! actions, so notification fan-out never extends a node's lifetime. When the
//! last handle of a node goes away, its [`Registration`] removes the node and
//! all of its subscriptions from the table.
//!
//! # Reentrancy
//!
//! Publishing while a wave is running does not recurse. The source is queued
//! and its wave runs after the current one finishes, inside the same outer
//! call. Failures from any wave in that call are reported by the outer call.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::node::{rank_after, CacheState, Node, NodeId, NodeKind, Rank, Reaction};
use super::scheduler::WaveQueue;
use super::snapshot::{GraphSnapshot, NodeSnapshot};
use crate::config::FactoryConfig;
use crate::error::{ReactiveError, Result};
use crate::reactive::Dependency;

/// Identity of one independent signal graph (one factory, one channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Table {
    /// Every registered node, indexed by ID.
    nodes: HashMap<NodeId, Node>,

    /// Publisher -> subscribers, in subscription order.
    subscribers: HashMap<NodeId, IndexSet<NodeId>>,
}

struct ChannelInner {
    id: GraphId,
    config: FactoryConfig,
    table: RefCell<Table>,

    /// Sources waiting for their wave.
    pending: RefCell<VecDeque<NodeId>>,

    propagating: Cell<bool>,
}

impl ChannelInner {
    /// Mark every cached node downstream of `source` dirty without running
    /// any sink.
    fn invalidate_reachable(&self, source: NodeId) {
        let Ok(table) = self.table.try_borrow() else {
            return;
        };
        let mut seen = HashSet::new();
        let mut stack = vec![source];
        while let Some(publisher) = stack.pop() {
            let Some(subscribers) = table.subscribers.get(&publisher) else {
                continue;
            };
            for id in subscribers {
                if !seen.insert(*id) {
                    continue;
                }
                let Some(node) = table.nodes.get(id) else {
                    continue;
                };
                match &node.reaction {
                    Reaction::Forward => stack.push(*id),
                    Reaction::Invalidate(state) => {
                        if let Some(state) = state.upgrade() {
                            state.set(CacheState::Dirty);
                            stack.push(*id);
                        }
                    }
                    Reaction::Inert | Reaction::Run(_) => {}
                }
            }
        }
        trace!(graph = %self.id, source = %source, reached = seen.len(), "invalidated without a wave");
    }
}

/// Publish/subscribe router for one signal graph.
///
/// Cloning yields another handle to the same routing table.
#[derive(Clone)]
pub struct Channel {
    inner: Rc<ChannelInner>,
}

impl Channel {
    pub(crate) fn new(config: FactoryConfig) -> Self {
        let id = GraphId::next();
        debug!(graph = %id, propagation = ?config.propagation, "channel created");
        Self {
            inner: Rc::new(ChannelInner {
                id,
                config,
                table: RefCell::new(Table::default()),
                pending: RefCell::new(VecDeque::new()),
                propagating: Cell::new(false),
            }),
        }
    }

    pub fn graph_id(&self) -> GraphId {
        self.inner.id
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// Number of live registered nodes. Constants are never registered.
    pub fn len(&self) -> usize {
        self.inner.table.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a node is currently registered.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.table.borrow().nodes.contains_key(&id)
    }

    /// Number of nodes currently subscribed to `id`.
    pub fn subscriber_count(&self, id: NodeId) -> usize {
        self.inner
            .table
            .borrow()
            .subscribers
            .get(&id)
            .map_or(0, IndexSet::len)
    }

    /// Whether a propagation wave is running right now.
    pub fn is_propagating(&self) -> bool {
        self.inner.propagating.get()
    }

    /// Register a root node. Roots have no dependencies and rank 0.
    pub(crate) fn register_source(&self, kind: NodeKind) -> Registration {
        self.insert(kind, 0, SmallVec::new(), Reaction::Inert)
    }

    /// Register a dependent node and subscribe it to its dependencies.
    ///
    /// Constants are accepted from any graph since they never publish.
    /// Any other dependency must belong to this channel.
    pub(crate) fn register(
        &self,
        kind: NodeKind,
        dependencies: &[&dyn Dependency],
        reaction: Reaction,
    ) -> Result<Registration> {
        let mut subscribed: SmallVec<[NodeId; 4]> = SmallVec::new();
        for dependency in dependencies {
            match dependency.graph_id() {
                None => {}
                Some(graph) if graph == self.inner.id => {
                    if !subscribed.contains(&dependency.id()) {
                        subscribed.push(dependency.id());
                    }
                }
                Some(_) => {
                    return Err(ReactiveError::ForeignDependency {
                        kind,
                        dependency: dependency.id(),
                    })
                }
            }
        }

        let rank = rank_after(dependencies.iter().map(|dependency| dependency.rank()));
        Ok(self.insert(kind, rank, subscribed, reaction))
    }

    fn insert(
        &self,
        kind: NodeKind,
        rank: Rank,
        dependencies: SmallVec<[NodeId; 4]>,
        reaction: Reaction,
    ) -> Registration {
        let id = NodeId::new();
        let mut table = self.inner.table.borrow_mut();
        for dependency in &dependencies {
            table.subscribers.entry(*dependency).or_default().insert(id);
        }
        trace!(graph = %self.inner.id, node = %id, %kind, rank, dependencies = dependencies.len(), "registered");
        table.nodes.insert(
            id,
            Node {
                id,
                kind,
                rank,
                dependencies,
                reaction,
            },
        );

        Registration {
            channel: self.clone(),
            id,
            kind,
            rank,
            released: Cell::new(false),
        }
    }

    /// Remove a node and every subscription it holds.
    fn release(&self, id: NodeId) {
        let mut table = self.inner.table.borrow_mut();
        let Some(node) = table.nodes.remove(&id) else {
            return;
        };

        for dependency in &node.dependencies {
            let emptied = match table.subscribers.get_mut(dependency) {
                Some(subscribers) => {
                    subscribers.shift_remove(&id);
                    subscribers.is_empty()
                }
                None => false,
            };
            if emptied {
                table.subscribers.remove(dependency);
            }
        }
        table.subscribers.remove(&id);

        trace!(graph = %self.inner.id, node = %id, kind = %node.kind, "released");
    }

    /// Publish an invalidation from `source` and drain every wave it causes.
    ///
    /// Returns the first failure raised by a sink action in any of the waves;
    /// later failures are logged and dropped. A failing sink never stops the
    /// rest of its wave.
    pub(crate) fn publish(&self, source: NodeId) -> Result<()> {
        let inner = &*self.inner;
        inner.pending.borrow_mut().push_back(source);
        if inner.propagating.get() {
            trace!(graph = %inner.id, source = %source, "queued reentrant publish");
            return Ok(());
        }

        let _guard = PropagatingGuard::enter(inner);
        let limit = inner.config.max_waves_per_publish;
        let mut first_error = None;
        let mut waves = 0usize;

        loop {
            let next = inner.pending.borrow_mut().pop_front();
            let Some(source) = next else {
                break;
            };

            if waves >= limit {
                // The sources already hold their new values, so cached
                // readers must not stay clean on the old ones.
                let mut discarded = vec![source];
                discarded.extend(inner.pending.borrow_mut().drain(..));
                for source in &discarded {
                    inner.invalidate_reachable(*source);
                }
                warn!(graph = %inner.id, limit, discarded = discarded.len(), "wave limit exceeded");
                record(
                    &mut first_error,
                    source,
                    ReactiveError::WaveLimitExceeded { limit },
                );
                break;
            }

            waves += 1;
            self.run_wave(source, &mut first_error);
        }

        first_error.map_or(Ok(()), Err)
    }

    fn run_wave(&self, source: NodeId, first_error: &mut Option<ReactiveError>) {
        let mut queue = WaveQueue::new(self.inner.config.propagation);
        self.schedule_subscribers(source, &mut queue);

        let mut reached = 0usize;
        while let Some(id) = queue.pop() {
            // Copy the reaction out so no borrow is held while user code runs.
            let reaction = {
                let table = self.inner.table.borrow();
                match table.nodes.get(&id) {
                    Some(node) => node.reaction.clone(),
                    None => continue,
                }
            };
            reached += 1;

            match reaction {
                Reaction::Inert => {}
                Reaction::Forward => self.schedule_subscribers(id, &mut queue),
                Reaction::Invalidate(state) => {
                    let Some(state) = state.upgrade() else {
                        continue;
                    };
                    state.set(CacheState::Dirty);
                    self.schedule_subscribers(id, &mut queue);
                }
                Reaction::Run(action) => {
                    let Some(action) = action.upgrade() else {
                        continue;
                    };
                    trace!(graph = %self.inner.id, sink = %id, "running sink");
                    if let Err(err) = action() {
                        record(first_error, id, err);
                    }
                }
            }
        }

        debug!(graph = %self.inner.id, source = %source, reached, "propagation wave complete");
    }

    fn schedule_subscribers(&self, publisher: NodeId, queue: &mut WaveQueue) {
        let table = self.inner.table.borrow();
        let Some(subscribers) = table.subscribers.get(&publisher) else {
            return;
        };
        for id in subscribers {
            if let Some(node) = table.nodes.get(id) {
                if queue.push(*id, node.rank) {
                    trace!(graph = %self.inner.id, from = %publisher, to = %id, "delivering");
                }
            }
        }
    }

    pub(crate) fn snapshot(&self) -> GraphSnapshot {
        let table = self.inner.table.borrow();
        let mut nodes: Vec<NodeSnapshot> = table
            .nodes
            .values()
            .map(|node| NodeSnapshot {
                id: node.id,
                kind: node.kind,
                rank: node.rank,
                dependencies: node.dependencies.to_vec(),
                subscribers: table
                    .subscribers
                    .get(&node.id)
                    .map(|subscribers| subscribers.iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect();
        nodes.sort_by_key(|node| node.id);

        GraphSnapshot {
            graph: self.inner.id,
            propagation: self.inner.config.propagation,
            nodes,
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("graph", &self.inner.id)
            .field("propagation", &self.inner.config.propagation)
            .field("nodes", &self.len())
            .field("propagating", &self.is_propagating())
            .finish()
    }
}

fn record(first_error: &mut Option<ReactiveError>, node: NodeId, err: ReactiveError) {
    if first_error.is_none() {
        *first_error = Some(err);
    } else {
        warn!(node = %node, error = %err, "suppressed failure during propagation");
    }
}

/// Marks the channel busy for the duration of an outer publish.
struct PropagatingGuard<'a> {
    inner: &'a ChannelInner,
}

impl<'a> PropagatingGuard<'a> {
    fn enter(inner: &'a ChannelInner) -> Self {
        inner.propagating.set(true);
        Self { inner }
    }
}

impl Drop for PropagatingGuard<'_> {
    fn drop(&mut self) {
        // Only non-empty if a sink panicked mid-wave.
        let abandoned: Vec<NodeId> = self.inner.pending.borrow_mut().drain(..).collect();
        for source in abandoned {
            self.inner.invalidate_reachable(source);
        }
        self.inner.propagating.set(false);
    }
}

/// A node's entry in its channel.
///
/// Dropping the registration (or calling [`release`](Self::release))
/// unsubscribes the node from everything it listens to.
pub(crate) struct Registration {
    channel: Channel,
    id: NodeId,
    kind: NodeKind,
    rank: Rank,
    released: Cell<bool>,
}

impl Registration {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn rank(&self) -> Rank {
        self.rank
    }

    pub(crate) fn graph_id(&self) -> GraphId {
        self.channel.graph_id()
    }

    pub(crate) fn publish(&self) -> Result<()> {
        self.channel.publish(self.id)
    }

    pub(crate) fn release(&self) {
        if !self.released.replace(true) {
            self.channel.release(self.id);
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("graph", &self.graph_id())
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("rank", &self.rank)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Propagation;
    use crate::graph::node::Action;
    use std::rc::Rc;

    fn counting_action(count: &Rc<Cell<u32>>) -> Rc<Action> {
        let count = Rc::clone(count);
        Rc::new(move || {
            count.set(count.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn registration_subscribes_and_release_unsubscribes() {
        let channel = Channel::new(FactoryConfig::default());
        let source = channel.register_source(NodeKind::Trigger);

        let action = counting_action(&Rc::new(Cell::new(0)));
        let listener = channel.insert(
            NodeKind::Sink,
            1,
            SmallVec::from_slice(&[source.id()]),
            Reaction::Run(Rc::downgrade(&action)),
        );

        assert_eq!(channel.len(), 2);
        assert_eq!(channel.subscriber_count(source.id()), 1);

        drop(listener);
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.subscriber_count(source.id()), 0);
    }

    #[test]
    fn publish_invokes_each_listener_once() {
        let channel = Channel::new(FactoryConfig::default());
        let source = channel.register_source(NodeKind::Trigger);
        let count = Rc::new(Cell::new(0));
        let action = counting_action(&count);

        let _listener = channel.insert(
            NodeKind::Sink,
            1,
            SmallVec::from_slice(&[source.id()]),
            Reaction::Run(Rc::downgrade(&action)),
        );

        source.publish().unwrap();
        assert_eq!(count.get(), 1);
        assert!(!channel.is_propagating());
    }

    #[test]
    fn dead_action_is_skipped() {
        let channel = Channel::new(FactoryConfig::default().with_propagation(Propagation::Direct));
        let source = channel.register_source(NodeKind::Variable);
        let count = Rc::new(Cell::new(0));
        let action = counting_action(&count);

        let _listener = channel.insert(
            NodeKind::Sink,
            1,
            SmallVec::from_slice(&[source.id()]),
            Reaction::Run(Rc::downgrade(&action)),
        );
        drop(action);

        source.publish().unwrap();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn panicking_sink_still_invalidates_queued_sources() {
        let channel = Channel::new(FactoryConfig::default());
        let source = Rc::new(channel.register_source(NodeKind::Variable));
        let state = Rc::new(Cell::new(CacheState::Clean));
        let _cache = channel.insert(
            NodeKind::Cached,
            1,
            SmallVec::from_slice(&[source.id()]),
            Reaction::Invalidate(Rc::downgrade(&state)),
        );

        let (publisher, flag) = (Rc::clone(&source), Rc::clone(&state));
        let action: Rc<Action> = Rc::new(move || -> Result<()> {
            // Read the cache, then queue another wave before failing hard.
            flag.set(CacheState::Clean);
            publisher.publish()?;
            panic!("sink failed");
        });
        let _sink = channel.insert(
            NodeKind::Sink,
            1,
            SmallVec::from_slice(&[source.id()]),
            Reaction::Run(Rc::downgrade(&action)),
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source.publish()));
        assert!(outcome.is_err());
        assert_eq!(state.get(), CacheState::Dirty);
        assert!(!channel.is_propagating());
    }

    #[test]
    fn release_is_idempotent() {
        let channel = Channel::new(FactoryConfig::default());
        let source = channel.register_source(NodeKind::Variable);

        source.release();
        source.release();
        assert!(source.is_released());
        assert!(channel.is_empty());
    }

    #[test]
    fn graph_ids_differ_per_channel() {
        let a = Channel::new(FactoryConfig::default());
        let b = Channel::new(FactoryConfig::default());
        assert_ne!(a.graph_id(), b.graph_id());
        assert_eq!(a.clone().graph_id(), a.graph_id());
    }
}
