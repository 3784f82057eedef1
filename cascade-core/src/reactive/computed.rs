//! Stateless Signal Implementation
//!
//! A stateless signal never caches. Every read runs its thunk, and every
//! invalidation it receives is forwarded to its own subscribers as-is: with
//! no stored value to compare against, any upstream change counts as a change.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::signal::{retain_all, sealed, Dependency, Retained, Signal};
use crate::error::Result;
use crate::graph::{Channel, GraphId, NodeId, NodeKind, Rank, Reaction, Registration};

struct StatelessInner<T> {
    registration: Registration,
    thunk: Box<dyn Fn() -> Result<T>>,
    evaluations: Cell<u64>,
    _dependencies: SmallVec<[Retained; 4]>,
}

/// A derived value recomputed on every read.
pub struct Stateless<T> {
    inner: Rc<StatelessInner<T>>,
}

impl<T: 'static> Stateless<T> {
    pub(crate) fn new<F>(channel: &Channel, dependencies: &[&dyn Dependency], thunk: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        let registration = channel.register(NodeKind::Stateless, dependencies, Reaction::Forward)?;
        Ok(Self {
            inner: Rc::new(StatelessInner {
                registration,
                thunk: Box::new(thunk),
                evaluations: Cell::new(0),
                _dependencies: retain_all(dependencies),
            }),
        })
    }

    /// Run the thunk and return its result.
    pub fn get(&self) -> Result<T> {
        let evaluations = &self.inner.evaluations;
        evaluations.set(evaluations.get() + 1);
        (self.inner.thunk)()
    }

    /// Number of times the thunk has been invoked.
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }
}

impl<T> Clone for Stateless<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> sealed::Sealed for Stateless<T> {}

impl<T: 'static> Dependency for Stateless<T> {
    fn id(&self) -> NodeId {
        self.inner.registration.id()
    }

    fn kind(&self) -> NodeKind {
        self.inner.registration.kind()
    }

    fn rank(&self) -> Rank {
        self.inner.registration.rank()
    }

    fn graph_id(&self) -> Option<GraphId> {
        Some(self.inner.registration.graph_id())
    }

    fn retain(&self) -> Retained {
        self.inner.clone()
    }
}

impl<T: 'static> Signal<T> for Stateless<T> {
    fn get(&self) -> Result<T> {
        Stateless::get(self)
    }
}

impl<T> fmt::Debug for Stateless<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stateless")
            .field("id", &self.inner.registration.id())
            .field("rank", &self.inner.registration.rank())
            .field("evaluations", &self.inner.evaluations.get())
            .finish()
    }
}
