//! Cached Signal Implementation
//!
//! A cached signal memoizes the last value its thunk produced.
//!
//! # How Cached Signals Work
//!
//! 1. A new cached signal starts dirty, so the first read computes.
//!
//! 2. A read while clean returns the stored value without running the thunk.
//!
//! 3. When a dependency publishes, the channel marks the signal dirty and
//!    forwards the invalidation to its subscribers. Nothing is recomputed
//!    at that point: push only says "something changed".
//!
//! 4. The next read while dirty runs the thunk exactly once, stores the
//!    result, and marks the signal clean.
//!
//! If the thunk fails or panics, the signal stays dirty and keeps whatever
//! value it had before, so the next read retries.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use super::signal::{retain_all, sealed, Dependency, Retained, Signal};
use crate::error::Result;
use crate::graph::{CacheState, Channel, GraphId, NodeId, NodeKind, Rank, Reaction, Registration};

struct CachedInner<T> {
    registration: Registration,

    /// The evaluation thunk.
    thunk: Box<dyn Fn() -> Result<T>>,

    /// Shared with the channel entry, which only holds it weakly.
    state: Rc<Cell<CacheState>>,

    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,

    /// Number of times the thunk was invoked.
    computations: Cell<u64>,

    _dependencies: SmallVec<[Retained; 4]>,
}

/// A lazily recomputed derived value.
///
/// # Example
///
/// ```rust
/// use cascade_core::SignalFactory;
///
/// let factory = SignalFactory::new();
/// let count = factory.variable(10);
///
/// let source = count.clone();
/// let doubled = factory.cached(&[&count], move || Ok(source.get() * 2))?;
/// assert_eq!(doubled.get()?, 20);
///
/// count.set(5)?;
/// assert_eq!(doubled.get()?, 10);
/// # Ok::<(), cascade_core::ReactiveError>(())
/// ```
pub struct Cached<T> {
    inner: Rc<CachedInner<T>>,
}

impl<T> Cached<T>
where
    T: Clone + 'static,
{
    pub(crate) fn new<F>(channel: &Channel, dependencies: &[&dyn Dependency], thunk: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        let state = Rc::new(Cell::new(CacheState::Dirty));
        let registration = channel.register(
            NodeKind::Cached,
            dependencies,
            Reaction::Invalidate(Rc::downgrade(&state)),
        )?;

        Ok(Self {
            inner: Rc::new(CachedInner {
                registration,
                thunk: Box::new(thunk),
                state,
                value: RefCell::new(None),
                computations: Cell::new(0),
                _dependencies: retain_all(dependencies),
            }),
        })
    }

    /// Get the current value, recomputing if a dependency changed.
    pub fn get(&self) -> Result<T> {
        let inner = &*self.inner;
        if inner.state.get() == CacheState::Clean {
            if let Some(value) = inner.value.borrow().as_ref() {
                return Ok(value.clone());
            }
        }

        // Mark clean before running so an invalidation arriving while the
        // thunk runs leaves the signal dirty.
        inner.state.set(CacheState::Clean);
        inner.computations.set(inner.computations.get() + 1);
        let recompute = Recompute::start(&inner.state);

        match (inner.thunk)() {
            Ok(value) => {
                recompute.finish();
                *inner.value.borrow_mut() = Some(value.clone());
                Ok(value)
            }
            Err(err) => {
                trace!(node = %inner.registration.id(), error = %err, "cached recompute failed");
                Err(err)
            }
        }
    }

    /// The stored value, without recomputing even if dirty.
    pub fn peek(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Get the current cache state.
    pub fn state(&self) -> CacheState {
        self.inner.state.get()
    }

    /// Check if the signal has ever computed a value successfully.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Number of times the thunk has been invoked, failures included.
    pub fn computation_count(&self) -> u64 {
        self.inner.computations.get()
    }
}

/// Puts the signal back to dirty unless the thunk returned a value.
///
/// Covers both an `Err` from the thunk and a panic unwinding through `get`.
struct Recompute<'a> {
    state: &'a Cell<CacheState>,
    finished: bool,
}

impl<'a> Recompute<'a> {
    fn start(state: &'a Cell<CacheState>) -> Self {
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for Recompute<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.set(CacheState::Dirty);
        }
    }
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> sealed::Sealed for Cached<T> {}

impl<T: 'static> Dependency for Cached<T> {
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

impl<T: Clone + 'static> Signal<T> for Cached<T> {
    fn get(&self) -> Result<T> {
        Cached::get(self)
    }
}

impl<T: Debug> Debug for Cached<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("id", &self.inner.registration.id())
            .field("state", &self.inner.state.get())
            .field("value", &self.inner.value.borrow())
            .field("computations", &self.inner.computations.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
