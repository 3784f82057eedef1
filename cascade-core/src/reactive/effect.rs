//! Sink Implementation
//!
//! A sink is a side-effecting action attached to a set of dependencies. It
//! runs whenever a propagation wave reaches it.
//!
//! # How Sinks Work
//!
//! 1. When created, the sink subscribes to its dependencies. It does not run.
//!
//! 2. Each wave that reaches the sink runs its action. Under ranked
//!    propagation that is exactly once per wave, however many of its
//!    dependencies changed; under direct propagation it is once per path.
//!
//! 3. Failures from the action are not caught or retried. They surface from
//!    the `set`/`fire` call that started the wave, after the rest of the wave
//!    has been delivered.
//!
//! # Use Cases
//!
//! Sinks are how reactive state leaves the graph:
//!
//! - Writing a recomputed expression result somewhere
//! - Logging state changes
//! - Notifying the embedding application
//!
//! # Differences from Cached
//!
//! - Cached signals return a value; sinks do not.
//! - Cached signals are lazy (compute on read); sinks are eager (run when reached).
//! - Sinks are terminal: nothing is notified through them.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::signal::{retain_all, sealed, Dependency, Retained};
use crate::error::Result;
use crate::graph::{Action, Channel, GraphId, NodeId, NodeKind, Rank, Reaction, Registration};

struct SinkInner {
    registration: Registration,

    /// The channel entry holds this weakly.
    action: Rc<Action>,

    runs: Rc<Cell<u64>>,

    _dependencies: SmallVec<[Retained; 4]>,
}

/// A terminal side effect driven by propagation waves.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use cascade_core::SignalFactory;
///
/// let factory = SignalFactory::new();
/// let count = factory.variable(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let source = count.clone();
/// let log = Rc::clone(&seen);
/// let _sink = factory.sink(&[&count], move || {
///     log.borrow_mut().push(source.get());
///     Ok(())
/// })?;
///
/// count.set(5)?;
/// count.set(6)?;
/// assert_eq!(*seen.borrow(), vec![5, 6]);
/// # Ok::<(), cascade_core::ReactiveError>(())
/// ```
#[derive(Clone)]
pub struct Sink {
    inner: Rc<SinkInner>,
}

impl Sink {
    pub(crate) fn new<F>(channel: &Channel, dependencies: &[&dyn Dependency], action: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + 'static,
    {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let action: Rc<Action> = Rc::new(move || {
            counter.set(counter.get() + 1);
            action()
        });

        let registration = channel.register(
            NodeKind::Sink,
            dependencies,
            Reaction::Run(Rc::downgrade(&action)),
        )?;

        Ok(Self {
            inner: Rc::new(SinkInner {
                registration,
                action,
                runs,
                _dependencies: retain_all(dependencies),
            }),
        })
    }

    /// Run the action directly, outside any wave.
    ///
    /// Does nothing once the sink is disposed.
    pub fn run(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        (self.inner.action)()
    }

    /// Unsubscribe from every dependency.
    ///
    /// After disposal the sink never runs again, even while handles remain.
    pub fn dispose(&self) {
        self.inner.registration.release();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.registration.is_released()
    }

    /// Get the number of times the action has run.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }
}

impl sealed::Sealed for Sink {}

impl Dependency for Sink {
    fn id(&self) -> NodeId {
        self.inner.registration.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sink
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

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.inner.registration.id())
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
