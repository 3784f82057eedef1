//! Signal Implementation
//!
//! This module defines the two capabilities every node builds on and the two
//! leaf signals.
//!
//! - [`Dependency`]: anything a derived node can list in its dependency set.
//! - [`Signal`]: a dependency that produces a value.
//! - [`Constant`]: an immutable value. Never publishes.
//! - [`Variable`]: a mutable value. Publishes on every `set`.
//!
//! # Ownership
//!
//! Handles are cheap clones of one shared node. A derived node keeps a strong
//! reference to every dependency it declared, so a variable lives at least as
//! long as anything computed from it. The reverse direction is held only as
//! ids inside the [`Channel`](crate::Channel).

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::Result;
use crate::graph::{Channel, GraphId, NodeId, NodeKind, Rank, Registration};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Type-erased strong reference that keeps a dependency alive.
#[doc(hidden)]
pub type Retained = Rc<dyn Any>;

/// A node that can appear in a dependency set.
///
/// Implemented by every node kind in this crate and by `Rc` of any of them.
/// The trait is sealed: the engine reasons over a closed set of node kinds.
pub trait Dependency: sealed::Sealed {
    /// Stable identity of the node.
    fn id(&self) -> NodeId;

    fn kind(&self) -> NodeKind;

    /// Topological rank. Sources and constants are rank 0.
    fn rank(&self) -> Rank;

    /// The graph this node publishes into. `None` for constants, which
    /// never publish and may be shared between graphs.
    fn graph_id(&self) -> Option<GraphId>;

    #[doc(hidden)]
    fn retain(&self) -> Retained;
}

/// A dependency that produces a value of type `T`.
pub trait Signal<T>: Dependency {
    /// Read the current value, evaluating if the node needs to.
    fn get(&self) -> Result<T>;
}

impl<D: Dependency + ?Sized> sealed::Sealed for Rc<D> {}

impl<D: Dependency + ?Sized> Dependency for Rc<D> {
    fn id(&self) -> NodeId {
        (**self).id()
    }

    fn kind(&self) -> NodeKind {
        (**self).kind()
    }

    fn rank(&self) -> Rank {
        (**self).rank()
    }

    fn graph_id(&self) -> Option<GraphId> {
        (**self).graph_id()
    }

    fn retain(&self) -> Retained {
        (**self).retain()
    }
}

impl<T, S: Signal<T> + ?Sized> Signal<T> for Rc<S> {
    fn get(&self) -> Result<T> {
        (**self).get()
    }
}

/// Collect the strong references a derived node holds on its dependencies.
pub(crate) fn retain_all(dependencies: &[&dyn Dependency]) -> SmallVec<[Retained; 4]> {
    dependencies
        .iter()
        .map(|dependency| dependency.retain())
        .collect()
}

// ----------------------------------------------------------------------------
// Constant
// ----------------------------------------------------------------------------

/// An immutable value wrapped as a signal.
///
/// Constants are not registered with any channel: they have nothing to
/// publish and nothing to listen to.
pub struct Constant<T> {
    id: NodeId,
    value: Rc<T>,
}

impl<T> Constant<T>
where
    T: Clone + 'static,
{
    pub(crate) fn new(value: T) -> Self {
        Self {
            id: NodeId::new(),
            value: Rc::new(value),
        }
    }

    pub fn get(&self) -> T {
        T::clone(&self.value)
    }
}

impl<T> Clone for Constant<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> sealed::Sealed for Constant<T> {}

impl<T: 'static> Dependency for Constant<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Constant
    }

    fn rank(&self) -> Rank {
        0
    }

    fn graph_id(&self) -> Option<GraphId> {
        None
    }

    fn retain(&self) -> Retained {
        self.value.clone()
    }
}

impl<T: Clone + 'static> Signal<T> for Constant<T> {
    fn get(&self) -> Result<T> {
        Ok(T::clone(&self.value))
    }
}

impl<T: Debug> Debug for Constant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constant")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Variable
// ----------------------------------------------------------------------------

struct VariableInner<T> {
    registration: Registration,
    value: RefCell<T>,
}

/// A mutable leaf signal.
///
/// # Example
///
/// ```rust
/// use cascade_core::SignalFactory;
///
/// let factory = SignalFactory::new();
/// let count = factory.variable(0);
///
/// count.set(5)?;
/// assert_eq!(count.get(), 5);
/// # Ok::<(), cascade_core::ReactiveError>(())
/// ```
pub struct Variable<T> {
    inner: Rc<VariableInner<T>>,
}

impl<T> Variable<T>
where
    T: Clone + 'static,
{
    pub(crate) fn new(channel: &Channel, value: T) -> Self {
        Self {
            inner: Rc::new(VariableInner {
                registration: channel.register_source(NodeKind::Variable),
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store a new value and publish an invalidation.
    ///
    /// Publishes even when the new value equals the old one, so impure
    /// stateless dependents can be forced to re-evaluate.
    /// Fails with the first sink failure of the resulting wave.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.value.replace(value);
        self.inner.registration.publish()
    }

    /// Set a new value computed from the current one.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }

    /// Store and publish only if `value` differs from the current value.
    ///
    /// Returns whether a wave was published.
    pub fn set_if_changed(&self, value: T) -> Result<bool>
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return Ok(false);
        }
        self.set(value)?;
        Ok(true)
    }
}

impl<T> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> sealed::Sealed for Variable<T> {}

impl<T: 'static> Dependency for Variable<T> {
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

impl<T: Clone + 'static> Signal<T> for Variable<T> {
    fn get(&self) -> Result<T> {
        Ok(self.inner.value.borrow().clone())
    }
}

impl<T: Debug> Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("id", &self.inner.registration.id())
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryConfig;

    fn channel() -> Channel {
        Channel::new(FactoryConfig::default())
    }

    #[test]
    fn variable_get_and_set() {
        let channel = channel();
        let variable = Variable::new(&channel, 0);
        assert_eq!(variable.get(), 0);

        variable.set(42).unwrap();
        assert_eq!(variable.get(), 42);
    }

    #[test]
    fn variable_update() {
        let channel = channel();
        let variable = Variable::new(&channel, 10);
        variable.update(|v| v + 5).unwrap();
        assert_eq!(variable.get(), 15);
    }

    #[test]
    fn variable_clone_shares_state() {
        let channel = channel();
        let variable1 = Variable::new(&channel, 0);
        let variable2 = variable1.clone();

        variable1.set(42).unwrap();
        assert_eq!(variable2.get(), 42);
        assert_eq!(variable1.id(), variable2.id());

        variable2.set(100).unwrap();
        assert_eq!(variable1.get(), 100);
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let channel = channel();
        let variable = Variable::new(&channel, "a".to_string());

        assert!(!variable.set_if_changed("a".to_string()).unwrap());
        assert!(variable.set_if_changed("b".to_string()).unwrap());
        assert_eq!(variable.with(|s| s.len()), 1);
        assert_eq!(variable.get(), "b");
    }

    #[test]
    fn dropping_last_variable_handle_releases_it() {
        let channel = channel();
        let variable = Variable::new(&channel, 1u8);
        let id = variable.id();
        assert!(channel.contains(id));

        let copy = variable.clone();
        drop(variable);
        assert!(channel.contains(id));

        drop(copy);
        assert!(!channel.contains(id));
    }

    #[test]
    fn constant_is_unregistered_rank_zero() {
        let constant = Constant::new(vec![1, 2, 3]);
        assert_eq!(constant.get(), vec![1, 2, 3]);
        assert_eq!(Signal::get(&constant).unwrap().len(), 3);
        assert_eq!(constant.rank(), 0);
        assert_eq!(constant.kind(), NodeKind::Constant);
        assert!(constant.graph_id().is_none());
    }

    #[test]
    fn rc_forwards_dependency_and_signal() {
        let channel = channel();
        let variable = Rc::new(Variable::new(&channel, 7));
        let erased: Rc<dyn Signal<i32>> = variable.clone();

        assert_eq!(erased.id(), variable.id());
        assert_eq!(erased.get().unwrap(), 7);
        assert_eq!(erased.graph_id(), Some(channel.graph_id()));
    }
}
