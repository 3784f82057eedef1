//! Signal Factory
//!
//! The factory is the entry point for building a signal graph. It owns one
//! [`Channel`] and wires every node it constructs to that channel, so nodes
//! from one factory interoperate and nodes from different factories never do.
//!
//! # Propagation Strategies
//!
//! - [`SignalFactory::new`] / [`SignalFactory::ordered`]: ranked, glitch-free
//!   delivery. A node is reached at most once per wave, and only after all of
//!   its dependencies.
//! - [`SignalFactory::direct`]: breadth-first delivery in subscription order.
//!   Cheaper bookkeeping, but a diamond-shaped graph delivers to the join
//!   node once per path.

use super::computed::Stateless;
use super::effect::Sink;
use super::memo::Cached;
use super::signal::{Constant, Dependency, Variable};
use super::trigger::Trigger;
use crate::config::{FactoryConfig, Propagation};
use crate::error::Result;
use crate::graph::{Channel, GraphSnapshot};

/// Builds nodes bound to one signal graph.
#[derive(Debug, Clone)]
pub struct SignalFactory {
    channel: Channel,
}

impl SignalFactory {
    /// Create a factory with ranked, glitch-free propagation.
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    /// Create a factory with ranked, glitch-free propagation.
    pub fn ordered() -> Self {
        Self::with_config(FactoryConfig::default().with_propagation(Propagation::Ranked))
    }

    /// Create a factory that delivers breadth-first, once per path.
    pub fn direct() -> Self {
        Self::with_config(FactoryConfig::default().with_propagation(Propagation::Direct))
    }

    /// Create a factory from an explicit configuration.
    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            channel: Channel::new(config),
        }
    }

    /// The configuration this factory was built with.
    pub fn config(&self) -> &FactoryConfig {
        self.channel.config()
    }

    /// The channel shared by every node of this factory.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Wrap an immutable value.
    pub fn constant<T>(&self, value: T) -> Constant<T>
    where
        T: Clone + 'static,
    {
        Constant::new(value)
    }

    /// Create a mutable source holding `initial`.
    pub fn variable<T>(&self, initial: T) -> Variable<T>
    where
        T: Clone + 'static,
    {
        Variable::new(&self.channel, initial)
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::new(&self.channel)
    }

    /// Bind a thunk as an uncached signal.
    ///
    /// `dependencies` must list every node the thunk reads; nothing is
    /// inferred from the thunk itself.
    pub fn stateless<T, F>(&self, dependencies: &[&dyn Dependency], thunk: F) -> Result<Stateless<T>>
    where
        T: 'static,
        F: Fn() -> Result<T> + 'static,
    {
        Stateless::new(&self.channel, dependencies, thunk)
    }

    /// Bind a thunk as a lazily recomputed, memoized signal.
    ///
    /// `dependencies` must list every node the thunk reads; nothing is
    /// inferred from the thunk itself.
    pub fn cached<T, F>(&self, dependencies: &[&dyn Dependency], thunk: F) -> Result<Cached<T>>
    where
        T: Clone + 'static,
        F: Fn() -> Result<T> + 'static,
    {
        Cached::new(&self.channel, dependencies, thunk)
    }

    /// Attach an action that runs whenever a wave reaches `dependencies`.
    pub fn sink<F>(&self, dependencies: &[&dyn Dependency], action: F) -> Result<Sink>
    where
        F: Fn() -> Result<()> + 'static,
    {
        Sink::new(&self.channel, dependencies, action)
    }

    /// Capture the current routing table.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.channel.snapshot()
    }
}

impl Default for SignalFactory {
    fn default() -> Self {
        Self::new()
    }
}
