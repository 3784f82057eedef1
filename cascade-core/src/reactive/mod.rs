//! Reactive Primitives
//!
//! This module implements the node kinds of a signal graph: constants,
//! variables, triggers, stateless and cached signals, and sinks. Every node
//! is created through a [`SignalFactory`].
//!
//! # Concepts
//!
//! ## Sources
//!
//! A [`Variable`] holds mutable state and publishes an invalidation on every
//! `set`. A [`Trigger`] publishes without holding anything. A [`Constant`]
//! never publishes.
//!
//! ## Derived Signals
//!
//! A derived signal wraps an evaluation thunk plus an explicitly declared
//! dependency set. A [`Stateless`] signal runs its thunk on every read. A
//! [`Cached`] signal memoizes the result and recomputes lazily, on the first
//! read after a dependency published.
//!
//! ## Sinks
//!
//! A [`Sink`] runs an action whenever a propagation wave reaches it. Sinks
//! are how changes leave the graph.
//!
//! # Implementation Notes
//!
//! Dependencies are declared, never tracked: the engine does not look inside
//! thunks. A thunk that reads a node missing from its dependency set will not
//! be invalidated when that node changes.
//!
//! Everything is single-threaded. Nodes are `Rc`-based and not `Send`.

mod computed;
mod effect;
mod factory;
mod memo;
mod signal;
mod trigger;

pub use computed::Stateless;
pub use effect::Sink;
pub use factory::SignalFactory;
pub use memo::Cached;
pub use signal::{Constant, Dependency, Signal, Variable};
pub use trigger::Trigger;
