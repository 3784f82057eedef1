//! Cascade Core
//!
//! This crate provides the reactive dependency-graph engine behind the
//! Cascade expression language. Values produced by evaluating expressions are
//! wired into a graph so that changes to inputs propagate to derived values
//! and side effects, consistently and in one synchronous pass.
//!
//! It implements:
//!
//! - Signals: constants, variables, stateless and cached derived values
//! - Triggers and sinks for valueless events and side effects
//! - A per-graph publish/subscribe channel with non-owning back-edges
//! - Ranked, glitch-free propagation (plus a simpler direct mode)
//!
//! Parsing and evaluating expressions is not part of this crate. The engine
//! consumes evaluation thunks (`Fn() -> Result<T>`) together with the set of
//! nodes each thunk reads, as declared by the caller.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Node kinds and the factory that builds them
//! - `graph`: Node identity, ranks, the channel, and wave scheduling
//! - `config`: Factory configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use cascade_core::SignalFactory;
//!
//! let factory = SignalFactory::new();
//!
//! // Create a variable
//! let count = factory.variable(1);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = factory.cached(&[&count], move || Ok(c.get() * 2))?;
//!
//! // Create a sink
//! let last = Rc::new(Cell::new(0));
//! let (d, out) = (doubled.clone(), Rc::clone(&last));
//! let _sink = factory.sink(&[&doubled], move || {
//!     out.set(d.get()?);
//!     Ok(())
//! })?;
//!
//! // Update the variable
//! count.set(5)?;
//! // The sink ran during the wave and saw the new value
//! assert_eq!(last.get(), 10);
//! # Ok::<(), cascade_core::ReactiveError>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{FactoryConfig, Propagation};
pub use error::{BoxError, ReactiveError, Result};
pub use graph::{CacheState, Channel, GraphId, GraphSnapshot, NodeId, NodeKind, NodeSnapshot, Rank};
pub use reactive::{Cached, Constant, Dependency, Signal, SignalFactory, Sink, Stateless, Trigger, Variable};
