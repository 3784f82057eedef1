//! Error Types
//!
//! The engine never recovers from failures on its own. Whatever a thunk or a
//! sink action returns is handed back to the caller of the operation that
//! triggered it (`get`, `set`, or `fire`).

use thiserror::Error;

use crate::graph::{NodeId, NodeKind};

/// Boxed error produced by evaluation thunks and sink actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Everything that can go wrong while building or driving a signal graph.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A dependency set named a node owned by a different factory.
    #[error("{kind} node cannot depend on node {dependency}: it belongs to another graph")]
    ForeignDependency {
        /// Kind of the node being constructed.
        kind: NodeKind,
        /// The offending dependency.
        dependency: NodeId,
    },

    /// A thunk or sink action failed.
    #[error("evaluation failed: {0}")]
    Evaluation(#[source] BoxError),

    /// Reentrant publishing queued more waves than the factory allows.
    #[error("propagation queued more than {limit} waves in a single call")]
    WaveLimitExceeded {
        /// The configured `max_waves_per_publish`.
        limit: usize,
    },

    /// A factory configuration could not be parsed.
    #[error("invalid factory configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ReactiveError {
    /// Wrap an arbitrary failure as an evaluation error.
    ///
    /// ```rust
    /// use cascade_core::ReactiveError;
    ///
    /// let err = ReactiveError::evaluation("division by zero");
    /// assert_eq!(err.to_string(), "evaluation failed: division by zero");
    /// ```
    pub fn evaluation(err: impl Into<BoxError>) -> Self {
        Self::Evaluation(err.into())
    }

    /// Whether this error came out of a thunk or sink action.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation(_))
    }
}
