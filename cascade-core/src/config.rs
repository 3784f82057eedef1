//! Factory Configuration
//!
//! A factory is configured once, at construction. The configuration decides
//! how a propagation wave is delivered and how much reentrant publishing a
//! single call may trigger.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default bound on waves drained by one outer `set`/`fire` call.
pub const DEFAULT_MAX_WAVES: usize = 10_000;

/// How a propagation wave reaches dependent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Deliver in subscription order, breadth first.
    ///
    /// A node reachable through several paths is notified once per path,
    /// so a dependent may observe a sibling that has not been invalidated yet.
    Direct,

    /// Deliver in non-decreasing rank order, each node at most once per wave.
    ///
    /// This is glitch-free: a dependent is only reached after every one of
    /// its dependencies has been processed for the same wave.
    #[default]
    Ranked,
}

/// Configuration for a [`SignalFactory`](crate::SignalFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Delivery strategy for propagation waves.
    pub propagation: Propagation,

    /// Upper bound on waves drained by one outer publish, counting waves
    /// queued by reentrant `set`/`fire` calls made from sink actions.
    pub max_waves_per_publish: usize,
}

impl FactoryConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the delivery order used by the factory's channel.
    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Cap the number of waves one outer `set`/`fire` may run.
    pub fn with_max_waves_per_publish(mut self, limit: usize) -> Self {
        self.max_waves_per_publish = limit;
        self
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            propagation: Propagation::default(),
            max_waves_per_publish: DEFAULT_MAX_WAVES,
        }
    }
}
