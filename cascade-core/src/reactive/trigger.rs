//! Triggers
//!
//! A trigger carries no value. Firing it publishes an invalidation, which is
//! how an embedding application forces propagation without a data change.

use std::fmt;
use std::rc::Rc;

use super::signal::{sealed, Dependency, Retained};
use crate::error::Result;
use crate::graph::{Channel, GraphId, NodeId, NodeKind, Rank, Registration};

struct TriggerInner {
    registration: Registration,
}

/// A valueless event source.
#[derive(Clone)]
pub struct Trigger {
    inner: Rc<TriggerInner>,
}

impl Trigger {
    pub(crate) fn new(channel: &Channel) -> Self {
        Self {
            inner: Rc::new(TriggerInner {
                registration: channel.register_source(NodeKind::Trigger),
            }),
        }
    }

    /// Publish an invalidation to every subscriber.
    pub fn fire(&self) -> Result<()> {
        self.inner.registration.publish()
    }
}

impl sealed::Sealed for Trigger {}

impl Dependency for Trigger {
    fn id(&self) -> NodeId {
        self.inner.registration.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Trigger
    }

    fn rank(&self) -> Rank {
        0
    }

    fn graph_id(&self) -> Option<GraphId> {
        Some(self.inner.registration.graph_id())
    }

    fn retain(&self) -> Retained {
        self.inner.clone()
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Trigger")
            .field(&self.inner.registration.id())
            .finish()
    }
}
