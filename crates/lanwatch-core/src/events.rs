//! Presence events derived from a change set.
//!
//! Events give per-host records of a cycle, as opposed to the aggregated
//! notifications; they end up in the serialized cycle outcome.

use serde::{Deserialize, Serialize};

use crate::types::{ChangeSet, HostIdentity};

/// A single host presence change, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type")]
pub enum PresenceEvent {
    /// A host that was not in the previous report is now present.
    Arrived { host: HostIdentity },
    /// A host from the previous report is no longer present.
    Departed { host: HostIdentity },
}

impl PresenceEvent {
    pub fn host(&self) -> &HostIdentity {
        match self {
            Self::Arrived { host } | Self::Departed { host } => host,
        }
    }
}

impl ChangeSet {
    /// One event per arrival followed by one per departure.
    pub fn events(&self) -> Vec<PresenceEvent> {
        let arrived = self
            .arrivals
            .iter()
            .cloned()
            .map(|host| PresenceEvent::Arrived { host });
        let departed = self
            .departures
            .iter()
            .cloned()
            .map(|host| PresenceEvent::Departed { host });
        arrived.chain(departed).collect()
    }
}
