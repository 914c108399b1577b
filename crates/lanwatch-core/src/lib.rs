//! lanwatch-core: Shared types for the lanwatch presence monitor.
//!
//! This crate provides the types the presence-tracking state machine works on:
//! - Host identities and the per-cycle scan report
//! - Change sets and the presence state carried between cycles
//! - Presence events for structured output
//! - Common error types

pub mod error;
pub mod events;
pub mod types;

pub use error::LanwatchError;
pub use events::PresenceEvent;
pub use types::{AddressKind, ChangeSet, HostIdentity, PresenceState, ScanReport, Secondary};
