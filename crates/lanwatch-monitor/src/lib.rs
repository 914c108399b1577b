//! lanwatch-monitor: Network presence monitor.
//!
//! Sweeps a subnet with nmap on a fixed interval, reduces each report to a
//! set of host identities, diffs it against the previous sweep and raises a
//! desktop notification when hosts arrive or leave.

pub mod config;
pub mod diff;
pub mod error;
pub mod nmap_xml;
pub mod normalize;
pub mod notifier;
pub mod report;
pub mod scanner;
pub mod scheduler;
