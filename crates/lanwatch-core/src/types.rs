//! Core domain types for presence tracking.
//!
//! A scan cycle reduces whatever the scanner reported to a set of
//! [`HostIdentity`] values. Presence is decided purely by comparing those
//! sets between consecutive cycles.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LanwatchError;

/// Vendor label used when a hardware address carries no vendor annotation.
pub const UNKNOWN_VENDOR: &str = "Unknown";

// ── Address families ──────────────────────────────────────────────

/// An address family as tagged in a scan report (`addrtype` in nmap XML).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Ipv4,
    Ipv6,
    Mac,
}

impl AddressKind {
    /// The tag the scanner uses for this family.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Mac => "mac",
        }
    }

    /// Short human label, used in the "no secondary address" marker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
            Self::Mac => "MAC",
        }
    }

    /// Whether a scanner tag names this family. Comparison ignores case.
    pub fn matches_tag(&self, tag: &str) -> bool {
        tag.eq_ignore_ascii_case(self.tag())
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AddressKind {
    type Err = LanwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" => Ok(Self::Ipv4),
            "ipv6" => Ok(Self::Ipv6),
            "mac" => Ok(Self::Mac),
            _ => Err(LanwatchError::Config(format!(
                "Unknown address family: {s}. Choose: ipv4, ipv6, mac"
            ))),
        }
    }
}

// ── Host identity ─────────────────────────────────────────────────

/// The secondary part of a host identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Secondary {
    /// A secondary address was reported, with its vendor label.
    Present { address: String, vendor: String },
    /// No address of the tracked secondary family was reported.
    Absent { family: AddressKind },
}

/// Canonical identity of one active host for one scan cycle.
///
/// Identity is the full tuple: a host that keeps its primary address but
/// gains, loses or changes its secondary address (or vendor label) compares
/// unequal to its earlier self, so it shows up as one departure plus one
/// arrival.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostIdentity {
    primary: String,
    secondary: Secondary,
}

impl HostIdentity {
    /// Identity for a host that reported a secondary address.
    /// A missing or blank vendor becomes [`UNKNOWN_VENDOR`].
    pub fn with_secondary(primary: &str, address: &str, vendor: Option<&str>) -> Self {
        let vendor = vendor
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_VENDOR);

        Self {
            primary: primary.to_string(),
            secondary: Secondary::Present {
                address: address.to_string(),
                vendor: vendor.to_string(),
            },
        }
    }

    /// Identity for a host with no address of the `family` secondary kind.
    pub fn without_secondary(primary: &str, family: AddressKind) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: Secondary::Absent { family },
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &Secondary {
        &self.secondary
    }

    /// The secondary address, if one was reported.
    pub fn secondary_address(&self) -> Option<&str> {
        match &self.secondary {
            Secondary::Present { address, .. } => Some(address),
            Secondary::Absent { .. } => None,
        }
    }

    /// The vendor label, if a secondary address was reported.
    pub fn vendor(&self) -> Option<&str> {
        match &self.secondary {
            Secondary::Present { vendor, .. } => Some(vendor),
            Secondary::Absent { .. } => None,
        }
    }
}

/// Canonical text form: `10.0.0.5 (AA:BB:CC:DD:EE:FF - Acme)` or `10.0.0.9 (No MAC)`.
impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Secondary::Present { address, vendor } => {
                write!(f, "{} ({address} - {vendor})", self.primary)
            }
            Secondary::Absent { family } => write!(f, "{} (No {})", self.primary, family.label()),
        }
    }
}

// ── Scan report ───────────────────────────────────────────────────

/// The normalized result of one scan cycle: a set of host identities.
///
/// Iteration order is deterministic (sorted) but carries no meaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanReport {
    hosts: BTreeSet<HostIdentity>,
}

impl ScanReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host. Returns `false` if an equal identity was already present.
    pub fn insert(&mut self, host: HostIdentity) -> bool {
        self.hosts.insert(host)
    }

    pub fn contains(&self, host: &HostIdentity) -> bool {
        self.hosts.contains(host)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostIdentity> {
        self.hosts.iter()
    }
}

impl FromIterator<HostIdentity> for ScanReport {
    fn from_iter<I: IntoIterator<Item = HostIdentity>>(iter: I) -> Self {
        Self {
            hosts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ScanReport {
    type Item = &'a HostIdentity;
    type IntoIter = std::collections::btree_set::Iter<'a, HostIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

// ── Change set ────────────────────────────────────────────────────

/// Arrivals and departures between two consecutive scan reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSet {
    pub arrivals: Vec<HostIdentity>,
    pub departures: Vec<HostIdentity>,
    /// The previous state was empty. Gates notifications only.
    pub is_first_cycle: bool,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.arrivals.is_empty() || !self.departures.is_empty()
    }
}

// ── Presence state ────────────────────────────────────────────────

/// The scan report of the most recently completed cycle.
///
/// Owned by the scheduler. Read at the start of a cycle's diff and replaced
/// wholesale when the cycle commits.
#[derive(Debug, Clone, Default)]
pub struct PresenceState {
    hosts: ScanReport,
    cycles_completed: u64,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hosts(&self) -> &ScanReport {
        &self.hosts
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Replace the known hosts with `report`, returning the previous set.
    pub fn commit(&mut self, report: ScanReport) -> ScanReport {
        self.cycles_completed += 1;
        std::mem::replace(&mut self.hosts, report)
    }

    /// Count a cycle that kept the previous hosts unchanged.
    pub fn retain(&mut self) {
        self.cycles_completed += 1;
    }
}
