//! Report normalization: reduce an nmap report to a set of host identities.

use lanwatch_core::{AddressKind, HostIdentity, ScanReport};

use crate::nmap_xml::{NmapHost, NmapRun};

/// Which address families make up a host identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// Required. Hosts without an address of this family are not tracked.
    pub primary: AddressKind,
    /// Optional. Attached to the identity when the host reports one.
    pub secondary: AddressKind,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            primary: AddressKind::Ipv4,
            secondary: AddressKind::Mac,
        }
    }
}

/// Convert a raw nmap report into the set of hosts that are up.
///
/// Never fails: hosts that are not explicitly up, or that lack a primary
/// address, are skipped.
pub fn normalize(nmap_run: &NmapRun, policy: &IdentityPolicy) -> ScanReport {
    nmap_run
        .hosts
        .iter()
        .filter(|h| h.is_up())
        .filter_map(|h| identify_host(h, policy))
        .collect()
}

fn identify_host(host: &NmapHost, policy: &IdentityPolicy) -> Option<HostIdentity> {
    let Some(primary) = host.first_address(policy.primary).and_then(|a| a.value()) else {
        tracing::debug!(
            family = %policy.primary,
            hostname = host.hostname().unwrap_or_default(),
            "Skipping up host without a primary address"
        );
        return None;
    };

    let identity = match host.first_address(policy.secondary) {
        Some(secondary) => HostIdentity::with_secondary(
            primary,
            secondary.value().unwrap_or_default(),
            secondary.vendor.as_deref(),
        ),
        None => HostIdentity::without_secondary(primary, policy.secondary),
    };

    Some(identity)
}
