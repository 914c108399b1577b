//! Change detection: diff the current scan report against the previous one.

use lanwatch_core::{ChangeSet, ScanReport};

/// Compare two consecutive scan reports.
///
/// Arrivals follow the iteration order of `current`, departures that of
/// `previous`. `is_first_cycle` is set when `previous` is empty.
pub fn diff(previous: &ScanReport, current: &ScanReport) -> ChangeSet {
    let arrivals = current
        .iter()
        .filter(|host| !previous.contains(host))
        .cloned()
        .collect();

    let departures = previous
        .iter()
        .filter(|host| !current.contains(host))
        .cloned()
        .collect();

    ChangeSet {
        arrivals,
        departures,
        is_first_cycle: previous.is_empty(),
    }
}
