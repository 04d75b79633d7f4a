//! Inventory snapshots and change detection
//!
//! An [`Inventory`] is the set of device identities attached as of one poll.
//! The monitoring loop replaces it wholesale every cycle, so an address that
//! gets reused by a different device is never confused with a stale entry.

use crate::types::DeviceIdentity;
use std::collections::HashSet;

/// Set of device identities attached as of the last poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    devices: HashSet<DeviceIdentity>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.devices.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.devices.iter()
    }
}

impl FromIterator<DeviceIdentity> for Inventory {
    fn from_iter<I: IntoIterator<Item = DeviceIdentity>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

/// Arrivals and departures between two inventories
///
/// Iteration order of either set is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryChange {
    /// Present now, absent before
    pub arrived: HashSet<DeviceIdentity>,
    /// Present before, absent now
    pub departed: HashSet<DeviceIdentity>,
}

impl InventoryChange {
    /// True when nothing arrived and nothing departed
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty() && self.departed.is_empty()
    }

    /// Arrivals sorted by identity, for stable output
    pub fn arrived_sorted(&self) -> Vec<DeviceIdentity> {
        let mut arrived: Vec<_> = self.arrived.iter().copied().collect();
        arrived.sort();
        arrived
    }

    /// Departures sorted by identity, for stable output
    pub fn departed_sorted(&self) -> Vec<DeviceIdentity> {
        let mut departed: Vec<_> = self.departed.iter().copied().collect();
        departed.sort();
        departed
    }
}

/// Compute arrivals and departures between two polls
///
/// `arrived = current - previous`, `departed = previous - current`.
pub fn diff(previous: &Inventory, current: &Inventory) -> InventoryChange {
    InventoryChange {
        arrived: current.devices.difference(&previous.devices).copied().collect(),
        departed: previous.devices.difference(&current.devices).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(vid: u16, pid: u16, bus: u8, addr: u8) -> DeviceIdentity {
        DeviceIdentity::new(vid, pid, bus, addr)
    }

    #[test]
    fn test_diff_no_change() {
        let inventory: Inventory = [id(0x1234, 0x5678, 1, 2)].into_iter().collect();
        let change = diff(&inventory, &inventory);
        assert!(change.is_empty());
    }

    #[test]
    fn test_diff_arrival_and_departure() {
        let previous: Inventory = [id(0x1234, 0x5678, 1, 2), id(0x046d, 0xc52b, 1, 3)]
            .into_iter()
            .collect();
        let current: Inventory = [id(0x1234, 0x5678, 1, 2), id(0x0781, 0x5581, 2, 4)]
            .into_iter()
            .collect();

        let change = diff(&previous, &current);
        assert_eq!(change.arrived_sorted(), vec![id(0x0781, 0x5581, 2, 4)]);
        assert_eq!(change.departed_sorted(), vec![id(0x046d, 0xc52b, 1, 3)]);
    }

    #[test]
    fn test_diff_readdressed_device_is_departure_plus_arrival() {
        let previous: Inventory = [id(0x1234, 0x5678, 1, 2)].into_iter().collect();
        let current: Inventory = [id(0x1234, 0x5678, 1, 7)].into_iter().collect();

        let change = diff(&previous, &current);
        assert!(change.arrived.contains(&id(0x1234, 0x5678, 1, 7)));
        assert!(change.departed.contains(&id(0x1234, 0x5678, 1, 2)));
    }

    #[test]
    fn test_sorted_output() {
        let current: Inventory = [id(2, 0, 1, 1), id(1, 0, 1, 1), id(1, 0, 1, 0)]
            .into_iter()
            .collect();
        let change = diff(&Inventory::new(), &current);
        assert_eq!(
            change.arrived_sorted(),
            vec![id(1, 0, 1, 0), id(1, 0, 1, 1), id(2, 0, 1, 1)]
        );
    }
}
