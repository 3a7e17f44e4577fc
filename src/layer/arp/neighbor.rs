use alloc::collections::BTreeMap;

use crate::time::{Duration, Expiration, Instant};
use crate::wire::{EthernetAddress, Ipv4Address};

/// A cached neighbor mapping.
///
/// Translates a protocol address into a hardware address and remembers the
/// deadline past which the mapping should no longer be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    hardware_addr: EthernetAddress,
    expires_at: Expiration,
}

impl Neighbor {
    /// The learned hardware address.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }

    /// Whether the mapping is still valid at time `ts`.
    pub fn is_alive(&self, ts: Instant) -> bool {
        !self.expires_at.is_elapsed(ts)
    }
}

/// A neighbor cache backed by a map, with request rate limiting.
///
/// Two tables keyed by protocol address: the learned mappings, each
/// expiring [`ENTRY_LIFETIME`](NeighborCache::ENTRY_LIFETIME) after it was
/// last refreshed, and the timestamps of outstanding resolution requests,
/// which suppress re-requests for
/// [`SILENT_TIME`](NeighborCache::SILENT_TIME).
///
/// Expiry is lazy: a stale entry is discarded by the lookup that finds it,
/// so the tables only ever shrink while being used.
#[derive(Debug, Default)]
pub struct NeighborCache {
    entries: BTreeMap<Ipv4Address, Neighbor>,
    requested_at: BTreeMap<Ipv4Address, Instant>,
}

impl NeighborCache {
    /// Neighbor entry lifetime.
    pub const ENTRY_LIFETIME: Duration = Duration::from_millis(30_000);

    /// Minimum delay between resolution requests for one address.
    pub const SILENT_TIME: Duration = Duration::from_millis(5_000);

    /// Create an empty cache.
    pub fn new() -> NeighborCache {
        NeighborCache::default()
    }

    /// Learn or refresh a mapping at time `ts`.
    ///
    /// Also forgets any outstanding request for the address; the next miss
    /// may request again immediately.
    pub fn fill(&mut self, protocol_addr: Ipv4Address, hardware_addr: EthernetAddress, ts: Instant) {
        self.entries.insert(
            protocol_addr,
            Neighbor {
                hardware_addr,
                expires_at: Expiration::When(ts + Self::ENTRY_LIFETIME),
            },
        );
        self.requested_at.remove(&protocol_addr);
    }

    /// Look up a live mapping, pruning it if it has expired.
    pub fn lookup(&mut self, protocol_addr: Ipv4Address, ts: Instant) -> Option<EthernetAddress> {
        match self.entries.get(&protocol_addr) {
            Some(neighbor) if neighbor.is_alive(ts) => Some(neighbor.hardware_addr),
            Some(_) => {
                self.entries.remove(&protocol_addr);
                None
            }
            None => None,
        }
    }

    /// Whether a resolution request for the address may be sent at `ts`.
    pub fn should_request(&self, protocol_addr: Ipv4Address, ts: Instant) -> bool {
        match self.requested_at.get(&protocol_addr) {
            Some(last) => ts.since(*last) >= Self::SILENT_TIME,
            None => true,
        }
    }

    /// Record that a resolution request went out at `ts`.
    pub fn note_request(&mut self, protocol_addr: Ipv4Address, ts: Instant) {
        self.requested_at.insert(protocol_addr, ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_A: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
    const IP_B: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);
    const HADDR_A: EthernetAddress = EthernetAddress([0, 0, 0, 0, 0, 1]);
    const HADDR_B: EthernetAddress = EthernetAddress([0, 0, 0, 0, 0, 2]);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn fill_and_lookup() {
        let mut cache = NeighborCache::new();
        assert_eq!(cache.lookup(IP_A, at(0)), None);
        cache.fill(IP_A, HADDR_A, at(0));
        assert_eq!(cache.lookup(IP_A, at(0)), Some(HADDR_A));
        assert_eq!(cache.lookup(IP_B, at(0)), None);
    }

    #[test]
    fn entries_expire() {
        let mut cache = NeighborCache::new();
        cache.fill(IP_A, HADDR_A, at(0));
        assert_eq!(cache.lookup(IP_A, at(29_999)), Some(HADDR_A));
        assert_eq!(cache.lookup(IP_A, at(30_000)), None);
        // The stale entry was pruned, not merely hidden.
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn refresh_extends_lifetime() {
        let mut cache = NeighborCache::new();
        cache.fill(IP_A, HADDR_A, at(0));
        cache.fill(IP_A, HADDR_B, at(20_000));
        assert_eq!(cache.lookup(IP_A, at(40_000)), Some(HADDR_B));
        assert_eq!(cache.lookup(IP_A, at(50_000)), None);
    }

    #[test]
    fn request_rate_limited() {
        let mut cache = NeighborCache::new();
        assert!(cache.should_request(IP_A, at(0)));
        cache.note_request(IP_A, at(0));
        assert!(!cache.should_request(IP_A, at(4_999)));
        assert!(cache.should_request(IP_A, at(5_000)));
        // An unrelated address is not limited.
        assert!(cache.should_request(IP_B, at(1)));
    }

    #[test]
    fn fill_clears_outstanding_request() {
        let mut cache = NeighborCache::new();
        cache.note_request(IP_A, at(0));
        cache.fill(IP_A, HADDR_A, at(1));
        assert!(cache.should_request(IP_A, at(2)));
    }
}
