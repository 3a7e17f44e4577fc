//! CIDR routing tables, relevant rfc1519, rfc4632.

use alloc::collections::BTreeMap;

use crate::wire::{Ipv4Address, Ipv4Subnet};

/// One forwarding decision: where a matching datagram leaves and through
/// whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// The next router on the path, or `None` when the destination network
    /// is attached directly and the datagram's own destination is the hop.
    pub next_hop: Option<Ipv4Address>,
    /// Index of the interface to send matching datagrams out on.
    pub interface: usize,
}

/// A longest-prefix-match routing table.
///
/// Keyed by `(prefix, prefix length)` with the prefix normalized, so a
/// lookup for a destination can probe exactly one key per prefix length,
/// from the most specific `/32` down to the catch-all `/0`.
#[derive(Debug, Default)]
pub struct Routes {
    table: BTreeMap<(u32, u8), Route>,
}

impl Routes {
    /// Create an empty routing table.
    pub fn new() -> Routes {
        Routes::default()
    }

    /// Add a route for `subnet`, replacing an existing route for the exact
    /// same subnet.
    ///
    /// [`Ipv4Subnet`] is normalized on construction, so `10.1.2.3/16` and
    /// `10.1.0.0/16` name the same entry.
    pub fn add(&mut self, subnet: Ipv4Subnet, route: Route) {
        self.table
            .insert((subnet.address().to_u32(), subnet.prefix_len()), route);
    }

    /// Find the route whose prefix is the longest one covering `dst`.
    pub fn lookup(&self, dst: Ipv4Address) -> Option<Route> {
        for prefix_len in (0..=32u8).rev() {
            let masked = dst.to_u32() & Ipv4Subnet::netmask(prefix_len);
            if let Some(route) = self.table.get(&(masked, prefix_len)) {
                return Some(*route);
            }
        }
        None
    }

    /// Number of routes in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table holds no routes.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
