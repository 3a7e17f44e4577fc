use alloc::vec::Vec;

use super::route::{Route, Routes};
use crate::layer::eth::Interface;
use crate::wire::{Ipv4Address, Ipv4Datagram, Ipv4Subnet};

/// An IPv4 router: a set of interfaces and the table telling datagrams
/// which one to leave through.
///
/// The router owns its interfaces. The host feeds frames into and drains
/// frames out of each interface by index; [`route`](Router::route) then
/// moves every datagram the interfaces received to its outbound interface,
/// decrementing the TTL and dropping expired or unroutable datagrams
/// silently.
#[derive(Debug, Default)]
pub struct Router {
    interfaces: Vec<Interface>,
    routes: Routes,
}

impl Router {
    /// Create a router with no interfaces and no routes.
    pub fn new() -> Router {
        Router::default()
    }

    /// Attach an interface, returning the index routes refer to it by.
    pub fn add_interface(&mut self, interface: Interface) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    /// Access an interface by index, e.g. to feed or drain its frames.
    pub fn interface_mut(&mut self, index: usize) -> &mut Interface {
        &mut self.interfaces[index]
    }

    /// Number of attached interfaces.
    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    /// Add a route sending `subnet` out of interface `interface`, via
    /// `next_hop` if the network is not directly attached.
    ///
    /// # Panics
    /// Panics if `interface` does not name an attached interface.
    pub fn add_route(
        &mut self,
        subnet: Ipv4Subnet,
        next_hop: Option<Ipv4Address>,
        interface: usize,
    ) {
        assert!(interface < self.interfaces.len());
        self.routes.add(subnet, Route { next_hop, interface });
    }

    /// Route one datagram towards its destination.
    fn route_one_datagram(&mut self, mut dgram: Ipv4Datagram) {
        // Expired on arrival, or would expire in our hands.
        if dgram.header.ttl <= 1 {
            net_trace!("dropping datagram for {}: ttl expired", dgram.header.dst_addr);
            return;
        }
        dgram.header.ttl -= 1;

        match self.routes.lookup(dgram.header.dst_addr) {
            Some(Route { next_hop, interface }) => {
                let hop = next_hop.unwrap_or(dgram.header.dst_addr);
                self.interfaces[interface].send_datagram(dgram, hop);
            }
            None => {
                net_trace!("no route for {}, dropping", dgram.header.dst_addr);
            }
        }
    }

    /// Drain every interface's inbound datagrams through the table.
    pub fn route(&mut self) {
        for index in 0..self.interfaces.len() {
            while let Some(dgram) = self.interfaces[index].pop_datagram() {
                self.route_one_datagram(dgram);
            }
        }
    }

    /// Advance every interface's clock by `ms` milliseconds.
    pub fn tick(&mut self, ms: u64) {
        for interface in &mut self.interfaces {
            interface.tick(ms);
        }
    }
}
