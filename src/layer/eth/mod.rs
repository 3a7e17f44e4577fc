//! The Ethernet attachment point of the stack.
//!
//! [`Interface`] is where IPv4 datagrams meet Ethernet frames: outbound
//! datagrams wait for ARP resolution of their next hop, inbound frames are
//! demultiplexed into datagrams and ARP table updates.

mod interface;

pub use interface::Interface;
