//! The process logic of protocol layers.
//!
//! Each protocol is split in two: the packet representation lives in
//! [`wire`](crate::wire) while the state machine processing those packets
//! lives here. Every state machine owns its queues and its clock; the host
//! feeds inbound items and `tick`s, and drains outbound items, in whatever
//! order it likes. Nothing in this module performs I/O or blocks.
//!
//! The ownership forms a tree, never a graph: a TCP
//! [`Connection`](tcp::Connection) owns its [`Sender`](tcp::Sender) and
//! [`Receiver`](tcp::Receiver); the sender owns its outgoing byte stream;
//! the receiver owns its reassembler, which owns the inbound byte stream.
//! An [`ip::Router`] owns its [`eth::Interface`]s, each of which owns its
//! ARP [neighbor cache](arp::NeighborCache). No handles to the inner
//! pieces escape their owner.

pub mod arp;
pub mod eth;
pub mod ip;
pub mod tcp;
