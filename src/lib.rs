//! A user-space TCP implementation and the link-layer glue to ship it.
//!
//! `weft` is a *library* realization of TCP over an Ethernet-like fabric. It
//! owns no sockets, opens no file descriptors and performs no I/O of its own.
//! A host program drives the stack by handing in parsed inbound frames and
//! monotonic time ticks, and drains outbound frames and segments from the
//! queues each component maintains.
//!
//! ## Structure
//!
//! The crate is split the same way the protocol is:
//!
//! * [`wire`] holds the packet representations: field access and the
//!   `Repr`-style parse/emit codecs for Ethernet, ARP, IPv4 and TCP, plus
//!   the sequence number wrap/unwrap arithmetic.
//! * [`storage`] holds the stream primitives: a capacity-bounded in-order
//!   [byte stream](storage::stream::ByteStream) and the out-of-order
//!   [reassembler](storage::assembler::Reassembler) feeding it.
//! * [`layer`] holds the protocol state machines: the TCP
//!   [receiver](layer::tcp::Receiver), [sender](layer::tcp::Sender) and
//!   [connection](layer::tcp::Connection); the Ethernet
//!   [interface](layer::eth::Interface) with its ARP
//!   [neighbor cache](layer::arp::NeighborCache); and the IP
//!   [router](layer::ip::Router).
//! * [`time`] defines the millisecond [`Instant`](time::Instant) every
//!   timed component keeps as local state.
//!
//! ## Driving the stack
//!
//! All components are single-threaded and cooperative. No call suspends;
//! time advances only through explicit `tick(ms)` calls which the host
//! supplies in nonnegative increments. Ticks may coalesce: one large tick
//! is equivalent to the sum of smaller ones for every timer in the crate.
//! Outbound items appear in FIFO order in owned queues, drained through
//! `pop_*` accessors; there are no callbacks and no internal locking.
//!
//! Nothing here blocks on a resource it does not own. Buffers are bounded
//! up front: byte streams by their capacity, the reassembler by the
//! capacity left over from its output stream, and the ARP tables are
//! pruned lazily on lookup.
#![warn(missing_docs)]
#![warn(unreachable_pub)]
// tests use `std`
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

#[macro_use]
mod macros;
pub mod layer;
pub mod storage;
pub mod time;
pub mod wire;
