//! IPv4 forwarding.
//!
//! [`Routes`] is the longest-prefix-match table; [`Router`] owns a set of
//! [`Interface`](crate::layer::eth::Interface)s and moves datagrams
//! between them according to that table, decrementing the TTL as it goes.

mod route;
mod router;

pub use route::{Route, Routes};
pub use router::Router;
