//! Address resolution state, as described in RFC 826.
//!
//! ARP assumes the resolver fully knows its own identities; everything the
//! cache stores is learned from traffic. The tables here are plain maps
//! with lazy expiry: entries are checked, and pruned, at the moment a
//! lookup touches them, never by a sweeper.

mod neighbor;

pub use neighbor::{Neighbor, NeighborCache};
