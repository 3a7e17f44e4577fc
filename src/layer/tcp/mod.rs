//! The TCP state machines.
//!
//! [`Receiver`] turns inbound segments into an ordered byte stream and
//! computes the acknowledgment and window to advertise back. [`Sender`]
//! carves its outgoing byte stream into segments under the peer's window
//! and retransmits on timeout. [`Connection`] owns one of each and runs
//! the handshake, teardown and reset logic between them.

mod connection;
mod receiver;
mod sender;

pub use connection::Connection;
pub use receiver::Receiver;
pub use sender::Sender;

use crate::wire::SeqNumber;

/// The largest payload carried by a single segment.
pub const MAX_PAYLOAD_SIZE: usize = 1452;

/// Tunables for a [`Connection`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the inbound (receiver) byte stream and reorder buffer.
    pub recv_capacity: usize,
    /// Capacity of the outbound (sender) byte stream.
    pub send_capacity: usize,
    /// Initial retransmission timeout, in milliseconds.
    pub rt_timeout: u64,
    /// Retransmission attempts after which the connection gives up.
    pub max_retx_attempts: u32,
    /// Use this exact initial sequence number instead of deriving one.
    pub fixed_isn: Option<SeqNumber>,
    /// Entropy for ISN derivation, injected by the host.
    ///
    /// The core never reads a clock or an RNG; whatever randomness the ISN
    /// should carry comes in through this seed.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            recv_capacity: 64000,
            send_capacity: 64000,
            rt_timeout: 1000,
            max_retx_attempts: 8,
            fixed_isn: None,
            seed: 0,
        }
    }
}

impl Config {
    /// The initial sequence number a connection built from this
    /// configuration will use.
    pub fn isn(&self) -> SeqNumber {
        match self.fixed_isn {
            Some(isn) => isn,
            None => SeqNumber(splitmix64(self.seed) as u32),
        }
    }
}

/// The 64-bit finalizer of the splitmix64 generator.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isn_respects_fixed() {
        let cfg = Config {
            fixed_isn: Some(SeqNumber(42)),
            ..Config::default()
        };
        assert_eq!(cfg.isn(), SeqNumber(42));
    }

    #[test]
    fn isn_is_seed_deterministic() {
        let a = Config {
            seed: 7,
            ..Config::default()
        };
        let b = Config {
            seed: 7,
            ..Config::default()
        };
        let c = Config {
            seed: 8,
            ..Config::default()
        };
        assert_eq!(a.isn(), b.isn());
        assert_ne!(a.isn(), c.isn());
    }
}
