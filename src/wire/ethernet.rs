use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};

enum_with_unknown! {
    /// Ethernet protocol type.
    pub enum EtherType(u16) {
        Ipv4 = 0x0800,
        Arp = 0x0806,
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EtherType::Ipv4 => write!(f, "IPv4"),
            EtherType::Arp => write!(f, "ARP"),
            EtherType::Unknown(id) => write!(f, "0x{:04x}", id),
        }
    }
}

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// The all-zeros address, used by ARP requests for the unknown target.
    pub const ZERO: Address = Address([0x00; 6]);

    /// Construct an Ethernet address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an Ethernet address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the "multicast" bit in the OUI is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() || self.is_multicast())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

mod field {
    use crate::wire::field::*;

    pub(crate) const DESTINATION: Field = 0..6;
    pub(crate) const SOURCE: Field = 6..12;
    pub(crate) const ETHERTYPE: Field = 12..14;
    pub(crate) const PAYLOAD: Rest = 14..;
}

/// The length of an Ethernet II header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

/// A high-level representation of an Ethernet II header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub ethertype: EtherType,
}

impl Repr {
    /// Parse an Ethernet II header out of an octet buffer.
    pub fn parse(data: &[u8]) -> Result<Repr> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }
        Ok(Repr {
            dst_addr: Address::from_bytes(&data[field::DESTINATION]),
            src_addr: Address::from_bytes(&data[field::SOURCE]),
            ethertype: EtherType::from(NetworkEndian::read_u16(&data[field::ETHERTYPE])),
        })
    }

    /// Emit the header into an octet buffer of at least [`HEADER_LEN`] octets.
    pub fn emit(&self, data: &mut [u8]) {
        data[field::DESTINATION].copy_from_slice(self.dst_addr.as_bytes());
        data[field::SOURCE].copy_from_slice(self.src_addr.as_bytes());
        NetworkEndian::write_u16(&mut data[field::ETHERTYPE], self.ethertype.into());
    }
}

/// An Ethernet II frame with an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Repr,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Parse a whole frame, copying the payload out of the buffer.
    pub fn parse(data: &[u8]) -> Result<Frame> {
        let header = Repr::parse(data)?;
        Ok(Frame {
            header,
            payload: data[field::PAYLOAD].to_vec(),
        })
    }

    /// The buffer size needed to emit this frame.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Emit the frame into an octet buffer of at least `buffer_len()` octets.
    pub fn emit(&self, data: &mut [u8]) {
        self.header.emit(data);
        data[field::PAYLOAD.start..][..self.payload.len()].copy_from_slice(&self.payload);
    }

    /// Serialize into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = alloc::vec![0; self.buffer_len()];
        self.emit(&mut buffer);
        buffer
    }
}
