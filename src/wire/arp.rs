use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};

pub use super::EthernetAddress as Address;
pub use super::Ipv4Address as IpAddress;

enum_with_unknown! {
    /// ARP hardware type.
    pub enum Hardware(u16) {
        Ethernet = 1,
    }
}

enum_with_unknown! {
    /// ARP operation type.
    pub enum Operation(u16) {
        Request = 1,
        Reply = 2,
    }
}

mod field {
    use crate::wire::field::*;

    pub(crate) const HTYPE: Field = 0..2;
    pub(crate) const PTYPE: Field = 2..4;
    pub(crate) const HLEN: usize = 4;
    pub(crate) const PLEN: usize = 5;
    pub(crate) const OPER: Field = 6..8;
    pub(crate) const SHA: Field = 8..14;
    pub(crate) const SPA: Field = 14..18;
    pub(crate) const THA: Field = 18..24;
    pub(crate) const TPA: Field = 24..28;
}

/// The length of an Ethernet/IPv4 ARP message.
pub const MESSAGE_LEN: usize = field::TPA.end;

/// A high-level representation of an Ethernet/IPv4 ARP message.
///
/// Only the Ethernet/IPv4 hardware/protocol pair is representable; messages
/// for any other pair parse as [`Error::Unrecognized`]. An all-zero
/// [`target_hardware_addr`](#structfield.target_hardware_addr) signals
/// "unknown" in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repr {
    pub operation: Operation,
    pub source_hardware_addr: Address,
    pub source_protocol_addr: IpAddress,
    pub target_hardware_addr: Address,
    pub target_protocol_addr: IpAddress,
}

impl Repr {
    /// Parse an ARP message out of an octet buffer.
    pub fn parse(data: &[u8]) -> Result<Repr> {
        if data.len() < MESSAGE_LEN {
            return Err(Error::Truncated);
        }
        let htype = Hardware::from(NetworkEndian::read_u16(&data[field::HTYPE]));
        let ptype = super::EtherType::from(NetworkEndian::read_u16(&data[field::PTYPE]));
        if htype != Hardware::Ethernet
            || ptype != super::EtherType::Ipv4
            || data[field::HLEN] != 6
            || data[field::PLEN] != 4
        {
            return Err(Error::Unrecognized);
        }
        Ok(Repr {
            operation: Operation::from(NetworkEndian::read_u16(&data[field::OPER])),
            source_hardware_addr: Address::from_bytes(&data[field::SHA]),
            source_protocol_addr: IpAddress::from_bytes(&data[field::SPA]),
            target_hardware_addr: Address::from_bytes(&data[field::THA]),
            target_protocol_addr: IpAddress::from_bytes(&data[field::TPA]),
        })
    }

    /// The buffer size needed to emit this message.
    pub fn buffer_len(&self) -> usize {
        MESSAGE_LEN
    }

    /// Emit the message into an octet buffer of at least [`MESSAGE_LEN`] octets.
    pub fn emit(&self, data: &mut [u8]) {
        NetworkEndian::write_u16(&mut data[field::HTYPE], Hardware::Ethernet.into());
        NetworkEndian::write_u16(&mut data[field::PTYPE], super::EtherType::Ipv4.into());
        data[field::HLEN] = 6;
        data[field::PLEN] = 4;
        NetworkEndian::write_u16(&mut data[field::OPER], self.operation.into());
        data[field::SHA].copy_from_slice(self.source_hardware_addr.as_bytes());
        data[field::SPA].copy_from_slice(self.source_protocol_addr.as_bytes());
        data[field::THA].copy_from_slice(self.target_hardware_addr.as_bytes());
        data[field::TPA].copy_from_slice(self.target_protocol_addr.as_bytes());
    }

    /// Serialize into a freshly allocated buffer.
    pub fn to_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut buffer = alloc::vec![0; MESSAGE_LEN];
        self.emit(&mut buffer);
        buffer
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operation {
            Operation::Request => write!(
                f,
                "who has {}? tell {} at {}",
                self.target_protocol_addr, self.source_protocol_addr, self.source_hardware_addr
            ),
            Operation::Reply => write!(
                f,
                "{} is at {}",
                self.source_protocol_addr, self.source_hardware_addr
            ),
            Operation::Unknown(op) => write!(f, "unknown ARP operation {}", op),
        }
    }
}
