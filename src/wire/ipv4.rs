use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{checksum, Error, Result};

enum_with_unknown! {
    /// IP payload protocol type.
    pub enum Protocol(u8) {
        Icmp = 0x01,
        Tcp = 0x06,
        Udp = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// An unspecified address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// The limited broadcast address.
    pub const BROADCAST: Address = Address([0xff; 4]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Construct an IPv4 address from its native-endian numeric form.
    pub const fn from_u32(value: u32) -> Address {
        Address(value.to_be_bytes())
    }

    /// Return the address as a native-endian 32-bit number.
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Return an IPv4 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the address is the limited broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the address is a multicast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 0xe0
    }

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() || self.is_multicast() || *self == Self::UNSPECIFIED)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// An IPv4 network: an address prefix and its length.
///
/// The stored address is always normalized, with every bit below the prefix
/// length cleared, so two subnets compare equal iff they match the same set
/// of addresses.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Subnet {
    address: Address,
    prefix_len: u8,
}

impl Subnet {
    /// Create a subnet, masking off the bits below the prefix length.
    ///
    /// # Panics
    /// The function panics if `prefix_len` is larger than 32.
    pub fn new(address: Address, prefix_len: u8) -> Subnet {
        assert!(prefix_len <= 32);
        Subnet {
            address: Address::from_u32(address.to_u32() & Self::netmask(prefix_len)),
            prefix_len,
        }
    }

    /// The all-matching `0.0.0.0/0` subnet, i.e. the default route.
    pub const ANY: Subnet = Subnet {
        address: Address::UNSPECIFIED,
        prefix_len: 0,
    };

    /// The netmask with `prefix_len` leading ones, as a native-endian number.
    pub fn netmask(prefix_len: u8) -> u32 {
        debug_assert!(prefix_len <= 32);
        // A shift by the full width is not defined, so /0 is special.
        u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0)
    }

    /// The normalized network address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The number of leading bits an address must share to match.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Query whether the subnet contains the given address.
    pub fn contains(&self, addr: Address) -> bool {
        addr.to_u32() & Self::netmask(self.prefix_len) == self.address.to_u32()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

mod field {
    use crate::wire::field::*;

    pub(crate) const VER_IHL: usize = 0;
    pub(crate) const LENGTH: Field = 2..4;
    pub(crate) const TTL: usize = 8;
    pub(crate) const PROTOCOL: usize = 9;
    pub(crate) const CHECKSUM: Field = 10..12;
    pub(crate) const SRC_ADDR: Field = 12..16;
    pub(crate) const DST_ADDR: Field = 16..20;
}

/// The length of an IPv4 header without options.
pub const HEADER_LEN: usize = field::DST_ADDR.end;

/// A high-level representation of an IPv4 header.
///
/// Options are skipped on parse and never emitted; fragmentation is not
/// modeled, so the identification and fragment fields emit as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub protocol: Protocol,
    pub ttl: u8,
    pub payload_len: usize,
}

impl Repr {
    /// Parse an IPv4 header out of an octet buffer, verifying the checksum.
    pub fn parse(data: &[u8]) -> Result<Repr> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }
        let ver_ihl = data[field::VER_IHL];
        if ver_ihl >> 4 != 4 {
            return Err(Error::Unrecognized);
        }
        let header_len = usize::from(ver_ihl & 0x0f) * 4;
        if header_len < HEADER_LEN || header_len > data.len() {
            return Err(Error::Malformed);
        }
        let total_len = usize::from(NetworkEndian::read_u16(&data[field::LENGTH]));
        if total_len < header_len || total_len > data.len() {
            return Err(Error::Malformed);
        }
        if checksum::data(&data[..header_len]) != 0 {
            return Err(Error::WrongChecksum);
        }
        Ok(Repr {
            src_addr: Address::from_bytes(&data[field::SRC_ADDR]),
            dst_addr: Address::from_bytes(&data[field::DST_ADDR]),
            protocol: Protocol::from(data[field::PROTOCOL]),
            ttl: data[field::TTL],
            payload_len: total_len - header_len,
        })
    }

    /// The octet range the payload occupies within a parsed buffer.
    fn payload_range(data: &[u8]) -> core::ops::Range<usize> {
        let header_len = usize::from(data[field::VER_IHL] & 0x0f) * 4;
        let total_len = usize::from(NetworkEndian::read_u16(&data[field::LENGTH]));
        header_len..total_len
    }

    /// The buffer size needed to emit this header and its payload.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN + self.payload_len
    }

    /// Emit the header into an octet buffer of at least [`HEADER_LEN`] octets.
    ///
    /// The checksum is computed over the emitted header.
    pub fn emit(&self, data: &mut [u8]) {
        data[..HEADER_LEN].fill(0);
        data[field::VER_IHL] = 0x45;
        NetworkEndian::write_u16(
            &mut data[field::LENGTH],
            (HEADER_LEN + self.payload_len) as u16,
        );
        data[field::TTL] = self.ttl;
        data[field::PROTOCOL] = self.protocol.into();
        data[field::SRC_ADDR].copy_from_slice(self.src_addr.as_bytes());
        data[field::DST_ADDR].copy_from_slice(self.dst_addr.as_bytes());
        let sum = checksum::data(&data[..HEADER_LEN]);
        NetworkEndian::write_u16(&mut data[field::CHECKSUM], sum);
    }
}

/// An IPv4 datagram with an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: Repr,
    pub payload: Vec<u8>,
}

impl Datagram {
    /// Parse a whole datagram, copying the payload out of the buffer.
    pub fn parse(data: &[u8]) -> Result<Datagram> {
        let header = Repr::parse(data)?;
        Ok(Datagram {
            header,
            payload: data[Repr::payload_range(data)].to_vec(),
        })
    }

    /// The buffer size needed to emit this datagram.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Emit the datagram into an octet buffer of at least `buffer_len()` octets.
    pub fn emit(&self, data: &mut [u8]) {
        debug_assert_eq!(self.header.payload_len, self.payload.len());
        self.header.emit(data);
        data[HEADER_LEN..][..self.payload.len()].copy_from_slice(&self.payload);
    }

    /// Serialize into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = alloc::vec![0; self.buffer_len()];
        self.emit(&mut buffer);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DATAGRAM_BYTES: [u8; 24] = [
        0x45, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x40, 0x06, 0x66, 0xde, 0x0a, 0x00, 0x00,
        0x01, 0x0a, 0x00, 0x00, 0x02, 0xaa, 0xbb, 0xcc, 0xdd,
    ];

    fn datagram() -> Datagram {
        Datagram {
            header: Repr {
                src_addr: Address::new(10, 0, 0, 1),
                dst_addr: Address::new(10, 0, 0, 2),
                protocol: Protocol::Tcp,
                ttl: 64,
                payload_len: 4,
            },
            payload: alloc::vec![0xaa, 0xbb, 0xcc, 0xdd],
        }
    }

    #[test]
    fn emit_parse_round_trip() {
        let bytes = datagram().to_bytes();
        assert_eq!(bytes, &DATAGRAM_BYTES[..]);
        assert_eq!(Datagram::parse(&bytes).unwrap(), datagram());
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut bytes = DATAGRAM_BYTES;
        bytes[10] = 0;
        bytes[11] = 0;
        assert_eq!(Datagram::parse(&bytes), Err(Error::WrongChecksum));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = DATAGRAM_BYTES;
        bytes[0] = 0x65;
        assert_eq!(Datagram::parse(&bytes), Err(Error::Unrecognized));
    }

    #[test]
    fn subnet_contains() {
        let net = Subnet::new(Address::new(10, 1, 2, 3), 16);
        assert_eq!(net.address(), Address::new(10, 1, 0, 0));
        assert!(net.contains(Address::new(10, 1, 255, 1)));
        assert!(!net.contains(Address::new(10, 2, 0, 1)));
        assert!(Subnet::ANY.contains(Address::new(8, 8, 8, 8)));
        assert_eq!(Subnet::netmask(0), 0);
        assert_eq!(Subnet::netmask(32), u32::MAX);
        assert_eq!(Subnet::netmask(8), 0xff00_0000);
    }
}
