/*! Low-level packet access and construction.

Each protocol gets a `Repr`: a compact, high-level description of a header
that can be `parse`d out of a sequence of octets and `emit`ted back into
one. On top of the `Repr`s sit owned container types ([`EthernetFrame`],
[`Ipv4Datagram`], [`TcpSegment`]) that pair a header representation with
an owned payload so they can travel through the crate's FIFO queues.

The field layout approach (offset tables in a private `field` module, all
multi-octet access through `byteorder::NetworkEndian`) follows the style
popularized by `smoltcp`.

`Repr::parse` never panics on arbitrary input; a malformed or truncated
buffer is reported through [`Error`]. `Repr::emit` never panics as long as
the target buffer holds at least `buffer_len()` octets.
*/
#![allow(missing_docs)]

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod arp;
pub mod ethernet;
pub mod ipv4;
pub mod tcp;

pub use arp::{Operation as ArpOperation, Repr as ArpRepr};
pub use ethernet::{
    Address as EthernetAddress, EtherType, Frame as EthernetFrame, Repr as EthernetRepr,
};
pub use ipv4::{
    Address as Ipv4Address, Datagram as Ipv4Datagram, Protocol as IpProtocol, Repr as Ipv4Repr,
    Subnet as Ipv4Subnet,
};
pub use tcp::{Repr as TcpRepr, Segment as TcpSegment, SeqNumber};

use core::fmt;

/// The error type for parsing of the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An incoming packet was shorter than its header claims.
    Truncated,

    /// An incoming packet was recognized but self-contradictory.
    Malformed,

    /// An incoming packet could not be recognized.
    ///
    /// E.g. an ARP message for a hardware/protocol pair other than
    /// Ethernet/IPv4, or an IP version other than 4.
    Unrecognized,

    /// An incoming packet had an incorrect checksum.
    WrongChecksum,
}

/// The result type for parsing and emission.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "truncated packet"),
            Error::Malformed => write!(f, "malformed packet"),
            Error::Unrecognized => write!(f, "unrecognized packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
        }
    }
}

pub(crate) mod checksum {
    //! The Internet checksum, rfc1071.

    use byteorder::{ByteOrder, NetworkEndian};

    pub(crate) fn sum(mut acc: u32, data: &[u8]) -> u32 {
        let mut chunks = data.chunks_exact(2);
        for chunk in chunks.by_ref() {
            acc += u32::from(NetworkEndian::read_u16(chunk));
        }
        if let [last] = chunks.remainder() {
            acc += u32::from(*last) << 8;
        }
        acc
    }

    pub(crate) fn finish(mut acc: u32) -> u16 {
        while acc >> 16 != 0 {
            acc = (acc & 0xffff) + (acc >> 16);
        }
        !(acc as u16)
    }

    pub(crate) fn data(data: &[u8]) -> u16 {
        finish(sum(0, data))
    }

    /// The IPv4 pseudo header sum used by the TCP checksum.
    pub(crate) fn pseudo_header(
        src: super::Ipv4Address,
        dst: super::Ipv4Address,
        protocol: super::IpProtocol,
        length: usize,
    ) -> u32 {
        let mut acc = 0;
        acc = sum(acc, src.as_bytes());
        acc = sum(acc, dst.as_bytes());
        acc += u32::from(u8::from(protocol));
        acc + length as u32
    }
}
