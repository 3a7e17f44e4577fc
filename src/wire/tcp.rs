use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::{fmt, ops};

use super::{checksum, Error, IpProtocol, Ipv4Address, Result};

/// A TCP sequence number as it appears on the wire.
///
/// Sequence numbers are 32 bits and wrap; the stack internally works in a
/// 64-bit *absolute* sequence space starting at zero for the SYN. The two
/// spaces are bridged by [`SeqNumber::wrap`] and [`SeqNumber::unwrap`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub u32);

impl SeqNumber {
    /// Map an absolute sequence number into the wire space around `isn`.
    pub fn wrap(abs: u64, isn: SeqNumber) -> SeqNumber {
        SeqNumber(isn.0.wrapping_add(abs as u32))
    }

    /// Map this wire sequence number back into the absolute space.
    ///
    /// Among the infinitely many absolute values congruent to `self`, the
    /// one closest to `checkpoint` is returned; when two candidates are
    /// equally close the smaller wins.
    pub fn unwrap(self, isn: SeqNumber, checkpoint: u64) -> u64 {
        const WINDOW: u64 = 1 << 32;
        let steps = u64::from(self.0.wrapping_sub(isn.0));
        // Candidate at or below the checkpoint's 2^32 block, clamped so it
        // never goes negative.
        let from_prev = steps + checkpoint.saturating_sub(steps) / WINDOW * WINDOW;
        let from_next = from_prev + WINDOW;
        let diff_prev = checkpoint.abs_diff(from_prev);
        let diff_next = checkpoint.abs_diff(from_next);
        if diff_prev <= diff_next {
            from_prev
        } else {
            from_next
        }
    }
}

impl ops::Add<u64> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u64) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs as u32))
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

mod field {
    use crate::wire::field::*;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM: Field = 4..8;
    pub(crate) const ACK_NUM: Field = 8..12;
    pub(crate) const FLAGS: Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;

    pub(crate) const FLG_FIN: u16 = 0x001;
    pub(crate) const FLG_SYN: u16 = 0x002;
    pub(crate) const FLG_RST: u16 = 0x004;
    pub(crate) const FLG_PSH: u16 = 0x008;
    pub(crate) const FLG_ACK: u16 = 0x010;
}

/// The length of a TCP header without options.
pub const HEADER_LEN: usize = 20;

/// A high-level representation of a TCP header.
///
/// Options are skipped on parse and never emitted. The urgent pointer is
/// not modeled and emits as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    pub seqno: SeqNumber,
    pub ackno: SeqNumber,
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
    pub window: u16,
}

impl Repr {
    /// Parse a TCP header out of an octet buffer.
    ///
    /// The checksum is not verified here since it covers a pseudo header
    /// the buffer alone does not contain; see [`Segment::verify_checksum`].
    pub fn parse(data: &[u8]) -> Result<Repr> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }
        let raw_flags = NetworkEndian::read_u16(&data[field::FLAGS]);
        let header_len = usize::from(raw_flags >> 12) * 4;
        if header_len < HEADER_LEN {
            return Err(Error::Malformed);
        }
        if header_len > data.len() {
            return Err(Error::Truncated);
        }
        Ok(Repr {
            src_port: NetworkEndian::read_u16(&data[field::SRC_PORT]),
            dst_port: NetworkEndian::read_u16(&data[field::DST_PORT]),
            seqno: SeqNumber(NetworkEndian::read_u32(&data[field::SEQ_NUM])),
            ackno: SeqNumber(NetworkEndian::read_u32(&data[field::ACK_NUM])),
            fin: raw_flags & field::FLG_FIN != 0,
            syn: raw_flags & field::FLG_SYN != 0,
            rst: raw_flags & field::FLG_RST != 0,
            psh: raw_flags & field::FLG_PSH != 0,
            ack: raw_flags & field::FLG_ACK != 0,
            window: NetworkEndian::read_u16(&data[field::WIN_SIZE]),
        })
    }

    /// Emit the header into an octet buffer of at least [`HEADER_LEN`] octets.
    ///
    /// The checksum field is left zero; [`Segment::emit`] fills it in once
    /// the payload and pseudo header are known.
    pub fn emit(&self, data: &mut [u8]) {
        data[..HEADER_LEN].fill(0);
        NetworkEndian::write_u16(&mut data[field::SRC_PORT], self.src_port);
        NetworkEndian::write_u16(&mut data[field::DST_PORT], self.dst_port);
        NetworkEndian::write_u32(&mut data[field::SEQ_NUM], self.seqno.0);
        NetworkEndian::write_u32(&mut data[field::ACK_NUM], self.ackno.0);
        let mut raw_flags = (HEADER_LEN as u16 / 4) << 12;
        if self.fin {
            raw_flags |= field::FLG_FIN;
        }
        if self.syn {
            raw_flags |= field::FLG_SYN;
        }
        if self.rst {
            raw_flags |= field::FLG_RST;
        }
        if self.psh {
            raw_flags |= field::FLG_PSH;
        }
        if self.ack {
            raw_flags |= field::FLG_ACK;
        }
        NetworkEndian::write_u16(&mut data[field::FLAGS], raw_flags);
        NetworkEndian::write_u16(&mut data[field::WIN_SIZE], self.window);
    }
}

/// A TCP segment with an owned payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    pub header: Repr,
    pub payload: Vec<u8>,
}

impl Segment {
    /// The number of sequence numbers this segment occupies.
    ///
    /// SYN and FIN each occupy one sequence number in addition to the
    /// payload octets.
    pub fn sequence_len(&self) -> u64 {
        usize::from(self.header.syn) as u64
            + self.payload.len() as u64
            + usize::from(self.header.fin) as u64
    }

    /// Parse a whole segment, copying the payload out of the buffer.
    pub fn parse(data: &[u8]) -> Result<Segment> {
        let header = Repr::parse(data)?;
        let raw_flags = NetworkEndian::read_u16(&data[field::FLAGS]);
        let header_len = usize::from(raw_flags >> 12) * 4;
        Ok(Segment {
            header,
            payload: data[header_len..].to_vec(),
        })
    }

    /// The buffer size needed to emit this segment.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Emit the segment into an octet buffer of at least `buffer_len()`
    /// octets, computing the checksum over the given pseudo header.
    pub fn emit(&self, data: &mut [u8], src: Ipv4Address, dst: Ipv4Address) {
        self.header.emit(data);
        data[HEADER_LEN..][..self.payload.len()].copy_from_slice(&self.payload);
        let total = HEADER_LEN + self.payload.len();
        let acc = checksum::pseudo_header(src, dst, IpProtocol::Tcp, total);
        let sum = checksum::finish(checksum::sum(acc, &data[..total]));
        NetworkEndian::write_u16(&mut data[field::CHECKSUM], sum);
    }

    /// Serialize into a freshly allocated buffer.
    pub fn to_bytes(&self, src: Ipv4Address, dst: Ipv4Address) -> Vec<u8> {
        let mut buffer = alloc::vec![0; self.buffer_len()];
        self.emit(&mut buffer, src, dst);
        buffer
    }

    /// Verify the checksum of a raw segment against its pseudo header.
    pub fn verify_checksum(data: &[u8], src: Ipv4Address, dst: Ipv4Address) -> bool {
        let acc = checksum::pseudo_header(src, dst, IpProtocol::Tcp, data.len());
        checksum::finish(checksum::sum(acc, data)) == 0
    }
}
