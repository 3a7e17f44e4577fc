use crate::storage::{ByteStream, Reassembler};
use crate::wire::{SeqNumber, TcpSegment};

/// The receiving half of a TCP connection.
///
/// Accepts inbound segments, translates their wrapped sequence numbers
/// into the absolute stream space, reassembles the payload bytes and
/// computes the acknowledgment number and window size to advertise back
/// to the remote sender.
///
/// The acknowledgment number counts one for the SYN, one per assembled
/// byte, and one for the FIN once the whole stream has arrived.
#[derive(Debug)]
pub struct Receiver {
    capacity: usize,
    reassembler: Reassembler,
    isn: SeqNumber,
    /// Absolute acknowledgment number; the SYN occupies index zero, so
    /// this starts at one once the ISN is known.
    ackno: u64,
    has_isn: bool,
    has_fin: bool,
    counted_fin: bool,
}

impl Receiver {
    /// Construct a receiver buffering at most `capacity` bytes.
    pub fn new(capacity: usize) -> Receiver {
        Receiver {
            capacity,
            reassembler: Reassembler::new(capacity),
            isn: SeqNumber(0),
            ackno: 1,
            has_isn: false,
            has_fin: false,
            counted_fin: false,
        }
    }

    /// Process an inbound segment.
    pub fn segment_received(&mut self, seg: &TcpSegment) {
        let header = &seg.header;
        if header.syn {
            self.isn = header.seqno;
            self.has_isn = true;
        }
        if !self.has_isn {
            return;
        }
        if header.fin && !self.counted_fin {
            self.has_fin = true;
        }

        // The first payload byte sits one past the SYN in sequence space;
        // aligning to the zero-based stream index shifts everything down
        // by one. A stale duplicate at the ISN itself wraps below zero and
        // lands far outside the reassembler's window, which drops it.
        let seqno = if header.syn {
            header.seqno + 1
        } else {
            header.seqno
        };
        let index = seqno.unwrap(self.isn, self.ackno).wrapping_sub(1);

        let before = self.reassembler.stream_out().buffer_size();
        self.reassembler.push_substring(&seg.payload, index, header.fin);
        let assembled = self.reassembler.stream_out().buffer_size() - before;
        self.ackno += assembled as u64;

        if self.has_fin && !self.counted_fin && self.reassembler.stream_out().input_ended() {
            self.ackno += 1;
            self.counted_fin = true;
        }
    }

    /// The acknowledgment number to send to the peer.
    ///
    /// `None` until a SYN has been received.
    pub fn ackno(&self) -> Option<SeqNumber> {
        if self.has_isn {
            Some(SeqNumber::wrap(self.ackno, self.isn))
        } else {
            None
        }
    }

    /// The window size to advertise: the capacity not taken up by bytes
    /// that are assembled but not yet consumed.
    pub fn window_size(&self) -> usize {
        self.capacity - self.reassembler.stream_out().buffer_size()
    }

    /// The number of bytes stored out of order, awaiting a gap fill.
    pub fn unassembled_bytes(&self) -> usize {
        self.reassembler.unassembled_bytes()
    }

    /// The reassembled inbound byte stream.
    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.stream_out()
    }

    /// Mutable access to the inbound byte stream, for the reader.
    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_out_mut()
    }
}
