use alloc::collections::VecDeque;
use core::cmp;

use super::MAX_PAYLOAD_SIZE;
use crate::storage::ByteStream;
use crate::wire::{SeqNumber, TcpRepr, TcpSegment};

/// The retransmission timer, counting elapsed milliseconds against the
/// current timeout.
///
/// The timeout starts at the configured value, doubles on backoff and is
/// restored by `reset`. Starting the timer clears the elapsed count.
#[derive(Debug)]
struct RetransmissionTimer {
    initial_rto: u64,
    rto: u64,
    waited: u64,
    running: bool,
}

impl RetransmissionTimer {
    fn new(initial_rto: u64) -> RetransmissionTimer {
        RetransmissionTimer {
            initial_rto,
            rto: initial_rto,
            waited: 0,
            running: false,
        }
    }

    fn running(&self) -> bool {
        self.running
    }

    fn expired(&self) -> bool {
        self.running && self.rto <= self.waited
    }

    fn reset(&mut self) {
        self.rto = self.initial_rto;
    }

    fn double(&mut self) {
        self.rto = self.rto.saturating_mul(2);
    }

    fn start(&mut self) {
        self.running = true;
        self.waited = 0;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn tick(&mut self, ms: u64) {
        self.waited = self.waited.saturating_add(ms);
    }
}

/// The sending half of a TCP connection.
///
/// Owns the outgoing byte stream, carves it into segments that fit the
/// peer's advertised window, tracks the segments still in flight and
/// retransmits the oldest of them when the retransmission timer expires.
///
/// A zero advertised window is treated as a window of one so a single
/// probe segment keeps testing whether it has reopened; retransmissions of
/// such probes do not back the timeout off.
#[derive(Debug)]
pub struct Sender {
    isn: SeqNumber,
    segments_out: VecDeque<TcpSegment>,
    /// Segments sent but not fully acknowledged, tagged with their
    /// starting absolute sequence number. Contiguous from `seqno_acked`.
    in_flight: VecDeque<(u64, TcpSegment)>,
    timer: RetransmissionTimer,
    consecutive_retransmissions: u32,
    stream: ByteStream,
    /// Absolute sequence number of the next byte (or flag) to emit.
    next_seqno: u64,
    /// First absolute sequence number not yet acknowledged.
    seqno_acked: u64,
    window_size: u16,
    sent_fin: bool,
}

impl Sender {
    /// Construct a sender.
    ///
    /// `capacity` bounds the outgoing byte stream, `rt_timeout` is the
    /// initial retransmission timeout in milliseconds, `isn` the sequence
    /// number the SYN will carry.
    pub fn new(capacity: usize, rt_timeout: u64, isn: SeqNumber) -> Sender {
        Sender {
            isn,
            segments_out: VecDeque::new(),
            in_flight: VecDeque::new(),
            timer: RetransmissionTimer::new(rt_timeout),
            consecutive_retransmissions: 0,
            stream: ByteStream::new(capacity),
            next_seqno: 0,
            seqno_acked: 0,
            window_size: 1,
            sent_fin: false,
        }
    }

    /// Sequence numbers occupied by segments sent but not yet acknowledged.
    ///
    /// SYN and FIN each count for one.
    pub fn bytes_in_flight(&self) -> u64 {
        self.next_seqno - self.seqno_acked
    }

    /// Build one segment starting at `next_seqno`; returns its length in
    /// sequence space, zero if there was nothing to send.
    fn emit_segment(&mut self) -> u64 {
        let start = self.next_seqno;
        let window = cmp::max(1, u64::from(self.window_size));
        let mut budget = window - (start - self.seqno_acked);

        let mut header = TcpRepr {
            seqno: SeqNumber::wrap(start, self.isn),
            ..TcpRepr::default()
        };

        if start == 0 {
            header.syn = true;
            budget -= 1;
        }

        // The FIN rides along only if a sequence slot remains for it once
        // the rest of the stream fits in front.
        if !self.sent_fin && self.stream.input_ended() && budget > 0 {
            let payload_with_fin = cmp::min(budget - 1, MAX_PAYLOAD_SIZE as u64);
            if self.stream.buffer_size() as u64 <= payload_with_fin {
                header.fin = true;
                self.sent_fin = true;
                budget -= 1;
            }
        }

        let take = cmp::min(
            budget,
            cmp::min(MAX_PAYLOAD_SIZE as u64, self.stream.buffer_size() as u64),
        );
        let payload = self.stream.read(take as usize);

        let segment = TcpSegment { header, payload };
        let len = segment.sequence_len();
        if len != 0 {
            self.segments_out.push_back(segment.clone());
            self.in_flight.push_back((start, segment));
            self.next_seqno = start + len;
        }
        len
    }

    /// Create and queue segments to fill as much of the window as possible.
    pub fn fill_window(&mut self) {
        let window = cmp::max(1, u64::from(self.window_size));
        while self.next_seqno < self.seqno_acked + window {
            if self.emit_segment() == 0 {
                break;
            }
            if self.stream.buffer_empty() {
                break;
            }
        }

        if !self.timer.running() && !self.in_flight.is_empty() {
            self.timer.reset();
            self.timer.start();
        }
    }

    /// Process an acknowledgment from the peer.
    ///
    /// An ackno beyond anything sent is impossible and ignored entirely; a
    /// new ackno resets the backoff and restarts the timer; either way the
    /// advertised window is adopted and fully acknowledged segments are
    /// retired.
    pub fn ack_received(&mut self, ackno: SeqNumber, window_size: u16) {
        let abs_ackno = ackno.unwrap(self.isn, self.seqno_acked);
        if abs_ackno > self.next_seqno {
            net_debug!("ignoring ack {} beyond next seqno {}", abs_ackno, self.next_seqno);
            return;
        }

        if abs_ackno > self.seqno_acked {
            self.seqno_acked = abs_ackno;
            self.consecutive_retransmissions = 0;
            self.timer.reset();
            self.timer.start();
        }

        self.window_size = window_size;

        while let Some(tail) = self
            .in_flight
            .front()
            .map(|(start, segment)| start + segment.sequence_len())
        {
            if tail > self.seqno_acked {
                break;
            }
            self.in_flight.pop_front();
        }
        if self.in_flight.is_empty() {
            self.timer.stop();
        }
    }

    /// Advance the retransmission timer by `ms` milliseconds.
    ///
    /// On expiry the earliest in-flight segment is queued again. The
    /// timeout doubles only when the peer's window is open; a closed
    /// window means the loss signal says nothing about congestion.
    pub fn tick(&mut self, ms: u64) {
        self.timer.tick(ms);
        if !self.timer.expired() {
            return;
        }
        if let Some((_, segment)) = self.in_flight.front() {
            if self.window_size != 0 {
                self.timer.double();
                self.consecutive_retransmissions += 1;
            }
            self.timer.start();
            net_trace!("retransmitting segment at {}", segment.header.seqno);
            self.segments_out.push_back(segment.clone());
        }
    }

    /// Queue a zero-length segment at the current sequence number.
    ///
    /// Occupies no sequence space and is not tracked for retransmission;
    /// the connection uses it for bare ACKs and RSTs.
    pub fn send_empty_segment(&mut self) {
        self.segments_out.push_back(TcpSegment {
            header: TcpRepr {
                seqno: SeqNumber::wrap(self.next_seqno, self.isn),
                ..TcpRepr::default()
            },
            payload: alloc::vec::Vec::new(),
        });
    }

    /// Retransmissions since the last new acknowledgment.
    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retransmissions
    }

    /// Segments waiting to be picked up, stamped and transmitted.
    pub fn segments_out(&self) -> &VecDeque<TcpSegment> {
        &self.segments_out
    }

    /// Mutable access to the outbound queue, for the connection to drain.
    pub fn segments_out_mut(&mut self) -> &mut VecDeque<TcpSegment> {
        &mut self.segments_out
    }

    /// The outgoing byte stream, waiting to be segmented.
    pub fn stream_in(&self) -> &ByteStream {
        &self.stream
    }

    /// Mutable access to the outgoing byte stream, for the writer.
    pub fn stream_in_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    /// Absolute sequence number of the next byte to be sent.
    pub fn next_seqno_absolute(&self) -> u64 {
        self.next_seqno
    }

    /// Wire sequence number of the next byte to be sent.
    pub fn next_seqno(&self) -> SeqNumber {
        SeqNumber::wrap(self.next_seqno, self.isn)
    }
}
