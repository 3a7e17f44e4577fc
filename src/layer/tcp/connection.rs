use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cmp;

use super::{Config, Receiver, Sender};
use crate::wire::TcpSegment;

/// A full TCP connection: one [`Sender`], one [`Receiver`], and the state
/// machine gluing them together.
///
/// There is no explicit state enumeration; the connection's state is the
/// conjunction of what its halves report: has the outbound stream ended,
/// is anything in flight, has the peer's stream ended, are we lingering.
/// [`active`](Connection::active) folds that into the single liveness
/// predicate the host polls.
///
/// After both streams finish, the side that closed first stays around for
/// ten initial timeouts of quiet to absorb retransmissions of its final
/// ACK; the side that saw the peer close first skips that wait.
#[derive(Debug)]
pub struct Connection {
    cfg: Config,
    sender: Sender,
    receiver: Receiver,
    segments_out: VecDeque<TcpSegment>,
    time_since_last_segment_received: u64,
    linger_after_streams_finish: bool,
}

impl Connection {
    /// Construct a connection from its tunables.
    pub fn new(cfg: Config) -> Connection {
        let isn = cfg.isn();
        Connection {
            sender: Sender::new(cfg.send_capacity, cfg.rt_timeout, isn),
            receiver: Receiver::new(cfg.recv_capacity),
            segments_out: VecDeque::new(),
            time_since_last_segment_received: 0,
            linger_after_streams_finish: true,
            cfg,
        }
    }

    /// Move everything the sender queued into the connection's outbound
    /// queue, stamping each segment with the receiver's acknowledgment
    /// and window on the way.
    fn stamp_and_flush(&mut self) {
        while let Some(mut segment) = self.sender.segments_out_mut().pop_front() {
            if let Some(ackno) = self.receiver.ackno() {
                segment.header.ack = true;
                segment.header.ackno = ackno;
            }
            segment.header.window = cmp::min(self.receiver.window_size(), usize::from(u16::MAX)) as u16;
            self.segments_out.push_back(segment);
        }
    }

    /// Queue a reset segment.
    fn send_rst(&mut self) {
        self.sender.send_empty_segment();
        if let Some(segment) = self.sender.segments_out_mut().back_mut() {
            segment.header.rst = true;
        }
        self.stamp_and_flush();
    }

    /// Tear down both streams as errored and stop lingering.
    fn dirty_abort(&mut self) {
        self.sender.stream_in_mut().set_error();
        self.receiver.stream_out_mut().set_error();
        self.linger_after_streams_finish = false;
    }

    /// Process an inbound segment.
    pub fn segment_received(&mut self, seg: &TcpSegment) {
        if seg.header.rst {
            net_debug!("reset by peer");
            self.dirty_abort();
            return;
        }

        self.receiver.segment_received(seg);

        // Nothing below makes sense before a SYN has been seen; there is
        // no acknowledgment to stamp yet.
        let ackno = match self.receiver.ackno() {
            Some(ackno) => ackno,
            None => return,
        };

        if seg.header.ack {
            self.sender.ack_received(seg.header.ackno, seg.header.window);
            self.sender.fill_window();
        } else if seg.header.syn {
            // Passive open: answer the bare SYN with our own SYN.
            self.sender.fill_window();
        }

        // Peer closed before our stream ended: once we finish there is
        // nobody left to retransmit a final ACK to, so don't linger.
        if seg.header.fin && !self.sender.stream_in().eof() {
            self.linger_after_streams_finish = false;
        }

        let seg_len = seg.sequence_len();

        // A zero-length segment one below the ackno is a keep-alive probe.
        if seg_len == 0 && seg.header.seqno + 1 == ackno {
            self.sender.send_empty_segment();
        }

        // Anything occupying sequence space deserves an ACK; if the sender
        // produced no segment to piggyback on, make an empty one.
        if seg_len != 0 && self.sender.segments_out().is_empty() {
            self.sender.send_empty_segment();
        }

        self.stamp_and_flush();
        self.time_since_last_segment_received = 0;
    }

    /// Whether the connection is still alive, in any sense: streams going,
    /// data in flight, or lingering after a clean close.
    pub fn active(&self) -> bool {
        let sender_busy = (self.sender.bytes_in_flight() != 0 || !self.sender.stream_in().eof())
            && !self.sender.stream_in().error();
        let receiver_busy =
            !self.receiver.stream_out().eof() && !self.receiver.stream_out().error();
        self.linger_after_streams_finish || sender_busy || receiver_busy
    }

    /// Write bytes into the outbound stream and send what the window allows.
    ///
    /// Returns the number of bytes accepted; zero after
    /// [`end_input_stream`](Connection::end_input_stream).
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.sender.stream_in().input_ended() {
            return 0;
        }
        let accepted = self.sender.stream_in_mut().write(data);
        self.sender.fill_window();
        self.stamp_and_flush();
        accepted
    }

    /// Read up to `len` bytes of the peer's reassembled stream.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        self.receiver.stream_out_mut().read(len)
    }

    /// Bytes of the peer's stream waiting to be read.
    pub fn bytes_available(&self) -> usize {
        self.receiver.stream_out().buffer_size()
    }

    /// Whether the peer's stream has ended and been fully read.
    pub fn inbound_finished(&self) -> bool {
        self.receiver.stream_out().eof()
    }

    /// Close the outbound stream; queued bytes and the FIN still go out.
    pub fn end_input_stream(&mut self) {
        if self.sender.stream_in().input_ended() {
            return;
        }
        self.sender.stream_in_mut().end_input();
        self.sender.fill_window();
        self.stamp_and_flush();
    }

    /// Initiate the handshake by sending a SYN.
    pub fn connect(&mut self) {
        self.sender.fill_window();
        self.stamp_and_flush();
    }

    /// Advance time by `ms` milliseconds.
    ///
    /// Runs the retransmission machinery, gives up with a reset after too
    /// many consecutive retransmissions, and ends the linger period once
    /// the connection has been quiet for ten initial timeouts.
    pub fn tick(&mut self, ms: u64) {
        self.time_since_last_segment_received =
            self.time_since_last_segment_received.saturating_add(ms);

        self.sender.tick(ms);

        if self.sender.consecutive_retransmissions() > self.cfg.max_retx_attempts {
            net_debug!("retransmission limit exceeded, resetting");
            self.sender.segments_out_mut().clear();
            self.send_rst();
            self.dirty_abort();
        }

        if self.sender.stream_in().eof()
            && self.receiver.stream_out().eof()
            && self.linger_after_streams_finish
            && self.time_since_last_segment_received >= 10 * self.cfg.rt_timeout
        {
            self.linger_after_streams_finish = false;
        }

        self.stamp_and_flush();
    }

    /// Next outbound segment, stamped and ready for the wire.
    pub fn pop_segment(&mut self) -> Option<TcpSegment> {
        self.segments_out.pop_front()
    }

    /// Number of outbound segments waiting to be drained.
    pub fn segments_queued(&self) -> usize {
        self.segments_out.len()
    }

    /// Space left in the outbound stream.
    pub fn remaining_outbound_capacity(&self) -> usize {
        self.sender.stream_in().remaining_capacity()
    }

    /// Sequence numbers sent but not yet acknowledged.
    pub fn bytes_in_flight(&self) -> u64 {
        self.sender.bytes_in_flight()
    }

    /// Bytes received out of order, awaiting a gap fill.
    pub fn unassembled_bytes(&self) -> usize {
        self.receiver.unassembled_bytes()
    }

    /// Milliseconds since the last segment arrived.
    pub fn time_since_last_segment_received(&self) -> u64 {
        self.time_since_last_segment_received
    }
}

impl Drop for Connection {
    /// An abandoned but still active connection resets the peer rather
    /// than leaving it hanging. The queued RST is lost along with the
    /// queue itself, but the streams are marked errored either way.
    fn drop(&mut self) {
        if self.active() {
            net_debug!("unclean shutdown of connection");
            self.send_rst();
            self.dirty_abort();
        }
    }
}
