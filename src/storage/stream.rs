//! An in-order byte stream with flow control.

use alloc::vec::Vec;
use core::cmp;

/// A bounded FIFO of bytes with independent writer and reader ends.
///
/// Bytes are written on the "input" side and read from the "output" side.
/// The stream is finite: the writer can end the input, after which no more
/// bytes are accepted. Writes past the remaining capacity are truncated,
/// not errored; the number of bytes actually accepted is returned.
#[derive(Debug, Clone)]
pub struct ByteStream {
    ring: RingBuffer,
    bytes_written: u64,
    bytes_read: u64,
    input_ended: bool,
    error: bool,
}

/// Fixed-size ring storage.
///
/// `front` chases the reader; a push or peek that crosses the physical end
/// of the buffer is split into two copies.
#[derive(Debug, Clone)]
struct RingBuffer {
    data: Vec<u8>,
    front: usize,
    len: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> RingBuffer {
        RingBuffer {
            data: alloc::vec![0; capacity],
            front: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    fn push(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.remaining());
        if bytes.is_empty() {
            return;
        }
        let start = (self.front + self.len) % self.capacity();
        let until_end = cmp::min(bytes.len(), self.capacity() - start);
        self.data[start..start + until_end].copy_from_slice(&bytes[..until_end]);
        self.data[..bytes.len() - until_end].copy_from_slice(&bytes[until_end..]);
        self.len += bytes.len();
    }

    fn peek(&self, len: usize) -> Vec<u8> {
        let len = cmp::min(len, self.len);
        if len == 0 {
            return Vec::new();
        }
        let until_end = cmp::min(len, self.capacity() - self.front);
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.data[self.front..self.front + until_end]);
        out.extend_from_slice(&self.data[..len - until_end]);
        out
    }

    fn pop(&mut self, len: usize) -> usize {
        let len = cmp::min(len, self.len);
        if len != 0 {
            self.front = (self.front + len) % self.capacity();
            self.len -= len;
        }
        len
    }
}

impl ByteStream {
    /// Construct a stream with room for `capacity` bytes.
    pub fn new(capacity: usize) -> ByteStream {
        ByteStream {
            ring: RingBuffer::new(capacity),
            bytes_written: 0,
            bytes_read: 0,
            input_ended: false,
            error: false,
        }
    }

    /// Write bytes into the stream, as many as fit.
    ///
    /// Returns the number of bytes accepted; the rest is dropped. Zero once
    /// the input has ended.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.input_ended {
            return 0;
        }
        let accepted = cmp::min(data.len(), self.ring.remaining());
        self.ring.push(&data[..accepted]);
        self.bytes_written += accepted as u64;
        accepted
    }

    /// Copy out up to `len` bytes from the output side without removing them.
    pub fn peek_output(&self, len: usize) -> Vec<u8> {
        self.ring.peek(len)
    }

    /// Remove up to `len` bytes from the output side.
    pub fn pop_output(&mut self, len: usize) {
        let popped = self.ring.pop(len);
        self.bytes_read += popped as u64;
    }

    /// Peek and then pop the next `len` bytes of the stream.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        let out = self.peek_output(len);
        self.pop_output(out.len());
        out
    }

    /// Signal that no further bytes will be written.
    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    /// Whether the writer has ended the input.
    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    /// Mark the stream as having suffered an error.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Whether the stream has suffered an error.
    pub fn error(&self) -> bool {
        self.error
    }

    /// The number of bytes currently buffered.
    pub fn buffer_size(&self) -> usize {
        self.ring.len
    }

    /// Whether no bytes are currently buffered.
    pub fn buffer_empty(&self) -> bool {
        self.ring.len == 0
    }

    /// Whether the output has reached the ending: input ended and drained.
    pub fn eof(&self) -> bool {
        self.input_ended && self.bytes_read == self.bytes_written
    }

    /// Total number of bytes ever accepted.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Total number of bytes ever popped.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// The number of additional bytes the stream has space for.
    pub fn remaining_capacity(&self) -> usize {
        self.ring.remaining()
    }
}
