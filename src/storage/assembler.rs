//! Reassembly of an out-of-order byte stream.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cmp;

use super::stream::ByteStream;

/// Merges out-of-order byte ranges and flushes the contiguous prefix into
/// an owned output [`ByteStream`].
///
/// The reorder buffer and the output stream share one capacity: the bytes
/// the reader has not yet consumed eat into the budget available for
/// out-of-order data, so a lagging consumer shrinks the acceptance window.
/// Bytes outside the window `[next, next + capacity - buffered)` are
/// dropped and must be retransmitted by the peer.
///
/// On overlap the earliest received copy of a byte wins. A conformant peer
/// sends identical bytes at identical stream positions, so the choice is
/// unobservable; it is fixed here so the merge is deterministic.
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    capacity: usize,
    /// Pending ranges keyed by their absolute start index. Disjoint and
    /// non-touching by construction; every start is `>= next`.
    ranges: BTreeMap<u64, Vec<u8>>,
    unassembled: usize,
    /// Absolute index of the next byte to deliver to the output stream.
    next: u64,
    /// Absolute index one past the last byte of the stream, once known.
    eof_at: Option<u64>,
}

impl Reassembler {
    /// Construct a reassembler whose output stream holds `capacity` bytes.
    pub fn new(capacity: usize) -> Reassembler {
        Reassembler {
            output: ByteStream::new(capacity),
            capacity,
            ranges: BTreeMap::new(),
            unassembled: 0,
            next: 0,
            eof_at: None,
        }
    }

    /// Accept a substring of the logical stream, possibly out of order.
    ///
    /// `index` is the absolute stream index of the first byte of `data`;
    /// `eof` marks `data` as ending the stream. Newly contiguous bytes are
    /// written to the output stream in order.
    pub fn push_substring(&mut self, data: &[u8], index: u64, eof: bool) {
        let window_end = self.next + (self.capacity - self.output.buffer_size()) as u64;
        let start = cmp::max(self.next, index);
        // Saturating: an index far past the window (e.g. a stale duplicate
        // whose stream position wrapped below zero) must clip, not trap.
        let end = cmp::min(index.saturating_add(data.len() as u64), window_end);
        if start < end {
            let offset = (start - index) as usize;
            let len = (end - start) as usize;
            self.insert(start, &data[offset..offset + len]);
        }
        self.flush();
        if eof {
            self.eof_at = Some(index.saturating_add(data.len() as u64));
        }
        if self.eof_at == Some(self.next) {
            self.output.end_input();
        }
    }

    /// Merge `[lo, lo + data.len())` into the range set.
    ///
    /// Every stored range that overlaps or touches the new one is replaced
    /// by a single coalesced range; stored bytes take precedence over the
    /// new copy where they overlap.
    fn insert(&mut self, lo: u64, data: &[u8]) {
        let hi = lo + data.len() as u64;

        // Ranges are disjoint and sorted, so both their starts and their
        // ends increase; the ones meeting [lo, hi] form a contiguous run
        // at the back of everything starting at or before hi.
        let touching: Vec<u64> = self
            .ranges
            .range(..=hi)
            .rev()
            .take_while(|(start, bytes)| **start + bytes.len() as u64 >= lo)
            .map(|(start, _)| *start)
            .collect();

        if touching.is_empty() {
            self.unassembled += data.len();
            self.ranges.insert(lo, data.to_vec());
            return;
        }

        let merged_lo = cmp::min(lo, *touching.last().unwrap());
        let mut merged_hi = hi;
        let mut merged = alloc::vec![0; (merged_hi - merged_lo) as usize];
        merged[(lo - merged_lo) as usize..(hi - merged_lo) as usize].copy_from_slice(data);

        let mut reclaimed = 0;
        for start in touching {
            let bytes = self.ranges.remove(&start).unwrap();
            reclaimed += bytes.len();
            let range_hi = start + bytes.len() as u64;
            if range_hi > merged_hi {
                merged.resize((range_hi - merged_lo) as usize, 0);
                merged_hi = range_hi;
            }
            // Earlier arrivals overwrite the fresh copy.
            merged[(start - merged_lo) as usize..(range_hi - merged_lo) as usize]
                .copy_from_slice(&bytes);
        }

        self.unassembled += merged.len();
        self.unassembled -= reclaimed;
        self.ranges.insert(merged_lo, merged);
    }

    /// Write the contiguous prefix, if any, to the output stream.
    fn flush(&mut self) {
        while let Some(entry) = self.ranges.first_entry() {
            if *entry.key() != self.next {
                break;
            }
            let bytes = entry.remove();
            let written = self.output.write(&bytes);
            debug_assert_eq!(written, bytes.len());
            self.next += written as u64;
            self.unassembled -= bytes.len();
        }
    }

    /// The number of bytes stored but not yet assembled.
    pub fn unassembled_bytes(&self) -> usize {
        self.unassembled
    }

    /// Whether every byte seen so far has been assembled.
    pub fn buffer_empty(&self) -> bool {
        self.unassembled == 0
    }

    /// The absolute index of the next byte the output stream expects.
    pub fn next_index(&self) -> u64 {
        self.next
    }

    /// The assembled-but-unread output of the stream.
    pub fn stream_out(&self) -> &ByteStream {
        &self.output
    }

    /// Mutable access to the output, for the reader to drain.
    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }
}
