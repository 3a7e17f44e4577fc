//! Stream primitives underlying the TCP state machines.
//!
//! [`stream::ByteStream`] is the in-order, capacity-bounded pipe between a
//! writer and a reader; [`assembler::Reassembler`] accepts out-of-order
//! byte ranges and flushes the contiguous prefix into such a stream.

pub mod assembler;
pub mod stream;

pub use assembler::Reassembler;
pub use stream::ByteStream;
