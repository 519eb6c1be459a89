//! The record-store boundary of trajlog:
//! - `RecordStore`: a stateful handle over a file of framed records, positioned
//!   by explicit byte-offset seeks.
//! - File-based and memory-based implementations, plus the framed-record codec
//!   they share.
//!
//! A record file is a plain concatenation of frames, where each frame is
//! `u32 LE length | payload | u32 LE checksum`. The byte offset of a frame is
//! the unit used by the index layer to position a store for reading.

pub mod checksum;
pub mod file;
pub mod memory;
pub mod store;

pub use file::{FileRecordStore, FramedWriter, read_framed_file};
pub use memory::MemoryRecordStore;
pub use store::RecordStore;

/// Size of the length prefix of a framed record, in bytes.
pub const RECORD_LEN_SIZE: usize = 4;

/// Size of the checksum suffix of a framed record, in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// Total framing overhead per record, in bytes.
pub const FRAME_OVERHEAD: usize = RECORD_LEN_SIZE + CHECKSUM_SIZE;
