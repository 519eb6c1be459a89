//! Random-access reading of sharded reinforcement-learning trajectory logs.
//!
//! A trajectory log is an append-only sequence of step and episode records,
//! sharded chronologically into timestamp-named subdirectories. Each shard
//! carries its own index files (byte offsets for steps and episode metadata,
//! plus the episode-to-step mapping), so an individual step or episode can be
//! addressed by a global zero-based index without scanning the log.
//!
//! Three layers, composed bottom-up:
//! - [`ShardIndex`]: the index of a single shard, resolving local step and
//!   episode indexes to byte offsets and reading records through a
//!   [`trajlog_records::RecordStore`].
//! - [`DatasetIndex`]: an ordered collection of shards with cumulative step
//!   and episode counters, resolving global indexes by binary search.
//! - [`EpisodeReader`]: a lightweight view over one resolved episode,
//!   translating episode-local step indexes to shard-local ones.
//!
//! Queries are synchronous and return `Option` (a missing step is an expected
//! outcome, and I/O failures on an initialized index collapse into the same
//! absence signal; see [`ShardIndex::status`] for the diagnostic escape
//! hatch). Initialization failures are structured
//! [`trajlog_common::error::Error`]s.

pub mod dataset;
pub mod discovery;
pub mod episode_info;
pub mod episode_reader;
pub mod shard_index;

#[cfg(test)]
mod tests;

pub use dataset::DatasetIndex;
pub use discovery::{ShardLayout, discover_shards};
pub use episode_info::EpisodeInfo;
pub use episode_reader::EpisodeReader;
pub use shard_index::ShardIndex;
