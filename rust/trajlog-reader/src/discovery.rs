//! Enumeration of shard directories and the dataset's on-disk layout.
//!
//! A dataset root directory looks like:
//!
//! ```text
//! <root>/
//!   metadata.rec                  (optional dataset-level metadata)
//!   <timestamp dir>/
//!     steps.rec                   (step payload records)
//!     step_offsets.rec            (little-endian i64 arrays of step offsets)
//!     episode_metadata.rec        (episode metadata payload records)
//!     episode_index.rec           (arrays of [episode start, metadata offset] i64 pairs)
//!   <timestamp dir>/
//!     ...
//! ```
//!
//! Timestamp directories are named so that lexicographic order is
//! chronological order; discovery sorts by name.

use std::path::{Path, PathBuf};

use trajlog_common::{Result, error::Error};
use trajlog_records::read_framed_file;

/// Step payload records of a shard.
pub const STEPS_FILE: &str = "steps.rec";

/// Byte offsets of the step records, one per step, in step order.
pub const STEP_OFFSETS_FILE: &str = "step_offsets.rec";

/// Episode metadata payload records of a shard.
pub const EPISODE_METADATA_FILE: &str = "episode_metadata.rec";

/// Per-episode `[start step index, metadata byte offset]` pairs.
pub const EPISODE_INDEX_FILE: &str = "episode_index.rec";

/// Optional dataset-level metadata record in the root directory.
pub const DATASET_METADATA_FILE: &str = "metadata.rec";

/// The file locations of a single shard's trajectory and index data.
#[derive(Debug, Clone)]
pub struct ShardLayout {
    timestamp_dir: PathBuf,
}

impl ShardLayout {
    pub fn new(timestamp_dir: impl Into<PathBuf>) -> ShardLayout {
        ShardLayout {
            timestamp_dir: timestamp_dir.into(),
        }
    }

    /// Path identity of the shard.
    pub fn timestamp_dir(&self) -> &Path {
        &self.timestamp_dir
    }

    pub fn steps_path(&self) -> PathBuf {
        self.timestamp_dir.join(STEPS_FILE)
    }

    pub fn step_offsets_path(&self) -> PathBuf {
        self.timestamp_dir.join(STEP_OFFSETS_FILE)
    }

    pub fn episode_metadata_path(&self) -> PathBuf {
        self.timestamp_dir.join(EPISODE_METADATA_FILE)
    }

    pub fn episode_index_path(&self) -> PathBuf {
        self.timestamp_dir.join(EPISODE_INDEX_FILE)
    }
}

/// Enumerates the shard directories under `root` in chronological order.
///
/// Plain files in the root (such as the dataset metadata record) are ignored.
///
/// # Errors
///
/// Returns `NotFound` if the root contains no shard directories, or an I/O
/// error if the root cannot be listed.
pub fn discover_shards(root: &Path) -> Result<Vec<ShardLayout>> {
    let entries =
        std::fs::read_dir(root).map_err(|e| Error::io(root.display().to_string(), e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(root.display().to_string(), e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    if dirs.is_empty() {
        return Err(Error::not_found(format!(
            "no shard directories under {}",
            root.display()
        )));
    }
    dirs.sort();
    Ok(dirs.into_iter().map(ShardLayout::new).collect())
}

/// Reads the dataset-level metadata record from the root directory, if the
/// metadata file exists. The payload of the first record is the metadata.
pub fn read_dataset_metadata(root: &Path) -> Result<Option<Vec<u8>>> {
    let path = root.join(DATASET_METADATA_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let records = read_framed_file(&path)?;
    Ok(records.into_iter().next())
}
