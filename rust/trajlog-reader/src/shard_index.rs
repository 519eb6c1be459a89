//! The index of a single shard.
//!
//! Note on nomenclature:
//! - An "index" is a 0-based position in an array: step index, episode index.
//! - An "offset" is a byte position in a record file, the unit used to seek a
//!   record store to a particular record.

use std::path::Path;

use trajlog_common::{Result, error::Error, verify_data};
use trajlog_records::{FileRecordStore, RecordStore, read_framed_file};

use crate::discovery::ShardLayout;
use crate::episode_info::EpisodeInfo;

/// A metadata offset below zero marks an episode without a metadata record.
const NO_METADATA_OFFSET: i64 = -1;

/// The index of one shard: byte offsets for quickly accessing steps and
/// episode metadata, and the mapping from episode index to the episode's
/// first step index.
///
/// A `ShardIndex` has a two-phase lifecycle: [`ShardIndex::new`] produces an
/// unbound index whose every accessor fails fast (as absence), and
/// [`ShardIndex::init`] binds it to a shard's files. This lets callers
/// preallocate indexes without opening files for shards that may never be
/// read. After a successful `init` the index data is immutable;
/// [`ShardIndex::close`] releases the record-store handles.
#[derive(Default)]
pub struct ShardIndex {
    /// Byte offsets for quickly accessing steps.
    step_offsets: Vec<i64>,
    /// Byte offsets for quickly accessing episodic metadata.
    episode_metadata_offsets: Vec<i64>,
    /// The first step of each episode. Episode index -> step index.
    episode_starts: Vec<i64>,

    steps: Option<Box<dyn RecordStore>>,
    episode_metadata: Option<Box<dyn RecordStore>>,
}

impl ShardIndex {
    /// Creates an unbound index. Every accessor returns an absent/empty
    /// result until [`ShardIndex::init`] succeeds.
    pub fn new() -> ShardIndex {
        Default::default()
    }

    /// Binds this index to the shard described by `layout`.
    ///
    /// Loads the step-offset array and the episode index (start step plus
    /// metadata offset per episode), then opens the steps and
    /// episode-metadata record stores. On failure the index is left unbound.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the step-offsets file is absent or indexes no
    /// steps, and a format/IO error if any index artifact is unreadable.
    pub fn init(&mut self, layout: &ShardLayout) -> Result<()> {
        let step_offsets_path = layout.step_offsets_path();
        if !step_offsets_path.is_file() {
            return Err(Error::not_found(step_offsets_path.display().to_string()));
        }

        let mut step_offsets = Vec::new();
        for record in read_framed_file(&step_offsets_path)? {
            decode_i64_array(&record, &mut step_offsets)?;
        }
        if step_offsets.is_empty() {
            return Err(Error::not_found(format!(
                "empty steps in {}",
                step_offsets_path.display()
            )));
        }

        let mut episode_starts = Vec::new();
        let mut episode_metadata_offsets = Vec::new();
        for record in read_framed_file(layout.episode_index_path())? {
            decode_episode_index(&record, &mut episode_starts, &mut episode_metadata_offsets)?;
        }

        let steps = open_store(&layout.steps_path())?;
        let episode_metadata = open_store(&layout.episode_metadata_path())?;

        self.step_offsets = step_offsets;
        self.episode_starts = episode_starts;
        self.episode_metadata_offsets = episode_metadata_offsets;
        self.steps = Some(steps);
        self.episode_metadata = Some(episode_metadata);
        Ok(())
    }

    /// Binds this index from a legacy combined index file.
    ///
    /// DEPRECATED legacy format: a single index file whose first record is the
    /// step-offset array and whose second record holds the episode starts as
    /// *byte offsets* into the trajectory file rather than step indexes. The
    /// step indexes are recovered by a linear scan over both arrays. Episode
    /// metadata is not available in this format.
    pub fn init_legacy(&mut self, index_path: &Path, trajectories_path: &Path) -> Result<()> {
        if !index_path.is_file() {
            return Err(Error::not_found(index_path.display().to_string()));
        }

        let records = read_framed_file(index_path)?;
        let mut step_offsets = Vec::new();
        if let Some(record) = records.first() {
            decode_i64_array(record, &mut step_offsets)?;
        }
        if step_offsets.is_empty() {
            return Err(Error::not_found(format!(
                "empty steps in {}",
                index_path.display()
            )));
        }
        let mut episode_offsets = Vec::new();
        if let Some(record) = records.get(1) {
            decode_i64_array(record, &mut episode_offsets)?;
        }

        // O(|steps| + |episodes|): both arrays are sorted, so each episode's
        // first step is found by advancing a single cursor over the step
        // offsets. Episode offsets outside the step range are skipped.
        let mut episode_starts = Vec::new();
        let mut step = 0usize;
        for &episode_offset in &episode_offsets {
            while step < step_offsets.len() && step_offsets[step] < episode_offset {
                step += 1;
            }
            if step < step_offsets.len() {
                episode_starts.push(step as i64);
            }
        }

        let steps = open_store(trajectories_path)?;

        self.step_offsets = step_offsets;
        self.episode_starts = episode_starts;
        self.episode_metadata_offsets = Vec::new();
        self.steps = Some(steps);
        self.episode_metadata = None;
        Ok(())
    }

    /// Returns the number of steps indexed by this shard.
    pub fn num_steps(&self) -> i64 {
        self.step_offsets.len() as i64
    }

    /// Returns the number of episodes indexed by this shard.
    pub fn num_episodes(&self) -> i64 {
        self.episode_starts.len() as i64
    }

    /// Returns the raw payload of the step at `step_index`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())`, or if the
    /// record cannot be read (the failure is logged and reflected in
    /// [`ShardIndex::status`]).
    pub fn step_record(&mut self, step_index: i64) -> Option<Vec<u8>> {
        if step_index < 0 || step_index >= self.step_offsets.len() as i64 {
            return None;
        }
        let offset = self.step_offsets[step_index as usize];
        let store = self.steps.as_mut()?;
        if !store.seek(offset as u64) {
            log::debug!(
                "failed to seek to step offset {offset}: {}",
                store.status().unwrap_or("unknown")
            );
            return None;
        }
        let mut buf = Vec::new();
        if !store.read_record(&mut buf) {
            log::debug!(
                "failed to read step record at offset {offset}: {}",
                store.status().unwrap_or("unknown")
            );
            return None;
        }
        Some(buf)
    }

    /// Returns the step at `step_index`, decoded into a message of type `T`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())`, or if the
    /// record cannot be read or decoded.
    pub fn step<T>(&mut self, step_index: i64) -> Option<T>
    where
        T: prost::Message + Default,
    {
        let buf = self.step_record(step_index)?;
        match T::decode(buf.as_slice()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("failed to decode step {step_index}: {e}");
                None
            }
        }
    }

    /// Returns information for accessing the episode at `episode_index`.
    ///
    /// The returned `start` is a step index local to this shard. With
    /// `include_metadata`, the episode's metadata record is read and embedded;
    /// a missing or unreadable metadata record is tolerated and leaves
    /// `metadata` as `None`.
    ///
    /// Returns `None` if `episode_index` is not in `[0, num_episodes())`.
    pub fn episode(&mut self, episode_index: i64, include_metadata: bool) -> Option<EpisodeInfo> {
        if episode_index < 0 || episode_index >= self.episode_starts.len() as i64 {
            return None;
        }

        let i = episode_index as usize;
        let start = self.episode_starts[i];
        let num_steps = if i + 1 < self.episode_starts.len() {
            self.episode_starts[i + 1] - start
        } else {
            self.step_offsets.len() as i64 - start
        };
        let mut episode_info = EpisodeInfo {
            start,
            num_steps,
            metadata: None,
        };
        if include_metadata && self.episode_metadata_offsets.len() == self.episode_starts.len() {
            episode_info.metadata = self.read_episode_metadata(episode_index);
        }
        Some(episode_info)
    }

    fn read_episode_metadata(&mut self, episode_index: i64) -> Option<Vec<u8>> {
        let offset = self.episode_metadata_offsets[episode_index as usize];
        if offset == NO_METADATA_OFFSET {
            return None;
        }
        let store = self.episode_metadata.as_mut()?;
        if !store.seek(offset as u64) {
            log::debug!(
                "no metadata for episode {episode_index} at offset {offset}: {}",
                store.status().unwrap_or("unknown")
            );
            return None;
        }
        let mut buf = Vec::new();
        if !store.read_record(&mut buf) {
            log::debug!(
                "failed to read metadata for episode {episode_index} at offset {offset}: {}",
                store.status().unwrap_or("unknown")
            );
            return None;
        }
        Some(buf)
    }

    /// Describes the most recent record-store failure, if any.
    ///
    /// Queries report every per-record failure as absence; after checking
    /// bounds with [`ShardIndex::num_steps`]/[`ShardIndex::num_episodes`],
    /// this is how a caller can tell an unreadable record from an absent one.
    pub fn status(&self) -> Option<&str> {
        self.steps
            .as_ref()
            .and_then(|s| s.status())
            .or_else(|| self.episode_metadata.as_ref().and_then(|s| s.status()))
    }

    /// Releases the record-store handles. Idempotent; subsequent queries
    /// return absent results.
    pub fn close(&mut self) {
        if let Some(mut store) = self.steps.take() {
            store.close();
        }
        if let Some(mut store) = self.episode_metadata.take() {
            store.close();
        }
    }

    /// Assembles an index directly from its parts. Test use only.
    #[cfg(test)]
    pub(crate) fn from_parts(
        step_offsets: Vec<i64>,
        episode_starts: Vec<i64>,
        episode_metadata_offsets: Vec<i64>,
        steps: Option<Box<dyn RecordStore>>,
        episode_metadata: Option<Box<dyn RecordStore>>,
    ) -> ShardIndex {
        ShardIndex {
            step_offsets,
            episode_metadata_offsets,
            episode_starts,
            steps,
            episode_metadata,
        }
    }
}

fn open_store(path: &Path) -> Result<Box<dyn RecordStore>> {
    let store =
        FileRecordStore::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(Box::new(store))
}

/// Decodes a record payload holding a dense little-endian `i64` array.
fn decode_i64_array(payload: &[u8], dst: &mut Vec<i64>) -> Result<()> {
    verify_data!(payload, payload.len() % 8 == 0);
    dst.extend(
        payload
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes(c.try_into().expect("i64 bytes"))),
    );
    Ok(())
}

/// Decodes a record payload holding `[episode start, metadata offset]` pairs.
fn decode_episode_index(
    payload: &[u8],
    episode_starts: &mut Vec<i64>,
    episode_metadata_offsets: &mut Vec<i64>,
) -> Result<()> {
    verify_data!(payload, payload.len() % 16 == 0);
    for pair in payload.chunks_exact(16) {
        episode_starts.push(i64::from_le_bytes(pair[..8].try_into().expect("i64 bytes")));
        episode_metadata_offsets.push(i64::from_le_bytes(
            pair[8..].try_into().expect("i64 bytes"),
        ));
    }
    Ok(())
}
