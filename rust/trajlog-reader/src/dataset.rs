//! The dataset-wide index over all shards of a trajectory log.

use std::path::{Path, PathBuf};

use trajlog_common::{Result, error::Error};

use crate::discovery::{self, discover_shards};
use crate::episode_info::EpisodeInfo;
use crate::episode_reader::EpisodeReader;
use crate::shard_index::ShardIndex;

/// One shard of the dataset: a timestamp directory with its index and the
/// running totals used for global index resolution.
struct Shard {
    /// The path to the timestamp directory.
    timestamp_dir: PathBuf,
    /// The index internal to this timestamp directory.
    index: ShardIndex,
    /// The global step index at which this shard starts.
    global_step_index: i64,
    /// The cumulative number of steps up to and including this shard, in
    /// shard insertion order.
    cumulative_steps: i64,
    /// The cumulative number of episodes up to and including this shard, in
    /// shard insertion order.
    cumulative_episodes: i64,
}

/// Random access into an entire trajectory log by global step or episode
/// index.
///
/// A dataset root directory holds the full trajectory of a single actor,
/// sharded into chronologically ordered timestamp directories. Each shard
/// carries its own index, so resolving a global index means finding the
/// owning shard first (binary search over cumulative counts) and then the
/// index local to it. An episode is never split between two shards, which is
/// what keeps step resolution and episode resolution two independent searches
/// over the same shard list.
pub struct DatasetIndex {
    shards: Vec<Shard>,
    /// The total number of steps across all timestamp directories.
    total_num_steps: i64,
    /// The total number of episodes across all timestamp directories.
    total_num_episodes: i64,
    metadata: Option<Vec<u8>>,
}

impl std::fmt::Debug for DatasetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetIndex")
            .field("num_shards", &self.shards.len())
            .field("total_num_steps", &self.total_num_steps)
            .field("total_num_episodes", &self.total_num_episodes)
            .finish_non_exhaustive()
    }
}

impl DatasetIndex {
    /// Opens the dataset rooted at `data_dir`.
    ///
    /// Discovers the shard directories in chronological order, initializes a
    /// [`ShardIndex`] for each and accumulates the cumulative step/episode
    /// counters, then captures the dataset-level metadata record if one is
    /// present.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no shard directories exist, and propagates the
    /// failure of any shard that cannot be initialized.
    pub fn init(data_dir: impl AsRef<Path>) -> Result<DatasetIndex> {
        let root = data_dir.as_ref();
        let layouts = discover_shards(root)?;
        let metadata = discovery::read_dataset_metadata(root)?;

        let mut shards = Vec::with_capacity(layouts.len());
        let mut cumulative_steps = 0i64;
        let mut cumulative_episodes = 0i64;
        for layout in &layouts {
            let mut index = ShardIndex::new();
            index.init(layout)?;
            let global_step_index = cumulative_steps;
            cumulative_steps += index.num_steps();
            cumulative_episodes += index.num_episodes();
            shards.push(Shard {
                timestamp_dir: layout.timestamp_dir().to_path_buf(),
                index,
                global_step_index,
                cumulative_steps,
                cumulative_episodes,
            });
        }

        Ok(DatasetIndex {
            shards,
            total_num_steps: cumulative_steps,
            total_num_episodes: cumulative_episodes,
            metadata,
        })
    }

    /// Returns the metadata record associated with this dataset, if any.
    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    /// Decodes the dataset metadata record into a message of type `M`.
    ///
    /// Returns `None` when there is no metadata or when decoding fails.
    pub fn decode_metadata<M>(&self) -> Option<M>
    where
        M: prost::Message + Default,
    {
        M::decode(self.metadata.as_deref()?).ok()
    }

    /// Returns the number of shards in this dataset.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the total number of steps across all shards.
    pub fn num_steps(&self) -> i64 {
        self.total_num_steps
    }

    /// Returns the total number of episodes across all shards.
    pub fn num_episodes(&self) -> i64 {
        self.total_num_episodes
    }

    /// Returns the raw payload of the step at global index `step_index`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())` or the
    /// record cannot be read.
    pub fn step_record(&mut self, step_index: i64) -> Option<Vec<u8>> {
        if step_index < 0 || step_index >= self.total_num_steps {
            return None;
        }
        let (pos, local_step_index) = self.find_shard(step_index, |s| s.cumulative_steps)?;
        self.shards[pos].index.step_record(local_step_index)
    }

    /// Returns the step at global index `step_index`, decoded into a message
    /// of type `T`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())` or the
    /// record cannot be read or decoded.
    pub fn step<T>(&mut self, step_index: i64) -> Option<T>
    where
        T: prost::Message + Default,
    {
        if step_index < 0 || step_index >= self.total_num_steps {
            return None;
        }
        let (pos, local_step_index) = self.find_shard(step_index, |s| s.cumulative_steps)?;
        self.shards[pos].index.step(local_step_index)
    }

    /// Returns information for accessing the episode at global index
    /// `episode_index`.
    ///
    /// NOTE: `start` in the returned object is the global step index, not the
    /// one local to the owning shard. It can be passed to
    /// [`DatasetIndex::step`] without any modification.
    ///
    /// Returns `None` if `episode_index` is not in `[0, num_episodes())`.
    pub fn episode(&mut self, episode_index: i64, include_metadata: bool) -> Option<EpisodeInfo> {
        if episode_index < 0 || episode_index >= self.total_num_episodes {
            return None;
        }
        let (pos, local_episode_index) =
            self.find_shard(episode_index, |s| s.cumulative_episodes)?;
        let shard = &mut self.shards[pos];
        let mut episode_info = shard.index.episode(local_episode_index, include_metadata)?;
        // Rewrite the start from shard-local to global step coordinates.
        episode_info.start += shard.global_step_index;
        Some(episode_info)
    }

    /// Returns a reader bound to the episode at global index `episode_index`.
    ///
    /// The reader borrows the owning shard's index, so the dataset cannot be
    /// queried while the reader is alive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `episode_index` is not in `[0, num_episodes())`
    /// or the episode cannot be resolved.
    pub fn create_episode_reader(&mut self, episode_index: i64) -> Result<EpisodeReader<'_>> {
        if episode_index < 0 || episode_index >= self.total_num_episodes {
            return Err(Error::not_found(format!(
                "episode index {episode_index} (num episodes: {})",
                self.total_num_episodes
            )));
        }
        let (pos, local_episode_index) = self
            .find_shard(episode_index, |s| s.cumulative_episodes)
            .ok_or_else(|| Error::not_found(format!("shard of episode {episode_index}")))?;
        let shard = &mut self.shards[pos];
        // Kept in shard-local coordinates: the reader queries the shard
        // directly.
        let episode_info = shard
            .index
            .episode(local_episode_index, false)
            .ok_or_else(|| Error::not_found(format!("episode {episode_index}")))?;
        Ok(EpisodeReader::new(episode_info, &mut shard.index))
    }

    /// Returns the path identity of the shard at `shard_pos`.
    pub fn shard_dir(&self, shard_pos: usize) -> Option<&Path> {
        self.shards.get(shard_pos).map(|s| s.timestamp_dir.as_path())
    }

    /// Closes every shard's index. Idempotent; subsequent queries return
    /// absent results.
    pub fn close(&mut self) {
        for shard in &mut self.shards {
            shard.index.close();
        }
    }

    /// Finds the shard owning `global_index`, where `extractor` selects which
    /// cumulative counter (steps or episodes) the index refers to.
    ///
    /// Returns the shard's position and the index local to it: the first
    /// shard whose cumulative count exceeds `global_index`, with the local
    /// index being the distance from the previous shard's cumulative count.
    /// Correct because cumulative counts are non-decreasing and a shard with
    /// a count equal to its predecessor's (zero elements) can never be
    /// selected.
    fn find_shard(
        &self,
        global_index: i64,
        extractor: impl Fn(&Shard) -> i64,
    ) -> Option<(usize, i64)> {
        let pos = self
            .shards
            .partition_point(|shard| extractor(shard) <= global_index);
        if pos == self.shards.len() {
            return None;
        }
        let previous = if pos == 0 {
            0
        } else {
            extractor(&self.shards[pos - 1])
        };
        Some((pos, global_index - previous))
    }
}
