use crate::episode_info::EpisodeInfo;
use crate::shard_index::ShardIndex;

/// A reader bound to one resolved episode.
///
/// Obtained from
/// [`DatasetIndex::create_episode_reader`](crate::DatasetIndex::create_episode_reader).
/// The reader holds the episode
/// in shard-local coordinates and an exclusive borrow of the owning shard's
/// index, translating episode-local step indexes into shard-local ones. The
/// borrow is what enforces the one-reader-at-a-time rule on the shard's
/// record stores; dropping (or [`close`](EpisodeReader::close)-ing) the
/// reader releases nothing beyond it, since the shard's lifetime belongs to
/// the dataset.
pub struct EpisodeReader<'a> {
    /// The episode's start (step index within the shard) and step count.
    episode_info: EpisodeInfo,
    /// The index of the timestamp directory holding this episode.
    shard_index: &'a mut ShardIndex,
}

impl std::fmt::Debug for EpisodeReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeReader")
            .field("episode_info", &self.episode_info)
            .finish_non_exhaustive()
    }
}

impl<'a> EpisodeReader<'a> {
    pub(crate) fn new(episode_info: EpisodeInfo, shard_index: &'a mut ShardIndex) -> Self {
        EpisodeReader {
            episode_info,
            shard_index,
        }
    }

    /// Number of steps within the episode.
    pub fn num_steps(&self) -> i64 {
        self.episode_info.num_steps
    }

    /// Returns the raw payload of the step at episode-local index
    /// `step_index`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())` or the
    /// record cannot be read.
    pub fn step_record(&mut self, step_index: i64) -> Option<Vec<u8>> {
        if step_index < 0 || step_index >= self.episode_info.num_steps {
            return None;
        }
        self.shard_index
            .step_record(self.episode_info.start + step_index)
    }

    /// Returns the step at episode-local index `step_index`, decoded into a
    /// message of type `T`.
    ///
    /// Returns `None` if `step_index` is not in `[0, num_steps())` or the
    /// record cannot be read or decoded.
    pub fn step<T>(&mut self, step_index: i64) -> Option<T>
    where
        T: prost::Message + Default,
    {
        if step_index < 0 || step_index >= self.episode_info.num_steps {
            return None;
        }
        self.shard_index.step(self.episode_info.start + step_index)
    }

    /// Invalidates further access by consuming the reader and releasing the
    /// borrow of the shard's index.
    pub fn close(self) {}
}
