/// Information for accessing a single episode.
///
/// Note on coordinate spaces: `start` produced by
/// [`ShardIndex::episode`](crate::ShardIndex::episode) is a step index local
/// to that shard, while `start` produced by
/// [`DatasetIndex::episode`](crate::DatasetIndex::episode) is a global step
/// index, directly usable with
/// [`DatasetIndex::step`](crate::DatasetIndex::step).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeInfo {
    /// Step index of the first step of the episode.
    pub start: i64,
    /// Number of steps in the episode. The episode's step range
    /// `[start, start + num_steps)` never crosses a shard boundary.
    pub num_steps: i64,
    /// Raw payload of the episode metadata record, when requested and present.
    pub metadata: Option<Vec<u8>>,
}

impl EpisodeInfo {
    /// Decodes the embedded metadata record, if any, into a message of type `M`.
    ///
    /// Returns `None` when there is no metadata or when decoding fails.
    pub fn decode_metadata<M>(&self) -> Option<M>
    where
        M: prost::Message + Default,
    {
        let bytes = self.metadata.as_deref()?;
        M::decode(bytes).ok()
    }
}
