//! Synthetic payload messages for trajectory tests.
//!
//! The reader is generic over any `prost::Message` payload; these are the
//! message types the test suite instantiates it with. Step identity is
//! deterministic (the global step index), so that a record fetched through
//! any access path can be checked against the index it was requested by.

use prost::Message;

/// One synthetic environment step.
#[derive(Clone, PartialEq, Message)]
pub struct TestStep {
    /// Global step index at write time.
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(double, tag = "2")]
    pub reward: f64,
    #[prost(bytes = "vec", tag = "3")]
    pub observation: Vec<u8>,
}

/// Per-episode metadata record.
#[derive(Clone, PartialEq, Message)]
pub struct TestEpisodeMetadata {
    /// Global episode index at write time.
    #[prost(int64, tag = "1")]
    pub episode_id: i64,
    #[prost(string, tag = "2")]
    pub label: String,
}

/// Dataset-level metadata record.
#[derive(Clone, PartialEq, Message)]
pub struct TestDatasetMetadata {
    #[prost(string, tag = "1")]
    pub environment: String,
    #[prost(int64, tag = "2")]
    pub version: i64,
}

/// Produces the step payload for global step `id`.
pub fn make_step(id: i64) -> TestStep {
    let mut observation = vec![0u8; 24];
    let mut rng = fastrand::Rng::with_seed(id as u64);
    rng.fill(&mut observation);
    TestStep {
        id,
        reward: (id % 10) as f64 * 0.5,
        observation,
    }
}

/// Produces the metadata payload for global episode `episode_id`.
pub fn make_episode_metadata(episode_id: i64) -> TestEpisodeMetadata {
    TestEpisodeMetadata {
        episode_id,
        label: format!("episode-{episode_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_step_deterministic() {
        assert_eq!(make_step(17), make_step(17));
        assert_ne!(make_step(17).observation, make_step(18).observation);
    }

    #[test]
    fn test_step_message_roundtrip() {
        let step = make_step(3);
        let bytes = step.encode_to_vec();
        let decoded = TestStep::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, step);
    }
}
