use trajlog_records::FramedWriter;
use trajlog_testkit::{DatasetBuilder, TestStep};

use crate::ShardIndex;

fn encode_offsets(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn test_legacy_combined_index() {
    let mut builder = DatasetBuilder::new();
    let (index_path, trajectories_path) = builder.write_legacy_shard(&[3, 2]);

    let mut index = ShardIndex::new();
    index.init_legacy(&index_path, &trajectories_path).unwrap();

    assert_eq!(index.num_steps(), 5);
    assert_eq!(index.num_episodes(), 2);

    for i in 0..5 {
        let step: TestStep = index.step(i).unwrap();
        assert_eq!(step.id, i);
    }

    let first = index.episode(0, false).unwrap();
    assert_eq!(first.start, 0);
    assert_eq!(first.num_steps, 3);
    let last = index.episode(1, false).unwrap();
    assert_eq!(last.start, 3);
    assert_eq!(last.num_steps, 2);
}

#[test]
fn test_legacy_skips_episode_offsets_past_last_step() {
    let tempdir = tempfile::tempdir().unwrap();
    let trajectories_path = tempdir.path().join("trajectories.rec");
    let mut steps = FramedWriter::create(&trajectories_path).unwrap();
    let offsets: Vec<i64> = [b"s0".as_ref(), b"s1", b"s2"]
        .iter()
        .map(|p| steps.write_record(p).unwrap() as i64)
        .collect();
    steps.seal().unwrap();

    // Second episode offset points far past the last step record, as left
    // behind by a writer that crashed between the step and index files.
    let index_path = tempdir.path().join("index.rec");
    let mut index_file = FramedWriter::create(&index_path).unwrap();
    index_file.write_record(&encode_offsets(&offsets)).unwrap();
    index_file
        .write_record(&encode_offsets(&[offsets[0], offsets[2] + 10_000]))
        .unwrap();
    index_file.seal().unwrap();

    let mut index = ShardIndex::new();
    index.init_legacy(&index_path, &trajectories_path).unwrap();

    assert_eq!(index.num_steps(), 3);
    assert_eq!(index.num_episodes(), 1);
    let episode = index.episode(0, false).unwrap();
    assert_eq!(episode.start, 0);
    assert_eq!(episode.num_steps, 3);
}

#[test]
fn test_legacy_index_has_no_episode_metadata() {
    let mut builder = DatasetBuilder::new();
    let (index_path, trajectories_path) = builder.write_legacy_shard(&[4]);

    let mut index = ShardIndex::new();
    index.init_legacy(&index_path, &trajectories_path).unwrap();

    let episode = index.episode(0, true).unwrap();
    assert!(episode.metadata.is_none());
}

#[test]
fn test_legacy_missing_index_file() {
    let builder = DatasetBuilder::new();
    let index_path = builder.root().join("missing_index.rec");
    let trajectories_path = builder.root().join("missing_trajectories.rec");

    let mut index = ShardIndex::new();
    let err = index
        .init_legacy(&index_path, &trajectories_path)
        .unwrap_err();
    assert!(err.is_not_found());
}
