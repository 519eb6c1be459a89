use trajlog_testkit::{DatasetBuilder, TestEpisodeMetadata, TestStep};

use crate::{ShardIndex, ShardLayout};

#[test]
fn test_shard_init_and_step_access() {
    let mut builder = DatasetBuilder::new();
    let dir = builder.add_shard(&[2, 3]);

    let mut index = ShardIndex::new();
    index.init(&ShardLayout::new(dir)).unwrap();

    assert_eq!(index.num_steps(), 5);
    assert_eq!(index.num_episodes(), 2);
    for i in 0..5 {
        let step: TestStep = index.step(i).unwrap();
        assert_eq!(step.id, i);
    }
    assert!(index.step::<TestStep>(5).is_none());
    assert!(index.step::<TestStep>(-1).is_none());
    assert!(index.status().is_none());
}

#[test]
fn test_shard_episode_access() {
    let mut builder = DatasetBuilder::new();
    let dir = builder.add_shard(&[2, 3]);

    let mut index = ShardIndex::new();
    index.init(&ShardLayout::new(dir)).unwrap();

    let first = index.episode(0, true).unwrap();
    assert_eq!(first.start, 0);
    assert_eq!(first.num_steps, 2);
    let metadata: TestEpisodeMetadata = first.decode_metadata().unwrap();
    assert_eq!(metadata.episode_id, 0);

    let last = index.episode(1, false).unwrap();
    assert_eq!(last.start, 2);
    assert_eq!(last.num_steps, 3);
    assert!(last.metadata.is_none());

    assert!(index.episode(2, false).is_none());
}

#[test]
fn test_shard_init_missing_directory() {
    let builder = DatasetBuilder::new();
    let layout = ShardLayout::new(builder.root().join("no-such-shard"));

    let mut index = ShardIndex::new();
    let err = index.init(&layout).unwrap_err();
    assert!(err.is_not_found());

    // Failed init leaves the index unbound.
    assert_eq!(index.num_steps(), 0);
    assert!(index.step::<TestStep>(0).is_none());
}
