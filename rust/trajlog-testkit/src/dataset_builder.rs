//! Writes synthetic trajectory datasets for tests.
//!
//! The on-disk layout mirrors what the reader discovers: timestamp-named
//! shard directories containing `steps.rec`, `step_offsets.rec`,
//! `episode_metadata.rec` and `episode_index.rec`, plus an optional
//! `metadata.rec` in the root. Shard directories are named with a
//! zero-padded sequence number so that lexicographic order matches insertion
//! order.

use std::path::{Path, PathBuf};

use prost::Message;
use tempfile::TempDir;
use trajlog_records::FramedWriter;

use crate::data_gen::{self, TestDatasetMetadata};

const STEPS_FILE: &str = "steps.rec";
const STEP_OFFSETS_FILE: &str = "step_offsets.rec";
const EPISODE_METADATA_FILE: &str = "episode_metadata.rec";
const EPISODE_INDEX_FILE: &str = "episode_index.rec";
const DATASET_METADATA_FILE: &str = "metadata.rec";

/// Offset arrays are split into records of at most this many entries, so
/// that multi-record index files are exercised by every test dataset.
const OFFSETS_PER_RECORD: usize = 4;

/// Builds a dataset under a temporary directory, one shard at a time.
///
/// Step and episode identities are global across the whole dataset
/// ([`data_gen::make_step`] of the global step index, and so on), which lets
/// tests verify that a record reached through any access path is the record
/// the index promised.
pub struct DatasetBuilder {
    temp_dir: TempDir,
    shard_seq: usize,
    next_step_id: i64,
    next_episode_id: i64,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetBuilder {
    pub fn new() -> DatasetBuilder {
        DatasetBuilder {
            temp_dir: TempDir::new().expect("tempdir"),
            shard_seq: 0,
            next_step_id: 0,
            next_episode_id: 0,
        }
    }

    /// The dataset root directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes the dataset-level metadata record.
    pub fn write_metadata(&self, metadata: &TestDatasetMetadata) {
        let mut writer =
            FramedWriter::create(self.root().join(DATASET_METADATA_FILE)).expect("create");
        writer
            .write_record(&metadata.encode_to_vec())
            .expect("write_record");
        writer.seal().expect("seal");
    }

    /// Writes one shard holding the given episodes (by step count) and
    /// returns its directory. Every episode gets a metadata record.
    pub fn add_shard(&mut self, episode_lengths: &[usize]) -> PathBuf {
        let dir = self.root().join(format!("{:016}", self.shard_seq));
        self.shard_seq += 1;
        std::fs::create_dir(&dir).expect("create_dir");

        let num_steps: usize = episode_lengths.iter().sum();

        // Step records and their byte offsets.
        let mut steps = FramedWriter::create(dir.join(STEPS_FILE)).expect("create");
        let mut step_offsets = Vec::with_capacity(num_steps);
        for _ in 0..num_steps {
            let step = data_gen::make_step(self.next_step_id);
            self.next_step_id += 1;
            let offset = steps
                .write_record(&step.encode_to_vec())
                .expect("write_record");
            step_offsets.push(offset as i64);
        }
        steps.seal().expect("seal");

        // Episode metadata records and the [start, metadata offset] pairs.
        let mut episode_metadata =
            FramedWriter::create(dir.join(EPISODE_METADATA_FILE)).expect("create");
        let mut episode_index = Vec::with_capacity(episode_lengths.len() * 2);
        let mut local_start = 0i64;
        for &length in episode_lengths {
            let metadata = data_gen::make_episode_metadata(self.next_episode_id);
            self.next_episode_id += 1;
            let offset = episode_metadata
                .write_record(&metadata.encode_to_vec())
                .expect("write_record");
            episode_index.push(local_start);
            episode_index.push(offset as i64);
            local_start += length as i64;
        }
        episode_metadata.seal().expect("seal");

        write_i64_records(
            dir.join(STEP_OFFSETS_FILE),
            &step_offsets,
            OFFSETS_PER_RECORD,
        );
        write_i64_records(dir.join(EPISODE_INDEX_FILE), &episode_index, usize::MAX);

        dir
    }

    /// Writes a legacy combined-index shard: a trajectory file plus a single
    /// index file whose first record is the step-offset array and whose
    /// second record holds the episode starts as byte offsets. Returns the
    /// `(index, trajectories)` paths.
    ///
    /// The files are written into the dataset root (discovery ignores plain
    /// files), and the step/episode identity counters advance exactly as for
    /// a regular shard.
    pub fn write_legacy_shard(&mut self, episode_lengths: &[usize]) -> (PathBuf, PathBuf) {
        let seq = self.shard_seq;
        self.shard_seq += 1;
        let trajectories_path = self.root().join(format!("legacy_trajectories_{seq}.rec"));
        let index_path = self.root().join(format!("legacy_index_{seq}.rec"));

        let num_steps: usize = episode_lengths.iter().sum();
        let mut steps = FramedWriter::create(&trajectories_path).expect("create");
        let mut step_offsets = Vec::with_capacity(num_steps);
        for _ in 0..num_steps {
            let step = data_gen::make_step(self.next_step_id);
            self.next_step_id += 1;
            let offset = steps
                .write_record(&step.encode_to_vec())
                .expect("write_record");
            step_offsets.push(offset as i64);
        }
        steps.seal().expect("seal");

        let mut episode_offsets = Vec::with_capacity(episode_lengths.len());
        let mut local_start = 0usize;
        for &length in episode_lengths {
            self.next_episode_id += 1;
            episode_offsets.push(step_offsets[local_start]);
            local_start += length;
        }

        let mut index = FramedWriter::create(&index_path).expect("create");
        index
            .write_record(&encode_i64s(&step_offsets))
            .expect("write_record");
        index
            .write_record(&encode_i64s(&episode_offsets))
            .expect("write_record");
        index.seal().expect("seal");

        (index_path, trajectories_path)
    }
}

fn write_i64_records(path: PathBuf, values: &[i64], per_record: usize) {
    let mut writer = FramedWriter::create(&path).expect("create");
    if values.is_empty() {
        writer.seal().expect("seal");
        return;
    }
    for chunk in values.chunks(per_record.min(values.len())) {
        writer.write_record(&encode_i64s(chunk)).expect("write_record");
    }
    writer.seal().expect("seal");
}

fn encode_i64s(values: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use trajlog_records::read_framed_file;

    use super::*;

    #[test]
    fn test_shard_files_on_disk() {
        let mut builder = DatasetBuilder::new();
        let dir = builder.add_shard(&[2, 3]);

        let steps = read_framed_file(dir.join(STEPS_FILE)).unwrap();
        assert_eq!(steps.len(), 5);

        // 5 offsets, 4 per record.
        let offsets = read_framed_file(dir.join(STEP_OFFSETS_FILE)).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].len(), 4 * 8);
        assert_eq!(offsets[1].len(), 8);

        let index = read_framed_file(dir.join(EPISODE_INDEX_FILE)).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].len(), 2 * 16);

        let metadata = read_framed_file(dir.join(EPISODE_METADATA_FILE)).unwrap();
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_step_ids_are_global() {
        let mut builder = DatasetBuilder::new();
        builder.add_shard(&[3]);
        builder.add_shard(&[2]);
        assert_eq!(builder.next_step_id, 5);
        assert_eq!(builder.next_episode_id, 2);
    }

    #[test]
    fn test_legacy_shard_index_records() {
        let mut builder = DatasetBuilder::new();
        let (index_path, trajectories_path) = builder.write_legacy_shard(&[2, 2]);

        let index = read_framed_file(&index_path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].len(), 4 * 8);
        assert_eq!(index[1].len(), 2 * 8);

        let steps = read_framed_file(&trajectories_path).unwrap();
        assert_eq!(steps.len(), 4);
    }
}
