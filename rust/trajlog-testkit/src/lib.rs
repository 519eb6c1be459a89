//! Test utilities for the trajlog project:
//! - Synthetic step/episode payload messages and their generation.
//! - A builder that writes complete multi-shard datasets (and legacy
//!   combined-index shards) into a temporary directory.
//!
//! This crate is intended for use within the trajlog test suite only; the
//! production crates never write trajectory data.

pub mod data_gen;
pub mod dataset_builder;

pub use data_gen::{TestDatasetMetadata, TestEpisodeMetadata, TestStep};
pub use dataset_builder::DatasetBuilder;
