mod legacy;
mod shard_read;
