//! Core world data types
//!
//! Coordinates only. Block and chunk types build on these.

mod position;

pub use position::{chunk_to_world, world_to_chunk, ChunkPos, LocalPos, VoxelPos};
