//! Chunked voxel world storage with procedural generation.
//!
//! Blocks live in 16x16x16 [`CompressedChunk`]s owned by a [`ChunkManager`],
//! which keeps a bounded working set in memory and persists chunks through
//! any [`ChunkStore`] backend.

pub mod config;
pub mod constants;
pub mod persistence;
pub mod utils;
pub mod world;

pub use config::{ConfigError, WorldConfig};
#[cfg(feature = "native")]
pub use persistence::FileChunkStore;
pub use persistence::{
    ChunkKey, ChunkSerializer, ChunkStore, MemoryChunkStore, PersistenceError, PersistenceResult,
    WorldId, WorldMetadata, WorldSettings,
};
#[cfg(feature = "native")]
pub use world::management::run_auto_save;
pub use world::{
    Block, BlockMetadata, BlockType, ChunkManager, ChunkManagerConfig, ChunkMetrics, ChunkPos,
    CompressedChunk, GenerationError, GeneratorConfig, LocalPos, ProceduralGenerator, VoxelPos,
    WorldError, WorldResult,
};
