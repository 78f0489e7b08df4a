//! Voxel world: coordinates, blocks, chunk storage, generation and the
//! chunk manager that ties them to a persistence backend.
//!
//! - **core**: chunk, voxel and local coordinates and the mapping between them
//! - **block** / **probability** / **palette**: what a cell holds
//! - **storage**: the 16x16x16 structure-of-arrays chunk
//! - **generation**: probability-driven flood fill
//! - **management**: bounded working set, dirty tracking, eviction, world lifecycle

pub mod block;
pub mod core;
pub mod error;
pub mod generation;
pub mod management;
pub mod palette;
pub mod probability;
pub mod storage;

pub use block::{Block, BlockFlags, BlockKey, BlockMetadata, BlockType, ToolRequirement};
pub use core::{chunk_to_world, world_to_chunk, ChunkPos, LocalPos, VoxelPos};
pub use error::{GenerationError, WorldError, WorldResult};
pub use generation::{GenerationResult, GeneratorConfig, ProceduralGenerator};
pub use management::{ChunkManager, ChunkManagerConfig, ChunkManagerStats, ChunkMetrics, MetricsSnapshot};
pub use palette::{PaletteId, ProbabilityPalette, RESERVED_PALETTE_ID};
pub use probability::{Direction, DirectionalProbabilities, ProbabilityMapping};
pub use storage::{CellData, CompressedChunk};
