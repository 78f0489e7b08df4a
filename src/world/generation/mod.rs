//! Procedural world generation

mod flood_fill;

pub use flood_fill::{GenerationResult, ProceduralGenerator};

use serde::{Deserialize, Serialize};

use crate::constants::generation::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_BLOCKS, DEFAULT_WORLD_SEED};
use crate::world::core::ChunkPos;

/// Generator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Chunk that gets the fixed spawn pattern instead of a flood fill.
    /// `None` disables the special case.
    pub spawn_chunk: Option<ChunkPos>,
    /// Expansions between abort-flag checks
    pub batch_size: usize,
    /// Upper bound on blocks emitted by a single pass
    pub max_blocks: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_WORLD_SEED,
            spawn_chunk: Some(ChunkPos::ORIGIN),
            batch_size: DEFAULT_BATCH_SIZE,
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }
}

#[cfg(test)]
mod tests;
