//! Probability-driven flood fill.
//!
//! Starting from a Dirt seed, pending blocks are expanded closest-first. Each
//! neighbor draws its type from the parent's table for that direction and
//! inherits the parent's tables with a small mutation, so terrain drifts
//! gradually with distance from the seed.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::GeneratorConfig;
use crate::constants::core::{CHUNK_SIZE, CHUNK_VOLUME};
use crate::world::block::{Block, BlockMetadata, BlockType};
use crate::world::core::{chunk_to_world, ChunkPos, LocalPos, VoxelPos};
use crate::world::error::GenerationError;
use crate::world::probability::Direction;

const NEIGHBORS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Height (in local z) below which the spawn chunk is solid
const SPAWN_FLOOR_HEIGHT: u32 = CHUNK_SIZE / 2;

/// Heap entry; ordered so the closest, then earliest-queued, entry pops first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    distance_sq: i64,
    sequence: u64,
    block_index: usize,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .distance_sq
            .cmp(&self.distance_sq)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Output of one generation pass
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    blocks: Vec<Block>,
    index: FxHashMap<VoxelPos, usize>,
    /// Whether the block cap stopped expansion early
    pub capped: bool,
    /// Whether the fixed spawn pattern was emitted
    pub spawn_pattern: bool,
}

impl GenerationResult {
    fn push(&mut self, block: Block) -> usize {
        let index = self.blocks.len();
        self.index.insert(block.position, index);
        self.blocks.push(block);
        index
    }

    fn contains(&self, pos: VoxelPos) -> bool {
        self.index.contains_key(&pos)
    }

    /// Blocks in generation order, Air included
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_at(&self, pos: VoxelPos) -> Option<&Block> {
        self.index.get(&pos).map(|&i| &self.blocks[i])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn non_air_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }

    /// Distinct chunks the result writes into, sorted
    pub fn chunks_touched(&self) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self
            .blocks
            .iter()
            .map(|b| b.position.to_chunk_pos())
            .collect();
        chunks.sort();
        chunks.dedup();
        chunks
    }
}

/// Flood fill generator with a cooperative abort flag
#[derive(Debug, Clone)]
pub struct ProceduralGenerator {
    config: GeneratorConfig,
    abort: Arc<AtomicBool>,
}

impl ProceduralGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    /// Shared flag; storing `true` stops the running pass at its next batch boundary
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn reset_abort(&self) {
        self.abort.store(false, Ordering::SeqCst);
    }

    /// Run one pass from `seed_pos` within Euclidean `radius` (in blocks)
    pub fn generate(
        &self,
        seed_pos: VoxelPos,
        radius: i32,
    ) -> Result<GenerationResult, GenerationError> {
        let seed_chunk = seed_pos.to_chunk_pos();
        if self.config.spawn_chunk == Some(seed_chunk) {
            log::debug!(
                "[ProceduralGenerator::generate] Seed {} lies in spawn chunk {}, emitting fixed pattern",
                seed_pos,
                seed_chunk
            );
            return Ok(spawn_pattern(seed_chunk));
        }

        let mut rng = StdRng::seed_from_u64(mix_seed(self.config.seed, seed_pos));
        let mut result = GenerationResult::default();
        let mut heap = BinaryHeap::new();
        let mut sequence = 0u64;

        let seed_index = result.push(Block::new(seed_pos, BlockMetadata::new(BlockType::Dirt)));
        heap.push(Pending {
            distance_sq: 0,
            sequence,
            block_index: seed_index,
        });

        let radius_sq = if radius > 0 { (radius as i64).pow(2) } else { -1 };
        let batch_size = self.config.batch_size.max(1);
        let mut processed = 0usize;

        'expand: while let Some(pending) = heap.pop() {
            if processed % batch_size == 0 && self.abort.load(Ordering::SeqCst) {
                log::info!(
                    "[ProceduralGenerator::generate] Aborted after {} expansions",
                    processed
                );
                return Err(GenerationError::Aborted { processed });
            }
            processed += 1;

            let parent = result.blocks[pending.block_index];
            for (dx, dy, dz) in NEIGHBORS {
                // Neighbors past the edge of the coordinate space do not exist
                let Some(pos) = parent.position.checked_offset(dx, dy, dz) else {
                    continue;
                };
                if result.contains(pos) || pos.distance_squared_to(seed_pos) > radius_sq {
                    continue;
                }
                if result.len() >= self.config.max_blocks {
                    log::debug!(
                        "[ProceduralGenerator::generate] Reached block cap {}, stopping expansion",
                        self.config.max_blocks
                    );
                    result.capped = true;
                    break 'expand;
                }

                let metadata = derive_child(&parent.metadata, Direction::from_offset(dz), &mut rng);
                let index = result.push(Block::new(pos, metadata));
                if !metadata.block_type.is_air() {
                    sequence += 1;
                    heap.push(Pending {
                        distance_sq: pos.distance_squared_to(seed_pos),
                        sequence,
                        block_index: index,
                    });
                }
            }
        }

        log::debug!(
            "[ProceduralGenerator::generate] Generated {} blocks ({} solid) around {} in {} expansions",
            result.len(),
            result.non_air_count(),
            seed_pos,
            processed
        );
        Ok(result)
    }
}

/// Draw a neighbor's type and derive its tables from the parent's
fn derive_child(parent: &BlockMetadata, direction: Direction, rng: &mut StdRng) -> BlockMetadata {
    let block_type = parent.probabilities.get(direction).draw(rng);
    if block_type.is_air() {
        return BlockMetadata::air();
    }

    let consecutive = match (block_type, parent.block_type) {
        (BlockType::Wood, BlockType::Wood) => parent.consecutive_count.saturating_add(1),
        (BlockType::Wood, _) => 1,
        _ => 0,
    };

    let mut tables = parent.probabilities.mutated();
    if block_type == BlockType::Wood {
        tables.apply_tree_rule(consecutive);
    }
    debug_assert!(tables.is_normalized());

    BlockMetadata::new(block_type)
        .with_probabilities(tables)
        .with_consecutive_count(consecutive)
}

/// Solid Dirt in the lower half of the chunk, Air above
fn spawn_pattern(chunk: ChunkPos) -> GenerationResult {
    let mut result = GenerationResult {
        spawn_pattern: true,
        ..Default::default()
    };
    let dirt = BlockMetadata::new(BlockType::Dirt);
    let air = BlockMetadata::air();
    for index in 0..CHUNK_VOLUME {
        let Some(local) = LocalPos::from_index(index) else { continue };
        let metadata = if (local.z as u32) < SPAWN_FLOOR_HEIGHT { dirt } else { air };
        result.push(Block::new(chunk_to_world(chunk, local), metadata));
    }
    result
}

/// Combine the world seed with the seed position so each start point has its own stream
fn mix_seed(seed: u64, pos: VoxelPos) -> u64 {
    let mut h = seed ^ 0x9E37_79B9_7F4A_7C15;
    for component in [pos.x, pos.y, pos.z] {
        h ^= component as u32 as u64;
        h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h ^= h >> 31;
    }
    h
}
