// Voxel World Store Constants - SINGLE SOURCE OF TRUTH
//
// Chunk geometry, on-disk format identifiers and generation tuning live here.
// Do NOT redefine these anywhere else in the crate.

/// Chunk geometry
pub mod core {
    /// Edge length of a chunk in blocks
    pub const CHUNK_SIZE: u32 = 16;
    pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;
    /// Blocks in one XY layer of a chunk
    pub const CHUNK_LAYER: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;
    /// Blocks per chunk (16³)
    pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;
}

/// Serialized chunk format
pub mod format {
    use super::core::CHUNK_VOLUME;

    /// Magic bytes identifying a chunk buffer
    pub const CHUNK_MAGIC: &[u8; 4] = b"VXCK";
    /// Bump when the body layout changes
    pub const CHUNK_FORMAT_VERSION: u32 = 1;
    /// magic + version + crc32
    pub const HEADER_SIZE: usize = 12;

    // Body offsets, relative to the end of the header
    pub const OFFSET_CHUNK_X: usize = 0;
    pub const OFFSET_CHUNK_Y: usize = 4;
    pub const OFFSET_CHUNK_Z: usize = 8;
    pub const OFFSET_LAST_ACCESSED: usize = 12;
    pub const OFFSET_LIVE_COUNT: usize = 20;
    pub const OFFSET_DIRTY: usize = 24;
    pub const OFFSET_BLOCK_TYPES: usize = 28;
    pub const OFFSET_PALETTE_IDS: usize = OFFSET_BLOCK_TYPES + CHUNK_VOLUME;
    pub const OFFSET_CONSECUTIVE: usize = OFFSET_PALETTE_IDS + CHUNK_VOLUME * 2;
    pub const OFFSET_FLAGS: usize = OFFSET_CONSECUTIVE + CHUNK_VOLUME;
    /// 20508 bytes
    pub const BODY_SIZE: usize = OFFSET_FLAGS + CHUNK_VOLUME;
    pub const SERIALIZED_CHUNK_SIZE: usize = HEADER_SIZE + BODY_SIZE;
}

/// Procedural generation tuning
pub mod generation {
    /// Every mapping sums to this
    pub const PROBABILITY_TOTAL: f64 = 100.0;
    /// Tolerance used by the sum invariant checks
    pub const PROBABILITY_EPSILON: f64 = 1e-6;
    /// Fraction of each type's mass shifted to the next type per generation step
    pub const MUTATION_RATE: f64 = 0.01;
    /// Flat wood reduction per consecutive wood block on the up table
    pub const TREE_FLAT_REDUCTION: f64 = 5.0;
    /// Upper bound on the flat reduction as a fraction of the remaining wood mass
    pub const TREE_FLAT_REDUCTION_CAP: f64 = 0.5;
    /// Pops between abort flag checks
    pub const DEFAULT_BATCH_SIZE: usize = 256;
    /// Flood-fill radius used when a world does not choose its own
    pub const DEFAULT_GENERATION_RADIUS: i32 = 32;
    /// Hard cap on blocks produced by one flood fill
    pub const DEFAULT_MAX_BLOCKS: usize = 250_000;
    pub const DEFAULT_WORLD_SEED: u64 = 12345;
}

/// Chunk manager defaults
pub mod management {
    /// Resident chunk ceiling before eviction kicks in
    pub const DEFAULT_MAX_RESIDENT_CHUNKS: usize = 512;
    /// Render distance in chunks
    pub const DEFAULT_RENDER_DISTANCE: i32 = 4;
    /// Above this many dirty chunks a flush uses one bulk backend call
    pub const DEFAULT_BULK_SAVE_THRESHOLD: usize = 4;
    pub const DEFAULT_AUTO_SAVE_INTERVAL_SECS: u64 = 30;
}
