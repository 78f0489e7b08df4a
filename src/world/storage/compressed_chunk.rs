use crate::constants::core::CHUNK_VOLUME;
use crate::utils::now_millis;
use crate::world::block::{Block, BlockFlags, BlockMetadata, BlockType};
use crate::world::core::{chunk_to_world, ChunkPos, LocalPos};
use crate::world::palette::{PaletteId, ProbabilityPalette, RESERVED_PALETTE_ID};

/// Raw contents of one cell, as the four arrays hold it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellData {
    pub block_type: BlockType,
    pub palette_id: PaletteId,
    pub consecutive_count: u8,
    pub flags: BlockFlags,
}

impl CellData {
    pub const AIR: CellData = CellData {
        block_type: BlockType::Air,
        palette_id: RESERVED_PALETTE_ID,
        consecutive_count: 0,
        flags: BlockFlags::TRANSPARENT,
    };
}

/// A 16³ block volume in Structure-of-Arrays form
///
/// Each cell costs 5 bytes spread over four parallel arrays:
/// - `block_types`: `BlockType` index
/// - `palette_ids`: id into the world's [`ProbabilityPalette`]
/// - `consecutive`: same-type run length used by the tree rule
/// - `flags`: [`BlockFlags`] byte
///
/// All four are indexed by [`LocalPos::index`].
#[derive(Clone, Debug)]
pub struct CompressedChunk {
    position: ChunkPos,

    block_types: Vec<u8>,
    palette_ids: Vec<u16>,
    consecutive: Vec<u8>,
    flags: Vec<u8>,

    // Metadata
    dirty: bool,
    last_accessed: f64,
    live_blocks: u32,
}

impl CompressedChunk {
    /// Create an all-Air chunk. It starts clean: there is nothing to save yet.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            block_types: vec![BlockType::Air as u8; CHUNK_VOLUME],
            palette_ids: vec![RESERVED_PALETTE_ID; CHUNK_VOLUME],
            consecutive: vec![0; CHUNK_VOLUME],
            flags: vec![CellData::AIR.flags.bits(); CHUNK_VOLUME],
            dirty: false,
            last_accessed: now_millis(),
            live_blocks: 0,
        }
    }

    /// Rebuild a chunk from decoded arrays. Callers validate lengths and type indices.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw_parts(
        position: ChunkPos,
        block_types: Vec<u8>,
        palette_ids: Vec<u16>,
        consecutive: Vec<u8>,
        flags: Vec<u8>,
        dirty: bool,
        last_accessed: f64,
        live_blocks: u32,
    ) -> Self {
        debug_assert_eq!(block_types.len(), CHUNK_VOLUME);
        debug_assert_eq!(palette_ids.len(), CHUNK_VOLUME);
        debug_assert_eq!(consecutive.len(), CHUNK_VOLUME);
        debug_assert_eq!(flags.len(), CHUNK_VOLUME);
        Self {
            position,
            block_types,
            palette_ids,
            consecutive,
            flags,
            dirty,
            last_accessed,
            live_blocks,
        }
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Write a block. `palette_id` must come from the palette that will be
    /// used to read it back.
    pub fn set_block(&mut self, local: LocalPos, metadata: &BlockMetadata, palette_id: PaletteId) -> bool {
        if !local.is_in_bounds() {
            return false;
        }
        let index = local.index();
        let was_air = self.block_types[index] == BlockType::Air as u8;
        let is_air = metadata.block_type.is_air();

        self.block_types[index] = metadata.block_type as u8;
        self.palette_ids[index] = if is_air { RESERVED_PALETTE_ID } else { palette_id };
        self.consecutive[index] = metadata.consecutive_count;
        self.flags[index] = metadata.stored_flags().bits();

        match (was_air, is_air) {
            (true, false) => self.live_blocks += 1,
            (false, true) => self.live_blocks -= 1,
            _ => {}
        }

        self.dirty = true;
        self.touch();
        true
    }

    /// Raw cell contents, `None` only outside the chunk
    pub fn cell(&self, local: LocalPos) -> Option<CellData> {
        if !local.is_in_bounds() {
            return None;
        }
        Some(self.cell_at(local.index()))
    }

    fn cell_at(&self, index: usize) -> CellData {
        CellData {
            // Indices are validated on every write and on decode
            block_type: BlockType::from_index(self.block_types[index]).unwrap_or_default(),
            palette_id: self.palette_ids[index],
            consecutive_count: self.consecutive[index],
            flags: BlockFlags::from_bits_truncate(self.flags[index]),
        }
    }

    /// Full block record; Air cells yield a valid Air block
    pub fn get_block(&self, local: LocalPos, palette: &ProbabilityPalette) -> Option<Block> {
        let cell = self.cell(local)?;
        Some(self.block_from_cell(local, cell, palette))
    }

    fn block_from_cell(&self, local: LocalPos, cell: CellData, palette: &ProbabilityPalette) -> Block {
        let props = cell.block_type.properties();
        let metadata = BlockMetadata {
            block_type: cell.block_type,
            probabilities: palette.resolve(cell.palette_id, cell.block_type),
            hardness: props.hardness,
            flags: cell.flags,
            consecutive_count: cell.consecutive_count,
        };
        Block::new(chunk_to_world(self.position, local), metadata)
    }

    /// Reset a cell to Air. Returns whether a non-Air block was there.
    pub fn remove_block(&mut self, local: LocalPos) -> bool {
        if !local.is_in_bounds() {
            return false;
        }
        let index = local.index();
        if self.block_types[index] == BlockType::Air as u8 {
            return false;
        }

        self.block_types[index] = BlockType::Air as u8;
        self.palette_ids[index] = CellData::AIR.palette_id;
        self.consecutive[index] = CellData::AIR.consecutive_count;
        self.flags[index] = CellData::AIR.flags.bits();
        self.live_blocks -= 1;

        self.dirty = true;
        self.touch();
        true
    }

    /// Every non-Air block in the chunk, in index order
    pub fn non_air_blocks<'a>(
        &'a self,
        palette: &'a ProbabilityPalette,
    ) -> impl Iterator<Item = Block> + 'a {
        self.block_types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != BlockType::Air as u8)
            .filter_map(move |(index, _)| {
                let local = LocalPos::from_index(index)?;
                Some(self.block_from_cell(local, self.cell_at(index), palette))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.live_blocks == 0
    }

    pub fn live_block_count(&self) -> u32 {
        self.live_blocks
    }

    /// Count non-Air cells directly from the type array
    pub fn count_non_air(&self) -> u32 {
        self.block_types
            .iter()
            .filter(|t| **t != BlockType::Air as u8)
            .count() as u32
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn last_accessed(&self) -> f64 {
        self.last_accessed
    }

    pub fn set_last_accessed(&mut self, millis: f64) {
        self.last_accessed = millis;
    }

    pub fn touch(&mut self) {
        self.last_accessed = now_millis();
    }

    pub fn block_types(&self) -> &[u8] {
        &self.block_types
    }

    pub fn palette_ids(&self) -> &[u16] {
        &self.palette_ids
    }

    pub fn consecutive_counts(&self) -> &[u8] {
        &self.consecutive
    }

    pub fn flags(&self) -> &[u8] {
        &self.flags
    }
}

impl PartialEq for CompressedChunk {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.block_types == other.block_types
            && self.palette_ids == other.palette_ids
            && self.consecutive == other.consecutive
            && self.flags == other.flags
            && self.dirty == other.dirty
            && self.last_accessed.to_bits() == other.last_accessed.to_bits()
            && self.live_blocks == other.live_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn local(x: u32, y: u32, z: u32) -> LocalPos {
        LocalPos::new_checked(x, y, z).expect("test position in range")
    }

    #[test]
    fn test_new_chunk_is_empty_and_clean() {
        let chunk = CompressedChunk::new(ChunkPos::new(1, 2, 3));
        assert!(chunk.is_empty());
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.count_non_air(), 0);
    }

    #[test]
    fn test_set_and_get_block() {
        let palette = ProbabilityPalette::new();
        let mut chunk = CompressedChunk::new(ChunkPos::new(-1, 0, 2));
        let stone = BlockMetadata::new(BlockType::Stone);

        assert!(chunk.set_block(local(15, 0, 3), &stone, RESERVED_PALETTE_ID));
        assert!(chunk.is_dirty());
        assert_eq!(chunk.live_block_count(), 1);

        let block = chunk.get_block(local(15, 0, 3), &palette).expect("in range");
        assert_eq!(block.block_type(), BlockType::Stone);
        assert_eq!(block.position.x, -1);
        assert_eq!(block.position.z, 35);
        assert!(block.visible);
        assert_eq!(block.metadata, stone);
    }

    #[test]
    fn test_air_cells_return_air_records() {
        let palette = ProbabilityPalette::new();
        let chunk = CompressedChunk::new(ChunkPos::ORIGIN);
        let block = chunk.get_block(local(4, 4, 4), &palette).expect("in range");
        assert!(block.is_air());
        assert!(!block.visible);

        let outside = LocalPos { x: 16, y: 0, z: 0 };
        assert!(chunk.get_block(outside, &palette).is_none());
    }

    #[test]
    fn test_remove_block_reports_whether_anything_was_removed() {
        let mut chunk = CompressedChunk::new(ChunkPos::ORIGIN);
        assert!(!chunk.remove_block(local(1, 1, 1)));
        assert!(!chunk.is_dirty());

        chunk.set_block(local(1, 1, 1), &BlockMetadata::new(BlockType::Dirt), 0);
        assert!(chunk.remove_block(local(1, 1, 1)));
        assert!(!chunk.remove_block(local(1, 1, 1)));
        assert!(chunk.is_empty());
        assert_eq!(chunk.cell(local(1, 1, 1)), Some(CellData::AIR));
    }

    #[test]
    fn test_live_count_matches_cells_after_random_edits() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut chunk = CompressedChunk::new(ChunkPos::ORIGIN);
        for _ in 0..5000 {
            let pos = local(rng.gen_range(0..16), rng.gen_range(0..16), rng.gen_range(0..16));
            match rng.gen_range(0..3) {
                0 => {
                    chunk.remove_block(pos);
                }
                _ => {
                    let block_type = BlockType::ALL[rng.gen_range(0..BlockType::COUNT)];
                    chunk.set_block(pos, &BlockMetadata::new(block_type), 0);
                }
            }
            assert_eq!(chunk.live_block_count(), chunk.count_non_air());
        }
    }

    #[test]
    fn test_overwriting_with_air_decrements_live_count() {
        let mut chunk = CompressedChunk::new(ChunkPos::ORIGIN);
        chunk.set_block(local(0, 0, 0), &BlockMetadata::new(BlockType::Wood), 0);
        chunk.set_block(local(0, 0, 0), &BlockMetadata::new(BlockType::Leaves), 0);
        assert_eq!(chunk.live_block_count(), 1);
        chunk.set_block(local(0, 0, 0), &BlockMetadata::air(), 0);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_non_air_blocks_are_in_world_coordinates() {
        let palette = ProbabilityPalette::new();
        let mut chunk = CompressedChunk::new(ChunkPos::new(2, 0, -1));
        chunk.set_block(local(0, 5, 15), &BlockMetadata::new(BlockType::Sand), 0);
        chunk.set_block(local(3, 0, 0), &BlockMetadata::new(BlockType::Water), 0);

        let blocks: Vec<Block> = chunk.non_air_blocks(&palette).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].position, crate::world::core::VoxelPos::new(35, 0, -16));
        assert_eq!(blocks[1].position, crate::world::core::VoxelPos::new(32, 5, -1));
    }
}
