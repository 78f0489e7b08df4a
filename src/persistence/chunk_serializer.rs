//! Fixed binary layout for [`CompressedChunk`].
//!
//! A 12-byte header (magic, format version, CRC32 of the body) is followed by
//! a 20508-byte body holding the chunk coordinate, access time, live count,
//! dirty flag and the four cell arrays. All integers are little-endian.

use crate::constants::core::CHUNK_VOLUME;
use crate::constants::format::*;
use crate::persistence::error::{corrupted_data, version_mismatch};
use crate::persistence::PersistenceResult;
use crate::world::block::BlockType;
use crate::world::core::ChunkPos;
use crate::world::storage::CompressedChunk;

/// Serializes and deserializes chunks
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkSerializer;

impl ChunkSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a chunk to bytes
    pub fn serialize(&self, chunk: &CompressedChunk) -> Vec<u8> {
        let mut body = vec![0u8; BODY_SIZE];
        let position = chunk.position();

        write_i32(&mut body, OFFSET_CHUNK_X, position.x);
        write_i32(&mut body, OFFSET_CHUNK_Y, position.y);
        write_i32(&mut body, OFFSET_CHUNK_Z, position.z);
        body[OFFSET_LAST_ACCESSED..OFFSET_LAST_ACCESSED + 8]
            .copy_from_slice(&chunk.last_accessed().to_le_bytes());
        body[OFFSET_LIVE_COUNT..OFFSET_LIVE_COUNT + 4]
            .copy_from_slice(&chunk.live_block_count().to_le_bytes());
        body[OFFSET_DIRTY] = chunk.is_dirty() as u8;

        body[OFFSET_BLOCK_TYPES..OFFSET_PALETTE_IDS].copy_from_slice(chunk.block_types());
        for (i, id) in chunk.palette_ids().iter().enumerate() {
            let at = OFFSET_PALETTE_IDS + i * 2;
            body[at..at + 2].copy_from_slice(&id.to_le_bytes());
        }
        body[OFFSET_CONSECUTIVE..OFFSET_FLAGS].copy_from_slice(chunk.consecutive_counts());
        body[OFFSET_FLAGS..BODY_SIZE].copy_from_slice(chunk.flags());

        let mut buffer = Vec::with_capacity(SERIALIZED_CHUNK_SIZE);
        buffer.extend_from_slice(CHUNK_MAGIC);
        buffer.extend_from_slice(&CHUNK_FORMAT_VERSION.to_le_bytes());
        buffer.extend_from_slice(&calculate_checksum(&body).to_le_bytes());
        buffer.extend_from_slice(&body);
        buffer
    }

    /// Deserialize a chunk from bytes.
    ///
    /// Anything short of a byte-exact valid buffer is rejected; a damaged
    /// chunk is never turned into an empty one.
    pub fn deserialize(&self, data: &[u8]) -> PersistenceResult<CompressedChunk> {
        if data.len() < HEADER_SIZE {
            return Err(corrupted_data(format!(
                "Data too small for header: {} bytes",
                data.len()
            )));
        }

        if &data[0..4] != CHUNK_MAGIC {
            return Err(corrupted_data("Invalid chunk magic"));
        }

        let version = read_u32(data, 4);
        if version != CHUNK_FORMAT_VERSION {
            return Err(version_mismatch(CHUNK_FORMAT_VERSION, version));
        }

        if data.len() != SERIALIZED_CHUNK_SIZE {
            return Err(corrupted_data(format!(
                "Invalid chunk length: expected {} bytes, found {}",
                SERIALIZED_CHUNK_SIZE,
                data.len()
            )));
        }

        let body = &data[HEADER_SIZE..];
        if calculate_checksum(body) != read_u32(data, 8) {
            return Err(corrupted_data("Checksum mismatch"));
        }

        let position = ChunkPos::new(
            read_i32(body, OFFSET_CHUNK_X),
            read_i32(body, OFFSET_CHUNK_Y),
            read_i32(body, OFFSET_CHUNK_Z),
        );

        let mut millis = [0u8; 8];
        millis.copy_from_slice(&body[OFFSET_LAST_ACCESSED..OFFSET_LAST_ACCESSED + 8]);
        let last_accessed = f64::from_le_bytes(millis);
        if !last_accessed.is_finite() {
            return Err(corrupted_data("Non-finite access time"));
        }

        let live_blocks = read_u32(body, OFFSET_LIVE_COUNT);
        let dirty = match body[OFFSET_DIRTY] {
            0 => false,
            1 => true,
            other => return Err(corrupted_data(format!("Invalid dirty flag {}", other))),
        };

        let block_types = body[OFFSET_BLOCK_TYPES..OFFSET_PALETTE_IDS].to_vec();
        let mut non_air = 0u32;
        for &index in &block_types {
            match BlockType::from_index(index) {
                Some(BlockType::Air) => {}
                Some(_) => non_air += 1,
                None => {
                    return Err(corrupted_data(format!("Invalid block type index {}", index)));
                }
            }
        }
        if non_air != live_blocks {
            return Err(corrupted_data(format!(
                "Live block count {} does not match {} non-air cells",
                live_blocks, non_air
            )));
        }

        let palette_ids = body[OFFSET_PALETTE_IDS..OFFSET_CONSECUTIVE]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        debug_assert_eq!(palette_ids.len(), CHUNK_VOLUME);

        let consecutive = body[OFFSET_CONSECUTIVE..OFFSET_FLAGS].to_vec();
        let flags = body[OFFSET_FLAGS..BODY_SIZE].to_vec();

        Ok(CompressedChunk::from_raw_parts(
            position,
            block_types,
            palette_ids,
            consecutive,
            flags,
            dirty,
            last_accessed,
            live_blocks,
        ))
    }
}

impl CompressedChunk {
    pub fn serialize(&self) -> Vec<u8> {
        ChunkSerializer.serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> PersistenceResult<Self> {
        ChunkSerializer.deserialize(data)
    }
}

fn write_i32(buffer: &mut [u8], offset: usize, value: i32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Calculate CRC32 checksum
fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceError;
    use crate::world::block::BlockMetadata;
    use crate::world::core::LocalPos;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn populated_chunk(seed: u64) -> CompressedChunk {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chunk = CompressedChunk::new(ChunkPos::new(-7, 3, 120));
        for _ in 0..1500 {
            let local = LocalPos::new_checked(
                rng.gen_range(0..16),
                rng.gen_range(0..16),
                rng.gen_range(0..16),
            )
            .expect("in range");
            let block_type = BlockType::ALL[rng.gen_range(0..BlockType::COUNT)];
            let metadata = BlockMetadata::new(block_type).with_consecutive_count(rng.gen());
            chunk.set_block(local, &metadata, rng.gen_range(0..400));
        }
        chunk.set_last_accessed(1_700_000_123_456.0);
        chunk
    }

    #[test]
    fn test_layout_size_and_offsets() {
        assert_eq!(BODY_SIZE, 20508);
        assert_eq!(OFFSET_PALETTE_IDS, 4124);
        assert_eq!(OFFSET_CONSECUTIVE, 12316);
        assert_eq!(OFFSET_FLAGS, 16412);

        let data = ChunkSerializer.serialize(&CompressedChunk::new(ChunkPos::ORIGIN));
        assert_eq!(data.len(), SERIALIZED_CHUNK_SIZE);
        assert_eq!(&data[0..4], b"VXCK");
    }

    #[test]
    fn test_round_trip_reproduces_every_array() {
        for seed in [1, 2, 3] {
            let chunk = populated_chunk(seed);
            let restored = CompressedChunk::deserialize(&chunk.serialize())
                .expect("Chunk deserialization should succeed");
            assert_eq!(restored, chunk);
            assert_eq!(restored.is_dirty(), chunk.is_dirty());
            assert_eq!(restored.last_accessed(), 1_700_000_123_456.0);
        }

        let mut clean = populated_chunk(4);
        clean.mark_clean();
        let restored = CompressedChunk::deserialize(&clean.serialize()).expect("clean chunk");
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_corruption_detection_invalid_magic() {
        let mut data = populated_chunk(5).serialize();
        data[0..4].copy_from_slice(b"FAKE");
        match ChunkSerializer.deserialize(&data) {
            Err(PersistenceError::CorruptData(msg)) => assert!(msg.contains("Invalid chunk magic")),
            other => panic!("Expected CorruptData error, got {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_invalid_size() {
        match ChunkSerializer.deserialize(&[0u8; 10]) {
            Err(PersistenceError::CorruptData(msg)) => assert!(msg.contains("Data too small")),
            other => panic!("Expected CorruptData error, got {:?}", other),
        }

        let mut data = populated_chunk(6).serialize();
        data.truncate(SERIALIZED_CHUNK_SIZE - 1);
        assert!(matches!(
            ChunkSerializer.deserialize(&data),
            Err(PersistenceError::CorruptData(_))
        ));
    }

    #[test]
    fn test_corruption_detection_invalid_version() {
        let mut data = populated_chunk(7).serialize();
        data[4..8].copy_from_slice(&999u32.to_le_bytes());
        match ChunkSerializer.deserialize(&data) {
            Err(PersistenceError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, CHUNK_FORMAT_VERSION);
                assert_eq!(found, 999);
            }
            other => panic!("Expected VersionMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_checksum_mismatch() {
        let mut data = populated_chunk(8).serialize();
        let last = data.len() - 1;
        data[last] = data[last].wrapping_add(1);
        match ChunkSerializer.deserialize(&data) {
            Err(PersistenceError::CorruptData(msg)) => assert!(msg.contains("Checksum mismatch")),
            other => panic!("Expected CorruptData error, got {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_bad_type_index_with_valid_checksum() {
        let mut data = CompressedChunk::new(ChunkPos::ORIGIN).serialize();
        data[HEADER_SIZE + OFFSET_BLOCK_TYPES] = 42;
        let checksum = calculate_checksum(&data[HEADER_SIZE..]);
        data[8..12].copy_from_slice(&checksum.to_le_bytes());
        match ChunkSerializer.deserialize(&data) {
            Err(PersistenceError::CorruptData(msg)) => assert!(msg.contains("block type index")),
            other => panic!("Expected CorruptData error, got {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_live_count_mismatch() {
        let mut data = CompressedChunk::new(ChunkPos::ORIGIN).serialize();
        data[HEADER_SIZE + OFFSET_LIVE_COUNT] = 3;
        let checksum = calculate_checksum(&data[HEADER_SIZE..]);
        data[8..12].copy_from_slice(&checksum.to_le_bytes());
        assert!(matches!(
            ChunkSerializer.deserialize(&data),
            Err(PersistenceError::CorruptData(_))
        ));
    }
}
