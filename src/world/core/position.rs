//! Coordinate mapping between world space and chunk space.
//!
//! World coordinates are unbounded `i32` triples. A world position splits into
//! the chunk that contains it and a local offset inside that chunk. Both
//! directions use Euclidean division so negative coordinates land in the right
//! chunk: world x = -1 is local x = 15 of chunk x = -1.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::core::{CHUNK_LAYER, CHUNK_SIZE, CHUNK_SIZE_I32, CHUNK_VOLUME};

/// Position of a chunk in the world (chunk coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const ORIGIN: ChunkPos = ChunkPos { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// World position of the chunk's (0, 0, 0) corner
    pub fn min_voxel(&self) -> VoxelPos {
        VoxelPos::new(
            self.x * CHUNK_SIZE_I32,
            self.y * CHUNK_SIZE_I32,
            self.z * CHUNK_SIZE_I32,
        )
    }

    /// Create a new chunk position offset by the given amounts
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Calculate squared distance to another chunk position
    pub fn distance_squared_to(&self, other: ChunkPos) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Position of a voxel in the world (world coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the chunk this voxel belongs to
    pub fn to_chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(
            self.x.div_euclid(CHUNK_SIZE_I32),
            self.y.div_euclid(CHUNK_SIZE_I32),
            self.z.div_euclid(CHUNK_SIZE_I32),
        )
    }

    /// Get local position within chunk
    pub fn to_local_pos(&self) -> LocalPos {
        LocalPos {
            x: self.x.rem_euclid(CHUNK_SIZE_I32) as u8,
            y: self.y.rem_euclid(CHUNK_SIZE_I32) as u8,
            z: self.z.rem_euclid(CHUNK_SIZE_I32) as u8,
        }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// `None` when any component would leave the `i32` range
    pub fn checked_offset(&self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }

    /// Squared Euclidean distance, exact for any pair of positions
    pub fn distance_squared_to(&self, other: VoxelPos) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Position of a block inside its chunk, each component in `0..16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    /// Returns `None` when any component falls outside the chunk
    pub fn new_checked(x: u32, y: u32, z: u32) -> Option<Self> {
        if x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE {
            Some(Self {
                x: x as u8,
                y: y as u8,
                z: z as u8,
            })
        } else {
            None
        }
    }

    pub fn is_in_bounds(&self) -> bool {
        (self.x as u32) < CHUNK_SIZE && (self.y as u32) < CHUNK_SIZE && (self.z as u32) < CHUNK_SIZE
    }

    /// Flat array index: x + y*16 + z*256
    #[inline]
    pub fn index(&self) -> usize {
        self.x as usize + self.y as usize * CHUNK_SIZE as usize + self.z as usize * CHUNK_LAYER
    }

    /// Inverse of [`LocalPos::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= CHUNK_VOLUME {
            return None;
        }
        let size = CHUNK_SIZE as usize;
        Some(Self {
            x: (index % size) as u8,
            y: ((index / size) % size) as u8,
            z: (index / CHUNK_LAYER) as u8,
        })
    }
}

/// Split a world coordinate into its chunk and the local offset inside it
pub fn world_to_chunk(x: i32, y: i32, z: i32) -> (ChunkPos, LocalPos) {
    let pos = VoxelPos::new(x, y, z);
    (pos.to_chunk_pos(), pos.to_local_pos())
}

/// Exact inverse of [`world_to_chunk`]
pub fn chunk_to_world(chunk: ChunkPos, local: LocalPos) -> VoxelPos {
    chunk
        .min_voxel()
        .offset(local.x as i32, local.y as i32, local.z as i32)
}
