//! Abstract asynchronous persistence backend.
//!
//! The chunk manager only ever talks to a [`ChunkStore`]. Every call is
//! awaited once and never retried here; retry policy belongs to the caller
//! (dirty chunks simply stay dirty) and timeouts belong to the backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::persistence::metadata::{WorldId, WorldMetadata, WorldSettings};
use crate::persistence::PersistenceResult;
use crate::world::core::ChunkPos;

/// Storage key of a chunk: world id plus chunk coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub world: WorldId,
    pub pos: ChunkPos,
}

impl ChunkKey {
    pub fn new(world: WorldId, pos: ChunkPos) -> Self {
        Self { world, pos }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}_{}_{}", self.world, self.pos.x, self.pos.y, self.pos.z)
    }
}

/// Persistent key-value backend for chunks and worlds
pub trait ChunkStore: Send + Sync {
    /// Serialized chunk bytes, or `None` if the chunk was never saved
    fn load_chunk(&self, key: ChunkKey)
        -> impl Future<Output = PersistenceResult<Option<Vec<u8>>>> + Send;

    fn save_chunk(&self, key: ChunkKey, data: Vec<u8>)
        -> impl Future<Output = PersistenceResult<()>> + Send;

    /// Save many chunks of one world. Fails as a whole if any entry fails.
    fn save_chunks_bulk(
        &self,
        world: WorldId,
        chunks: Vec<(ChunkPos, Vec<u8>)>,
    ) -> impl Future<Output = PersistenceResult<()>> + Send;

    fn list_chunk_keys(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Vec<ChunkKey>>> + Send;

    fn create_world(
        &self,
        name: &str,
        settings: WorldSettings,
    ) -> impl Future<Output = PersistenceResult<WorldMetadata>> + Send;

    fn load_world(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Option<WorldMetadata>>> + Send;

    fn list_worlds(&self) -> impl Future<Output = PersistenceResult<Vec<WorldMetadata>>> + Send;

    /// Delete a world and every chunk stored under it. Returns whether it existed.
    fn delete_world(&self, world: WorldId) -> impl Future<Output = PersistenceResult<bool>> + Send;

    /// Store the world's encoded probability palette
    fn save_palette(&self, world: WorldId, data: Vec<u8>)
        -> impl Future<Output = PersistenceResult<()>> + Send;

    fn load_palette(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Option<Vec<u8>>>> + Send;
}

/// Lets a store be shared between a manager and other owners
impl<T: ChunkStore> ChunkStore for Arc<T> {
    fn load_chunk(&self, key: ChunkKey)
        -> impl Future<Output = PersistenceResult<Option<Vec<u8>>>> + Send {
        (**self).load_chunk(key)
    }

    fn save_chunk(&self, key: ChunkKey, data: Vec<u8>)
        -> impl Future<Output = PersistenceResult<()>> + Send {
        (**self).save_chunk(key, data)
    }

    fn save_chunks_bulk(
        &self,
        world: WorldId,
        chunks: Vec<(ChunkPos, Vec<u8>)>,
    ) -> impl Future<Output = PersistenceResult<()>> + Send {
        (**self).save_chunks_bulk(world, chunks)
    }

    fn list_chunk_keys(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Vec<ChunkKey>>> + Send {
        (**self).list_chunk_keys(world)
    }

    fn create_world(
        &self,
        name: &str,
        settings: WorldSettings,
    ) -> impl Future<Output = PersistenceResult<WorldMetadata>> + Send {
        (**self).create_world(name, settings)
    }

    fn load_world(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Option<WorldMetadata>>> + Send {
        (**self).load_world(world)
    }

    fn list_worlds(&self) -> impl Future<Output = PersistenceResult<Vec<WorldMetadata>>> + Send {
        (**self).list_worlds()
    }

    fn delete_world(&self, world: WorldId) -> impl Future<Output = PersistenceResult<bool>> + Send {
        (**self).delete_world(world)
    }

    fn save_palette(&self, world: WorldId, data: Vec<u8>)
        -> impl Future<Output = PersistenceResult<()>> + Send {
        (**self).save_palette(world, data)
    }

    fn load_palette(&self, world: WorldId)
        -> impl Future<Output = PersistenceResult<Option<Vec<u8>>>> + Send {
        (**self).load_palette(world)
    }
}
