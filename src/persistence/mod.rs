//! Persistence system for chunks, palettes and world metadata

pub mod chunk_serializer;
pub mod error;
#[cfg(feature = "native")]
pub mod file_store;
pub mod memory_store;
pub mod metadata;
pub mod store;

pub use chunk_serializer::ChunkSerializer;
pub use error::{PersistenceError, PersistenceResult};
#[cfg(feature = "native")]
pub use file_store::FileChunkStore;
pub use memory_store::{MemoryChunkStore, MemoryStoreStats};
pub use metadata::{WorldId, WorldMetadata, WorldSettings};
pub use store::{ChunkKey, ChunkStore};
