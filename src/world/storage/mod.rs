//! In-memory chunk storage

mod compressed_chunk;

pub use compressed_chunk::{CellData, CompressedChunk};
