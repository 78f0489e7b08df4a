//! Working-set management: loading, eviction, saving and world lifecycle

mod chunk_manager;
mod metrics;

#[cfg(feature = "native")]
pub use chunk_manager::run_auto_save;
pub use chunk_manager::{ChunkManager, ChunkManagerConfig, ChunkManagerStats};
pub use metrics::{ChunkMetrics, MetricsSnapshot};
