//! Counters for chunk management

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Chunk management counters.
///
/// Shared as `Arc<ChunkMetrics>`; the manager records into it and anyone
/// holding a clone can read a [`MetricsSnapshot`].
#[derive(Debug, Default)]
pub struct ChunkMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    chunks_loaded: AtomicU64,
    chunks_created: AtomicU64,
    chunks_evicted: AtomicU64,
    chunks_saved: AtomicU64,
    bulk_saves: AtomicU64,
    save_failures: AtomicU64,
    load_failures: AtomicU64,
    corrupt_chunks: AtomicU64,
    blocks_generated: AtomicU64,
}

/// Point-in-time copy of [`ChunkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub chunks_loaded: u64,
    pub chunks_created: u64,
    pub chunks_evicted: u64,
    pub chunks_saved: u64,
    pub bulk_saves: u64,
    pub save_failures: u64,
    pub load_failures: u64,
    pub corrupt_chunks: u64,
    pub blocks_generated: u64,
}

impl MetricsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl ChunkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A chunk decoded from the backend
    pub fn record_loaded(&self) {
        self.chunks_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// A chunk created empty because the backend had none
    pub fn record_created(&self) {
        self.chunks_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.chunks_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_saved(&self, count: u64) {
        self.chunks_saved.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_bulk_save(&self) {
        self.bulk_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupt(&self) {
        self.corrupt_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generated(&self, blocks: u64) {
        self.blocks_generated.fetch_add(blocks, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            chunks_loaded: self.chunks_loaded.load(Ordering::Relaxed),
            chunks_created: self.chunks_created.load(Ordering::Relaxed),
            chunks_evicted: self.chunks_evicted.load(Ordering::Relaxed),
            chunks_saved: self.chunks_saved.load(Ordering::Relaxed),
            bulk_saves: self.bulk_saves.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            corrupt_chunks: self.corrupt_chunks.load(Ordering::Relaxed),
            blocks_generated: self.blocks_generated.load(Ordering::Relaxed),
        }
    }
}
