//! In-memory [`ChunkStore`].
//!
//! Used by tests and by hosts that persist elsewhere. Failures can be
//! switched on to exercise the retry paths, and every save is recorded.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::persistence::metadata::{WorldId, WorldMetadata, WorldSettings};
use crate::persistence::store::{ChunkKey, ChunkStore};
use crate::persistence::{PersistenceError, PersistenceResult};
use crate::world::core::ChunkPos;

#[derive(Debug, Default)]
struct MemoryState {
    chunks: HashMap<ChunkKey, Vec<u8>>,
    worlds: BTreeMap<WorldId, WorldMetadata>,
    palettes: HashMap<WorldId, Vec<u8>>,
    /// Every key passed to a successful save, in call order
    save_log: Vec<ChunkKey>,
}

/// Counters of backend calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub single_saves: usize,
    pub bulk_saves: usize,
    pub loads: usize,
}

#[derive(Debug)]
pub struct MemoryChunkStore {
    state: Mutex<MemoryState>,
    next_world_id: AtomicU64,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    single_saves: AtomicUsize,
    bulk_saves: AtomicUsize,
    loads: AtomicUsize,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_world_id: AtomicU64::new(1),
            fail_saves: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            single_saves: AtomicUsize::new(0),
            bulk_saves: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    /// Make every save report `BackendUnavailable` until switched off
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            single_saves: self.single_saves.load(Ordering::SeqCst),
            bulk_saves: self.bulk_saves.load(Ordering::SeqCst),
            loads: self.loads.load(Ordering::SeqCst),
        }
    }

    /// Keys written so far, one entry per chunk per successful save
    pub fn save_log(&self) -> Vec<ChunkKey> {
        self.state.lock().save_log.clone()
    }

    pub fn contains_chunk(&self, key: ChunkKey) -> bool {
        self.state.lock().chunks.contains_key(&key)
    }

    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// Overwrite stored bytes directly, bypassing the save path
    pub fn insert_raw(&self, key: ChunkKey, data: Vec<u8>) {
        self.state.lock().chunks.insert(key, data);
    }

    fn check_saves(&self) -> PersistenceResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            Err(PersistenceError::BackendUnavailable(
                "memory store rejecting writes".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_world(state: &MemoryState, world: WorldId) -> PersistenceResult<()> {
        if state.worlds.contains_key(&world) {
            Ok(())
        } else {
            Err(PersistenceError::WorldNotFound(world))
        }
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MemoryChunkStore {
    async fn load_chunk(&self, key: ChunkKey) -> PersistenceResult<Option<Vec<u8>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::BackendUnavailable(
                "memory store rejecting reads".to_string(),
            ));
        }
        Ok(self.state.lock().chunks.get(&key).cloned())
    }

    async fn save_chunk(&self, key: ChunkKey, data: Vec<u8>) -> PersistenceResult<()> {
        self.check_saves()?;
        let mut state = self.state.lock();
        Self::check_world(&state, key.world)?;
        state.chunks.insert(key, data);
        state.save_log.push(key);
        self.single_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_chunks_bulk(
        &self,
        world: WorldId,
        chunks: Vec<(ChunkPos, Vec<u8>)>,
    ) -> PersistenceResult<()> {
        self.check_saves()?;
        let mut state = self.state.lock();
        Self::check_world(&state, world)?;
        for (pos, data) in chunks {
            let key = ChunkKey::new(world, pos);
            state.chunks.insert(key, data);
            state.save_log.push(key);
        }
        self.bulk_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_chunk_keys(&self, world: WorldId) -> PersistenceResult<Vec<ChunkKey>> {
        let state = self.state.lock();
        let mut keys: Vec<ChunkKey> = state
            .chunks
            .keys()
            .filter(|key| key.world == world)
            .copied()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn create_world(
        &self,
        name: &str,
        settings: WorldSettings,
    ) -> PersistenceResult<WorldMetadata> {
        self.check_saves()?;
        let id = WorldId(self.next_world_id.fetch_add(1, Ordering::SeqCst));
        let metadata = WorldMetadata::new(id, name, settings);
        self.state.lock().worlds.insert(id, metadata.clone());
        Ok(metadata)
    }

    async fn load_world(&self, world: WorldId) -> PersistenceResult<Option<WorldMetadata>> {
        Ok(self.state.lock().worlds.get(&world).cloned())
    }

    async fn list_worlds(&self) -> PersistenceResult<Vec<WorldMetadata>> {
        Ok(self.state.lock().worlds.values().cloned().collect())
    }

    async fn delete_world(&self, world: WorldId) -> PersistenceResult<bool> {
        let mut state = self.state.lock();
        let existed = state.worlds.remove(&world).is_some();
        state.chunks.retain(|key, _| key.world != world);
        state.palettes.remove(&world);
        Ok(existed)
    }

    async fn save_palette(&self, world: WorldId, data: Vec<u8>) -> PersistenceResult<()> {
        self.check_saves()?;
        let mut state = self.state.lock();
        Self::check_world(&state, world)?;
        state.palettes.insert(world, data);
        Ok(())
    }

    async fn load_palette(&self, world: WorldId) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.state.lock().palettes.get(&world).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_are_namespaced_by_world() {
        let store = MemoryChunkStore::new();
        let a = store.create_world("a", WorldSettings::default()).await.unwrap();
        let b = store.create_world("b", WorldSettings::default()).await.unwrap();
        let pos = ChunkPos::new(1, 2, 3);

        store.save_chunk(ChunkKey::new(a.id, pos), vec![1]).await.unwrap();
        store.save_chunk(ChunkKey::new(b.id, pos), vec![2]).await.unwrap();

        assert_eq!(store.load_chunk(ChunkKey::new(a.id, pos)).await.unwrap(), Some(vec![1]));
        assert_eq!(store.load_chunk(ChunkKey::new(b.id, pos)).await.unwrap(), Some(vec![2]));
        assert_eq!(store.list_chunk_keys(a.id).await.unwrap(), vec![ChunkKey::new(a.id, pos)]);
    }

    #[tokio::test]
    async fn test_delete_world_cascades_to_chunks() {
        let store = MemoryChunkStore::new();
        let world = store.create_world("doomed", WorldSettings::default()).await.unwrap();
        store
            .save_chunks_bulk(world.id, vec![(ChunkPos::ORIGIN, vec![0]), (ChunkPos::new(1, 0, 0), vec![1])])
            .await
            .unwrap();
        assert_eq!(store.chunk_count(), 2);

        assert!(store.delete_world(world.id).await.unwrap());
        assert_eq!(store.chunk_count(), 0);
        assert!(store.load_world(world.id).await.unwrap().is_none());
        assert!(!store.delete_world(world.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryChunkStore::new();
        let world = store.create_world("w", WorldSettings::default()).await.unwrap();
        store.set_fail_saves(true);
        let result = store.save_chunk(ChunkKey::new(world.id, ChunkPos::ORIGIN), vec![]).await;
        assert!(matches!(result, Err(PersistenceError::BackendUnavailable(_))));
        assert!(store.save_log().is_empty());

        store.set_fail_saves(false);
        store.save_chunk(ChunkKey::new(world.id, ChunkPos::ORIGIN), vec![]).await.unwrap();
        assert_eq!(store.stats().single_saves, 1);
    }

    #[tokio::test]
    async fn test_saving_into_unknown_world_fails() {
        let store = MemoryChunkStore::new();
        let result = store.save_chunk(ChunkKey::new(WorldId(42), ChunkPos::ORIGIN), vec![]).await;
        assert!(matches!(result, Err(PersistenceError::WorldNotFound(WorldId(42)))));
    }
}
