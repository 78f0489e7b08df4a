//! Bounded working set of chunks backed by a [`ChunkStore`].
//!
//! The manager is the only owner of resident chunks: at most one instance per
//! chunk coordinate exists, every mutation goes through `&mut self`, and the
//! backend is only reached through awaited store calls. Mutated chunks are
//! tracked as dirty until a save succeeds; eviction never drops a dirty chunk
//! whose save failed.

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::management::{
    DEFAULT_AUTO_SAVE_INTERVAL_SECS, DEFAULT_BULK_SAVE_THRESHOLD, DEFAULT_MAX_RESIDENT_CHUNKS,
    DEFAULT_RENDER_DISTANCE,
};
use crate::persistence::{
    ChunkKey, ChunkStore, PersistenceError, WorldId, WorldMetadata, WorldSettings,
};
use crate::world::block::{Block, BlockMetadata};
use crate::world::core::{ChunkPos, LocalPos, VoxelPos};
use crate::world::error::{WorldError, WorldResult};
use crate::world::generation::{GenerationResult, GeneratorConfig, ProceduralGenerator};
use crate::world::management::metrics::ChunkMetrics;
use crate::world::palette::{PaletteId, ProbabilityPalette, RESERVED_PALETTE_ID};
use crate::world::storage::CompressedChunk;

/// Name given to the world created when a requested world cannot be loaded
const RECOVERY_WORLD_NAME: &str = "New World";

/// Chunk management configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkManagerConfig {
    /// Resident chunk ceiling; eviction brings the count back down to it
    pub max_resident_chunks: usize,
    /// Visibility radius in chunks (spherical)
    pub render_distance: i32,
    /// Dirty counts above this use a single bulk backend call
    pub bulk_save_threshold: usize,
    pub auto_save_interval_secs: u64,
}

impl ChunkManagerConfig {
    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval_secs)
    }
}

impl Default for ChunkManagerConfig {
    fn default() -> Self {
        Self {
            max_resident_chunks: DEFAULT_MAX_RESIDENT_CHUNKS,
            render_distance: DEFAULT_RENDER_DISTANCE,
            bulk_save_threshold: DEFAULT_BULK_SAVE_THRESHOLD,
            auto_save_interval_secs: DEFAULT_AUTO_SAVE_INTERVAL_SECS,
        }
    }
}

/// Snapshot of the working set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkManagerStats {
    pub resident_chunks: usize,
    pub dirty_chunks: usize,
    pub empty_chunks: usize,
    pub palette_entries: usize,
    pub world: Option<WorldId>,
}

pub struct ChunkManager<S: ChunkStore> {
    store: S,
    config: ChunkManagerConfig,
    /// Generator settings before per-world overrides
    base_generator: GeneratorConfig,
    generator: ProceduralGenerator,
    metrics: Arc<ChunkMetrics>,
    chunks: FxHashMap<ChunkPos, CompressedChunk>,
    dirty: BTreeSet<ChunkPos>,
    palette: ProbabilityPalette,
    palette_dirty: bool,
    world: Option<WorldMetadata>,
    last_save: Instant,
}

impl<S: ChunkStore> std::fmt::Debug for ChunkManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("config", &self.config)
            .field("world", &self.world.as_ref().map(|w| w.id))
            .field("resident_chunks", &self.chunks.len())
            .field("dirty_chunks", &self.dirty.len())
            .field("palette_entries", &self.palette.len())
            .finish()
    }
}

impl<S: ChunkStore> ChunkManager<S> {
    /// Create a manager with its own metrics collector and no active world
    pub fn new(store: S, config: ChunkManagerConfig, generator: GeneratorConfig) -> Self {
        Self::with_metrics(store, config, generator, Arc::new(ChunkMetrics::new()))
    }

    pub fn with_metrics(
        store: S,
        config: ChunkManagerConfig,
        generator: GeneratorConfig,
        metrics: Arc<ChunkMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            base_generator: generator,
            generator: ProceduralGenerator::new(generator),
            metrics,
            chunks: FxHashMap::default(),
            dirty: BTreeSet::new(),
            palette: ProbabilityPalette::new(),
            palette_dirty: false,
            world: None,
            last_save: Instant::now(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ChunkManagerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ChunkMetrics> {
        &self.metrics
    }

    pub fn generator(&self) -> &ProceduralGenerator {
        &self.generator
    }

    pub fn palette(&self) -> &ProbabilityPalette {
        &self.palette
    }

    pub fn active_world(&self) -> Option<&WorldMetadata> {
        self.world.as_ref()
    }

    pub fn render_distance(&self) -> i32 {
        self.config.render_distance
    }

    pub fn set_render_distance(&mut self, distance: i32) {
        self.config.render_distance = distance.max(0);
    }

    /// Instant of the last successful full flush
    pub fn last_save(&self) -> Instant {
        self.last_save
    }

    pub fn is_resident(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    /// Resident chunk coordinates, sorted
    pub fn resident_positions(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        positions.sort();
        positions
    }

    /// A resident chunk, without loading or touching it
    pub fn resident_chunk(&self, pos: ChunkPos) -> Option<&CompressedChunk> {
        self.chunks.get(&pos)
    }

    /// Mutable access to a resident chunk without loading it.
    ///
    /// Changes made through it are picked up by the next save via the chunk's
    /// own dirty flag.
    pub fn resident_chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut CompressedChunk> {
        self.chunks.get_mut(&pos)
    }

    /// Coordinates with unsaved changes, sorted
    pub fn dirty_positions(&self) -> Vec<ChunkPos> {
        self.collect_dirty().into_iter().collect()
    }

    pub fn stats(&self) -> ChunkManagerStats {
        ChunkManagerStats {
            resident_chunks: self.chunks.len(),
            dirty_chunks: self.collect_dirty().len(),
            empty_chunks: self.chunks.values().filter(|c| c.is_empty()).count(),
            palette_entries: self.palette.len(),
            world: self.world.as_ref().map(|w| w.id),
        }
    }

    fn world_id(&self) -> Option<WorldId> {
        self.world.as_ref().map(|w| w.id)
    }

    fn active_world_id(&self) -> WorldResult<WorldId> {
        self.world_id().ok_or(WorldError::NoActiveWorld)
    }

    fn collect_dirty(&self) -> BTreeSet<ChunkPos> {
        let mut dirty = self.dirty.clone();
        dirty.extend(
            self.chunks
                .iter()
                .filter(|(_, chunk)| chunk.is_dirty())
                .map(|(pos, _)| *pos),
        );
        dirty
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Read a chunk from the backend, or a fresh empty one if it was never saved
    async fn fetch_chunk(&self, pos: ChunkPos) -> WorldResult<CompressedChunk> {
        let Some(world) = self.world_id() else {
            self.metrics.record_created();
            return Ok(CompressedChunk::new(pos));
        };

        let bytes = match self.store.load_chunk(ChunkKey::new(world, pos)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[ChunkManager::fetch_chunk] Failed to load chunk {}: {}", pos, e);
                self.metrics.record_load_failure();
                return Err(e.into());
            }
        };

        let Some(bytes) = bytes else {
            self.metrics.record_created();
            return Ok(CompressedChunk::new(pos));
        };

        let mut chunk = match CompressedChunk::deserialize(&bytes) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!(
                    "[ChunkManager::fetch_chunk] Stored chunk {} in {} is unreadable: {}",
                    pos,
                    world,
                    e
                );
                self.metrics.record_corrupt();
                return Err(e.into());
            }
        };

        if chunk.position() != pos {
            log::error!(
                "[ChunkManager::fetch_chunk] Stored chunk under {} claims position {}",
                pos,
                chunk.position()
            );
            self.metrics.record_corrupt();
            return Err(PersistenceError::CorruptData(format!(
                "chunk stored at {} has position {}",
                pos,
                chunk.position()
            ))
            .into());
        }

        // The stored copy is what we just read, so nothing is unsaved
        chunk.mark_clean();
        chunk.touch();
        self.metrics.record_loaded();
        Ok(chunk)
    }

    /// Make `pos` resident without enforcing the ceiling
    async fn ensure_resident(&mut self, pos: ChunkPos) -> WorldResult<()> {
        if let Some(chunk) = self.chunks.get_mut(&pos) {
            chunk.touch();
            self.metrics.record_hit();
            return Ok(());
        }

        self.metrics.record_miss();
        let chunk = self.fetch_chunk(pos).await?;
        self.chunks.insert(pos, chunk);
        Ok(())
    }

    async fn make_resident(&mut self, pos: ChunkPos) -> WorldResult<()> {
        self.ensure_resident(pos).await?;
        self.enforce_limit(Some(pos)).await;
        Ok(())
    }

    /// Load every non-resident position concurrently. Successful loads are
    /// kept even when others fail; the first failure is returned.
    async fn load_missing(&mut self, positions: &[ChunkPos]) -> WorldResult<usize> {
        let missing: BTreeSet<ChunkPos> = positions
            .iter()
            .filter(|pos| !self.chunks.contains_key(pos))
            .copied()
            .collect();

        for pos in positions {
            if let Some(chunk) = self.chunks.get_mut(pos) {
                chunk.touch();
                self.metrics.record_hit();
            }
        }
        if missing.is_empty() {
            return Ok(0);
        }

        let results = {
            let this = &*self;
            join_all(missing.iter().map(move |&pos| async move {
                this.metrics.record_miss();
                (pos, this.fetch_chunk(pos).await)
            }))
            .await
        };

        let mut loaded = 0;
        let mut first_error = None;
        for (pos, result) in results {
            match result {
                Ok(chunk) => {
                    self.chunks.insert(pos, chunk);
                    loaded += 1;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        log::debug!(
            "[ChunkManager::load_missing] Loaded {} of {} missing chunks",
            loaded,
            missing.len()
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(loaded),
        }
    }

    // ---------------------------------------------------------------------
    // Block access
    // ---------------------------------------------------------------------

    /// The chunk at `pos`, loading or creating it first
    pub async fn get_chunk(&mut self, pos: ChunkPos) -> WorldResult<&mut CompressedChunk> {
        self.make_resident(pos).await?;
        Ok(self
            .chunks
            .entry(pos)
            .or_insert_with(|| CompressedChunk::new(pos)))
    }

    pub async fn set_block_at(&mut self, pos: VoxelPos, metadata: BlockMetadata) -> WorldResult<()> {
        let chunk_pos = pos.to_chunk_pos();
        let local = pos.to_local_pos();
        self.make_resident(chunk_pos).await?;
        let palette_id = self.palette_id_for(&metadata);
        self.write_block(chunk_pos, local, &metadata, palette_id);
        Ok(())
    }

    pub async fn get_block_at(&mut self, pos: VoxelPos) -> WorldResult<Option<Block>> {
        let chunk_pos = pos.to_chunk_pos();
        self.make_resident(chunk_pos).await?;
        Ok(self
            .chunks
            .get(&chunk_pos)
            .and_then(|chunk| chunk.get_block(pos.to_local_pos(), &self.palette)))
    }

    /// Reset a block to Air. Returns whether a non-Air block was removed.
    pub async fn remove_block_at(&mut self, pos: VoxelPos) -> WorldResult<bool> {
        let chunk_pos = pos.to_chunk_pos();
        self.make_resident(chunk_pos).await?;
        let removed = self
            .chunks
            .get_mut(&chunk_pos)
            .map(|chunk| chunk.remove_block(pos.to_local_pos()))
            .unwrap_or(false);
        if removed {
            self.dirty.insert(chunk_pos);
        }
        Ok(removed)
    }

    fn palette_id_for(&mut self, metadata: &BlockMetadata) -> PaletteId {
        if metadata.block_type.is_air() {
            return RESERVED_PALETTE_ID;
        }
        let before = self.palette.len();
        let id = self.palette.id_for(metadata);
        if self.palette.len() != before {
            self.palette_dirty = true;
        }
        id
    }

    fn write_block(
        &mut self,
        chunk_pos: ChunkPos,
        local: LocalPos,
        metadata: &BlockMetadata,
        palette_id: PaletteId,
    ) {
        let chunk = self
            .chunks
            .entry(chunk_pos)
            .or_insert_with(|| CompressedChunk::new(chunk_pos));
        if chunk.set_block(local, metadata, palette_id) {
            self.dirty.insert(chunk_pos);
        }
    }

    /// Chunk coordinates within the spherical render distance of `center`
    pub fn chunks_in_render_distance(&self, center: ChunkPos) -> Vec<ChunkPos> {
        let r = self.config.render_distance.max(0);
        let r_sq = (r as i64) * (r as i64);
        let mut positions = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    let pos = center.offset(dx, dy, dz);
                    if center.distance_squared_to(pos) <= r_sq {
                        positions.push(pos);
                    }
                }
            }
        }
        positions
    }

    /// Every non-Air block in the chunks around the player, in world coordinates
    pub async fn get_visible_blocks(&mut self, player_pos: VoxelPos) -> WorldResult<Vec<Block>> {
        let positions = self.chunks_in_render_distance(player_pos.to_chunk_pos());
        self.load_missing(&positions).await?;

        let mut blocks = Vec::new();
        for pos in &positions {
            if let Some(chunk) = self.chunks.get(pos) {
                blocks.extend(chunk.non_air_blocks(&self.palette));
            }
        }

        self.enforce_chunk_limit().await;
        Ok(blocks)
    }

    /// Load many chunks concurrently. Returns how many were not yet resident.
    pub async fn preload_chunks(&mut self, positions: &[ChunkPos]) -> WorldResult<usize> {
        let loaded = self.load_missing(positions).await?;
        self.enforce_chunk_limit().await;
        Ok(loaded)
    }

    /// Run the generator and write its output into the working set
    pub async fn generate_around(
        &mut self,
        seed_pos: VoxelPos,
        radius: i32,
    ) -> WorldResult<GenerationResult> {
        let result = self.generator.generate(seed_pos, radius)?;
        let touched = result.chunks_touched();
        self.load_missing(&touched).await?;

        for block in result.blocks() {
            let palette_id = self.palette_id_for(&block.metadata);
            self.write_block(
                block.position.to_chunk_pos(),
                block.position.to_local_pos(),
                &block.metadata,
                palette_id,
            );
        }
        self.metrics.record_generated(result.len() as u64);

        log::info!(
            "[ChunkManager::generate_around] Applied {} blocks across {} chunks around {}",
            result.len(),
            touched.len(),
            seed_pos
        );

        self.enforce_chunk_limit().await;
        Ok(result)
    }

    /// Generate around `seed_pos` using the active world's generation radius
    pub async fn generate_area(&mut self, seed_pos: VoxelPos) -> WorldResult<GenerationResult> {
        let radius = self
            .world
            .as_ref()
            .map(|world| world.settings.generation_radius)
            .ok_or(WorldError::NoActiveWorld)?;
        self.generate_around(seed_pos, radius).await
    }

    // ---------------------------------------------------------------------
    // Eviction
    // ---------------------------------------------------------------------

    /// Evict down to the resident ceiling. Returns the number evicted.
    pub async fn enforce_chunk_limit(&mut self) -> usize {
        self.enforce_limit(None).await
    }

    async fn enforce_limit(&mut self, keep: Option<ChunkPos>) -> usize {
        let max = self.config.max_resident_chunks;
        if self.chunks.len() <= max {
            return 0;
        }

        // Empty chunks first, then least recently used, then coordinate
        let mut candidates: Vec<(bool, f64, ChunkPos)> = self
            .chunks
            .iter()
            .filter(|(pos, _)| Some(**pos) != keep)
            .map(|(pos, chunk)| (!chunk.is_empty(), chunk.last_accessed(), *pos))
            .collect();
        candidates.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.total_cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        let mut evicted = 0;
        let mut save_failed = false;
        for (_, _, pos) in candidates {
            if self.chunks.len() <= max {
                break;
            }
            let needs_save = self.dirty.contains(&pos)
                || self.chunks.get(&pos).is_some_and(|c| c.is_dirty());
            if needs_save {
                // One failed save is enough to know the backend is refusing writes
                if save_failed {
                    continue;
                }
                if let Err(e) = self.save_chunk(pos).await {
                    if e.is_transient() {
                        log::warn!(
                            "[ChunkManager::enforce_chunk_limit] Keeping dirty chunk {} resident, save failed: {}",
                            pos,
                            e
                        );
                    } else {
                        log::error!(
                            "[ChunkManager::enforce_chunk_limit] Keeping dirty chunk {} resident, save failed: {}",
                            pos,
                            e
                        );
                    }
                    save_failed = true;
                    continue;
                }
            }
            self.chunks.remove(&pos);
            self.dirty.remove(&pos);
            self.metrics.record_evicted();
            evicted += 1;
        }

        if evicted > 0 {
            log::debug!(
                "[ChunkManager::enforce_chunk_limit] Evicted {} chunks, {} resident",
                evicted,
                self.chunks.len()
            );
        }
        evicted
    }

    // ---------------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------------

    async fn save_palette_if_dirty(&mut self, world: WorldId) -> WorldResult<()> {
        if !self.palette_dirty {
            return Ok(());
        }
        let bytes = self.palette.to_bytes()?;
        self.store.save_palette(world, bytes).await?;
        self.palette_dirty = false;
        Ok(())
    }

    /// Save one resident chunk and mark it clean
    async fn save_chunk(&mut self, pos: ChunkPos) -> WorldResult<()> {
        let world = self.active_world_id()?;
        if let Err(e) = self.save_palette_if_dirty(world).await {
            self.metrics.record_save_failure();
            return Err(e);
        }

        let Some(bytes) = self.chunks.get(&pos).map(|chunk| chunk.serialize()) else {
            self.dirty.remove(&pos);
            return Ok(());
        };

        if let Err(e) = self.store.save_chunk(ChunkKey::new(world, pos), bytes).await {
            self.metrics.record_save_failure();
            return Err(e.into());
        }

        if let Some(chunk) = self.chunks.get_mut(&pos) {
            chunk.mark_clean();
        }
        self.dirty.remove(&pos);
        self.metrics.record_saved(1);
        Ok(())
    }

    /// Flush every dirty chunk and the palette.
    ///
    /// Above `bulk_save_threshold` dirty chunks a single bulk call is made,
    /// otherwise one call per chunk. Chunks whose save fails stay dirty.
    pub async fn save_all_chunks(&mut self) -> WorldResult<usize> {
        let world = self.active_world_id()?;
        let dirty = self.collect_dirty();

        if let Err(e) = self.save_palette_if_dirty(world).await {
            log::warn!("[ChunkManager::save_all_chunks] Palette save failed: {}", e);
            self.metrics.record_save_failure();
            return Err(e);
        }

        if dirty.is_empty() {
            self.last_save = Instant::now();
            return Ok(0);
        }

        let saved = if dirty.len() > self.config.bulk_save_threshold {
            let batch: Vec<(ChunkPos, Vec<u8>)> = dirty
                .iter()
                .filter_map(|pos| self.chunks.get(pos).map(|chunk| (*pos, chunk.serialize())))
                .collect();
            let count = batch.len();

            if let Err(e) = self.store.save_chunks_bulk(world, batch).await {
                log::warn!(
                    "[ChunkManager::save_all_chunks] Bulk save of {} chunks failed: {}",
                    count,
                    e
                );
                self.metrics.record_save_failure();
                return Err(e.into());
            }

            for pos in &dirty {
                if let Some(chunk) = self.chunks.get_mut(pos) {
                    chunk.mark_clean();
                }
                self.dirty.remove(pos);
            }
            self.metrics.record_bulk_save();
            self.metrics.record_saved(count as u64);
            count
        } else {
            let mut saved = 0;
            let mut first_error = None;
            for pos in dirty {
                match self.save_chunk(pos).await {
                    Ok(()) => saved += 1,
                    Err(e) => {
                        if e.is_transient() {
                            log::warn!(
                                "[ChunkManager::save_all_chunks] Chunk {} stays dirty: {}",
                                pos,
                                e
                            );
                        } else {
                            log::error!(
                                "[ChunkManager::save_all_chunks] Chunk {} stays dirty: {}",
                                pos,
                                e
                            );
                        }
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
            saved
        };

        self.last_save = Instant::now();
        log::debug!("[ChunkManager::save_all_chunks] Saved {} chunks to {}", saved, world);
        Ok(saved)
    }

    /// Flush if the auto-save interval has elapsed since the last successful
    /// flush. Returns whether a flush was attempted and succeeded.
    pub async fn maybe_auto_save(&mut self) -> WorldResult<bool> {
        if self.world.is_none() || self.last_save.elapsed() < self.config.auto_save_interval() {
            return Ok(false);
        }
        self.save_all_chunks().await?;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // World lifecycle
    // ---------------------------------------------------------------------

    /// Flush the active world, if any, before leaving it
    async fn flush_outgoing(&mut self) -> WorldResult<()> {
        if self.world.is_some() {
            self.save_all_chunks().await?;
        }
        Ok(())
    }

    fn bind(&mut self, metadata: WorldMetadata, palette: ProbabilityPalette) {
        self.chunks.clear();
        self.dirty.clear();
        self.palette = palette;
        self.palette_dirty = false;

        let settings = metadata.settings;
        let generator = self.generator.config_mut();
        generator.seed = settings.seed;
        generator.spawn_chunk = if settings.spawn_platform {
            self.base_generator.spawn_chunk
        } else {
            None
        };
        self.config.render_distance = settings.render_distance.max(0);

        log::info!(
            "[ChunkManager::bind] Active world is now {} '{}'",
            metadata.id,
            metadata.name
        );
        self.world = Some(metadata);
        self.last_save = Instant::now();
    }

    pub async fn create_new_world(
        &mut self,
        name: &str,
        settings: WorldSettings,
    ) -> WorldResult<WorldMetadata> {
        self.flush_outgoing().await?;
        let metadata = self.store.create_world(name, settings).await?;
        self.bind(metadata.clone(), ProbabilityPalette::new());
        Ok(metadata)
    }

    /// Bind to a stored world. Fails if it does not exist or cannot be read.
    pub async fn load_world(&mut self, id: WorldId) -> WorldResult<WorldMetadata> {
        self.flush_outgoing().await?;
        let metadata = self
            .store
            .load_world(id)
            .await?
            .ok_or(PersistenceError::WorldNotFound(id))?;
        let palette = match self.store.load_palette(id).await? {
            Some(bytes) => ProbabilityPalette::from_bytes(&bytes)?,
            None => ProbabilityPalette::new(),
        };
        self.bind(metadata.clone(), palette);
        Ok(metadata)
    }

    /// Flush the current world and bind to `id`.
    ///
    /// If the target cannot be loaded, a fresh world is created and bound
    /// instead; the returned metadata says which world is active. When that
    /// also fails the previous world stays bound with its chunks intact.
    pub async fn switch_to_world(&mut self, id: WorldId) -> WorldResult<WorldMetadata> {
        self.flush_outgoing().await?;
        match self.load_world(id).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                log::warn!(
                    "[ChunkManager::switch_to_world] Could not load {}: {}. Starting a fresh world",
                    id,
                    e
                );
                self.create_new_world(RECOVERY_WORLD_NAME, WorldSettings::default())
                    .await
            }
        }
    }

    /// Drop every resident chunk without saving. Returns how many were dropped.
    pub fn clear_all_chunks(&mut self) -> usize {
        let unsaved = self.collect_dirty().len();
        if unsaved > 0 {
            log::warn!(
                "[ChunkManager::clear_all_chunks] Discarding {} unsaved chunks",
                unsaved
            );
        }
        let count = self.chunks.len();
        self.chunks.clear();
        self.dirty.clear();
        count
    }

    /// Delete a stored world. The active world cannot be deleted.
    pub async fn delete_world(&mut self, id: WorldId) -> WorldResult<bool> {
        if self.world_id() == Some(id) {
            return Err(WorldError::ActiveWorldDeletion(id));
        }
        Ok(self.store.delete_world(id).await?)
    }

    pub async fn list_worlds(&self) -> WorldResult<Vec<WorldMetadata>> {
        Ok(self.store.list_worlds().await?)
    }

    /// Chunk keys the backend holds for the active world
    pub async fn stored_chunk_keys(&self) -> WorldResult<Vec<ChunkKey>> {
        let world = self.active_world_id()?;
        Ok(self.store.list_chunk_keys(world).await?)
    }
}

/// Drive [`ChunkManager::maybe_auto_save`] until `shutdown` turns `true`,
/// then make a final flush.
#[cfg(feature = "native")]
pub async fn run_auto_save<S>(
    manager: Arc<tokio::sync::Mutex<ChunkManager<S>>>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) where
    S: ChunkStore + 'static,
{
    let interval = manager.lock().await.config().auto_save_interval();
    let check_every = interval.clamp(Duration::from_millis(10), Duration::from_secs(1));
    let mut ticker = tokio::time::interval(check_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut manager = manager.lock().await;
                match manager.maybe_auto_save().await {
                    Ok(true) => log::debug!("[run_auto_save] Auto-save complete"),
                    Ok(false) => {}
                    Err(e) if e.is_transient() => {
                        log::warn!("[run_auto_save] Auto-save failed, will retry: {}", e)
                    }
                    Err(e) => log::error!("[run_auto_save] Auto-save failed: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    let mut manager = manager.lock().await;
    if manager.active_world().is_some() {
        if let Err(e) = manager.save_all_chunks().await {
            log::error!("[run_auto_save] Final flush failed: {}", e);
        }
    }
}
