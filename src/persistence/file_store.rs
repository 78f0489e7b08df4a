//! Directory-on-disk [`ChunkStore`].
//!
//! Layout under the root directory:
//!
//! ```text
//! world_<id>/world.json         world metadata (JSON)
//! world_<id>/palette.bin        probability palette (bincode)
//! world_<id>/chunks/X_Y_Z.chunk serialized chunks
//! ```
//!
//! Every file is written to a `.tmp` sibling first and renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::persistence::metadata::{WorldId, WorldMetadata, WorldSettings};
use crate::persistence::store::{ChunkKey, ChunkStore};
use crate::persistence::{PersistenceError, PersistenceResult};
use crate::world::core::ChunkPos;

const WORLD_DIR_PREFIX: &str = "world_";
const METADATA_FILE: &str = "world.json";
const PALETTE_FILE: &str = "palette.bin";
const CHUNKS_DIR: &str = "chunks";
const CHUNK_EXTENSION: &str = "chunk";

#[derive(Debug)]
pub struct FileChunkStore {
    root: PathBuf,
    next_world_id: AtomicU64,
}

impl FileChunkStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> PersistenceResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let existing = scan_world_ids(&root).await?;
        let highest = existing.iter().map(|id| id.0).max().unwrap_or(0);

        log::info!(
            "[FileChunkStore::open] Opened store at {:?} ({} worlds)",
            root,
            existing.len()
        );

        Ok(Self {
            root,
            next_world_id: AtomicU64::new(highest + 1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn world_dir(&self, world: WorldId) -> PathBuf {
        self.root.join(format!("{}{}", WORLD_DIR_PREFIX, world.0))
    }

    fn chunk_path(&self, key: ChunkKey) -> PathBuf {
        self.world_dir(key.world).join(CHUNKS_DIR).join(format!(
            "{}_{}_{}.{}",
            key.pos.x, key.pos.y, key.pos.z, CHUNK_EXTENSION
        ))
    }

    async fn require_world(&self, world: WorldId) -> PersistenceResult<()> {
        let metadata_path = self.world_dir(world).join(METADATA_FILE);
        if tokio::fs::try_exists(&metadata_path).await? {
            Ok(())
        } else {
            Err(PersistenceError::WorldNotFound(world))
        }
    }
}

/// Write to a temporary file first, then rename over the target
async fn write_atomic(path: &Path, data: &[u8]) -> PersistenceResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, data).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Read a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> PersistenceResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn scan_world_ids(root: &Path) -> PersistenceResult<Vec<WorldId>> {
    let mut ids = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(id) = name
            .strip_prefix(WORLD_DIR_PREFIX)
            .and_then(|rest| rest.parse::<u64>().ok())
        {
            ids.push(WorldId(id));
        }
    }
    ids.sort();
    Ok(ids)
}

fn parse_chunk_file_name(name: &str) -> Option<ChunkPos> {
    let stem = name.strip_suffix(CHUNK_EXTENSION)?.strip_suffix('.')?;
    let mut parts = stem.split('_');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(ChunkPos::new(x, y, z))
}

impl ChunkStore for FileChunkStore {
    async fn load_chunk(&self, key: ChunkKey) -> PersistenceResult<Option<Vec<u8>>> {
        read_optional(&self.chunk_path(key)).await
    }

    async fn save_chunk(&self, key: ChunkKey, data: Vec<u8>) -> PersistenceResult<()> {
        self.require_world(key.world).await?;
        write_atomic(&self.chunk_path(key), &data).await
    }

    async fn save_chunks_bulk(
        &self,
        world: WorldId,
        chunks: Vec<(ChunkPos, Vec<u8>)>,
    ) -> PersistenceResult<()> {
        self.require_world(world).await?;
        let count = chunks.len();
        for (pos, data) in chunks {
            write_atomic(&self.chunk_path(ChunkKey::new(world, pos)), &data).await?;
        }
        log::debug!(
            "[FileChunkStore::save_chunks_bulk] Wrote {} chunks for {}",
            count,
            world
        );
        Ok(())
    }

    async fn list_chunk_keys(&self, world: WorldId) -> PersistenceResult<Vec<ChunkKey>> {
        let dir = self.world_dir(world).join(CHUNKS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(pos) = name.to_str().and_then(parse_chunk_file_name) {
                keys.push(ChunkKey::new(world, pos));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn create_world(
        &self,
        name: &str,
        settings: WorldSettings,
    ) -> PersistenceResult<WorldMetadata> {
        let id = WorldId(self.next_world_id.fetch_add(1, Ordering::SeqCst));
        let metadata = WorldMetadata::new(id, name, settings);
        let json = serde_json::to_vec_pretty(&metadata)?;
        let dir = self.world_dir(id);
        tokio::fs::create_dir_all(dir.join(CHUNKS_DIR)).await?;
        write_atomic(&dir.join(METADATA_FILE), &json).await?;

        log::info!(
            "[FileChunkStore::create_world] Created {} '{}' at {:?}",
            id,
            name,
            dir
        );
        Ok(metadata)
    }

    async fn load_world(&self, world: WorldId) -> PersistenceResult<Option<WorldMetadata>> {
        match read_optional(&self.world_dir(world).join(METADATA_FILE)).await? {
            Some(json) => Ok(Some(serde_json::from_slice(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_worlds(&self) -> PersistenceResult<Vec<WorldMetadata>> {
        let mut worlds = Vec::new();
        for id in scan_world_ids(&self.root).await? {
            match self.load_world(id).await {
                Ok(Some(metadata)) => worlds.push(metadata),
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        "[FileChunkStore::list_worlds] Skipping unreadable {}: {}",
                        id,
                        e
                    );
                }
            }
        }
        Ok(worlds)
    }

    async fn delete_world(&self, world: WorldId) -> PersistenceResult<bool> {
        match tokio::fs::remove_dir_all(self.world_dir(world)).await {
            Ok(()) => {
                log::info!("[FileChunkStore::delete_world] Deleted {}", world);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_palette(&self, world: WorldId, data: Vec<u8>) -> PersistenceResult<()> {
        self.require_world(world).await?;
        write_atomic(&self.world_dir(world).join(PALETTE_FILE), &data).await
    }

    async fn load_palette(&self, world: WorldId) -> PersistenceResult<Option<Vec<u8>>> {
        read_optional(&self.world_dir(world).join(PALETTE_FILE)).await
    }
}
