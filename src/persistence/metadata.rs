use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::format::CHUNK_FORMAT_VERSION;
use crate::constants::generation::{DEFAULT_GENERATION_RADIUS, DEFAULT_WORLD_SEED};
use crate::constants::management::DEFAULT_RENDER_DISTANCE;

/// Identifier of a stored world. Chunk keys are namespaced by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world-{}", self.0)
    }
}

/// Settings chosen when a world is created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Seed for the procedural generator
    pub seed: u64,
    /// Render distance in chunks
    pub render_distance: i32,
    /// Emit the fixed spawn pattern when generating the spawn chunk
    pub spawn_platform: bool,
    /// Flood fill radius used for the initial generation pass
    pub generation_radius: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_WORLD_SEED,
            render_distance: DEFAULT_RENDER_DISTANCE,
            spawn_platform: true,
            generation_radius: DEFAULT_GENERATION_RADIUS,
        }
    }
}

/// World metadata containing information about the save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub id: WorldId,
    pub name: String,
    pub settings: WorldSettings,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at: i64,
    /// Chunk format version the world was written with
    pub format_version: u32,
}

impl WorldMetadata {
    pub fn new(id: WorldId, name: impl Into<String>, settings: WorldSettings) -> Self {
        Self {
            id,
            name: name.into(),
            settings,
            created_at: chrono::Utc::now().timestamp_millis(),
            format_version: CHUNK_FORMAT_VERSION,
        }
    }

    pub fn created_at_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.created_at)
            .map(|time| time.to_rfc3339())
            .unwrap_or_else(|| self.created_at.to_string())
    }
}
