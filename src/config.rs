//! Runtime configuration loaded from TOML.
//!
//! ```toml
//! store_dir = "saves"
//!
//! [manager]
//! max_resident_chunks = 256
//! render_distance = 6
//! auto_save_interval_secs = 60
//!
//! [generator]
//! seed = 42
//! spawn_chunk = { x = 0, y = 0, z = 0 }
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::world::generation::GeneratorConfig;
use crate::world::management::ChunkManagerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub manager: ChunkManagerConfig,
    pub generator: GeneratorConfig,
    /// Root directory of the on-disk store
    pub store_dir: PathBuf,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            manager: ChunkManagerConfig::default(),
            generator: GeneratorConfig::default(),
            store_dir: PathBuf::from("worlds"),
        }
    }
}

impl WorldConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("[WorldConfig::load] Loaded config from {:?}", path);
        Ok(config)
    }
}
