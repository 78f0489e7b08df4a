//! Deduplicating palette of probability tables.
//!
//! Storing three full distributions per block would dwarf the rest of a
//! chunk, so chunks store a `u16` palette id instead. Id 0 is reserved and
//! resolves to the block type's default tables.

use rustc_hash::FxHashMap;

use crate::persistence::{PersistenceError, PersistenceResult};
use crate::world::block::{BlockMetadata, BlockType};
use crate::world::probability::DirectionalProbabilities;

pub type PaletteId = u16;

/// Id meaning "use the block type's default tables"
pub const RESERVED_PALETTE_ID: PaletteId = 0;

type PatternKey = [[u64; BlockType::COUNT]; 3];

/// Maps small ids to shared [`DirectionalProbabilities`]
#[derive(Debug, Clone, Default)]
pub struct ProbabilityPalette {
    /// Entry `i` has id `i + 1`
    entries: Vec<DirectionalProbabilities>,
    reverse_map: FxHashMap<PatternKey, PaletteId>,
}

impl ProbabilityPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id of an equal table set, inserting it if unseen.
    ///
    /// Returns the reserved id once the palette is full; the block then falls
    /// back to its type defaults.
    pub fn get_or_insert(&mut self, tables: &DirectionalProbabilities) -> PaletteId {
        let key = tables.bit_pattern();
        if let Some(&id) = self.reverse_map.get(&key) {
            return id;
        }

        if self.entries.len() >= PaletteId::MAX as usize {
            log::warn!(
                "[palette::get_or_insert] Palette full ({} entries), falling back to type defaults",
                self.entries.len()
            );
            return RESERVED_PALETTE_ID;
        }

        self.entries.push(*tables);
        let id = self.entries.len() as PaletteId;
        self.reverse_map.insert(key, id);
        id
    }

    /// Palette id to store for a block. Type-default tables use the reserved id.
    pub fn id_for(&mut self, metadata: &BlockMetadata) -> PaletteId {
        if metadata.probabilities == DirectionalProbabilities::for_type(metadata.block_type) {
            RESERVED_PALETTE_ID
        } else {
            self.get_or_insert(&metadata.probabilities)
        }
    }

    pub fn get(&self, id: PaletteId) -> Option<&DirectionalProbabilities> {
        if id == RESERVED_PALETTE_ID {
            return None;
        }
        self.entries.get(id as usize - 1)
    }

    /// Tables for a stored cell; unknown ids resolve to the type defaults
    pub fn resolve(&self, id: PaletteId, block_type: BlockType) -> DirectionalProbabilities {
        match self.get(id) {
            Some(tables) => *tables,
            None => {
                if id != RESERVED_PALETTE_ID {
                    log::debug!(
                        "[palette::resolve] Unknown palette id {}, using {} defaults",
                        id,
                        block_type
                    );
                }
                DirectionalProbabilities::for_type(block_type)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.reverse_map.clear();
    }

    pub fn to_bytes(&self) -> PersistenceResult<Vec<u8>> {
        Ok(bincode::serialize(&self.entries)?)
    }

    pub fn from_bytes(data: &[u8]) -> PersistenceResult<Self> {
        let entries: Vec<DirectionalProbabilities> = bincode::deserialize(data)
            .map_err(|e| PersistenceError::CorruptData(format!("palette: {}", e)))?;
        if entries.len() > PaletteId::MAX as usize {
            return Err(PersistenceError::CorruptData(format!(
                "palette has {} entries, maximum is {}",
                entries.len(),
                PaletteId::MAX
            )));
        }

        let mut palette = Self::new();
        for tables in &entries {
            if !tables.is_normalized() {
                return Err(PersistenceError::CorruptData(
                    "palette entry does not total 100".to_string(),
                ));
            }
            palette.entries.push(*tables);
            let id = palette.entries.len() as PaletteId;
            palette.reverse_map.entry(tables.bit_pattern()).or_insert(id);
        }
        Ok(palette)
    }
}
