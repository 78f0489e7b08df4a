use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::world::core::VoxelPos;
use crate::world::probability::DirectionalProbabilities;

/// The closed set of block types.
///
/// The discriminant is the on-disk type index and also the fixed order used
/// when walking a probability distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    #[default]
    Air = 0,
    Dirt = 1,
    Stone = 2,
    Sand = 3,
    Water = 4,
    Wood = 5,
    Leaves = 6,
}

impl BlockType {
    pub const COUNT: usize = 7;

    pub const ALL: [BlockType; Self::COUNT] = [
        BlockType::Air,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Sand,
        BlockType::Water,
        BlockType::Wood,
        BlockType::Leaves,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Next type in the mutation cycle Air -> Dirt -> ... -> Leaves -> Air
    pub fn next_in_cycle(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    pub fn properties(self) -> BlockProperties {
        use ToolRequirement::*;
        let (hardness, breakable, transparent, tool) = match self {
            BlockType::Air => (0.0, false, true, None),
            BlockType::Dirt => (0.5, true, false, Spade),
            BlockType::Stone => (1.5, true, false, Pickaxe),
            BlockType::Sand => (0.5, true, false, Spade),
            BlockType::Water => (100.0, false, true, None),
            BlockType::Wood => (2.0, true, false, Axe),
            BlockType::Leaves => (0.2, true, true, None),
        };
        BlockProperties {
            hardness,
            breakable,
            transparent,
            tool,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockType::Air => "Air",
            BlockType::Dirt => "Dirt",
            BlockType::Stone => "Stone",
            BlockType::Sand => "Sand",
            BlockType::Water => "Water",
            BlockType::Wood => "Wood",
            BlockType::Leaves => "Leaves",
        };
        f.write_str(name)
    }
}

/// Static per-type defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockProperties {
    pub hardness: f32,
    pub breakable: bool,
    pub transparent: bool,
    pub tool: ToolRequirement,
}

/// Tool needed to break a block. At most one per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolRequirement {
    #[default]
    None,
    Pickaxe,
    Spade,
    Axe,
}

impl ToolRequirement {
    pub fn to_flags(self) -> BlockFlags {
        match self {
            ToolRequirement::None => BlockFlags::empty(),
            ToolRequirement::Pickaxe => BlockFlags::REQUIRES_PICKAXE,
            ToolRequirement::Spade => BlockFlags::REQUIRES_SPADE,
            ToolRequirement::Axe => BlockFlags::REQUIRES_AXE,
        }
    }

    pub fn from_flags(flags: BlockFlags) -> Self {
        if flags.contains(BlockFlags::REQUIRES_PICKAXE) {
            ToolRequirement::Pickaxe
        } else if flags.contains(BlockFlags::REQUIRES_SPADE) {
            ToolRequirement::Spade
        } else if flags.contains(BlockFlags::REQUIRES_AXE) {
            ToolRequirement::Axe
        } else {
            ToolRequirement::None
        }
    }
}

bitflags! {
    /// Per-cell flag byte as stored in a chunk
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BlockFlags: u8 {
        const VISIBLE = 1 << 0;
        const BREAKABLE = 1 << 1;
        const TRANSPARENT = 1 << 2;
        const REQUIRES_PICKAXE = 1 << 3;
        const REQUIRES_SPADE = 1 << 4;
        const REQUIRES_AXE = 1 << 5;
        const TOOL_MASK = Self::REQUIRES_PICKAXE.bits()
            | Self::REQUIRES_SPADE.bits()
            | Self::REQUIRES_AXE.bits();
    }
}

impl BlockFlags {
    pub fn with_visible(self, value: bool) -> Self {
        if value {
            self | Self::VISIBLE
        } else {
            self & !Self::VISIBLE
        }
    }

    pub fn with_breakable(self, value: bool) -> Self {
        if value {
            self | Self::BREAKABLE
        } else {
            self & !Self::BREAKABLE
        }
    }

    pub fn with_transparent(self, value: bool) -> Self {
        if value {
            self | Self::TRANSPARENT
        } else {
            self & !Self::TRANSPARENT
        }
    }

    /// Replaces whatever tool bit was set
    pub fn with_tool(self, tool: ToolRequirement) -> Self {
        (self & !Self::TOOL_MASK) | tool.to_flags()
    }

    pub fn is_visible(&self) -> bool {
        self.contains(Self::VISIBLE)
    }

    pub fn is_breakable(&self) -> bool {
        self.contains(Self::BREAKABLE)
    }

    pub fn is_transparent(&self) -> bool {
        self.contains(Self::TRANSPARENT)
    }

    pub fn tool(&self) -> ToolRequirement {
        ToolRequirement::from_flags(*self)
    }
}

/// Everything known about a block besides where it is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub block_type: BlockType,
    pub probabilities: DirectionalProbabilities,
    pub hardness: f32,
    pub flags: BlockFlags,
    /// Run length of same-typed ancestors, used by the tree rule
    pub consecutive_count: u8,
}

impl BlockMetadata {
    /// Metadata with the type's default properties and probability tables
    pub fn new(block_type: BlockType) -> Self {
        let props = block_type.properties();
        let flags = BlockFlags::empty()
            .with_visible(!block_type.is_air())
            .with_breakable(props.breakable)
            .with_transparent(props.transparent)
            .with_tool(props.tool);
        Self {
            block_type,
            probabilities: DirectionalProbabilities::for_type(block_type),
            hardness: props.hardness,
            flags,
            consecutive_count: 0,
        }
    }

    pub fn air() -> Self {
        Self::new(BlockType::Air)
    }

    pub fn with_probabilities(mut self, probabilities: DirectionalProbabilities) -> Self {
        self.probabilities = probabilities;
        self
    }

    pub fn with_consecutive_count(mut self, count: u8) -> Self {
        self.consecutive_count = count;
        self
    }

    /// Flag byte as stored in a chunk. Air never carries the visible or breakable bits.
    pub fn stored_flags(&self) -> BlockFlags {
        if self.block_type.is_air() {
            self.flags.with_visible(false).with_breakable(false)
        } else {
            self.flags
        }
    }

    pub fn is_breakable(&self) -> bool {
        self.stored_flags().is_breakable()
    }

    pub fn is_transparent(&self) -> bool {
        self.flags.is_transparent()
    }

    pub fn tool_requirement(&self) -> ToolRequirement {
        self.flags.tool()
    }
}

impl Default for BlockMetadata {
    fn default() -> Self {
        Self::air()
    }
}

/// Stable identifier of a block, derived from its world position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKey(pub VoxelPos);

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.0.x, self.0.y, self.0.z)
    }
}

/// A block at a world position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub position: VoxelPos,
    pub metadata: BlockMetadata,
    pub visible: bool,
}

impl Block {
    pub fn new(position: VoxelPos, metadata: BlockMetadata) -> Self {
        let visible = metadata.stored_flags().is_visible();
        Self {
            position,
            metadata,
            visible,
        }
    }

    pub fn id(&self) -> BlockKey {
        BlockKey(self.position)
    }

    pub fn block_type(&self) -> BlockType {
        self.metadata.block_type
    }

    pub fn is_air(&self) -> bool {
        self.metadata.block_type.is_air()
    }
}
