//! Probability tables that drive procedural generation.
//!
//! A [`ProbabilityMapping`] is a distribution over every [`BlockType`], stored
//! as percentages that always total 100. Each block carries three of them in a
//! [`DirectionalProbabilities`]: one for neighbors beside it, one for the
//! neighbor above (+Z) and one for the neighbor below (-Z).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::generation::{
    MUTATION_RATE, PROBABILITY_EPSILON, PROBABILITY_TOTAL, TREE_FLAT_REDUCTION,
    TREE_FLAT_REDUCTION_CAP,
};
use crate::world::block::BlockType;

/// Which of a parent's tables applies to a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Horizontal,
    Up,
    Down,
}

impl Direction {
    /// Classify a neighbor offset by its Z component
    pub fn from_offset(dz: i32) -> Self {
        match dz {
            dz if dz > 0 => Direction::Up,
            dz if dz < 0 => Direction::Down,
            _ => Direction::Horizontal,
        }
    }
}

/// Percentages over all block types, indexed by `BlockType::index`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityMapping {
    weights: [f64; BlockType::COUNT],
}

impl ProbabilityMapping {
    /// Builds a mapping and scales it to total 100
    pub fn new(weights: [f64; BlockType::COUNT]) -> Self {
        let mut mapping = Self { weights };
        mapping.renormalize();
        mapping
    }

    /// 100% of a single type
    pub fn certain(block_type: BlockType) -> Self {
        let mut weights = [0.0; BlockType::COUNT];
        weights[block_type.index()] = PROBABILITY_TOTAL;
        Self { weights }
    }

    pub fn weight(&self, block_type: BlockType) -> f64 {
        self.weights[block_type.index()]
    }

    pub fn weights(&self) -> &[f64; BlockType::COUNT] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_normalized(&self) -> bool {
        self.weights.iter().all(|w| *w >= 0.0)
            && (self.total() - PROBABILITY_TOTAL).abs() <= PROBABILITY_EPSILON
    }

    /// Rescale to total 100. Negative or non-finite entries are clamped to
    /// zero first; a mapping with no mass left becomes all Air.
    pub fn renormalize(&mut self) {
        for w in self.weights.iter_mut() {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        let total = self.total();
        if total <= 0.0 {
            *self = Self::certain(BlockType::Air);
            return;
        }
        let scale = PROBABILITY_TOTAL / total;
        for w in self.weights.iter_mut() {
            *w *= scale;
        }
        debug_assert!(self.is_normalized(), "mapping does not total 100: {:?}", self.weights);
    }

    /// Move up to `amount` of mass from one type to another
    pub fn shift(&mut self, from: BlockType, to: BlockType, amount: f64) {
        let moved = amount.clamp(0.0, self.weights[from.index()]);
        self.weights[from.index()] -= moved;
        self.weights[to.index()] += moved;
    }

    /// Cumulative-distribution lookup for a draw `u` in `[0, 100)`.
    ///
    /// Types are walked in their fixed order and the first one whose running
    /// total reaches `u` wins. A draw that slips past the end through
    /// rounding yields Air.
    pub fn sample(&self, u: f64) -> BlockType {
        let mut cumulative = 0.0;
        for block_type in BlockType::ALL {
            cumulative += self.weights[block_type.index()];
            if cumulative >= u {
                return block_type;
            }
        }
        BlockType::Air
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> BlockType {
        self.sample(rng.gen_range(0.0..PROBABILITY_TOTAL))
    }

    /// Shift `MUTATION_RATE` of every type's mass to the next type in the cycle
    pub fn mutated(&self) -> Self {
        let mut next = self.weights;
        for block_type in BlockType::ALL {
            let moved = self.weights[block_type.index()] * MUTATION_RATE;
            next[block_type.index()] -= moved;
            next[block_type.next_in_cycle().index()] += moved;
        }
        let mut mapping = Self { weights: next };
        mapping.renormalize();
        mapping
    }

    /// Bit-exact identity used for palette deduplication
    pub(crate) fn bit_pattern(&self) -> [u64; BlockType::COUNT] {
        self.weights.map(f64::to_bits)
    }
}

/// The three tables a block uses to pick its neighbors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalProbabilities {
    pub horizontal: ProbabilityMapping,
    pub up: ProbabilityMapping,
    pub down: ProbabilityMapping,
}

impl DirectionalProbabilities {
    pub fn new(
        horizontal: ProbabilityMapping,
        up: ProbabilityMapping,
        down: ProbabilityMapping,
    ) -> Self {
        Self {
            horizontal,
            up,
            down,
        }
    }

    pub fn get(&self, direction: Direction) -> &ProbabilityMapping {
        match direction {
            Direction::Horizontal => &self.horizontal,
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Starting tables for a freshly placed block of the given type
    pub fn for_type(block_type: BlockType) -> Self {
        //                 Air   Dirt  Stone Sand  Water Wood  Leaves
        let (horizontal, up, down) = match block_type {
            BlockType::Air => (
                [100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            ),
            BlockType::Dirt => (
                [30.0, 45.0, 10.0, 8.0, 3.0, 3.0, 1.0],
                [55.0, 25.0, 2.0, 5.0, 3.0, 8.0, 2.0],
                [5.0, 40.0, 45.0, 5.0, 3.0, 1.0, 1.0],
            ),
            BlockType::Stone => (
                [20.0, 15.0, 55.0, 5.0, 4.0, 0.5, 0.5],
                [40.0, 35.0, 15.0, 5.0, 3.0, 1.0, 1.0],
                [2.0, 8.0, 85.0, 3.0, 2.0, 0.0, 0.0],
            ),
            BlockType::Sand => (
                [30.0, 10.0, 5.0, 40.0, 14.0, 0.5, 0.5],
                [65.0, 5.0, 1.0, 20.0, 8.0, 1.0, 0.0],
                [3.0, 10.0, 40.0, 45.0, 2.0, 0.0, 0.0],
            ),
            BlockType::Water => (
                [35.0, 5.0, 2.0, 15.0, 43.0, 0.0, 0.0],
                [90.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0],
                [2.0, 15.0, 25.0, 38.0, 20.0, 0.0, 0.0],
            ),
            BlockType::Wood => (
                [60.0, 0.0, 0.0, 0.0, 0.0, 5.0, 35.0],
                [15.0, 0.0, 0.0, 0.0, 0.0, 65.0, 20.0],
                [10.0, 50.0, 10.0, 5.0, 0.0, 25.0, 0.0],
            ),
            BlockType::Leaves => (
                [55.0, 0.0, 0.0, 0.0, 0.0, 0.0, 45.0],
                [70.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.0],
                [75.0, 0.0, 0.0, 0.0, 0.0, 5.0, 20.0],
            ),
        };
        Self::new(
            ProbabilityMapping::new(horizontal),
            ProbabilityMapping::new(up),
            ProbabilityMapping::new(down),
        )
    }

    /// All three tables mutated independently
    pub fn mutated(&self) -> Self {
        Self {
            horizontal: self.horizontal.mutated(),
            up: self.up.mutated(),
            down: self.down.mutated(),
        }
    }

    /// Damp vertical wood growth once a trunk is `consecutive` blocks tall.
    ///
    /// A share `1 - 1/count` of the up table's Wood mass moves to Air, then a
    /// flat `TREE_FLAT_REDUCTION * count` more, capped at half of what is left.
    pub fn apply_tree_rule(&mut self, consecutive: u8) {
        if consecutive <= 1 {
            return;
        }
        let count = consecutive as f64;
        let wood = self.up.weight(BlockType::Wood);
        let proportional = wood * (1.0 - 1.0 / count);
        let remaining = wood - proportional;
        let flat = (TREE_FLAT_REDUCTION * count).min(TREE_FLAT_REDUCTION_CAP * remaining);
        self.up
            .shift(BlockType::Wood, BlockType::Air, proportional + flat);
        self.up.renormalize();
    }

    pub fn is_normalized(&self) -> bool {
        self.horizontal.is_normalized() && self.up.is_normalized() && self.down.is_normalized()
    }

    pub(crate) fn bit_pattern(&self) -> [[u64; BlockType::COUNT]; 3] {
        [
            self.horizontal.bit_pattern(),
            self.up.bit_pattern(),
            self.down.bit_pattern(),
        ]
    }
}

impl Default for DirectionalProbabilities {
    fn default() -> Self {
        Self::for_type(BlockType::Air)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults_are_normalized() {
        for block_type in BlockType::ALL {
            assert!(DirectionalProbabilities::for_type(block_type).is_normalized());
        }
    }

    #[test]
    fn test_mutation_keeps_total_at_100() {
        let mut tables = DirectionalProbabilities::for_type(BlockType::Dirt);
        for _ in 0..500 {
            tables = tables.mutated();
            for direction in [Direction::Horizontal, Direction::Up, Direction::Down] {
                let total = tables.get(direction).total();
                assert!((total - 100.0).abs() <= 1e-6, "total drifted to {}", total);
            }
        }
    }

    #[test]
    fn test_mutation_shifts_one_percent_to_next_type() {
        let mapping = ProbabilityMapping::certain(BlockType::Dirt).mutated();
        assert!((mapping.weight(BlockType::Dirt) - 99.0).abs() < 1e-9);
        assert!((mapping.weight(BlockType::Stone) - 1.0).abs() < 1e-9);

        let wraps = ProbabilityMapping::certain(BlockType::Leaves).mutated();
        assert!((wraps.weight(BlockType::Air) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_walks_cumulative_distribution() {
        let mapping = ProbabilityMapping::new([10.0, 20.0, 30.0, 40.0, 0.0, 0.0, 0.0]);
        assert_eq!(mapping.sample(5.0), BlockType::Air);
        assert_eq!(mapping.sample(10.0), BlockType::Air);
        assert_eq!(mapping.sample(10.5), BlockType::Dirt);
        assert_eq!(mapping.sample(59.9), BlockType::Stone);
        assert_eq!(mapping.sample(99.9), BlockType::Sand);
        // Past the end through rounding
        assert_eq!(mapping.sample(100.5), BlockType::Air);
    }

    #[test]
    fn test_draw_never_panics_and_stays_in_support() {
        let mapping = ProbabilityMapping::new([0.0, 50.0, 50.0, 0.0, 0.0, 0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let drawn = mapping.draw(&mut rng);
            assert!(matches!(drawn, BlockType::Dirt | BlockType::Stone | BlockType::Air));
        }
    }

    #[test]
    fn test_tree_rule_reduces_upward_wood() {
        let mut tables = DirectionalProbabilities::for_type(BlockType::Wood);
        let before = tables.up.weight(BlockType::Wood);
        tables.apply_tree_rule(1);
        assert_eq!(tables.up.weight(BlockType::Wood), before);

        tables.apply_tree_rule(2);
        let after_two = tables.up.weight(BlockType::Wood);
        assert!(after_two < before / 2.0);
        assert!(tables.is_normalized());

        let mut taller = DirectionalProbabilities::for_type(BlockType::Wood);
        taller.apply_tree_rule(6);
        assert!(taller.up.weight(BlockType::Wood) < after_two);
    }

    #[test]
    fn test_renormalize_recovers_from_empty_mapping() {
        let mapping = ProbabilityMapping::new([0.0; BlockType::COUNT]);
        assert_eq!(mapping.weight(BlockType::Air), 100.0);
    }

    #[test]
    fn test_direction_classification() {
        assert_eq!(Direction::from_offset(1), Direction::Up);
        assert_eq!(Direction::from_offset(-1), Direction::Down);
        assert_eq!(Direction::from_offset(0), Direction::Horizontal);
    }
}
