use super::*;
use crate::world::block::BlockType;
use crate::world::core::{chunk_to_world, LocalPos, VoxelPos};
use crate::world::error::GenerationError;
use std::sync::atomic::Ordering;

fn off_spawn_config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        seed,
        spawn_chunk: None,
        ..Default::default()
    }
}

#[test]
fn test_spawn_chunk_pattern() {
    let generator = ProceduralGenerator::new(GeneratorConfig::default());
    let result = generator
        .generate(VoxelPos::new(8, 8, 8), 32)
        .expect("spawn generation should succeed");

    assert!(result.spawn_pattern);
    assert_eq!(result.len(), 4096);

    let dirt = result
        .block_at(chunk_to_world(ChunkPos::ORIGIN, LocalPos::new_checked(8, 8, 7).unwrap()))
        .unwrap();
    let air = result
        .block_at(chunk_to_world(ChunkPos::ORIGIN, LocalPos::new_checked(8, 8, 8).unwrap()))
        .unwrap();
    assert_eq!(dirt.block_type(), BlockType::Dirt);
    assert_eq!(air.block_type(), BlockType::Air);
}

#[test]
fn test_spawn_pattern_ignores_seed() {
    for seed in [0, 1, 999, u64::MAX] {
        let generator = ProceduralGenerator::new(GeneratorConfig {
            seed,
            ..Default::default()
        });
        let result = generator.generate(VoxelPos::new(0, 0, 0), 10).unwrap();
        for block in result.blocks() {
            let local = block.position.to_local_pos();
            let expected = if local.z < 8 { BlockType::Dirt } else { BlockType::Air };
            assert_eq!(block.block_type(), expected, "seed {} at {}", seed, block.position);
        }
    }
}

#[test]
fn test_zero_radius_yields_only_seed() {
    let generator = ProceduralGenerator::new(off_spawn_config(7));
    for radius in [0, -5] {
        let result = generator.generate(VoxelPos::new(100, 0, 0), radius).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.blocks()[0].block_type(), BlockType::Dirt);
        assert_eq!(result.blocks()[0].position, VoxelPos::new(100, 0, 0));
    }
}

#[test]
fn test_generation_is_deterministic() {
    let seed_pos = VoxelPos::new(-40, 200, 12);
    let a = ProceduralGenerator::new(off_spawn_config(42))
        .generate(seed_pos, 12)
        .unwrap();
    let b = ProceduralGenerator::new(off_spawn_config(42))
        .generate(seed_pos, 12)
        .unwrap();
    assert_eq!(a.blocks(), b.blocks());
}

#[test]
fn test_blocks_stay_within_radius_and_tables_stay_normalized() {
    let seed_pos = VoxelPos::new(500, -500, 64);
    let radius = 10;
    let result = ProceduralGenerator::new(off_spawn_config(3))
        .generate(seed_pos, radius)
        .unwrap();

    for block in result.blocks() {
        assert!(block.position.distance_squared_to(seed_pos) <= (radius as i64).pow(2));
        assert!(block.metadata.probabilities.is_normalized());
        if block.block_type() != BlockType::Wood {
            assert_eq!(block.metadata.consecutive_count, 0);
        }
    }
}

#[test]
fn test_positions_are_unique() {
    let result = ProceduralGenerator::new(off_spawn_config(11))
        .generate(VoxelPos::new(1000, 1000, 1000), 14)
        .unwrap();
    let mut positions: Vec<VoxelPos> = result.blocks().iter().map(|b| b.position).collect();
    let total = positions.len();
    positions.sort();
    positions.dedup();
    assert_eq!(positions.len(), total);
}

#[test]
fn test_block_cap_stops_expansion() {
    let generator = ProceduralGenerator::new(GeneratorConfig {
        max_blocks: 10,
        ..off_spawn_config(5)
    });
    let mut capped_once = false;
    for x in 0..20 {
        let result = generator.generate(VoxelPos::new(64 + x * 100, 0, 0), 30).unwrap();
        assert!(result.len() <= 10);
        capped_once |= result.capped;
    }
    assert!(capped_once, "at least one pass should reach the cap");
}

#[test]
fn test_abort_flag_stops_generation() {
    let generator = ProceduralGenerator::new(off_spawn_config(9));
    generator.abort_handle().store(true, Ordering::SeqCst);

    let result = generator.generate(VoxelPos::new(300, 0, 0), 20);
    assert_eq!(result.unwrap_err(), GenerationError::Aborted { processed: 0 });

    generator.reset_abort();
    assert!(generator.generate(VoxelPos::new(300, 0, 0), 20).is_ok());
}

#[test]
fn test_chunks_touched_are_sorted_and_unique() {
    let result = ProceduralGenerator::new(GeneratorConfig::default())
        .generate(VoxelPos::new(3, 3, 3), 4)
        .unwrap();
    assert_eq!(result.chunks_touched(), vec![ChunkPos::ORIGIN]);
}

#[test]
fn test_generation_at_coordinate_limits() {
    let generator = ProceduralGenerator::new(off_spawn_config(21));
    for seed_pos in [
        VoxelPos::new(i32::MAX, 0, 0),
        VoxelPos::new(i32::MIN, i32::MAX, i32::MIN),
        VoxelPos::new(i32::MAX, i32::MAX, i32::MAX),
    ] {
        let result = generator.generate(seed_pos, 2).unwrap();
        assert_eq!(result.blocks()[0].position, seed_pos);
        for block in result.blocks() {
            assert!(block.position.distance_squared_to(seed_pos) <= 4);
        }
    }
}
