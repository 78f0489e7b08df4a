// World inspection tool
//
// Creates, generates into and inspects worlds stored in a directory.
//
//   world_inspect [--config world.toml] create <dir> <name> [seed]
//   world_inspect [--config world.toml] generate <dir> <world-id> <x> <y> <z> [radius]
//   world_inspect [--config world.toml] list <dir>
//   world_inspect [--config world.toml] stats <dir> <world-id>
//
// Without a radius, generate uses the world's own generation radius.

use anyhow::{bail, Context, Result};
use std::path::Path;

use voxel_world_store::persistence::{FileChunkStore, WorldId, WorldSettings};
use voxel_world_store::world::{BlockType, ChunkManager, VoxelPos};
use voxel_world_store::WorldConfig;

const USAGE: &str = "usage: world_inspect [--config <file>] <create|generate|list|stats> <dir> [args...]";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config = if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            bail!(USAGE);
        }
        let path = args.remove(1);
        args.remove(0);
        WorldConfig::load(&path).with_context(|| format!("loading {}", path))?
    } else {
        WorldConfig::default()
    };

    let Some(command) = args.first().cloned() else {
        bail!(USAGE);
    };
    let Some(dir) = args.get(1).cloned() else {
        bail!(USAGE);
    };
    let rest = &args[2..];

    match command.as_str() {
        "create" => create(&config, Path::new(&dir), rest).await,
        "generate" => generate(&config, Path::new(&dir), rest).await,
        "list" => list(Path::new(&dir)).await,
        "stats" => stats(&config, Path::new(&dir), rest).await,
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

fn parse_world_id(raw: Option<&String>) -> Result<WorldId> {
    let raw = raw.context("missing world id")?;
    let id = raw
        .trim_start_matches("world-")
        .parse::<u64>()
        .with_context(|| format!("invalid world id '{}'", raw))?;
    Ok(WorldId(id))
}

fn parse_i32(raw: Option<&String>, name: &str) -> Result<i32> {
    let raw = raw.with_context(|| format!("missing {}", name))?;
    raw.parse()
        .with_context(|| format!("invalid {} '{}'", name, raw))
}

async fn create(config: &WorldConfig, dir: &Path, args: &[String]) -> Result<()> {
    let name = args.first().context("missing world name")?;
    let mut settings = WorldSettings {
        seed: config.generator.seed,
        render_distance: config.manager.render_distance,
        spawn_platform: config.generator.spawn_chunk.is_some(),
        ..Default::default()
    };
    if let Some(seed) = args.get(1) {
        settings.seed = seed
            .parse()
            .with_context(|| format!("invalid seed '{}'", seed))?;
    }

    let store = FileChunkStore::open(dir).await?;
    let mut manager = ChunkManager::new(store, config.manager, config.generator);
    let metadata = manager.create_new_world(name, settings).await?;
    println!("Created {} '{}' (seed {})", metadata.id, metadata.name, metadata.settings.seed);
    Ok(())
}

async fn generate(config: &WorldConfig, dir: &Path, args: &[String]) -> Result<()> {
    let id = parse_world_id(args.first())?;
    let seed_pos = VoxelPos::new(
        parse_i32(args.get(1), "x")?,
        parse_i32(args.get(2), "y")?,
        parse_i32(args.get(3), "z")?,
    );
    let radius = args.get(4).map(|raw| parse_i32(Some(raw), "radius")).transpose()?;

    let store = FileChunkStore::open(dir).await?;
    let mut manager = ChunkManager::new(store, config.manager, config.generator);
    manager.load_world(id).await?;

    let result = match radius {
        Some(radius) => manager.generate_around(seed_pos, radius).await?,
        None => manager.generate_area(seed_pos).await?,
    };
    let saved = manager.save_all_chunks().await?;

    let mut counts = [0usize; BlockType::COUNT];
    for block in result.blocks() {
        counts[block.block_type().index()] += 1;
    }

    println!(
        "Generated {} blocks around {} ({} chunks saved{})",
        result.len(),
        seed_pos,
        saved,
        if result.capped { ", capped" } else { "" }
    );
    for block_type in BlockType::ALL {
        println!("  {:<8} {}", block_type.to_string(), counts[block_type.index()]);
    }
    Ok(())
}

async fn list(dir: &Path) -> Result<()> {
    let store = FileChunkStore::open(dir).await?;
    let manager = ChunkManager::new(store, Default::default(), Default::default());
    let worlds = manager.list_worlds().await?;
    if worlds.is_empty() {
        println!("No worlds in {:?}", dir);
    }
    for world in worlds {
        println!(
            "{}  {:<24} seed {:<12} created {}",
            world.id,
            world.name,
            world.settings.seed,
            world.created_at_rfc3339()
        );
    }
    Ok(())
}

async fn stats(config: &WorldConfig, dir: &Path, args: &[String]) -> Result<()> {
    let id = parse_world_id(args.first())?;
    let store = FileChunkStore::open(dir).await?;
    let mut manager = ChunkManager::new(store, config.manager, config.generator);
    let metadata = manager.load_world(id).await?;
    let keys = manager.stored_chunk_keys().await?;

    let positions: Vec<_> = keys.iter().map(|key| key.pos).collect();
    let mut solid = 0u64;
    let mut empty = 0usize;
    for batch in positions.chunks(config.manager.max_resident_chunks.max(1)) {
        manager.clear_all_chunks();
        manager.preload_chunks(batch).await?;
        for pos in batch {
            if let Some(chunk) = manager.resident_chunk(*pos) {
                solid += chunk.live_block_count() as u64;
                if chunk.is_empty() {
                    empty += 1;
                }
            }
        }
    }

    println!("{} '{}'", metadata.id, metadata.name);
    println!("  created          {}", metadata.created_at_rfc3339());
    println!("  seed             {}", metadata.settings.seed);
    println!("  stored chunks    {}", keys.len());
    println!("  empty chunks     {}", empty);
    println!("  solid blocks     {}", solid);
    println!("  palette entries  {}", manager.palette().len());
    println!("  metrics          {:?}", manager.metrics().snapshot());
    Ok(())
}
