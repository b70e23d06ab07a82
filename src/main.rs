//! Octree builder demo: builds a LOD octree over a synthetic cloud and
//! prints the per-LOD statistics.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --points <N>        Number of uniformly distributed points (default: 100000)
//!   --extent <METERS>   Half extent of the cloud cube (default: 50.0)
//!   --seed <SEED>       Random seed (default: 12345)
//!   --settings <PATH>   LOD settings JSON (default: built-in defaults)
//!   --lods <N>          Override the LOD count
//!   --jobs <N>          Worker threads for the root fan-out (default: rayon's choice)

use std::sync::Arc;
use std::time::Instant;

use pointlod::core::logging;
use pointlod::source::synthetic;
use pointlod::{LodSettings, PointOctree};

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let count = parse_arg::<usize>(&args, "--points").unwrap_or(100_000);
    let extent = parse_arg::<f32>(&args, "--extent").unwrap_or(50.0);
    let seed = parse_arg::<u64>(&args, "--seed").unwrap_or(12345);
    let jobs = parse_arg::<usize>(&args, "--jobs");

    let mut settings = match parse_arg::<String>(&args, "--settings") {
        Some(path) => match LodSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => LodSettings::default(),
    };
    if let Some(lods) = parse_arg::<u32>(&args, "--lods") {
        settings.lod_count = lods;
    }

    println!("=== Pointlod Octree Builder ===");
    println!("Points: {}", count);
    println!("Extent: {}m", extent);
    println!("Seed:   {}", seed);
    println!("LODs:   {}", settings.lod_count);
    println!();

    let start = Instant::now();
    let cloud = synthetic::uniform_cube(count, extent, seed, settings);
    println!("Generated cloud in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    let mut octree = PointOctree::new();
    if let Some(jobs) = jobs {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => octree = octree.with_thread_pool(Arc::new(pool)),
            Err(e) => log::warn!("Falling back to the global thread pool: {}", e),
        }
    }

    let start = Instant::now();
    if let Err(e) = octree.rebuild(&cloud) {
        eprintln!("Rebuild failed: {}", e);
        std::process::exit(1);
    }
    println!("Built {} nodes in {:.1}ms", octree.node_count(), start.elapsed().as_secs_f64() * 1000.0);
    println!();

    for line in octree.stats_report() {
        println!("{}", line);
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
