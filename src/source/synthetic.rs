//! Synthetic point clouds for tests, benchmarks and the demo binary.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::Vec3;
use super::{LodSettings, PointCloud};

/// `count` points uniformly distributed in a cube of half extent `half_extent`
/// centered on the origin. Same seed, same cloud.
pub fn uniform_cube(count: usize, half_extent: f32, seed: u64, settings: LodSettings) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let locations: Vec<Vec3> = (0..count)
        .map(|_| {
            Vec3::new(
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-half_extent..=half_extent),
            )
        })
        .collect();
    PointCloud::from_locations(locations, settings)
}

/// `per_side`^3 points on a regular lattice with the given spacing, starting
/// at the origin. Lattice points land exactly on octant face planes whenever
/// the spacing divides the cell size, which exercises boundary assignment.
pub fn lattice(per_side: u32, spacing: f32, settings: LodSettings) -> PointCloud {
    let mut locations = Vec::with_capacity((per_side as usize).pow(3));
    for z in 0..per_side {
        for y in 0..per_side {
            for x in 0..per_side {
                locations.push(Vec3::new(x as f32, y as f32, z as f32) * spacing);
            }
        }
    }
    PointCloud::from_locations(locations, settings)
}
