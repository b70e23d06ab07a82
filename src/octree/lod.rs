//! Sampling strides and distance thresholds
//!
//! LOD indices run the other way from depth: the root holds `max_lod`,
//! each level down is one less, and the deepest nodes sit at LOD 0.

use crate::source::PointSource;

/// Sampling stride for every LOD, indexed by LOD.
///
/// `stride[max_lod]` is 1 (every point); each step toward LOD 0 divides
/// the kept fraction by `1 - reduction`, so coarser LODs sample sparser.
/// A reduction of 1 leaves only the first point of every coarser node.
///
/// # Examples
/// ```
/// use pointlod::octree::lod::sampling_strides;
///
/// assert_eq!(sampling_strides(2, 0.5), vec![4.0, 2.0, 1.0]);
/// assert_eq!(sampling_strides(2, 0.0), vec![1.0, 1.0, 1.0]);
/// ```
pub fn sampling_strides(max_lod: u32, reduction: f32) -> Vec<f64> {
    let keep = 1.0 - f64::from(reduction.clamp(0.0, 1.0));
    (0..=max_lod)
        .map(|lod| {
            let steps = (max_lod - lod) as i32;
            1.0 / keep.powi(steps)
        })
        .collect()
}

/// Resize `thresholds` to the source's LOD count and refill it in place.
pub fn refresh_distance_thresholds(thresholds: &mut Vec<f32>, source: &dyn PointSource) {
    let lod_count = source.lod_count() as usize;
    thresholds.resize(lod_count, 0.0);
    for (lod, slot) in thresholds.iter_mut().enumerate() {
        *slot = source.distance_threshold(lod as u32);
    }
}
