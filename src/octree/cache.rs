//! Primitive index caches
//!
//! Each node keeps the vertex indices a renderer draws for it. Plain point
//! clouds emit one index per sampled point. Sprite clouds store four
//! vertices per point (`id * 4 .. id * 4 + 3`) and emit either a two
//! triangle quad or, from the single-poly LOD upward, one triangle.

use crate::core::{Error, Result};
use crate::source::CloudPoint;

/// How sampled points become indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveEncoding {
    /// One index per point.
    Points,
    /// Sprite quad, 6 indices / 2 triangles per point.
    SpriteQuad,
    /// Single sprite triangle, 3 indices per point.
    SpriteTriangle,
}

impl PrimitiveEncoding {
    pub fn for_lod(lod: u32, uses_sprites: bool, single_poly_min_lod: u32) -> Self {
        match (uses_sprites, lod >= single_poly_min_lod) {
            (false, _) => Self::Points,
            (true, true) => Self::SpriteTriangle,
            (true, false) => Self::SpriteQuad,
        }
    }

    pub fn indices_per_point(self) -> usize {
        match self {
            Self::Points => 1,
            Self::SpriteQuad => 6,
            Self::SpriteTriangle => 3,
        }
    }

    pub fn primitives_per_point(self) -> u32 {
        match self {
            Self::SpriteQuad => 2,
            Self::Points | Self::SpriteTriangle => 1,
        }
    }
}

/// Ordered draw indices plus their primitive count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexCache {
    pub indices: Vec<u32>,
    pub primitive_count: u32,
}

impl IndexCache {
    /// Append the encoding of one point.
    pub fn push_point(&mut self, point: &CloudPoint, encoding: PrimitiveEncoding) -> Result<()> {
        if encoding == PrimitiveEncoding::Points {
            self.indices.push(point.id);
        } else {
            let base = point
                .id
                .checked_mul(4)
                .filter(|b| b.checked_add(3).is_some())
                .ok_or(Error::IndexOverflow { id: point.id })?;
            match encoding {
                PrimitiveEncoding::SpriteTriangle => {
                    self.indices.extend_from_slice(&[base, base + 1, base + 2]);
                }
                _ => {
                    self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
                }
            }
        }
        self.primitive_count += encoding.primitives_per_point();
        Ok(())
    }

    /// Append every point picked by fractional stepping through `points`.
    ///
    /// The cursor advances by `stride` and truncates to an index, so a
    /// stride of 2.5 keeps points 0, 2, 5, 7, 10, ...
    pub fn append_sampled(&mut self, points: &[&CloudPoint], stride: f64, encoding: PrimitiveEncoding) -> Result<()> {
        debug_assert!(stride >= 1.0);
        let mut cursor = 0.0f64;
        while cursor < points.len() as f64 {
            self.push_point(points[cursor as usize], encoding)?;
            cursor += stride;
        }
        Ok(())
    }
}

/// Number of points `append_sampled` keeps out of `len` at `stride`.
pub fn sampled_len(len: usize, stride: f64) -> usize {
    if len == 0 {
        0
    } else if stride.is_infinite() {
        1
    } else {
        ((len as f64) / stride).ceil() as usize
    }
}
