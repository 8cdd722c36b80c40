//! Destination-to-source coordinate mapping.
//!
//! BMP rows are stored bottom-up, and the reductions walk the destination
//! buffer in storage order while reading the source mirrored vertically. In
//! storage coordinates destination row `dy` reads source row
//! `OLD_HEIGHT - 1 - dy * OLD_HEIGHT / NEW_HEIGHT`, so the reduced image is
//! flipped relative to the source. Clients of the reduced image (the CNN and
//! its training data) see this orientation consistently.

use crate::error::BmpError;
use crate::geometry::Geometry;
use crate::header::BmpRef;
use std::ops::Range;

/// A square block of source pixels in storage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Leftmost source column.
    pub x: usize,
    /// Lowest source storage row.
    pub y: usize,
    /// Edge length in pixels.
    pub size: usize,
}

impl Block {
    pub fn columns(&self) -> Range<usize> {
        self.x..self.x + self.size
    }

    pub fn rows(&self) -> Range<usize> {
        self.y..self.y + self.size
    }
}

/// Maps destination pixels of a reduction to source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    source: Geometry,
    target: Geometry,
    scale: usize,
}

impl Sampler {
    /// The 96x96 to 32x32 reduction used by the camera pipeline.
    pub const CAMERA: Sampler = Sampler {
        source: Geometry::SOURCE,
        target: Geometry::TARGET,
        scale: 3,
    };

    /// Create a sampler for a whole-factor reduction.
    ///
    /// Both axes must shrink by the same integer factor so that block
    /// averaging covers every source pixel exactly once.
    pub fn new(source: Geometry, target: Geometry) -> Result<Self, BmpError> {
        let unsupported = BmpError::UnsupportedScale {
            source_geometry: source,
            target_geometry: target,
        };
        if target.width == 0 || target.height == 0 {
            return Err(unsupported);
        }
        if source.width % target.width != 0 || source.height % target.height != 0 {
            return Err(unsupported);
        }
        let scale = source.width / target.width;
        if scale == 0 || source.height / target.height != scale {
            return Err(unsupported);
        }
        Ok(Self {
            source,
            target,
            scale,
        })
    }

    pub fn source(&self) -> Geometry {
        self.source
    }

    pub fn target(&self) -> Geometry {
        self.target
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Source pixel for nearest-neighbour sampling of `(dx, dy)`.
    #[inline]
    pub fn nearest(&self, dx: usize, dy: usize) -> (usize, usize) {
        let old_x = dx * self.source.width / self.target.width;
        let old_y = dy * self.source.height / self.target.height;
        (old_x, self.source.height - 1 - old_y)
    }

    /// Source block averaged into destination pixel `(dx, dy)`.
    #[inline]
    pub fn block(&self, dx: usize, dy: usize) -> Block {
        Block {
            x: dx * self.scale,
            y: (self.target.height - 1 - dy) * self.scale,
            size: self.scale,
        }
    }

    /// Nearest-neighbour source value for `(dx, dy)`.
    ///
    /// # Panics
    ///
    /// Panics if `(dx, dy)` is outside the target geometry or `source` is
    /// smaller than the source geometry.
    #[inline]
    pub fn sample_nearest(&self, source: &BmpRef<'_>, dx: usize, dy: usize) -> u8 {
        let (x, y) = self.nearest(dx, dy);
        source.pixel(x, y)
    }

    /// Integer mean (floor) of the source block for `(dx, dy)`.
    ///
    /// Same preconditions as [`sample_nearest`](Self::sample_nearest).
    pub fn sample_average(&self, source: &BmpRef<'_>, dx: usize, dy: usize) -> u8 {
        let block = self.block(dx, dy);
        let mut sum = 0u32;
        let mut count = 0u32;
        for y in block.rows() {
            for &value in &source.row(y)[block.columns()] {
                sum += u32::from(value);
                count += 1;
            }
        }
        (sum / count.max(1)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{encode, identity_palette};

    #[test]
    fn test_camera_sampler_matches_new() {
        let sampler = Sampler::new(Geometry::SOURCE, Geometry::TARGET).unwrap();
        assert_eq!(sampler, Sampler::CAMERA);
        assert_eq!(sampler.scale(), 3);
    }

    #[test]
    fn test_new_rejects_uneven_ratio() {
        assert!(Sampler::new(Geometry::new(100, 96), Geometry::TARGET).is_err());
        assert!(Sampler::new(Geometry::new(96, 64), Geometry::TARGET).is_err());
        assert!(Sampler::new(Geometry::TARGET, Geometry::SOURCE).is_err());
        assert!(Sampler::new(Geometry::SOURCE, Geometry::new(0, 32)).is_err());
    }

    #[test]
    fn test_nearest_mirrors_rows() {
        let sampler = Sampler::CAMERA;
        assert_eq!(sampler.nearest(0, 0), (0, 95));
        assert_eq!(sampler.nearest(31, 0), (93, 95));
        assert_eq!(sampler.nearest(0, 31), (0, 2));
        assert_eq!(sampler.nearest(31, 31), (93, 2));
        assert_eq!(sampler.nearest(16, 16), (48, 47));
    }

    #[test]
    fn test_block_mirrors_rows() {
        let sampler = Sampler::CAMERA;
        assert_eq!(sampler.block(0, 0), Block { x: 0, y: 93, size: 3 });
        assert_eq!(sampler.block(0, 31), Block { x: 0, y: 0, size: 3 });
        assert_eq!(sampler.block(31, 31).columns(), 93..96);
    }

    #[test]
    fn test_nearest_pixel_lies_inside_block() {
        let sampler = Sampler::CAMERA;
        for dy in 0..32 {
            for dx in 0..32 {
                let (x, y) = sampler.nearest(dx, dy);
                let block = sampler.block(dx, dy);
                assert!(block.columns().contains(&x), "column for ({dx}, {dy})");
                assert!(block.rows().contains(&y), "row for ({dx}, {dy})");
            }
        }
    }

    #[test]
    fn test_sample_average_floors() {
        // 6x6 source, 2x2 target: block (0, 1) covers storage rows 0..3.
        let source_geometry = Geometry::new(6, 6);
        let mut pixels = vec![0u8; 36];
        pixels[0] = 10;
        pixels[1] = 10;
        let bmp = encode(source_geometry, &identity_palette(), &pixels).unwrap();
        let source = BmpRef::parse(&bmp, source_geometry).unwrap();
        let sampler = Sampler::new(source_geometry, Geometry::new(2, 2)).unwrap();

        assert_eq!(sampler.sample_average(&source, 0, 1), 2, "20 / 9 floors to 2");
        assert_eq!(sampler.sample_average(&source, 0, 0), 0);
    }
}
