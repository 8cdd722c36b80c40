//! Image geometry and row-stride arithmetic.
//!
//! All buffers in this crate are 8 bits per pixel. Only two geometries are
//! used in practice ([`Geometry::SOURCE`] and [`Geometry::TARGET`]), but the
//! stride and size computations are kept general.

use crate::header::PIXEL_DATA_OFFSET;
use std::fmt;

/// Width and height of an 8-bit image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
}

impl Geometry {
    /// Camera capture geometry (OV2640 at its smallest frame size).
    pub const SOURCE: Geometry = Geometry::new(96, 96);

    /// Classifier input geometry.
    pub const TARGET: Geometry = Geometry::new(32, 32);

    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Bytes per stored row, including padding.
    #[inline]
    pub const fn row_stride(&self) -> usize {
        row_stride(self.width)
    }

    /// Padding bytes written after each row.
    #[inline]
    pub const fn row_padding(&self) -> usize {
        self.width % 4
    }

    /// Number of pixels, excluding padding.
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Size of the pixel array in bytes, including padding.
    #[inline]
    pub const fn image_size(&self) -> usize {
        self.row_stride() * self.height
    }

    /// Total BMP file size: headers, palette and pixel array.
    #[inline]
    pub const fn file_size(&self) -> usize {
        PIXEL_DATA_OFFSET + self.image_size()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row stride for an 8-bit image of the given width.
///
/// This is `width + width % 4`, which coincides with the usual round-up to a
/// 4-byte boundary for every width used here (both are multiples of 4).
#[inline]
pub const fn row_stride(width: usize) -> usize {
    width + width % 4
}

/// Byte length of a complete SOURCE frame as sent on the wire (10294).
pub const SOURCE_FILE_SIZE: usize = Geometry::SOURCE.file_size();

/// Byte length of a complete TARGET BMP (2102).
pub const TARGET_FILE_SIZE: usize = Geometry::TARGET.file_size();

/// Pixel count of a TARGET image, i.e. the classifier input length.
pub const TARGET_PIXELS: usize = Geometry::TARGET.pixel_count();
