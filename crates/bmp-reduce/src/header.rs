//! BMP header codec.
//!
//! Every buffer in this system has the same fixed layout:
//!
//! ```text
//! offset  size  field
//! 0       14    file header   ("BM", file size, reserved, data offset)
//! 14      40    DIB header    (BITMAPINFOHEADER, Windows v3)
//! 54      1024  palette       (256 entries of B, G, R, 0)
//! 1078    ...   pixel data    (bottom-up rows, 1 byte per pixel)
//! ```
//!
//! The palette is always present, even though the images are grayscale, so
//! the pixel data offset is 1078 regardless of image size.

use crate::error::{BmpError, Malformed};
use crate::geometry::Geometry;

pub const FILE_HEADER_SIZE: usize = 14;
pub const DIB_HEADER_SIZE: usize = 40;
pub const PALETTE_ENTRIES: usize = 256;
pub const PALETTE_SIZE: usize = PALETTE_ENTRIES * 4;
pub const PALETTE_OFFSET: usize = FILE_HEADER_SIZE + DIB_HEADER_SIZE;
pub const PIXEL_DATA_OFFSET: usize = PALETTE_OFFSET + PALETTE_SIZE;

const SIGNATURE: [u8; 2] = *b"BM";
const BITS_PER_PIXEL: u16 = 8;

// Field offsets within the combined file + DIB header.
const FILE_SIZE_AT: usize = 2;
const DATA_OFFSET_AT: usize = 10;
const DIB_SIZE_AT: usize = 14;
const WIDTH_AT: usize = 18;
const HEIGHT_AT: usize = 22;
const PLANES_AT: usize = 26;
const BITS_AT: usize = 28;
const IMAGE_SIZE_AT: usize = 34;

/// 256-entry BGRA palette block.
pub type Palette = [u8; PALETTE_SIZE];

/// File header, DIB header and palette, ready to prepend to pixel data.
pub type Header = [u8; PIXEL_DATA_OFFSET];

/// Palette mapping index `i` to gray level `i`.
pub fn identity_palette() -> Palette {
    let mut palette = [0u8; PALETTE_SIZE];
    for (level, entry) in palette.chunks_exact_mut(4).enumerate() {
        let level = level as u8;
        entry.copy_from_slice(&[level, level, level, 0]);
    }
    palette
}

/// Offset of the first pixel byte. Constant for every geometry.
#[inline]
pub const fn pixel_data_offset(_geometry: Geometry) -> usize {
    PIXEL_DATA_OFFSET
}

/// Build the header and palette block for an 8-bit image.
///
/// `palette` is copied verbatim; transforms pass the source palette so
/// non-identity grayscale ramps survive a reduction.
pub fn build_header(geometry: Geometry, palette: &Palette) -> Header {
    let mut header = [0u8; PIXEL_DATA_OFFSET];
    header[..2].copy_from_slice(&SIGNATURE);
    put_u32(&mut header, FILE_SIZE_AT, geometry.file_size() as u32);
    put_u32(&mut header, DATA_OFFSET_AT, PIXEL_DATA_OFFSET as u32);
    put_u32(&mut header, DIB_SIZE_AT, DIB_HEADER_SIZE as u32);
    put_u32(&mut header, WIDTH_AT, geometry.width as u32);
    put_u32(&mut header, HEIGHT_AT, geometry.height as u32);
    put_u16(&mut header, PLANES_AT, 1);
    put_u16(&mut header, BITS_AT, BITS_PER_PIXEL);
    put_u32(&mut header, IMAGE_SIZE_AT, geometry.image_size() as u32);
    header[PALETTE_OFFSET..].copy_from_slice(palette);
    header
}

/// Build a complete BMP from headerless, unpadded pixel rows.
///
/// `pixels` holds `geometry.pixel_count()` bytes in storage order (bottom
/// row first). Padding is inserted after each row.
pub fn encode(geometry: Geometry, palette: &Palette, pixels: &[u8]) -> Result<Vec<u8>, BmpError> {
    if pixels.len() != geometry.pixel_count() {
        return Err(BmpError::InvalidDimensions {
            expected: geometry.pixel_count(),
            actual: pixels.len(),
        });
    }
    let mut bmp = Vec::with_capacity(geometry.file_size());
    bmp.extend_from_slice(&build_header(geometry, palette));
    for row in pixels.chunks_exact(geometry.width.max(1)) {
        bmp.extend_from_slice(row);
        bmp.resize(bmp.len() + geometry.row_padding(), 0);
    }
    Ok(bmp)
}

#[inline]
fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

/// A validated, borrowed 8-bit BMP of known geometry.
///
/// Construction checks length, signature and header geometry once, so pixel
/// access afterwards is in bounds for any coordinate inside the geometry.
#[derive(Debug, Clone, Copy)]
pub struct BmpRef<'a> {
    bytes: &'a [u8],
    palette: &'a Palette,
    geometry: Geometry,
}

impl<'a> BmpRef<'a> {
    /// Validate `bytes` as a BMP of the `expected` geometry.
    ///
    /// The declared file-size field is not checked: capture firmware is
    /// trusted on layout but the length itself is what bounds indexing.
    pub fn parse(bytes: &'a [u8], expected: Geometry) -> Result<Self, BmpError> {
        let needed = expected.file_size();
        if bytes.len() < needed {
            return Err(Malformed::TooShort {
                len: bytes.len(),
                needed,
            }
            .into());
        }
        if bytes[..2] != SIGNATURE {
            return Err(Malformed::BadSignature.into());
        }

        let width = read_u32(bytes, WIDTH_AT);
        let height = read_u32(bytes, HEIGHT_AT);
        let bits = read_u16(bytes, BITS_AT);
        if width as usize != expected.width
            || height as usize != expected.height
            || bits != BITS_PER_PIXEL
        {
            return Err(Malformed::UnexpectedGeometry {
                width,
                height,
                bits,
                expected,
            }
            .into());
        }

        let palette: &Palette = bytes[PALETTE_OFFSET..PIXEL_DATA_OFFSET]
            .try_into()
            .map_err(|_| Malformed::TooShort {
                len: bytes.len(),
                needed,
            })?;

        Ok(Self {
            bytes,
            palette,
            geometry: expected,
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn palette(&self) -> &'a Palette {
        self.palette
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Value of the file-size header field.
    pub fn declared_file_size(&self) -> u32 {
        read_u32(self.bytes, FILE_SIZE_AT)
    }

    /// Value of the data-offset header field.
    pub fn declared_data_offset(&self) -> u32 {
        read_u32(self.bytes, DATA_OFFSET_AT)
    }

    /// Pixel at column `x` of storage row `y` (row 0 is the bottom row).
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the geometry. Row padding is never
    /// returned as a pixel.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        assert!(
            x < self.geometry.width && y < self.geometry.height,
            "pixel ({x}, {y}) outside {}",
            self.geometry
        );
        self.bytes[PIXEL_DATA_OFFSET + y * self.geometry.row_stride() + x]
    }

    /// Storage row `y` without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y` is not below the image height.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.geometry.height, "row {y} outside {}", self.geometry);
        let start = PIXEL_DATA_OFFSET + y * self.geometry.row_stride();
        &self.bytes[start..start + self.geometry.width]
    }
}
