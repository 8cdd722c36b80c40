//! Header stripping for 32x32 classifier input.
//!
//! This uses the conventional single 54-byte file+DIB header count instead of
//! the codec's 14 + 40 split. The byte layout is identical; the check is kept
//! independent so that buffers from other producers are judged by length
//! alone.

use crate::error::{BmpError, Malformed};

/// Combined file and DIB header size.
pub const BMP_HEADER_SIZE: usize = 54;
/// 256 palette entries of 4 bytes.
pub const PALETTE_SIZE: usize = 256 * 4;
/// Pixel payload expected after the header and palette.
pub const PAYLOAD_SIZE: usize = 32 * 32;

/// Return the raw pixel payload of a 32x32 8-bit BMP.
///
/// Fails with [`BmpError::MalformedInput`] when nothing follows the header
/// and palette, and with [`BmpError::InvalidDimensions`] when the payload is
/// not exactly 1024 bytes. Pixel values are returned as stored.
pub fn strip_header(bmp: &[u8]) -> Result<&[u8; PAYLOAD_SIZE], BmpError> {
    let start = BMP_HEADER_SIZE + PALETTE_SIZE;
    if bmp.len() <= start {
        return Err(Malformed::TooShort {
            len: bmp.len(),
            needed: start + 1,
        }
        .into());
    }

    let payload = &bmp[start..];
    payload
        .try_into()
        .map_err(|_| BmpError::InvalidDimensions {
            expected: PAYLOAD_SIZE,
            actual: payload.len(),
        })
}
