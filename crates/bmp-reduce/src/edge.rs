//! Sobel edge detection on headerless 32x32 pixel arrays.
//!
//! The gradient magnitude is hard-binarized: a pixel is 255 when
//! `sqrt(gx² + gy²) >= 255` and 0 otherwise. Because the comparison point
//! and the ceiling are both 255 the output has no intermediate levels.

use crate::error::{BmpError, Malformed};

pub const EDGE_WIDTH: usize = 32;
pub const EDGE_HEIGHT: usize = 32;
pub const EDGE_PIXELS: usize = EDGE_WIDTH * EDGE_HEIGHT;

/// Horizontal Sobel kernel, row-major.
pub const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
/// Vertical Sobel kernel, row-major.
pub const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

const EDGE_LEVEL: i32 = 255;

/// Run the Sobel operator over the 32x32 image starting at `offset` in
/// `input` and overwrite `output` with the binarized magnitude.
///
/// `offset` lets callers pass a buffer that still carries a BMP header.
/// The outermost ring of `output` is always zero.
pub fn sobel(input: &[u8], offset: usize, output: &mut [u8; EDGE_PIXELS]) -> Result<(), BmpError> {
    let needed = offset.saturating_add(EDGE_PIXELS);
    if input.len() < needed {
        return Err(Malformed::TooShort {
            len: input.len(),
            needed,
        }
        .into());
    }
    let image = &input[offset..needed];

    for y in 1..EDGE_HEIGHT - 1 {
        for x in 1..EDGE_WIDTH - 1 {
            let (gx, gy) = gradient(image, x, y);
            // Integer form of sqrt(gx² + gy²) >= 255.
            let on = gx * gx + gy * gy >= EDGE_LEVEL * EDGE_LEVEL;
            output[y * EDGE_WIDTH + x] = if on { 255 } else { 0 };
        }
    }

    zero_border(output);
    Ok(())
}

#[inline]
fn gradient(image: &[u8], x: usize, y: usize) -> (i32, i32) {
    let mut gx = 0;
    let mut gy = 0;
    for ky in 0..3 {
        let row = (y + ky - 1) * EDGE_WIDTH;
        for kx in 0..3 {
            let pixel = i32::from(image[row + x + kx - 1]);
            let k = ky * 3 + kx;
            gx += pixel * SOBEL_X[k];
            gy += pixel * SOBEL_Y[k];
        }
    }
    (gx, gy)
}

fn zero_border(output: &mut [u8; EDGE_PIXELS]) {
    output[..EDGE_WIDTH].fill(0);
    output[EDGE_PIXELS - EDGE_WIDTH..].fill(0);
    for row in output.chunks_exact_mut(EDGE_WIDTH) {
        row[0] = 0;
        row[EDGE_WIDTH - 1] = 0;
    }
}
