//! Reduction transforms from SOURCE to TARGET geometry.
//!
//! All four transforms share the same frame: validate the source, write a
//! fresh header carrying the source palette, then fill the destination in
//! storage order one pixel at a time through the [`Sampler`]. They differ
//! only in how a destination value is derived.
//!
//! Nearest sampling costs one read per destination pixel; block averaging
//! costs `scale²` reads but aliases less. Training-data generation tends to
//! favour [`Transform::AverageThreshold`], low-latency live inference
//! [`Transform::NearestCopy`] or [`Transform::NearestThreshold`].

use crate::error::{BmpError, Malformed};
use crate::geometry::TARGET_FILE_SIZE;
use crate::header::{build_header, BmpRef, PIXEL_DATA_OFFSET};
use crate::sampler::Sampler;
use std::fmt;

/// A complete TARGET-geometry BMP.
pub type TargetBmp = [u8; TARGET_FILE_SIZE];

/// Gray level written for pixels on the "on" side of a threshold.
pub const WHITE: u8 = 255;
/// Gray level written for pixels on the "off" side of a threshold.
pub const BLACK: u8 = 0;

/// Depth used when the requested depth is out of range.
pub const FULL_DEPTH: u16 = 256;

/// Pixel-value policy applied during reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Nearest source pixel, unmodified.
    NearestCopy,

    /// Nearest source pixel, optionally binarized.
    ///
    /// `threshold: None` keeps full grayscale.
    NearestThreshold {
        threshold: Option<u8>,
        inversion: bool,
    },

    /// Block average, always binarized. There is no grayscale mode.
    AverageThreshold { threshold: u8, inversion: bool },

    /// Nearest source pixel, quantized to `depth` gray levels.
    Quantize { depth: u16 },
}

impl Transform {
    /// `NearestThreshold` from a raw threshold where any negative value
    /// disables thresholding. Values above 255 saturate to 255.
    pub fn nearest_threshold(threshold: i32, inversion: bool) -> Self {
        let threshold = (threshold >= 0).then(|| threshold.min(255) as u8);
        Transform::NearestThreshold {
            threshold,
            inversion,
        }
    }

    /// Reduce a 96x96 camera frame to a 32x32 BMP.
    pub fn apply(&self, source: &[u8]) -> Result<TargetBmp, BmpError> {
        let mut out = [0u8; TARGET_FILE_SIZE];
        self.apply_into(&Sampler::CAMERA, source, &mut out)?;
        Ok(out)
    }

    /// Reduce `source` into `out` using an arbitrary whole-factor sampler.
    ///
    /// Returns the number of bytes written (the target file size). `out`
    /// must be at least that long; bytes past it are left untouched.
    pub fn apply_into(
        &self,
        sampler: &Sampler,
        source: &[u8],
        out: &mut [u8],
    ) -> Result<usize, BmpError> {
        let source = BmpRef::parse(source, sampler.source())?;
        let target = sampler.target();
        let written = target.file_size();
        if out.len() < written {
            return Err(Malformed::TooShort {
                len: out.len(),
                needed: written,
            }
            .into());
        }

        out[..PIXEL_DATA_OFFSET].copy_from_slice(&build_header(target, source.palette()));

        let stride = target.row_stride();
        for dy in 0..target.height {
            let start = PIXEL_DATA_OFFSET + dy * stride;
            let row = &mut out[start..start + stride];
            for (dx, pixel) in row[..target.width].iter_mut().enumerate() {
                *pixel = self.sample(sampler, &source, dx, dy);
            }
            row[target.width..].fill(0);
        }

        Ok(written)
    }

    #[inline]
    fn sample(&self, sampler: &Sampler, source: &BmpRef<'_>, dx: usize, dy: usize) -> u8 {
        match *self {
            Transform::NearestCopy => sampler.sample_nearest(source, dx, dy),
            Transform::NearestThreshold {
                threshold,
                inversion,
            } => {
                let value = sampler.sample_nearest(source, dx, dy);
                match threshold {
                    Some(threshold) => binarize(value, threshold, inversion),
                    None => value,
                }
            }
            Transform::AverageThreshold {
                threshold,
                inversion,
            } => binarize(
                sampler.sample_average(source, dx, dy),
                threshold,
                inversion,
            ),
            Transform::Quantize { depth } => {
                quantize(sampler.sample_nearest(source, dx, dy), depth)
            }
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let invert = |inversion: bool| if inversion { ", inverted" } else { "" };
        match *self {
            Transform::NearestCopy => write!(f, "nearest-copy"),
            Transform::NearestThreshold {
                threshold: None, ..
            } => write!(f, "nearest-threshold(off)"),
            Transform::NearestThreshold {
                threshold: Some(t),
                inversion,
            } => write!(f, "nearest-threshold({t}{})", invert(inversion)),
            Transform::AverageThreshold {
                threshold,
                inversion,
            } => write!(f, "average-threshold({threshold}{})", invert(inversion)),
            Transform::Quantize { depth } => write!(f, "quantize({})", effective_depth(depth)),
        }
    }
}

/// Map `value` to [`WHITE`] when it reaches `threshold`, else [`BLACK`].
/// `inversion` swaps the two outputs.
#[inline]
pub fn binarize(value: u8, threshold: u8, inversion: bool) -> u8 {
    if (value >= threshold) != inversion {
        WHITE
    } else {
        BLACK
    }
}

/// Depth actually used for quantization: 2..=256, anything else is 256.
#[inline]
pub fn effective_depth(depth: u16) -> u16 {
    if (2..=FULL_DEPTH).contains(&depth) {
        depth
    } else {
        FULL_DEPTH
    }
}

/// Quantize `value` to the midpoint of its bucket among `depth` equal ranges.
///
/// The range size is `256 / depth` (floor). When the buckets do not divide
/// 256 evenly the top bucket's midpoint can exceed 255 and is clamped.
#[inline]
pub fn quantize(value: u8, depth: u16) -> u8 {
    let range = 256 / u32::from(effective_depth(depth));
    let level = u32::from(value) / range;
    (level * range + range / 2).min(255) as u8
}
