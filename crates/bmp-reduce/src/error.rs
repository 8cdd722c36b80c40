//! Error types for buffer validation.
//!
//! Every codec and transform entry point validates buffer lengths before
//! indexing and reports failures through [`BmpError`]. Nothing in this crate
//! retries or panics on bad input.

use crate::geometry::Geometry;
use thiserror::Error;

/// Why a buffer was rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    /// Buffer is shorter than header, palette and declared pixel data.
    #[error("buffer is {len} bytes, need at least {needed}")]
    TooShort { len: usize, needed: usize },

    /// First two bytes are not `BM`.
    #[error("missing BM signature")]
    BadSignature,

    /// Header fields disagree with the geometry the caller expects.
    #[error("header declares {width}x{height} at {bits} bpp, expected {expected} at 8 bpp")]
    UnexpectedGeometry {
        width: u32,
        height: u32,
        bits: u16,
        expected: Geometry,
    },
}

/// Unified error type for the bmp-reduce API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BmpError {
    /// Buffer too short, wrong signature, or wrong geometry.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] Malformed),

    /// Extracted pixel payload does not have the expected length.
    #[error("invalid dimensions: expected {expected} pixel bytes, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    /// Source and target geometries have no whole-number reduction factor.
    #[error("cannot reduce {source_geometry} to {target_geometry} by a whole factor")]
    UnsupportedScale {
        source_geometry: Geometry,
        target_geometry: Geometry,
    },
}
