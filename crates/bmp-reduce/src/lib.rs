//! bmp-reduce: fixed-geometry grayscale BMP reduction
//!
//! Turns 96x96 8-bit camera frames into 32x32 images for a tiny CNN, working
//! directly on raw BMP byte buffers. Every entry point validates lengths up
//! front and writes into a single fixed-size output buffer.
//!
//! # Quick Start
//!
//! ```
//! use bmp_reduce::{encode, identity_palette, strip_header, Geometry, Transform};
//!
//! let frame = encode(Geometry::SOURCE, &identity_palette(), &[200; 96 * 96]).unwrap();
//!
//! let reduced = Transform::AverageThreshold { threshold: 128, inversion: false }
//!     .apply(&frame)
//!     .unwrap();
//! let pixels = strip_header(&reduced).unwrap();
//!
//! assert_eq!(pixels.len(), 1024);
//! assert!(pixels.iter().all(|&p| p == 255));
//! ```
//!
//! # Layout
//!
//! ```text
//! camera frame (10294 bytes)
//!     |
//!     v
//! header::BmpRef::parse     validate length, "BM", 96x96, 8 bpp
//!     |
//!     v
//! Transform::apply          Sampler maps each 32x32 pixel to its source
//!     |                     pixel or 3x3 block (rows mirrored)
//!     v
//! 32x32 BMP (2102 bytes)
//!     |
//!     +--> strip_header     1024 raw pixels for the classifier
//!     |
//!     +--> edge::sobel      optional binarized edge map
//! ```
//!
//! # Coordinates
//!
//! Pixel coordinates are storage coordinates: `y = 0` is the first row in
//! the buffer, which BMP defines as the bottom of the picture. The sampler
//! reads source rows in mirrored order, so destination `(x, y)` takes source
//! `(3x, 95 - 3y)` for nearest sampling.

pub mod edge;
pub mod error;
pub mod geometry;
pub mod header;
pub mod sampler;
pub mod strip;
pub mod transform;


pub use edge::{sobel, EDGE_PIXELS};
pub use error::{BmpError, Malformed};
pub use geometry::{Geometry, SOURCE_FILE_SIZE, TARGET_FILE_SIZE, TARGET_PIXELS};
pub use header::{
    build_header, encode, identity_palette, pixel_data_offset, BmpRef, Palette, PIXEL_DATA_OFFSET,
};
pub use sampler::{Block, Sampler};
pub use strip::strip_header;
pub use transform::{TargetBmp, Transform};
