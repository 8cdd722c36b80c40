pub mod preview;

pub use preview::encode_grayscale_png;
