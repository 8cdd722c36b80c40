//! Tinycam
//!
//! Streams 96x96 grayscale camera frames to one authenticated TCP client at
//! a time, each followed by the gesture class predicted on its 32x32
//! reduction. This library exposes modules for integration testing.

pub mod assets;
pub mod client;
pub mod error;
pub mod models;
pub mod protocol;
pub mod rendering;
pub mod server;
pub mod services;
