//! Wire protocol between the camera and its clients.
//!
//! After a successful handshake the server repeats, until the client goes
//! away:
//!
//! ```text
//! [10294 bytes: unmodified 96x96 BMP]["PREDICTION: <label>\n"]
//! ```

pub mod auth;
pub mod wire;

/// Bytes of raw frame preceding each prediction line.
pub const TOTAL_FRAME_SIZE: usize = bmp_reduce::SOURCE_FILE_SIZE;

pub const PREDICTION_PREFIX: &str = "PREDICTION: ";

pub use auth::{build_auth_request, parse_auth_request, verify, AuthError, AuthRequest};
pub use wire::{format_prediction, parse_prediction_line, PredictionLineError};
