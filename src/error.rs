use bmp_reduce::BmpError;
use thiserror::Error;

use crate::services::inference::InferenceError;

/// Failures while producing or delivering a single frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("BMP error: {0}")]
    Bmp(#[from] BmpError),

    #[error("Capture failed, retrying next cycle")]
    TransientCaptureFailure,

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Classifier produced no probabilities")]
    EmptyPrediction,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Credentials must not be empty")]
    EmptyCredentials,

    #[error("Credentials must not contain '/' or spaces")]
    UnusableCredentials,

    #[error("Threshold {threshold} out of range for {transform}")]
    ThresholdOutOfRange {
        transform: &'static str,
        threshold: i32,
    },

    #[error("Recognition threshold {0} must be within 0.0..=1.0")]
    RecognitionThreshold(f32),

    #[error("{flag} does not apply to {transform}")]
    UnusedOverride {
        flag: &'static str,
        transform: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("PNG encode error: {0}")]
    PngEncode(String),

    #[error("BMP error: {0}")]
    Bmp(#[from] BmpError),
}
