pub mod capture;
pub mod inference;
pub mod pipeline;

pub use capture::{open_source, CaptureError, FrameSource, ReplaySource, SyntheticSource};
pub use inference::{Classifier, InferenceError, LinearClassifier, ModelArtifact};
pub use pipeline::FramePipeline;
