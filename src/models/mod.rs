pub mod config;
pub mod prediction;

pub use config::{
    AppConfig, CameraConfig, CameraPins, Credentials, ModelConfig, PipelineConfig, ServerConfig,
    SourceConfig, TransformConfig, TransformKind, TransformOverrides,
};
pub use prediction::{argmax, ClassLabel, Prediction};
