use crate::assets::AssetLoader;
use crate::error::ConfigError;
use bmp_reduce::Transform;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Application configuration loaded from config.yaml
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Socket server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Credentials a client must present in the handshake
    #[serde(default)]
    pub credentials: Credentials,

    /// Camera wiring and host-side frame source
    #[serde(default)]
    pub camera: CameraConfig,

    /// CNN model artifact
    #[serde(default)]
    pub model: ModelConfig,

    /// Frame reduction settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Delay between frames sent to a client
    #[serde(default = "default_frame_interval")]
    pub frame_interval_secs: u64,

    /// Maximum bytes read for the authentication request
    #[serde(default = "default_auth_read_limit")]
    pub auth_read_limit: usize,

    /// How long a freshly connected client has to authenticate
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:9999".to_string()
}

fn default_frame_interval() -> u64 {
    3
}

fn default_auth_read_limit() -> usize {
    200
}

fn default_auth_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            frame_interval_secs: default_frame_interval(),
            auth_read_limit: default_auth_read_limit(),
            auth_timeout_secs: default_auth_timeout(),
        }
    }
}

/// Username and password compared case-sensitively during the handshake.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("camera", "change-me")
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Camera wiring, handed to the capture backend at construction.
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub pins: CameraPins,

    #[serde(default = "default_xclk_freq")]
    pub xclk_freq: u32,

    #[serde(default)]
    pub source: SourceConfig,
}

fn default_xclk_freq() -> u32 {
    20_000_000
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pins: CameraPins::default(),
            xclk_freq: default_xclk_freq(),
            source: SourceConfig::default(),
        }
    }
}

/// OV2640 pin assignment. `-1` marks an unconnected pin.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CameraPins {
    pub data: [i32; 8],
    pub vsync: i32,
    pub href: i32,
    pub sda: i32,
    pub scl: i32,
    pub pclk: i32,
    pub xclk: i32,
    #[serde(default = "unconnected")]
    pub powerdown: i32,
    #[serde(default = "unconnected")]
    pub reset: i32,
}

fn unconnected() -> i32 {
    -1
}

impl Default for CameraPins {
    fn default() -> Self {
        Self {
            data: [15, 17, 18, 16, 14, 12, 11, 48],
            vsync: 38,
            href: 47,
            sda: 40,
            scl: 39,
            pclk: 13,
            xclk: 10,
            powerdown: -1,
            reset: -1,
        }
    }
}

/// Where frames come from when no camera is attached.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Generated moving test pattern
    #[default]
    Synthetic,
    /// Cycle through the *.bmp files of a directory
    Replay { dir: PathBuf },
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Confidence below which predictions are logged as uncertain
    #[serde(default = "default_recognition_threshold")]
    pub recognition_threshold: f32,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.tmdl")
}

fn default_recognition_threshold() -> f32 {
    0.74
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            recognition_threshold: default_recognition_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Transform selection as written in YAML.
///
/// Thresholds are raw integers so that `-1` can disable thresholding for
/// `nearest_threshold`, matching the camera firmware's convention.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    NearestCopy,
    NearestThreshold {
        #[serde(default = "disabled_threshold")]
        threshold: i32,
        #[serde(default)]
        inversion: bool,
    },
    AverageThreshold {
        #[serde(default = "default_threshold")]
        threshold: i32,
        #[serde(default)]
        inversion: bool,
    },
    Quantize {
        depth: i32,
    },
}

fn disabled_threshold() -> i32 {
    -1
}

fn default_threshold() -> i32 {
    128
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig::AverageThreshold {
            threshold: default_threshold(),
            inversion: false,
        }
    }
}

/// Transform selector without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    NearestCopy,
    NearestThreshold,
    AverageThreshold,
    Quantize,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::NearestCopy => "nearest_copy",
            TransformKind::NearestThreshold => "nearest_threshold",
            TransformKind::AverageThreshold => "average_threshold",
            TransformKind::Quantize => "quantize",
        }
    }
}

/// Command-line adjustments laid over a configured transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOverrides {
    pub kind: Option<TransformKind>,
    pub threshold: Option<i32>,
    pub invert: bool,
    pub depth: Option<i32>,
}

impl TransformConfig {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformConfig::NearestCopy => TransformKind::NearestCopy,
            TransformConfig::NearestThreshold { .. } => TransformKind::NearestThreshold,
            TransformConfig::AverageThreshold { .. } => TransformKind::AverageThreshold,
            TransformConfig::Quantize { .. } => TransformKind::Quantize,
        }
    }

    /// Apply `overrides` on top of `self`.
    ///
    /// A different `kind` starts from that kind's defaults, otherwise the
    /// configured parameters are kept unless a flag replaces them. `invert`
    /// only ever turns inversion on. A flag the resulting transform has no
    /// use for is an error.
    pub fn with_overrides(
        self,
        overrides: &TransformOverrides,
    ) -> Result<TransformConfig, ConfigError> {
        let kind = overrides.kind.unwrap_or(self.kind());
        let base = if kind == self.kind() {
            self
        } else {
            TransformConfig::defaults_for(kind)
        };

        let unused = |flag: &'static str| ConfigError::UnusedOverride {
            flag,
            transform: kind.as_str(),
        };
        let threshold_flags = || match (overrides.threshold, overrides.invert) {
            (Some(_), _) => Err(unused("--threshold")),
            (None, true) => Err(unused("--invert")),
            (None, false) => Ok(()),
        };

        match base {
            TransformConfig::NearestCopy => {
                threshold_flags()?;
                if overrides.depth.is_some() {
                    return Err(unused("--depth"));
                }
                Ok(base)
            }
            TransformConfig::NearestThreshold {
                threshold,
                inversion,
            } => {
                if overrides.depth.is_some() {
                    return Err(unused("--depth"));
                }
                Ok(TransformConfig::NearestThreshold {
                    threshold: overrides.threshold.unwrap_or(threshold),
                    inversion: inversion || overrides.invert,
                })
            }
            TransformConfig::AverageThreshold {
                threshold,
                inversion,
            } => {
                if overrides.depth.is_some() {
                    return Err(unused("--depth"));
                }
                Ok(TransformConfig::AverageThreshold {
                    threshold: overrides.threshold.unwrap_or(threshold),
                    inversion: inversion || overrides.invert,
                })
            }
            TransformConfig::Quantize { depth } => {
                threshold_flags()?;
                Ok(TransformConfig::Quantize {
                    depth: overrides.depth.unwrap_or(depth),
                })
            }
        }
    }

    fn defaults_for(kind: TransformKind) -> TransformConfig {
        match kind {
            TransformKind::NearestCopy => TransformConfig::NearestCopy,
            TransformKind::NearestThreshold => TransformConfig::NearestThreshold {
                threshold: disabled_threshold(),
                inversion: false,
            },
            TransformKind::AverageThreshold => TransformConfig::default(),
            TransformKind::Quantize => TransformConfig::Quantize { depth: 256 },
        }
    }

    /// Convert to a core [`Transform`], rejecting out-of-range thresholds.
    pub fn to_transform(&self) -> Result<Transform, ConfigError> {
        match *self {
            TransformConfig::NearestCopy => Ok(Transform::NearestCopy),
            TransformConfig::NearestThreshold {
                threshold,
                inversion,
            } => {
                if threshold > 255 {
                    return Err(ConfigError::ThresholdOutOfRange {
                        transform: "nearest_threshold",
                        threshold,
                    });
                }
                Ok(Transform::nearest_threshold(threshold, inversion))
            }
            TransformConfig::AverageThreshold {
                threshold,
                inversion,
            } => {
                let threshold =
                    u8::try_from(threshold).map_err(|_| ConfigError::ThresholdOutOfRange {
                        transform: "average_threshold",
                        threshold,
                    })?;
                Ok(Transform::AverageThreshold {
                    threshold,
                    inversion,
                })
            }
            // Out-of-range depths are handled by the quantizer itself.
            TransformConfig::Quantize { depth } => Ok(Transform::Quantize {
                depth: depth.clamp(0, i32::from(u16::MAX)) as u16,
            }),
        }
    }
}

impl AppConfig {
    /// Load configuration from AssetLoader (embedded or external)
    pub fn load_from_assets(loader: &AssetLoader) -> Result<Self, ConfigError> {
        let content = loader.read_config_string()?;
        let config = Self::from_yaml(&content)?;
        tracing::info!(
            bind_addr = %config.server.bind_addr,
            transform = ?config.pipeline.transform,
            source = ?config.camera.source,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(ConfigError::EmptyCredentials);
        }
        if self.credentials.username.contains(['/', ' '])
            || self.credentials.password.contains(['/', ' '])
        {
            return Err(ConfigError::UnusableCredentials);
        }
        if !(0.0..=1.0).contains(&self.model.recognition_threshold) {
            return Err(ConfigError::RecognitionThreshold(
                self.model.recognition_threshold,
            ));
        }
        self.pipeline.transform.to_transform()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_addr, "0.0.0.0:9999");
        assert_eq!(config.server.frame_interval_secs, 3);
        assert_eq!(config.server.auth_read_limit, 200);
        assert_eq!(config.camera.source, SourceConfig::Synthetic);
        assert_eq!(config.camera.xclk_freq, 20_000_000);
        assert!((config.model.recognition_threshold - 0.74).abs() < f32::EPSILON);
        assert_eq!(
            config.pipeline.transform,
            TransformConfig::AverageThreshold {
                threshold: 128,
                inversion: false
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embedded_config_parses() {
        let loader = AssetLoader::new(None);
        let config = AppConfig::load_from_assets(&loader).unwrap();
        assert_eq!(config.camera.pins, CameraPins::default());
        assert_eq!(config.pipeline.transform, TransformConfig::default());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
server:
  bind_addr: "127.0.0.1:7000"
  frame_interval_secs: 1
credentials:
  username: Yatin
  password: "210899"
camera:
  source:
    kind: replay
    dir: /tmp/frames
pipeline:
  transform:
    kind: nearest_threshold
    inversion: true
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.server.auth_read_limit, 200);
        assert!(config.credentials.matches("Yatin", "210899"));
        assert_eq!(
            config.camera.source,
            SourceConfig::Replay {
                dir: PathBuf::from("/tmp/frames")
            }
        );
        assert_eq!(
            config.pipeline.transform,
            TransformConfig::NearestThreshold {
                threshold: -1,
                inversion: true
            }
        );
    }

    #[test]
    fn test_transform_conversion() {
        assert_eq!(
            TransformConfig::NearestThreshold {
                threshold: -1,
                inversion: false
            }
            .to_transform()
            .unwrap(),
            Transform::NearestThreshold {
                threshold: None,
                inversion: false
            }
        );
        assert_eq!(
            TransformConfig::Quantize { depth: -5 }.to_transform().unwrap(),
            Transform::Quantize { depth: 0 }
        );
        assert_eq!(
            TransformConfig::Quantize { depth: 100_000 }
                .to_transform()
                .unwrap(),
            Transform::Quantize { depth: u16::MAX }
        );
    }

    #[test]
    fn test_average_threshold_has_no_passthrough() {
        let err = TransformConfig::AverageThreshold {
            threshold: -1,
            inversion: false,
        }
        .to_transform()
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ThresholdOutOfRange {
                transform: "average_threshold",
                threshold: -1
            }
        ));
    }

    #[test]
    fn test_overrides_adjust_configured_transform() {
        let configured = TransformConfig::default();
        let overrides = TransformOverrides {
            threshold: Some(50),
            ..Default::default()
        };
        let transform = configured.with_overrides(&overrides).unwrap();
        assert_eq!(
            transform,
            TransformConfig::AverageThreshold {
                threshold: 50,
                inversion: false,
            }
        );

        // A flat 60 frame is above the lowered threshold.
        let frame = bmp_reduce::encode(
            bmp_reduce::Geometry::SOURCE,
            &bmp_reduce::identity_palette(),
            &[60u8; bmp_reduce::Geometry::SOURCE.pixel_count()],
        )
        .unwrap();
        let reduced = transform.to_transform().unwrap().apply(&frame).unwrap();
        let pixels = bmp_reduce::strip_header(&reduced).unwrap();
        assert!(pixels.iter().all(|&p| p == 255));
    }

    #[test]
    fn test_overrides_keep_configured_parameters() {
        let configured = TransformConfig::NearestThreshold {
            threshold: 90,
            inversion: false,
        };
        let overrides = TransformOverrides {
            invert: true,
            ..Default::default()
        };
        assert_eq!(
            configured.with_overrides(&overrides).unwrap(),
            TransformConfig::NearestThreshold {
                threshold: 90,
                inversion: true,
            }
        );
        assert_eq!(
            configured
                .with_overrides(&TransformOverrides::default())
                .unwrap(),
            configured
        );
    }

    #[test]
    fn test_kind_override_starts_from_defaults() {
        let configured = TransformConfig::AverageThreshold {
            threshold: 200,
            inversion: true,
        };
        let overrides = TransformOverrides {
            kind: Some(TransformKind::NearestThreshold),
            ..Default::default()
        };
        assert_eq!(
            configured.with_overrides(&overrides).unwrap(),
            TransformConfig::NearestThreshold {
                threshold: -1,
                inversion: false,
            }
        );

        let overrides = TransformOverrides {
            kind: Some(TransformKind::Quantize),
            depth: Some(4),
            ..Default::default()
        };
        assert_eq!(
            configured.with_overrides(&overrides).unwrap(),
            TransformConfig::Quantize { depth: 4 }
        );
    }

    #[test]
    fn test_overrides_reject_unused_flags() {
        let depth_on_threshold = TransformOverrides {
            depth: Some(4),
            ..Default::default()
        };
        let err = TransformConfig::default()
            .with_overrides(&depth_on_threshold)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnusedOverride {
                flag: "--depth",
                transform: "average_threshold",
            }
        ));

        let threshold_on_quantize = TransformOverrides {
            threshold: Some(10),
            ..Default::default()
        };
        let err = TransformConfig::Quantize { depth: 4 }
            .with_overrides(&threshold_on_quantize)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnusedOverride {
                flag: "--threshold",
                ..
            }
        ));

        let invert_on_copy = TransformOverrides {
            kind: Some(TransformKind::NearestCopy),
            invert: true,
            ..Default::default()
        };
        assert!(TransformConfig::default()
            .with_overrides(&invert_on_copy)
            .is_err());
    }

    #[test]
    fn test_validate_rejects_empty_credentials() {
        let yaml = "credentials:\n  username: \"\"\n  password: x\n";
        assert!(matches!(
            AppConfig::from_yaml(yaml),
            Err(ConfigError::EmptyCredentials)
        ));
    }

    #[test]
    fn test_validate_rejects_slash_in_credentials() {
        let yaml = "credentials:\n  username: a/b\n  password: x\n";
        assert!(matches!(
            AppConfig::from_yaml(yaml),
            Err(ConfigError::UnusableCredentials)
        ));
    }

    #[test]
    fn test_validate_rejects_recognition_threshold() {
        let yaml = "model:\n  recognition_threshold: 1.5\n";
        assert!(matches!(
            AppConfig::from_yaml(yaml),
            Err(ConfigError::RecognitionThreshold(_))
        ));
    }

    #[test]
    fn test_credentials_are_case_sensitive() {
        let credentials = Credentials::new("Yatin", "Secret");
        assert!(credentials.matches("Yatin", "Secret"));
        assert!(!credentials.matches("yatin", "Secret"));
        assert!(!credentials.matches("Yatin", "secret"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("user", "hunter2"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
