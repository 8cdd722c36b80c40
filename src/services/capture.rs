use crate::models::{CameraConfig, SourceConfig};
use bmp_reduce::{encode, identity_palette, Geometry};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Produces 96x96 grayscale BMP frames.
///
/// `None` means the capture failed transiently and the caller should try
/// again on the next cycle.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Vec<u8>>;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to read frame directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No .bmp frames found in {0}")]
    NoFrames(PathBuf),
}

/// Build the frame source selected in the camera config.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    tracing::debug!(pins = ?config.pins, xclk_freq = config.xclk_freq, "Camera wiring");
    match &config.source {
        SourceConfig::Synthetic => {
            tracing::info!("Using synthetic frame source");
            Ok(Box::new(SyntheticSource::new()))
        }
        SourceConfig::Replay { dir } => {
            let source = ReplaySource::open(dir)?;
            tracing::info!(
                dir = %dir.display(),
                frames = source.len(),
                "Using replay frame source"
            );
            Ok(Box::new(source))
        }
    }
}

/// Deterministic diagonal gradient that shifts a little on every capture.
#[derive(Debug, Default)]
pub struct SyntheticSource {
    phase: usize,
}

/// Gradient shift per captured frame
const PHASE_STEP: usize = 8;

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn pixels(&self) -> Vec<u8> {
        let Geometry { width, height } = Geometry::SOURCE;
        let offset = self.phase * PHASE_STEP;
        (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x + y + offset) % 256) as u8))
            .collect()
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        let frame = encode(Geometry::SOURCE, &identity_palette(), &self.pixels());
        self.phase = self.phase.wrapping_add(1);
        match frame {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(%e, "Failed to encode synthetic frame");
                None
            }
        }
    }
}

/// Cycles through recorded `*.bmp` frames in file name order.
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<PathBuf>,
    next: usize,
}

impl ReplaySource {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let entries = fs::read_dir(dir).map_err(|source| CaptureError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut frames: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("bmp"))
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::NoFrames(dir.to_path_buf()));
        }
        Ok(Self { frames, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self) -> Option<Vec<u8>> {
        let path = self.frames.get(self.next)?;
        self.next = (self.next + 1) % self.frames.len();
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), %e, "Failed to read replay frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmp_reduce::{BmpRef, SOURCE_FILE_SIZE};
    use tempfile::TempDir;

    #[test]
    fn test_synthetic_frames_are_valid_source_bmps() {
        let mut source = SyntheticSource::new();
        for _ in 0..3 {
            let frame = source.capture().unwrap();
            assert_eq!(frame.len(), SOURCE_FILE_SIZE);
            assert!(BmpRef::parse(&frame, Geometry::SOURCE).is_ok());
        }
    }

    #[test]
    fn test_synthetic_frames_move() {
        let mut source = SyntheticSource::new();
        let first = source.capture().unwrap();
        let second = source.capture().unwrap();
        assert_ne!(first, second);

        let mut again = SyntheticSource::new();
        assert_eq!(again.capture().unwrap(), first);
    }

    #[test]
    fn test_replay_cycles_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.bmp"), b"second").unwrap();
        fs::write(dir.path().join("a.bmp"), b"first").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source = ReplaySource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.capture().unwrap(), b"first");
        assert_eq!(source.capture().unwrap(), b"second");
        assert_eq!(source.capture().unwrap(), b"first");
    }

    #[test]
    fn test_replay_vanished_file_is_transient() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bmp");
        fs::write(&path, b"frame").unwrap();
        let mut source = ReplaySource::open(dir.path()).unwrap();

        fs::remove_file(&path).unwrap();
        assert_eq!(source.capture(), None);
    }

    #[test]
    fn test_replay_empty_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ReplaySource::open(dir.path()),
            Err(CaptureError::NoFrames(_))
        ));
    }

    #[test]
    fn test_open_source_synthetic() {
        let mut source = open_source(&CameraConfig::default()).unwrap();
        assert!(source.capture().is_some());
    }
}
