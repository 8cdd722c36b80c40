use bmp_reduce::TARGET_PIXELS;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Runs the model on one stripped 32x32 frame.
///
/// Implementations write one score in `0.0..=1.0` per class into `out`.
/// Scores need not sum to one.
pub trait Classifier: Send {
    fn run(&mut self, pixels: &[u8; TARGET_PIXELS], out: &mut [f32]) -> Result<(), InferenceError>;

    /// Number of scores written by `run`
    fn classes(&self) -> usize;
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Invalid model: expected {expected} bytes, got {actual}")]
    InvalidModel { expected: usize, actual: usize },

    #[error("Output buffer holds {actual} scores, model produces {expected}")]
    OutputLength { expected: usize, actual: usize },

    #[error("Failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Model blob held in memory for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| InferenceError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Loaded model");
        Ok(Self { path, bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Single dense layer with a sigmoid on each output.
///
/// Blob layout, all little-endian `f32`: `classes * 1024` weights in class
/// major order, then `classes` biases.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl LinearClassifier {
    pub fn expected_len(classes: usize) -> usize {
        (classes * TARGET_PIXELS + classes) * 4
    }

    pub fn from_artifact(artifact: &ModelArtifact, classes: usize) -> Result<Self, InferenceError> {
        let bytes = artifact.bytes();
        let expected = Self::expected_len(classes);
        if bytes.len() != expected {
            return Err(InferenceError::InvalidModel {
                expected,
                actual: bytes.len(),
            });
        }

        let mut values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let biases = values.split_off(classes * TARGET_PIXELS);
        Ok(Self {
            weights: values,
            biases,
        })
    }

    /// Serialize weights back into the blob layout.
    pub fn to_bytes(weights: &[f32], biases: &[f32]) -> Vec<u8> {
        weights
            .iter()
            .chain(biases)
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Classifier for LinearClassifier {
    fn run(&mut self, pixels: &[u8; TARGET_PIXELS], out: &mut [f32]) -> Result<(), InferenceError> {
        if out.len() != self.biases.len() {
            return Err(InferenceError::OutputLength {
                expected: self.biases.len(),
                actual: out.len(),
            });
        }

        for ((score, row), bias) in out
            .iter_mut()
            .zip(self.weights.chunks_exact(TARGET_PIXELS))
            .zip(&self.biases)
        {
            let dot: f32 = row
                .iter()
                .zip(pixels)
                .map(|(w, &p)| w * (f32::from(p) / 255.0))
                .sum();
            *score = sigmoid(dot + bias);
        }
        Ok(())
    }

    fn classes(&self) -> usize {
        self.biases.len()
    }
}
