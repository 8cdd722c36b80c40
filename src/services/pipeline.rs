use crate::error::FrameError;
use crate::models::Prediction;
use crate::services::inference::Classifier;
use bmp_reduce::{strip_header, Transform};

/// Bytes shown in per-frame debug logs
const SAMPLE_BYTES: usize = 8;

/// Camera frame in, class prediction out.
///
/// Owns the probability buffer so successive frames reuse one allocation.
pub struct FramePipeline {
    transform: Transform,
    classifier: Box<dyn Classifier>,
    probabilities: Vec<f32>,
    recognition_threshold: f32,
}

impl FramePipeline {
    pub fn new(
        transform: Transform,
        classifier: Box<dyn Classifier>,
        recognition_threshold: f32,
    ) -> Self {
        let probabilities = vec![0.0; classifier.classes()];
        Self {
            transform,
            classifier,
            probabilities,
            recognition_threshold,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Reduce, strip and classify one 96x96 frame.
    pub fn process(&mut self, frame: &[u8]) -> Result<Prediction, FrameError> {
        debug_data("frame", frame);
        let reduced = self.transform.apply(frame)?;
        let pixels = strip_header(&reduced)?;
        debug_data("input", pixels);

        self.classifier.run(pixels, &mut self.probabilities)?;
        tracing::debug!(probabilities = ?self.probabilities, "Inference done");

        let prediction = Prediction::from_probabilities(&self.probabilities)
            .ok_or(FrameError::EmptyPrediction)?;
        if prediction.confidence < self.recognition_threshold {
            tracing::info!(
                class = %prediction.label,
                confidence = prediction.confidence,
                threshold = self.recognition_threshold,
                "Low-confidence prediction"
            );
        }
        Ok(prediction)
    }

    /// Scores from the most recent `process` call
    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }
}

fn debug_data(what: &str, data: &[u8]) {
    let head = &data[..data.len().min(SAMPLE_BYTES)];
    tracing::debug!(what, bytes = data.len(), head = ?head, "Frame data");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassLabel;
    use crate::services::inference::InferenceError;
    use bmp_reduce::{encode, identity_palette, BmpError, Geometry, TARGET_PIXELS};

    /// Scores the mean brightness as class 0, its inverse as class 1.
    struct MeanClassifier;

    impl Classifier for MeanClassifier {
        fn run(
            &mut self,
            pixels: &[u8; TARGET_PIXELS],
            out: &mut [f32],
        ) -> Result<(), InferenceError> {
            let mean = pixels.iter().map(|&p| f32::from(p)).sum::<f32>() / (255.0 * 1024.0);
            out.copy_from_slice(&[mean, 1.0 - mean, 0.0]);
            Ok(())
        }

        fn classes(&self) -> usize {
            3
        }
    }

    fn pipeline() -> FramePipeline {
        FramePipeline::new(
            Transform::AverageThreshold {
                threshold: 128,
                inversion: false,
            },
            Box::new(MeanClassifier),
            0.74,
        )
    }

    fn frame(value: u8) -> Vec<u8> {
        encode(Geometry::SOURCE, &identity_palette(), &[value; 96 * 96]).unwrap()
    }

    #[test]
    fn test_bright_frame_predicts_rock() {
        let mut pipeline = pipeline();
        let prediction = pipeline.process(&frame(200)).unwrap();
        assert_eq!(prediction.label, ClassLabel::Rock);
        assert_eq!(pipeline.probabilities(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dark_frame_predicts_paper() {
        let mut pipeline = pipeline();
        assert_eq!(pipeline.process(&frame(10)).unwrap().label, ClassLabel::Paper);
    }

    #[test]
    fn test_probabilities_overwritten_each_frame() {
        let mut pipeline = pipeline();
        pipeline.process(&frame(200)).unwrap();
        pipeline.process(&frame(10)).unwrap();
        assert_eq!(pipeline.probabilities(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let mut pipeline = pipeline();
        let err = pipeline.process(&frame(0)[..500]).unwrap_err();
        assert!(matches!(err, FrameError::Bmp(BmpError::MalformedInput(_))));
    }
}
