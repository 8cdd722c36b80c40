use super::PREDICTION_PREFIX;
use crate::models::prediction::UnknownLabel;
use crate::models::ClassLabel;

/// Line sent after every frame, newline included.
pub fn format_prediction(label: ClassLabel) -> String {
    format!("{PREDICTION_PREFIX}{label}\n")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionLineError {
    #[error("Missing '{prefix}' prefix in {0:?}", prefix = PREDICTION_PREFIX)]
    MissingPrefix(String),

    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),
}

/// Parse a prediction line. Trailing `\r` and `\n` are ignored.
pub fn parse_prediction_line(line: &str) -> Result<ClassLabel, PredictionLineError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let label = line
        .strip_prefix(PREDICTION_PREFIX)
        .ok_or_else(|| PredictionLineError::MissingPrefix(line.to_string()))?;
    Ok(label.parse()?)
}
