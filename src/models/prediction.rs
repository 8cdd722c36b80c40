use std::fmt;
use std::str::FromStr;

/// Gesture classes the model was trained on, in output-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Rock,
    Paper,
    Scissors,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 3] = [ClassLabel::Rock, ClassLabel::Paper, ClassLabel::Scissors];
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name as sent on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Rock => "Rock",
            ClassLabel::Paper => "Paper",
            ClassLabel::Scissors => "Scissors",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown class label: {}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for ClassLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Index of the largest value. Ties keep the first index; NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: ClassLabel,
    pub confidence: f32,
}

impl Prediction {
    /// Pick the most likely class. Extra trailing outputs are ignored.
    pub fn from_probabilities(probabilities: &[f32]) -> Option<Self> {
        let scores = probabilities.get(..ClassLabel::COUNT)?;
        let index = argmax(scores)?;
        Some(Self {
            label: ClassLabel::from_index(index)?,
            confidence: scores[index],
        })
    }
}
