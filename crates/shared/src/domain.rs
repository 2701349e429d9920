use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(SelectionId);

impl SelectionId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque bearer credential issued by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Label and confidence fraction as reported by the prediction service.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence_fraction: f64,
}

/// What the user sees: the label and the confidence scaled to a percentage
/// rounded to two decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence_percent: f64,
}

impl PredictionResult {
    pub fn from_prediction(prediction: Prediction) -> Self {
        Self {
            label: prediction.label,
            confidence_percent: fraction_to_percent(prediction.confidence_fraction),
        }
    }

    pub fn confidence_text(&self) -> String {
        format!("{:.2}%", self.confidence_percent)
    }
}

pub fn fraction_to_percent(fraction: f64) -> f64 {
    // Adding positive zero folds a negative zero into `0.0` so it never prints
    // as `-0.00%`.
    (fraction * 100.0 * 100.0).round() / 100.0 + 0.0
}
