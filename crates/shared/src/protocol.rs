//! Request and response bodies of the prediction service.

use serde::{Deserialize, Serialize};

use crate::domain::{AccessToken, Prediction};

pub const TOKEN_PATH: &str = "token";
pub const PREDICT_PATH: &str = "predict";
pub const PING_PATH: &str = "ping";
/// Multipart field carrying the image bytes.
pub const PREDICT_FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn into_token(self) -> Result<AccessToken, String> {
        if self.access_token.trim().is_empty() {
            return Err("empty access_token".to_string());
        }
        Ok(AccessToken::new(self.access_token))
    }
}

/// The service reports confidence either as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(f64),
    Text(String),
}

impl Confidence {
    pub fn fraction(&self) -> Result<f64, String> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|err| format!("confidence {text:?} is not numeric: {err}"))?,
        };
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!("confidence {value} outside [0, 1]"));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: Confidence,
}

impl PredictResponse {
    pub fn into_prediction(self) -> Result<Prediction, String> {
        let confidence_fraction = self.confidence.fraction()?;
        Ok(Prediction {
            label: self.label,
            confidence_fraction,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}
