//! Inputs to the upload controller and the side effects it asks for.

use shared::{
    domain::{AccessToken, Prediction, SelectionId},
    error::{AuthError, PredictError},
};

use crate::api::ImageUpload;

#[derive(Debug, Clone)]
pub enum Event {
    SubmitCredentials {
        username: String,
        password: String,
    },
    AuthSucceeded(AccessToken),
    AuthFailed(AuthError),
    Logout,
    DragEntered,
    DragLeft,
    /// Selection is submission: accepting an image immediately asks for a
    /// prediction.
    ImageSelected(ImageUpload),
    /// A drop or file dialog that produced no file.
    SelectionEmpty,
    PredictionSucceeded {
        selection: SelectionId,
        prediction: Prediction,
    },
    PredictionFailed {
        selection: SelectionId,
        error: PredictError,
    },
    Clear,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitCredentials { .. } => "submit_credentials",
            Self::AuthSucceeded(_) => "auth_succeeded",
            Self::AuthFailed(_) => "auth_failed",
            Self::Logout => "logout",
            Self::DragEntered => "drag_entered",
            Self::DragLeft => "drag_left",
            Self::ImageSelected(_) => "image_selected",
            Self::SelectionEmpty => "selection_empty",
            Self::PredictionSucceeded { .. } => "prediction_succeeded",
            Self::PredictionFailed { .. } => "prediction_failed",
            Self::Clear => "clear",
        }
    }
}

/// Work the controller cannot do itself. Running an effect yields the
/// [`Event`] that completes it.
#[derive(Debug, Clone)]
pub enum Effect {
    Authenticate {
        username: String,
        password: String,
    },
    Predict {
        selection: SelectionId,
        image: ImageUpload,
        token: Option<AccessToken>,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Predict { .. } => "predict",
        }
    }
}
