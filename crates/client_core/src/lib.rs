//! Client side of the melanoma prediction service: session handling, the
//! upload state machine, and the HTTP calls it drives.

pub mod api;
pub mod config;
pub mod controller;
pub mod preview;
pub mod session;

pub use api::{Authenticator, HttpPredictionClient, ImageUpload, Predictor};
pub use config::{load_settings, ClientSettings};
pub use controller::{
    events::{Effect, Event},
    orchestration::run_effect,
    PendingImage, Screen, UiState, UploadController, LOGIN_ERROR_MESSAGE, PREDICT_ERROR_MESSAGE,
};
pub use preview::{NoPreview, PreviewSurface};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
