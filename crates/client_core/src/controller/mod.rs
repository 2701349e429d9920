//! Controller layer: the login/upload state machine, its events and effects,
//! and effect orchestration.

pub mod events;
pub mod orchestration;

use shared::domain::{PredictionResult, SelectionId};
use tracing::{debug, info, warn};

use crate::{
    api::{Authenticator, ImageUpload, Predictor},
    preview::PreviewSurface,
    session::{Session, TokenStore},
};
use events::{Effect, Event};

pub const LOGIN_ERROR_MESSAGE: &str = "Invalid username or password.";
pub const PREDICT_ERROR_MESSAGE: &str = "Prediction failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Idle,
    /// A file is being dragged over the drop zone.
    AwaitingUpload,
    Predicting,
    ShowingResult,
    ShowingError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    LoggedOut,
    LoggedIn(Screen),
}

impl UiState {
    pub fn is_logged_in(self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }
}

pub struct PendingImage<H> {
    pub selection: SelectionId,
    pub image: ImageUpload,
    pub preview: Option<H>,
}

/// Owns all client-side state and decides every transition.
///
/// [`UploadController::handle`] applies one event and returns the effect, if
/// any, that the caller must run; the effect's outcome comes back as another
/// event. Prediction outcomes carry the [`SelectionId`] they were issued for
/// and are dropped when that selection is no longer the pending one.
pub struct UploadController<S: TokenStore, P: PreviewSurface> {
    session: Session<S>,
    previews: P,
    state: UiState,
    pending: Option<PendingImage<P::Handle>>,
    result: Option<PredictionResult>,
    login_error: Option<String>,
    prediction_error: Option<String>,
    login_pending: bool,
    last_selection: SelectionId,
}

impl<S: TokenStore, P: PreviewSurface> UploadController<S, P> {
    pub fn new(session: Session<S>, previews: P) -> Self {
        Self {
            session,
            previews,
            state: UiState::LoggedOut,
            pending: None,
            result: None,
            login_error: None,
            prediction_error: None,
            login_pending: false,
            last_selection: SelectionId(0),
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn pending_image(&self) -> Option<&PendingImage<P::Handle>> {
        self.pending.as_ref()
    }

    pub fn preview(&self) -> Option<&P::Handle> {
        self.pending.as_ref().and_then(|pending| pending.preview.as_ref())
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn prediction_error(&self) -> Option<&str> {
        self.prediction_error.as_deref()
    }

    pub fn is_login_pending(&self) -> bool {
        self.login_pending
    }

    pub fn is_loading(&self) -> bool {
        self.state == UiState::LoggedIn(Screen::Predicting)
    }

    pub fn previews(&self) -> &P {
        &self.previews
    }

    /// Resume a session persisted by an earlier run. Only applies while logged
    /// out; returns whether the controller is now logged in.
    pub fn resume(&mut self) -> anyhow::Result<bool> {
        if self.state != UiState::LoggedOut {
            return Ok(self.state.is_logged_in());
        }
        if self.session.restore()? {
            self.state = UiState::LoggedIn(Screen::Idle);
            info!("resumed persisted session");
            return Ok(true);
        }
        Ok(false)
    }

    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        let name = event.name();
        let before = self.state;
        let effect = match (before, event) {
            (UiState::LoggedOut, Event::SubmitCredentials { username, password }) => {
                if self.login_pending {
                    debug!("login already in flight");
                    return None;
                }
                self.login_pending = true;
                self.login_error = None;
                Some(Effect::Authenticate { username, password })
            }
            (UiState::LoggedOut, Event::AuthSucceeded(token)) => {
                self.login_pending = false;
                self.login_error = None;
                if let Err(err) = self.session.establish(token) {
                    warn!("failed to persist token: {err:#}");
                }
                self.state = UiState::LoggedIn(Screen::Idle);
                None
            }
            (UiState::LoggedOut, Event::AuthFailed(_)) => {
                self.login_pending = false;
                self.login_error = Some(LOGIN_ERROR_MESSAGE.to_string());
                None
            }
            (UiState::LoggedIn(_), Event::Logout) => {
                self.discard_selection();
                self.login_pending = false;
                self.login_error = None;
                if let Err(err) = self.session.end() {
                    warn!("failed to erase persisted token: {err:#}");
                }
                self.state = UiState::LoggedOut;
                None
            }
            (UiState::LoggedIn(Screen::Idle), Event::DragEntered) => {
                self.state = UiState::LoggedIn(Screen::AwaitingUpload);
                None
            }
            (UiState::LoggedIn(Screen::AwaitingUpload), Event::DragLeft) => {
                self.state = UiState::LoggedIn(Screen::Idle);
                None
            }
            (UiState::LoggedIn(_), Event::ImageSelected(image)) => Some(self.select(image)),
            (UiState::LoggedIn(_), Event::SelectionEmpty) => {
                self.discard_selection();
                self.state = UiState::LoggedIn(Screen::Idle);
                None
            }
            (
                UiState::LoggedIn(Screen::Predicting),
                Event::PredictionSucceeded {
                    selection,
                    prediction,
                },
            ) if self.is_pending(selection) => {
                self.result = Some(PredictionResult::from_prediction(prediction));
                self.state = UiState::LoggedIn(Screen::ShowingResult);
                None
            }
            (UiState::LoggedIn(Screen::Predicting), Event::PredictionFailed { selection, .. })
                if self.is_pending(selection) =>
            {
                self.prediction_error = Some(PREDICT_ERROR_MESSAGE.to_string());
                self.state = UiState::LoggedIn(Screen::ShowingError);
                None
            }
            (
                UiState::LoggedIn(
                    Screen::Predicting | Screen::ShowingResult | Screen::ShowingError,
                ),
                Event::Clear,
            ) => {
                self.discard_selection();
                self.state = UiState::LoggedIn(Screen::Idle);
                None
            }
            (state, event) => {
                debug!(event = event.name(), ?state, "event does not apply; ignored");
                return None;
            }
        };

        if self.state != before {
            info!(event = name, from = ?before, to = ?self.state, "state transition");
        }
        effect
    }

    /// Apply `event`, then run every effect it leads to until the controller
    /// settles. For callers that handle one user action at a time.
    pub async fn dispatch<A, Pr>(
        &mut self,
        event: Event,
        authenticator: &A,
        predictor: &Pr,
    ) -> UiState
    where
        A: Authenticator + ?Sized,
        Pr: Predictor + ?Sized,
    {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            if let Some(effect) = self.handle(event) {
                next = Some(orchestration::run_effect(authenticator, predictor, effect).await);
            }
        }
        self.state
    }

    fn is_pending(&self, selection: SelectionId) -> bool {
        let current = self.pending.as_ref().map(|pending| pending.selection);
        if current != Some(selection) {
            debug!(
                stale = selection.0,
                current = current.map(|id| id.0),
                "discarding response for superseded selection"
            );
            return false;
        }
        true
    }

    fn select(&mut self, image: ImageUpload) -> Effect {
        self.discard_selection();
        let selection = self.last_selection.next();
        self.last_selection = selection;

        let preview = self.previews.create(selection, &image);
        self.pending = Some(PendingImage {
            selection,
            image: image.clone(),
            preview,
        });
        self.state = UiState::LoggedIn(Screen::Predicting);
        info!(
            selection = selection.0,
            file = %image.file_name,
            bytes = image.bytes.len(),
            "image selected; requesting prediction"
        );
        Effect::Predict {
            selection,
            image,
            token: self.session.token().cloned(),
        }
    }

    /// Drops the pending image, its preview and any result or error together.
    fn discard_selection(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(handle) = pending.preview {
                self.previews.release(handle);
            }
        }
        self.result = None;
        self.prediction_error = None;
    }
}

impl<S: TokenStore, P: PreviewSurface> Drop for UploadController<S, P> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take().and_then(|pending| pending.preview) {
            self.previews.release(handle);
        }
    }
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
