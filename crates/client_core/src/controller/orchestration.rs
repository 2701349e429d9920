//! Runs controller effects against the prediction service.

use tracing::{info, warn};

use crate::{
    api::{Authenticator, Predictor},
    controller::events::{Effect, Event},
};

pub async fn run_effect<A, P>(authenticator: &A, predictor: &P, effect: Effect) -> Event
where
    A: Authenticator + ?Sized,
    P: Predictor + ?Sized,
{
    match effect {
        Effect::Authenticate { username, password } => {
            match authenticator.authenticate(&username, &password).await {
                Ok(token) => Event::AuthSucceeded(token),
                Err(error) => {
                    warn!(username = %username, cause = %error.cause, "authentication failed");
                    Event::AuthFailed(error)
                }
            }
        }
        Effect::Predict {
            selection,
            image,
            token,
        } => match predictor.predict(&image, token.as_ref()).await {
            Ok(prediction) => {
                info!(
                    selection = selection.0,
                    label = %prediction.label,
                    confidence = prediction.confidence_fraction,
                    "prediction received"
                );
                Event::PredictionSucceeded {
                    selection,
                    prediction,
                }
            }
            Err(error) => {
                warn!(selection = selection.0, cause = %error.cause, "prediction failed");
                Event::PredictionFailed { selection, error }
            }
        },
    }
}
