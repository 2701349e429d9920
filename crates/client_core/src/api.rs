//! The two calls the client makes against the prediction service.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::{AccessToken, Prediction},
    error::{AuthError, FailureCause, PredictError},
    protocol::{
        PingResponse, PredictResponse, TokenRequest, TokenResponse, PING_PATH, PREDICT_FILE_FIELD,
        PREDICT_PATH, TOKEN_PATH,
    },
};
use tracing::{debug, info, warn};
use url::Url;

/// An image picked by the user, ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            file_name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<AccessToken, AuthError>;
}

#[async_trait]
pub trait Predictor: Send + Sync {
    /// An absent token is still sent; the service decides whether to accept it.
    async fn predict(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<Prediction, PredictError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, AuthError> {
        (**self).authenticate(username, password).await
    }
}

#[async_trait]
impl<T: Predictor + ?Sized> Predictor for Arc<T> {
    async fn predict(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<Prediction, PredictError> {
        (**self).predict(image, token).await
    }
}

/// `reqwest` client for the token, predict and ping endpoints.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    http: Client,
    api_base: Url,
}

impl HttpPredictionClient {
    pub fn new(api_base: Url) -> Self {
        Self::with_client(Client::new(), api_base)
    }

    pub fn with_client(http: Client, mut api_base: Url) -> Self {
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Self { http, api_base }
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_base.join(path)
    }

    pub async fn ping(&self) -> Result<String> {
        let url = self.endpoint(PING_PATH)?;
        let body: PingResponse = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()?
            .json()
            .await
            .context("ping response was not the expected JSON")?;
        Ok(body.message)
    }
}

fn transport(err: impl std::fmt::Display) -> FailureCause {
    FailureCause::Transport(err.to_string())
}

fn check_status(response: &Response) -> Result<(), FailureCause> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FailureCause::Status(status.as_u16()))
    }
}

#[async_trait]
impl Authenticator for HttpPredictionClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, AuthError> {
        let url = self
            .endpoint(TOKEN_PATH)
            .map_err(|err| AuthError::new(transport(err)))?;
        let response = self
            .http
            .post(url)
            .form(&TokenRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|err| AuthError::new(transport(err)))?;
        check_status(&response).map_err(AuthError::new)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::new(FailureCause::Malformed(err.to_string())))?;
        let token = body
            .into_token()
            .map_err(|err| AuthError::new(FailureCause::Malformed(err)))?;
        info!(username, "token issued");
        Ok(token)
    }
}

#[async_trait]
impl Predictor for HttpPredictionClient {
    async fn predict(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<Prediction, PredictError> {
        let url = self
            .endpoint(PREDICT_PATH)
            .map_err(|err| PredictError::new(transport(err)))?;

        let mut part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone());
        if let Some(mime) = image.mime_type.as_deref() {
            part = match part.mime_str(mime) {
                Ok(part) => part,
                Err(err) => {
                    warn!(mime, "ignoring unusable mime type: {err}");
                    Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone())
                }
            };
        }
        let form = Form::new().part(PREDICT_FILE_FIELD, part);

        debug!(
            file = %image.file_name,
            bytes = image.bytes.len(),
            has_token = token.is_some(),
            "posting image for prediction"
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(token.map(AccessToken::as_str).unwrap_or_default())
            .multipart(form)
            .send()
            .await
            .map_err(|err| PredictError::new(transport(err)))?;
        check_status(&response).map_err(PredictError::new)?;

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|err| PredictError::new(FailureCause::Malformed(err.to_string())))?;
        body.into_prediction()
            .map_err(|err| PredictError::new(FailureCause::Malformed(err)))
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
