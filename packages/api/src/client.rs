//! Thin JSON client for the prospecting backend.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::settings::ApiSettings;

/// Prefix of every feature route.
pub(crate) const ROUTES: &str = "/routes";

/// Backend health report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn from_settings(settings: &ApiSettings) -> Self {
        let client = Self::new(&settings.base_url);
        match &settings.token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }

    /// Builder method to attach the identity provider's id token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Swap the token after a refresh or sign-out.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode its JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.bytes().await?;
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "backend request failed");
            return Err(status_error(status.as_u16(), &body));
        }
        debug!(%url, bytes = body.len(), "backend response");
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.send_json(self.request(Method::GET, "/_healthz")).await
    }
}

/// Map a non-success response to [`ApiError::Status`], preferring the JSON `detail` field.
pub(crate) fn status_error(status: u16, body: &[u8]) -> ApiError {
    let detail = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => match fields.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => Value::Object(fields).to_string(),
        },
        _ => String::from_utf8_lossy(body).trim().to_string(),
    };
    ApiError::Status { status, detail }
}
