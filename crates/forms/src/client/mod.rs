//! HTTP client for the Hearth backend.
//!
//! All endpoints speak JSON. Failures come back as a non-2xx status with a
//! `{ "error": "..." }` body; the message is surfaced through
//! [`ApiError::user_message`].
//!
//! # Endpoints
//!
//! - `GET /settings/{category}` / `PUT /settings/{category}`
//! - `GET /profile/{id}` / `PUT /profile/{id}`
//! - `POST /setup`
//! - `POST /media/upload` (multipart, `file` part, returns `{ url }`)

mod error;

pub use error::ApiError;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use hearth_core::{Setting, SettingCategory, SettingUpdate, UserId, UserProfile};

use crate::backend::{MediaBackend, ProfileBackend, SettingsBackend, SetupBackend};
use crate::config::ClientConfig;
use crate::media::MediaUpload;
use crate::payload::FormPayload;
use crate::wizard::SetupPayload;

/// Error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Body of a successful media upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Backend API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = config.bearer() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL from path segments. Segments are
    /// percent-encoded, so IDs cannot escape their position.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Parse("Base URL cannot carry a path".to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let response = self.inner.client.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn send_json<B: serde::Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(segments)?;
        let response = self
            .inner
            .client
            .request(method, url)
            .json(body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::parse_error(response).await)
        }
    }

    /// Send a form payload to an arbitrary endpoint.
    ///
    /// Returns the JSON response body, or `Value::Null` when the body is
    /// empty (`204 No Content`).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or a
    /// non-JSON response body.
    #[instrument(skip(self, payload), fields(method = %method, path = %path))]
    pub async fn submit_form(
        &self,
        method: Method,
        path: &str,
        payload: &FormPayload,
    ) -> Result<Value, ApiError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let response = self.send_json(method, &segments, payload).await?;
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Turn a non-2xx response into an error, keeping the server's message.
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            code => ApiError::Api {
                status: code,
                message,
            },
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SettingsBackend for ApiClient {
    #[instrument(skip(self), fields(category = %category))]
    async fn fetch_settings(&self, category: SettingCategory) -> Result<Vec<Setting>, ApiError> {
        let settings: Vec<Setting> = self.get(&["settings", category.as_str()]).await?;
        tracing::debug!(count = settings.len(), "Fetched settings");
        Ok(settings)
    }

    #[instrument(skip(self, updates), fields(category = %category, count = updates.len()))]
    async fn update_settings(
        &self,
        category: SettingCategory,
        updates: &[SettingUpdate],
    ) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &["settings", category.as_str()], updates)
            .await?;
        tracing::info!("Settings updated");
        Ok(())
    }
}

#[async_trait]
impl ProfileBackend for ApiClient {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn fetch_profile(&self, id: &UserId) -> Result<UserProfile, ApiError> {
        self.get(&["profile", id.as_str()]).await
    }

    #[instrument(skip(self, payload), fields(user_id = %id))]
    async fn update_profile(
        &self,
        id: &UserId,
        payload: &FormPayload,
    ) -> Result<UserProfile, ApiError> {
        let response = self
            .send_json(Method::PUT, &["profile", id.as_str()], payload)
            .await?;
        Self::handle_response(response).await
    }
}

#[async_trait]
impl MediaBackend for ApiClient {
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    async fn upload(&self, upload: MediaUpload) -> Result<String, ApiError> {
        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let url = self.endpoint(&["media", "upload"])?;
        let response = self.inner.client.post(url).multipart(form).send().await?;
        let body: UploadResponse = Self::handle_response(response).await?;
        tracing::info!(url = %body.url, "Media uploaded");
        Ok(body.url)
    }
}

#[async_trait]
impl SetupBackend for ApiClient {
    #[instrument(skip(self, payload), fields(site = %payload.site.name))]
    async fn complete_setup(&self, payload: &SetupPayload) -> Result<(), ApiError> {
        self.send_json(Method::POST, &["setup"], payload).await?;
        tracing::info!("Setup completed");
        Ok(())
    }
}
