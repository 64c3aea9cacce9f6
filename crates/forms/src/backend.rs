//! Seams between the form pipeline and the HTTP backend.
//!
//! [`ApiClient`](crate::ApiClient) implements every trait here; tests swap
//! in in-memory backends.

use async_trait::async_trait;

use hearth_core::{Setting, SettingCategory, SettingUpdate, UserId, UserProfile};

use crate::client::ApiError;
use crate::media::MediaUpload;
use crate::payload::FormPayload;
use crate::wizard::SetupPayload;

/// `GET`/`PUT /settings/{category}`.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn fetch_settings(&self, category: SettingCategory) -> Result<Vec<Setting>, ApiError>;

    async fn update_settings(
        &self,
        category: SettingCategory,
        updates: &[SettingUpdate],
    ) -> Result<(), ApiError>;
}

/// `GET`/`PUT /profile/{id}`.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn fetch_profile(&self, id: &UserId) -> Result<UserProfile, ApiError>;

    async fn update_profile(
        &self,
        id: &UserId,
        payload: &FormPayload,
    ) -> Result<UserProfile, ApiError>;
}

/// `POST /media/upload`.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Upload a file and return its public URL.
    async fn upload(&self, upload: MediaUpload) -> Result<String, ApiError>;
}

/// `POST /setup`.
#[async_trait]
pub trait SetupBackend: Send + Sync {
    async fn complete_setup(&self, payload: &SetupPayload) -> Result<(), ApiError>;
}

#[async_trait]
impl<B: SettingsBackend + ?Sized> SettingsBackend for std::sync::Arc<B> {
    async fn fetch_settings(&self, category: SettingCategory) -> Result<Vec<Setting>, ApiError> {
        (**self).fetch_settings(category).await
    }

    async fn update_settings(
        &self,
        category: SettingCategory,
        updates: &[SettingUpdate],
    ) -> Result<(), ApiError> {
        (**self).update_settings(category, updates).await
    }
}

#[async_trait]
impl<B: ProfileBackend + ?Sized> ProfileBackend for std::sync::Arc<B> {
    async fn fetch_profile(&self, id: &UserId) -> Result<UserProfile, ApiError> {
        (**self).fetch_profile(id).await
    }

    async fn update_profile(
        &self,
        id: &UserId,
        payload: &FormPayload,
    ) -> Result<UserProfile, ApiError> {
        (**self).update_profile(id, payload).await
    }
}
