//! Avatar and cover image uploads.

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::backend::MediaBackend;
use crate::client::ApiError;
use crate::controller::{FormController, Submitter};
use crate::notify::Notifier;
use crate::schema::COVER_IMAGE;

/// A file selected for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("The selected file is empty")]
    Empty,
    #[error("The file is too large ({size} bytes, limit {max} bytes)")]
    TooLarge { size: usize, max: usize },
    #[error("Only images can be uploaded (got {0})")]
    NotAnImage(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MediaError {
    /// Text suitable for an error toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl MediaUpload {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Check the file before any bytes leave the client.
    ///
    /// # Errors
    ///
    /// Returns an error for empty files, files above `max_bytes`, and
    /// anything that is not `image/*`.
    pub fn validate(&self, max_bytes: usize) -> Result<(), MediaError> {
        if self.bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if self.bytes.len() > max_bytes {
            return Err(MediaError::TooLarge {
                size: self.bytes.len(),
                max: max_bytes,
            });
        }
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.split_once('/') {
            Some(("image", subtype)) if !subtype.is_empty() => Ok(()),
            _ => Err(MediaError::NotAnImage(self.content_type.clone())),
        }
    }
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    /// Form field the uploaded URL is written into.
    #[must_use]
    pub const fn form_key(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::CoverImage => COVER_IMAGE,
        }
    }
}

/// Validate and upload an image, then store its URL in the form.
///
/// Both outcomes are reported as toasts. The form is only touched on
/// success.
///
/// # Errors
///
/// Returns the validation or upload failure.
#[instrument(skip(backend, form, upload), fields(slot = ?slot, file_name = %upload.file_name))]
pub async fn upload_image<B, S, N>(
    backend: &B,
    form: &FormController<S, N>,
    slot: ImageSlot,
    upload: MediaUpload,
    max_bytes: usize,
) -> Result<String, MediaError>
where
    B: MediaBackend + ?Sized,
    S: Submitter,
    N: Notifier,
{
    let result = async {
        upload.validate(max_bytes)?;
        Ok::<_, MediaError>(backend.upload(upload).await?)
    }
    .await;

    match result {
        Ok(url) => {
            form.change(slot.form_key(), Value::String(url.clone()));
            form.notifier().success("Image uploaded");
            Ok(url)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Image upload failed");
            form.notifier().error(e.user_message());
            Err(e)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload() {
        let png = MediaUpload::new("a.png", "image/png", vec![1, 2, 3]);
        assert!(png.validate(10).is_ok());
        assert!(matches!(
            png.validate(2),
            Err(MediaError::TooLarge { size: 3, max: 2 })
        ));

        let empty = MediaUpload::new("a.png", "image/png", Vec::new());
        assert!(matches!(empty.validate(10), Err(MediaError::Empty)));

        let pdf = MediaUpload::new("a.pdf", "application/pdf", vec![1]);
        assert!(matches!(pdf.validate(10), Err(MediaError::NotAnImage(_))));

        let svg = MediaUpload::new("a.svg", "Image/SVG+XML; charset=utf-8", vec![1]);
        assert!(svg.validate(10).is_ok());
    }

    #[test]
    fn test_slot_keys() {
        assert_eq!(ImageSlot::Avatar.form_key(), "avatar");
        assert_eq!(ImageSlot::CoverImage.form_key(), "coverImage");
    }
}
