//! Hearth Forms - settings-driven form pipeline.
//!
//! Every form in Hearth runs the same three steps:
//!
//! 1. [`loader`] fetches a settings category and parses it into a typed
//!    struct, falling back to defaults (with a toast) when that fails.
//! 2. [`schema`] turns the typed settings and the administrator's custom
//!    field definitions into a validation [`Schema`].
//! 3. [`controller`] binds the schema to form state, validates on change,
//!    blur and submit, and sends exactly one write per submission.
//!
//! The profile edit form ([`profile_form`]) joins its settings and profile
//! fetches before building anything. The setup wizard ([`wizard`]), image
//! uploads ([`media`]) and the administrator settings forms
//! ([`settings_form`]) are built from the same parts.
//!
//! All I/O goes through the traits in [`backend`]; [`ApiClient`] implements
//! them over HTTP.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod client;
pub mod config;
pub mod controller;
pub mod loader;
pub mod media;
pub mod notify;
pub mod payload;
pub mod profile_form;
pub mod schema;
pub mod settings_form;
pub mod wizard;

pub use backend::{MediaBackend, ProfileBackend, SettingsBackend, SetupBackend};
pub use client::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use controller::{EndpointSubmitter, FormController, FormError, FormState, Submitter};
pub use loader::{LoadError, load_settings, try_load_settings};
pub use media::{ImageSlot, MediaError, MediaUpload, upload_image};
pub use notify::{Notifier, Toast, ToastLevel, ToastLog, TracingNotifier};
pub use payload::{FormPayload, assemble};
pub use profile_form::{
    ProfileForm, ProfileSubmitter, initial_values, load_profile_form, open_profile_form,
};
pub use schema::{
    FieldError, FieldRule, FormValues, RuleKind, Schema, ValidationErrors, login_schema,
    profile_schema, registration_schema,
};
pub use settings_form::{SettingsForm, SettingsSubmitter, open_settings_form, settings_schema};
pub use wizard::{SetupPayload, SetupWizard, WizardError, WizardStep};
