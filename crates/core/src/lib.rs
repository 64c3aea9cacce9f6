//! Hearth Core - Shared types library.
//!
//! This crate provides the data model shared by every Hearth component:
//! - `forms` - Settings loading, schema building and form submission
//! - `cli` - Command-line tools for administrators
//!
//! # Architecture
//!
//! The core crate contains only types and pure parsing - no I/O, no HTTP
//! clients. Settings arrive from the backend as flat string records; they are
//! parsed exactly once into the typed structs in [`settings`] and never
//! compared as strings again.
//!
//! # Modules
//!
//! - [`types`] - Settings records, custom fields, profiles and newtype IDs
//! - [`settings`] - Typed, per-category settings with hard-coded defaults

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod settings;
pub mod types;

pub use settings::{
    CategorySettings, LoginSettings, ProfileSettings, RegistrationSettings, SettingsError,
    SettingsMap,
};
pub use types::*;
