//! Core types for Hearth.
//!
//! This module provides the data model exchanged with the backend.

pub mod custom_field;
pub mod email;
pub mod id;
pub mod profile;
pub mod setting;

pub use custom_field::{CustomField, CustomFieldError, CustomFields, FieldType, RESERVED_NAMES};
pub use email::{Email, EmailError};
pub use id::*;
pub use profile::{SocialLinks, UserProfile, Visibility};
pub use setting::{Setting, SettingCategory, SettingUpdate};
