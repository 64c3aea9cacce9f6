//! User profile as stored by the backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::email::Email;
use super::id::UserId;

/// Who may see a profile field when privacy controls are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub const ALL: [Self; 3] = [Self::Public, Self::Friends, Self::Private];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            _ => Err(format!("invalid visibility: {s}")),
        }
    }
}

/// Links to a user's accounts on other networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

impl SocialLinks {
    /// Networks in display order.
    pub const NETWORKS: [&'static str; 5] = ["twitter", "facebook", "instagram", "linkedin", "github"];

    #[must_use]
    pub fn get(&self, network: &str) -> Option<&str> {
        match network {
            "twitter" => self.twitter.as_deref(),
            "facebook" => self.facebook.as_deref(),
            "instagram" => self.instagram.as_deref(),
            "linkedin" => self.linkedin.as_deref(),
            "github" => self.github.as_deref(),
            _ => None,
        }
    }
}

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
    /// Values keyed by custom field `name` (not the `custom_` form key).
    #[serde(default)]
    pub custom_fields: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub privacy: BTreeMap<String, Visibility>,
}

impl UserProfile {
    /// Value of a built-in optional text field by its form key.
    #[must_use]
    pub fn text_field(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "username" => Some(&self.username),
            "email" => Some(self.email.as_str()),
            "bio" => self.bio.as_deref(),
            "location" => self.location.as_deref(),
            "website" => self.website.as_deref(),
            "occupation" => self.occupation.as_deref(),
            "avatar" => self.avatar.as_deref(),
            "coverImage" => self.cover_image.as_deref(),
            _ => None,
        }
    }

    /// Visibility of `field`, defaulting to public when unset.
    #[must_use]
    pub fn visibility(&self, field: &str) -> Visibility {
        self.privacy.get(field).copied().unwrap_or_default()
    }
}
