//! Schema construction from typed settings.
//!
//! Every builder is a pure function of its settings: the same input always
//! yields the same fields in the same order.

use hearth_core::{
    CustomField, CustomFields, FieldType, LoginSettings, ProfileSettings, RegistrationSettings,
    SocialLinks,
};

use super::{FieldRule, RuleKind, Schema};

/// Prefix of the per-field visibility selectors.
pub const PRIVACY_PREFIX: &str = "privacy_";

/// Form key of the nested social links object.
pub const SOCIAL_LINKS: &str = "socialLinks";

/// Form key of the cover image URL.
pub const COVER_IMAGE: &str = "coverImage";

const fn text(min: Option<usize>, max: Option<usize>) -> RuleKind {
    RuleKind::Text { min, max }
}

/// Key of the visibility selector for `field`.
#[must_use]
pub fn privacy_key(field: &str) -> String {
    format!("{PRIVACY_PREFIX}{field}")
}

/// Rule for a single administrator-defined field, keyed `custom_<name>`.
#[must_use]
pub fn custom_field_rule(field: &CustomField) -> FieldRule {
    let kind = match field.field_type {
        FieldType::Email => RuleKind::Email,
        FieldType::Tel => RuleKind::Tel,
        FieldType::Number => RuleKind::Number,
        FieldType::Date => RuleKind::Date,
        FieldType::Checkbox => RuleKind::Boolean,
        FieldType::Select | FieldType::Radio => RuleKind::Choice(field.options().to_vec()),
        FieldType::Text | FieldType::Textarea => text(None, None),
    };
    FieldRule {
        name: field.form_key(),
        label: field.label.clone(),
        kind,
        required: field.required,
    }
}

fn push_custom_fields(schema: &mut Schema, fields: &CustomFields) {
    for field in fields {
        schema.push(custom_field_rule(field));
    }
}

fn social_links_schema() -> Schema {
    let mut schema = Schema::new();
    for network in SocialLinks::NETWORKS {
        schema.push(FieldRule::new(network, network, RuleKind::Url));
    }
    schema
}

/// Profile edit form.
#[must_use]
pub fn profile_schema(settings: &ProfileSettings) -> Schema {
    let mut schema = Schema::new()
        .with(FieldRule::new("name", "Name", text(Some(2), None)).required())
        .with(FieldRule::new("username", "Username", text(Some(3), None)).required());

    // (enabled, key, label, kind) for the optional built-in fields.
    let optional = [
        (
            settings.bio_enabled,
            "bio",
            "Bio",
            text(None, Some(settings.bio_max_length)),
        ),
        (settings.location_enabled, "location", "Location", text(None, None)),
        (settings.website_enabled, "website", "Website", RuleKind::Url),
        (settings.occupation_enabled, "occupation", "Occupation", text(None, None)),
    ];
    let mut private_fields = vec!["email".to_owned()];
    for (enabled, key, label, kind) in optional {
        if enabled {
            schema.push(FieldRule::new(key, label, kind));
            private_fields.push(key.to_owned());
        }
    }

    if settings.social_links_enabled {
        schema.push(FieldRule::new(
            SOCIAL_LINKS,
            "Social links",
            RuleKind::Object(social_links_schema()),
        ));
    }

    schema.push(FieldRule::new("avatar", "Avatar", RuleKind::Url));
    schema.push(FieldRule::new(COVER_IMAGE, "Cover image", RuleKind::Url));

    push_custom_fields(&mut schema, &settings.custom_fields);

    if settings.privacy_controls_enabled {
        private_fields.extend(
            settings
                .custom_fields
                .iter()
                .filter(|f| f.has_privacy_control())
                .map(|f| f.name.clone()),
        );
        for field in private_fields {
            let label = format!("Who can see {field}");
            schema.push(FieldRule::new(privacy_key(&field), label, RuleKind::Visibility));
        }
    }

    schema
}

/// Login form.
#[must_use]
pub fn login_schema(settings: &LoginSettings) -> Schema {
    let (label, kind) = match (settings.email_enabled, settings.username_enabled) {
        (true, false) => ("Email", RuleKind::Email),
        (false, true) => ("Username", text(None, None)),
        _ => ("Email or username", text(None, None)),
    };

    let mut schema = Schema::new()
        .with(FieldRule::new("identifier", label, kind).required())
        .with(FieldRule::new("password", "Password", text(None, None)).required());

    if settings.remember_me_enabled {
        schema.push(FieldRule::new("remember_me", "Remember me", RuleKind::Boolean));
    }
    schema
}

/// Registration form.
#[must_use]
pub fn registration_schema(settings: &RegistrationSettings) -> Schema {
    let mut schema = Schema::new()
        .with(FieldRule::new("name", "Name", text(Some(2), None)).required())
        .with(FieldRule::new("username", "Username", text(Some(3), None)).required())
        .with(FieldRule::new("email", "Email", RuleKind::Email).required())
        .with(
            FieldRule::new(
                "password",
                "Password",
                text(Some(settings.password_min_length), None),
            )
            .required(),
        );

    if settings.require_terms {
        schema.push(
            FieldRule::new("accept_terms", "I accept the terms of service", RuleKind::Boolean)
                .required(),
        );
    }

    push_custom_fields(&mut schema, &settings.custom_fields);
    schema
}
