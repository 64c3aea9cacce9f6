//! Profile edit form.
//!
//! Settings and the profile are fetched concurrently and joined before the
//! schema and initial values are built, so the result does not depend on
//! which request finishes first.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::instrument;

use hearth_core::{CustomField, ProfileSettings, SocialLinks, UserId, UserProfile};

use crate::backend::{ProfileBackend, SettingsBackend};
use crate::client::ApiError;
use crate::controller::{FormController, FormError, Submitter};
use crate::loader::load_settings;
use crate::notify::Notifier;
use crate::payload::FormPayload;
use crate::schema::{FormValues, PRIVACY_PREFIX, RuleKind, SOCIAL_LINKS, Schema, profile_schema};

/// Writes the profile with `PUT /profile/{id}`.
#[derive(Debug, Clone)]
pub struct ProfileSubmitter<B> {
    backend: B,
    user_id: UserId,
}

impl<B> ProfileSubmitter<B> {
    #[must_use]
    pub const fn new(backend: B, user_id: UserId) -> Self {
        Self { backend, user_id }
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

#[async_trait]
impl<B: ProfileBackend> Submitter for ProfileSubmitter<B> {
    type Output = UserProfile;

    async fn submit(&self, payload: &FormPayload) -> Result<UserProfile, ApiError> {
        self.backend.update_profile(&self.user_id, payload).await
    }

    fn success_message(&self) -> &str {
        "Profile updated"
    }
}

pub type ProfileForm<B, N> = FormController<ProfileSubmitter<B>, N>;

/// Create a profile form and load it.
///
/// The returned form is `Ready` on success and `Error` when the profile
/// could not be fetched. A settings failure alone still yields a `Ready`
/// form built from the default settings.
pub async fn open_profile_form<B, N>(backend: B, notifier: N, user_id: UserId) -> ProfileForm<B, N>
where
    B: SettingsBackend + ProfileBackend,
    N: Notifier,
{
    let form = FormController::new("profile", ProfileSubmitter::new(backend, user_id), notifier);
    // Failures are recorded on the form itself.
    let _ = load_profile_form(&form).await;
    form
}

/// (Re)load settings and profile into `form`.
///
/// # Errors
///
/// Returns [`FormError::Load`] when the profile fetch fails, or
/// [`FormError::AlreadySubmitting`] while a write is in flight.
#[instrument(skip(form), fields(user_id = %form.submitter().user_id()))]
pub async fn load_profile_form<B, N>(form: &ProfileForm<B, N>) -> Result<ProfileSettings, FormError>
where
    B: SettingsBackend + ProfileBackend,
    N: Notifier,
{
    form.begin_loading()?;

    let submitter = form.submitter();
    let (settings, profile) = tokio::join!(
        load_settings::<ProfileSettings, _, _>(submitter.backend(), form.notifier()),
        submitter.backend().fetch_profile(submitter.user_id()),
    );

    match profile {
        Ok(profile) => {
            let schema = profile_schema(&settings);
            let initial = initial_values(&schema, &profile);
            form.ready(schema, initial)?;
            Ok(settings)
        }
        Err(e) => {
            form.fail_loading(format!("Could not load your profile: {}", e.user_message()));
            Err(FormError::Load(e))
        }
    }
}

/// Initial values for every field of `schema`, taken from `profile`.
///
/// Fields the profile has no value for keep the schema default.
#[must_use]
pub fn initial_values(schema: &Schema, profile: &UserProfile) -> FormValues {
    let mut values = schema.default_values();

    for rule in schema {
        let name = rule.name.as_str();
        let value = if let Some(bare) = name.strip_prefix(CustomField::FORM_PREFIX) {
            profile.custom_fields.get(bare).cloned()
        } else if let (RuleKind::Visibility, Some(bare)) =
            (&rule.kind, name.strip_prefix(PRIVACY_PREFIX))
        {
            Some(Value::String(profile.visibility(bare).as_str().to_owned()))
        } else if name == SOCIAL_LINKS {
            profile.social_links.as_ref().map(social_links_value)
        } else {
            profile
                .text_field(name)
                .map(|text| Value::String(text.to_owned()))
        };

        if let Some(value) = value.filter(|v| !v.is_null()) {
            values.insert(rule.name.clone(), value);
        }
    }

    values
}

fn social_links_value(links: &SocialLinks) -> Value {
    let map: Map<String, Value> = SocialLinks::NETWORKS
        .iter()
        .map(|network| {
            let url = links.get(network).unwrap_or_default();
            ((*network).to_owned(), Value::String(url.to_owned()))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use hearth_core::settings::keys;
    use hearth_core::{CustomFields, Email, FieldType, Setting, SettingCategory, SettingUpdate, Visibility};
    use serde_json::json;

    use crate::controller::FormState;
    use crate::notify::ToastLog;

    fn sample_profile() -> UserProfile {
        UserProfile {
            id: UserId::new("u1"),
            name: "Ada Lovelace".into(),
            username: "ada".into(),
            email: Email::parse("ada@example.com").unwrap(),
            bio: Some("Analyst".into()),
            location: None,
            website: Some("https://ada.dev".into()),
            occupation: Some("Mathematician".into()),
            avatar: None,
            cover_image: Some("https://cdn.test/cover.png".into()),
            social_links: Some(SocialLinks {
                github: Some("https://github.com/ada".into()),
                ..SocialLinks::default()
            }),
            custom_fields: BTreeMap::from([("phone".to_owned(), json!("+44 20 7946 0000"))]),
            privacy: BTreeMap::from([("phone".to_owned(), Visibility::Friends)]),
        }
    }

    /// Backend whose two reads finish in a configurable order.
    struct SlowBackend {
        settings: Vec<Setting>,
        settings_delay: Duration,
        profile_delay: Duration,
        profile: Option<UserProfile>,
        writes: Mutex<Vec<FormPayload>>,
    }

    impl SlowBackend {
        fn new(settings_delay: u64, profile_delay: u64) -> Self {
            Self {
                settings: vec![
                    Setting::new(SettingCategory::Profile, keys::PROFILE_OCCUPATION_ENABLED, "true"),
                    Setting::new(SettingCategory::Profile, keys::PROFILE_SOCIAL_LINKS_ENABLED, "true"),
                    Setting::new(SettingCategory::Profile, keys::PROFILE_PRIVACY_CONTROLS_ENABLED, "true"),
                    Setting::new(
                        SettingCategory::Profile,
                        keys::PROFILE_CUSTOM_FIELDS,
                        r#"[{"id":"f1","name":"phone","label":"Phone","type":"tel","required":false,"privacy":true}]"#,
                    ),
                ],
                settings_delay: Duration::from_millis(settings_delay),
                profile_delay: Duration::from_millis(profile_delay),
                profile: Some(sample_profile()),
                writes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SettingsBackend for SlowBackend {
        async fn fetch_settings(&self, _: SettingCategory) -> Result<Vec<Setting>, ApiError> {
            tokio::time::sleep(self.settings_delay).await;
            Ok(self.settings.clone())
        }

        async fn update_settings(&self, _: SettingCategory, _: &[SettingUpdate]) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProfileBackend for SlowBackend {
        async fn fetch_profile(&self, _: &UserId) -> Result<UserProfile, ApiError> {
            tokio::time::sleep(self.profile_delay).await;
            self.profile
                .clone()
                .ok_or_else(|| ApiError::NotFound("User not found".into()))
        }

        async fn update_profile(&self, _: &UserId, payload: &FormPayload) -> Result<UserProfile, ApiError> {
            self.writes.lock().unwrap().push(payload.clone());
            Ok(sample_profile())
        }
    }

    #[tokio::test]
    async fn test_join_is_order_independent() {
        let settings_first =
            open_profile_form(SlowBackend::new(1, 30), ToastLog::new(), UserId::new("u1")).await;
        let profile_first =
            open_profile_form(SlowBackend::new(30, 1), ToastLog::new(), UserId::new("u1")).await;

        assert_eq!(settings_first.state(), FormState::Ready);
        assert_eq!(settings_first.values(), profile_first.values());
        assert_eq!(settings_first.schema(), profile_first.schema());
    }

    #[tokio::test]
    async fn test_initial_values_follow_profile() {
        let form = open_profile_form(SlowBackend::new(0, 0), ToastLog::new(), UserId::new("u1")).await;
        let values = form.values();

        assert_eq!(values["name"], json!("Ada Lovelace"));
        assert_eq!(values["occupation"], json!("Mathematician"));
        assert_eq!(values["location"], json!(""));
        assert_eq!(values["coverImage"], json!("https://cdn.test/cover.png"));
        assert_eq!(values["socialLinks"]["github"], json!("https://github.com/ada"));
        assert_eq!(values["socialLinks"]["twitter"], json!(""));
        assert_eq!(values["custom_phone"], json!("+44 20 7946 0000"));
        assert_eq!(values["privacy_phone"], json!("friends"));
        assert_eq!(values["privacy_email"], json!("public"));
    }

    #[tokio::test]
    async fn test_profile_failure_moves_to_error() {
        let mut backend = SlowBackend::new(0, 0);
        backend.profile = None;
        let log = ToastLog::new();
        let form = open_profile_form(backend, log.clone(), UserId::new("u1")).await;

        assert_eq!(form.state(), FormState::Error);
        assert_eq!(log.errors().len(), 1);
        assert!(matches!(form.submit().await, Err(FormError::NotReady(FormState::Error))));
    }

    #[tokio::test]
    async fn test_submit_sends_unprefixed_groups() {
        let form = open_profile_form(SlowBackend::new(0, 0), ToastLog::new(), UserId::new("u1")).await;
        form.change("custom_phone", json!("+1 555 123 4567"));
        form.change("privacy_phone", json!("private"));
        form.submit().await.unwrap();

        let writes = form.submitter().backend().writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].custom_fields["phone"], json!("+1 555 123 4567"));
        assert_eq!(writes[0].privacy["phone"], Visibility::Private);
    }

    #[test]
    fn test_initial_values_without_profile_data_use_defaults() {
        let settings = ProfileSettings {
            custom_fields: CustomFields::from(vec![CustomField::new("shoe", "Shoe", FieldType::Number)]),
            ..ProfileSettings::default()
        };
        let schema = profile_schema(&settings);
        let values = initial_values(&schema, &sample_profile());
        assert_eq!(values["custom_shoe"], json!(""));
        assert_eq!(values["avatar"], json!(""));
    }
}
