//! First-run setup wizard.
//!
//! Four steps: site details, the administrator account, initial feature
//! flags, and a review. Each step validates its own values before the
//! wizard advances; going back keeps everything entered so far. Only the
//! review step can finish, and only once every earlier step is complete.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use hearth_core::settings::keys;
use hearth_core::{Email, ProfileSettings, RegistrationSettings, Setting, SettingCategory};

use crate::backend::SetupBackend;
use crate::client::ApiError;
use crate::notify::Notifier;
use crate::schema::{FieldError, FieldRule, FormValues, RuleKind, Schema, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Site,
    Administrator,
    Features,
    Review,
}

impl WizardStep {
    pub const ALL: [Self; 4] = [Self::Site, Self::Administrator, Self::Features, Self::Review];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Site => "Site details",
            Self::Administrator => "Administrator account",
            Self::Features => "Features",
            Self::Review => "Review",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Site => Some(Self::Administrator),
            Self::Administrator => Some(Self::Features),
            Self::Features => Some(Self::Review),
            Self::Review => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Site => None,
            Self::Administrator => Some(Self::Site),
            Self::Features => Some(Self::Administrator),
            Self::Review => Some(Self::Features),
        }
    }

    /// Validation rules of this step. The review step has none.
    #[must_use]
    pub fn schema(self) -> Schema {
        let bounded = |min, max| RuleKind::Text { min, max };
        match self {
            Self::Site => Schema::new()
                .with(FieldRule::new("site_name", "Site name", bounded(Some(2), Some(80))).required())
                .with(FieldRule::new("site_url", "Site URL", RuleKind::Url).required())
                .with(FieldRule::new("tagline", "Tagline", bounded(None, Some(160)))),
            Self::Administrator => Schema::new()
                .with(FieldRule::new("admin_name", "Name", bounded(Some(2), None)).required())
                .with(FieldRule::new("admin_email", "Email", RuleKind::Email).required())
                .with(
                    FieldRule::new("admin_username", "Username", bounded(Some(3), Some(32)))
                        .required(),
                )
                .with(FieldRule::new("admin_password", "Password", bounded(Some(8), None)).required())
                .with(
                    FieldRule::new("admin_password_confirm", "Confirm password", bounded(None, None))
                        .required(),
                ),
            Self::Features => Schema::new()
                .with(FieldRule::new(
                    "registration_enabled",
                    "Allow new registrations",
                    RuleKind::Boolean,
                ))
                .with(FieldRule::new(
                    "require_email_verification",
                    "Require email verification",
                    RuleKind::Boolean,
                ))
                .with(FieldRule::new("require_terms", "Require accepting terms", RuleKind::Boolean))
                .with(FieldRule::new("social_links_enabled", "Social links", RuleKind::Boolean))
                .with(FieldRule::new(
                    "privacy_controls_enabled",
                    "Privacy controls",
                    RuleKind::Boolean,
                )),
            Self::Review => Schema::new(),
        }
    }

    /// Starting values; feature flags start from the settings defaults.
    fn defaults(self) -> FormValues {
        let mut values = self.schema().default_values();
        if self == Self::Features {
            let registration = RegistrationSettings::default();
            let profile = ProfileSettings::default();
            for (key, on) in [
                ("registration_enabled", registration.enabled),
                ("require_email_verification", registration.require_email_verification),
                ("require_terms", registration.require_terms),
                ("social_links_enabled", profile.social_links_enabled),
                ("privacy_controls_enabled", profile.privacy_controls_enabled),
            ] {
                values.insert(key.to_owned(), Value::Bool(on));
            }
        }
        values
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Please fix the highlighted fields: {0}")]
    Invalid(ValidationErrors),

    #[error("Already on the first step")]
    FirstStep,

    #[error("Setup can only be finished from the review step (currently on {0})")]
    NotOnReview(WizardStep),

    #[error("Step '{0}' is not complete")]
    Incomplete(WizardStep),

    #[error("Setup has already been completed")]
    AlreadyFinished,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Site details collected by the first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteDetails {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
}

/// The first administrator account.
#[derive(Clone, Serialize)]
pub struct AdminAccount {
    pub name: String,
    pub email: Email,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Body of `POST /setup`.
#[derive(Debug, Clone, Serialize)]
pub struct SetupPayload {
    pub site: SiteDetails,
    pub admin: AdminAccount,
    /// Initial feature flags as settings records.
    pub settings: Vec<Setting>,
}

/// State of one run through the setup wizard.
#[derive(Debug, Clone)]
pub struct SetupWizard {
    step: WizardStep,
    values: BTreeMap<WizardStep, FormValues>,
    completed: BTreeSet<WizardStep>,
    errors: ValidationErrors,
    finished: bool,
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupWizard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: WizardStep::Site,
            values: WizardStep::ALL
                .into_iter()
                .map(|step| (step, step.defaults()))
                .collect(),
            completed: BTreeSet::new(),
            errors: ValidationErrors::new(),
            finished: false,
        }
    }

    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub fn is_completed(&self, step: WizardStep) -> bool {
        self.completed.contains(&step)
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Values entered for `step` so far (defaults if never submitted).
    #[must_use]
    pub fn values(&self, step: WizardStep) -> FormValues {
        self.values
            .get(&step)
            .cloned()
            .unwrap_or_else(|| step.defaults())
    }

    /// Errors from the last rejected step submission.
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Validate the current step, store its values and advance.
    ///
    /// Values are stored even when invalid so nothing typed is lost.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Invalid`] with the failing fields.
    pub fn submit_step(&mut self, values: FormValues) -> Result<WizardStep, WizardError> {
        let step = self.step;
        let schema = step.schema();

        let mut stored = step.defaults();
        for (name, value) in values {
            if schema.contains(&name) {
                stored.insert(name, value);
            }
        }

        let mut errors = schema.validate(&stored).err().unwrap_or_default();
        if step == WizardStep::Administrator {
            let password = stored.get("admin_password").and_then(Value::as_str);
            let confirm = stored.get("admin_password_confirm").and_then(Value::as_str);
            if errors.get("admin_password_confirm").is_none() && password != confirm {
                errors.insert(
                    "admin_password_confirm",
                    FieldError::Mismatch {
                        other: "Password".to_string(),
                    },
                );
            }
        }

        self.values.insert(step, stored);
        if !errors.is_empty() {
            self.completed.remove(&step);
            self.errors = errors.clone();
            return Err(WizardError::Invalid(errors));
        }

        self.errors = ValidationErrors::new();
        self.completed.insert(step);
        if let Some(next) = step.next() {
            self.step = next;
        }
        tracing::debug!(step = %step, next = %self.step, "Wizard step completed");
        Ok(self.step)
    }

    /// Return to the previous step, keeping all entered values.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::FirstStep`] on the first step.
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self.step.previous().ok_or(WizardError::FirstStep)?;
        self.errors = ValidationErrors::new();
        self.step = previous;
        Ok(previous)
    }

    /// Assemble the combined payload from every completed step.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Incomplete`] naming the first unfinished step.
    pub fn payload(&self) -> Result<SetupPayload, WizardError> {
        if let Some(step) = WizardStep::ALL
            .into_iter()
            .filter(|s| *s != WizardStep::Review)
            .find(|s| !self.is_completed(*s))
        {
            return Err(WizardError::Incomplete(step));
        }

        let site = self.values(WizardStep::Site);
        let admin = self.values(WizardStep::Administrator);
        let features = self.values(WizardStep::Features);

        let tagline = text(&site, "tagline");
        let email = Email::parse(&text(&admin, "admin_email")).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.insert("admin_email", FieldError::InvalidEmail);
            WizardError::Invalid(errors)
        })?;

        let flag = |key: &str| features.get(key).and_then(Value::as_bool).unwrap_or(false);
        let settings = vec![
            Setting::new(
                SettingCategory::Registration,
                keys::REGISTRATION_ENABLED,
                flag("registration_enabled").to_string(),
            ),
            Setting::new(
                SettingCategory::Registration,
                keys::REGISTRATION_REQUIRE_EMAIL_VERIFICATION,
                flag("require_email_verification").to_string(),
            ),
            Setting::new(
                SettingCategory::Registration,
                keys::REGISTRATION_REQUIRE_TERMS,
                flag("require_terms").to_string(),
            ),
            Setting::new(
                SettingCategory::Profile,
                keys::PROFILE_SOCIAL_LINKS_ENABLED,
                flag("social_links_enabled").to_string(),
            ),
            Setting::new(
                SettingCategory::Profile,
                keys::PROFILE_PRIVACY_CONTROLS_ENABLED,
                flag("privacy_controls_enabled").to_string(),
            ),
        ];

        Ok(SetupPayload {
            site: SiteDetails {
                name: text(&site, "site_name"),
                url: text(&site, "site_url"),
                tagline: (!tagline.is_empty()).then_some(tagline),
            },
            admin: AdminAccount {
                name: text(&admin, "admin_name"),
                email,
                username: text(&admin, "admin_username"),
                password: SecretString::from(
                    admin
                        .get("admin_password")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                ),
            },
            settings,
        })
    }

    /// Post the combined payload to `POST /setup`.
    ///
    /// Success and failure are both reported as toasts. A failed request
    /// leaves the wizard on the review step with its values intact.
    ///
    /// # Errors
    ///
    /// Returns an error when not on the review step, when a step is
    /// incomplete, when setup already finished, or when the request fails.
    #[instrument(skip_all)]
    pub async fn finish<B, N>(&mut self, backend: &B, notifier: &N) -> Result<(), WizardError>
    where
        B: SetupBackend + ?Sized,
        N: Notifier,
    {
        if self.finished {
            return Err(WizardError::AlreadyFinished);
        }
        if self.step != WizardStep::Review {
            return Err(WizardError::NotOnReview(self.step));
        }
        let payload = self.payload()?;

        match backend.complete_setup(&payload).await {
            Ok(()) => {
                self.finished = true;
                tracing::info!(site = %payload.site.name, "Setup finished");
                notifier.success("Setup complete");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Setup request failed");
                notifier.error(e.user_message());
                Err(WizardError::Api(e))
            }
        }
    }
}

/// Trimmed string value of `key`, empty when absent.
fn text(values: &FormValues, key: &str) -> String {
    values
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::notify::{Toast, ToastLog};

    #[derive(Default)]
    struct RecordingSetup {
        fail: bool,
        received: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl SetupBackend for RecordingSetup {
        async fn complete_setup(&self, payload: &SetupPayload) -> Result<(), ApiError> {
            if self.fail {
                return Err(ApiError::Api {
                    status: 409,
                    message: "Setup already completed".into(),
                });
            }
            self.received
                .lock()
                .unwrap()
                .push(serde_json::to_value(payload).unwrap());
            Ok(())
        }
    }

    fn obj(v: Value) -> FormValues {
        v.as_object().cloned().unwrap()
    }

    fn site() -> FormValues {
        obj(json!({"site_name": "Hearth", "site_url": "https://hearth.test"}))
    }

    fn admin() -> FormValues {
        obj(json!({
            "admin_name": "Ada",
            "admin_email": "ada@example.com",
            "admin_username": "ada",
            "admin_password": "correct horse",
            "admin_password_confirm": "correct horse",
        }))
    }

    fn completed_wizard() -> SetupWizard {
        let mut wizard = SetupWizard::new();
        wizard.submit_step(site()).unwrap();
        wizard.submit_step(admin()).unwrap();
        wizard
            .submit_step(obj(json!({"require_terms": true})))
            .unwrap();
        wizard
    }

    #[test]
    fn test_steps_advance_in_order() {
        let wizard = completed_wizard();
        assert_eq!(wizard.step(), WizardStep::Review);
        assert!(wizard.is_completed(WizardStep::Features));
    }

    #[test]
    fn test_invalid_step_does_not_advance() {
        let mut wizard = SetupWizard::new();
        let err = wizard
            .submit_step(obj(json!({"site_name": "H", "site_url": "hearth"})))
            .unwrap_err();
        assert!(matches!(err, WizardError::Invalid(ref e) if e.len() == 2));
        assert_eq!(wizard.step(), WizardStep::Site);
        assert_eq!(wizard.values(WizardStep::Site)["site_name"], json!("H"));
    }

    #[test]
    fn test_password_confirmation_must_match() {
        let mut wizard = SetupWizard::new();
        wizard.submit_step(site()).unwrap();
        let mut values = admin();
        values.insert("admin_password_confirm".into(), json!("battery staple"));

        let err = wizard.submit_step(values).unwrap_err();
        assert!(matches!(
            err,
            WizardError::Invalid(ref e)
                if matches!(e.get("admin_password_confirm"), Some(FieldError::Mismatch { .. }))
        ));
        assert_eq!(wizard.step(), WizardStep::Administrator);
    }

    #[test]
    fn test_back_keeps_values() {
        let mut wizard = SetupWizard::new();
        wizard.submit_step(site()).unwrap();
        assert_eq!(wizard.back().unwrap(), WizardStep::Site);
        assert_eq!(
            wizard.values(WizardStep::Site)["site_url"],
            json!("https://hearth.test")
        );
        assert!(matches!(wizard.back(), Err(WizardError::FirstStep)));
    }

    #[test]
    fn test_feature_defaults_follow_settings_defaults() {
        let values = SetupWizard::new().values(WizardStep::Features);
        assert_eq!(values["registration_enabled"], json!(true));
        assert_eq!(values["require_email_verification"], json!(true));
        assert_eq!(values["social_links_enabled"], json!(false));
    }

    #[tokio::test]
    async fn test_finish_posts_combined_payload() {
        let mut wizard = completed_wizard();
        let backend = RecordingSetup::default();
        let log = ToastLog::new();

        wizard.finish(&backend, &log).await.unwrap();
        assert!(wizard.is_finished());
        assert_eq!(log.toasts(), vec![Toast::success("Setup complete")]);

        let sent = backend.received.lock().unwrap()[0].clone();
        assert_eq!(sent["site"]["name"], json!("Hearth"));
        assert!(sent["site"].get("tagline").is_none());
        assert_eq!(sent["admin"]["password"], json!("correct horse"));
        assert!(sent["settings"].as_array().unwrap().iter().any(|s| {
            s["key"] == json!(keys::REGISTRATION_REQUIRE_TERMS) && s["value"] == json!("true")
        }));

        assert!(matches!(
            wizard.finish(&backend, &log).await,
            Err(WizardError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn test_finish_only_from_review() {
        let mut wizard = SetupWizard::new();
        wizard.submit_step(site()).unwrap();
        let err = wizard
            .finish(&RecordingSetup::default(), &ToastLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::NotOnReview(WizardStep::Administrator)));
    }

    #[tokio::test]
    async fn test_failed_finish_stays_on_review() {
        let mut wizard = completed_wizard();
        let backend = RecordingSetup {
            fail: true,
            ..RecordingSetup::default()
        };
        let log = ToastLog::new();

        assert!(matches!(
            wizard.finish(&backend, &log).await,
            Err(WizardError::Api(_))
        ));
        assert_eq!(wizard.step(), WizardStep::Review);
        assert!(!wizard.is_finished());
        assert_eq!(log.errors(), vec![Toast::error("Setup already completed")]);
    }

    #[test]
    fn test_debug_redacts_password() {
        let payload = completed_wizard().payload().unwrap();
        let debug = format!("{payload:?}");
        assert!(!debug.contains("correct horse"));
    }
}
