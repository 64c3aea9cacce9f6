//! Administrator settings forms writing through `PUT /settings/{category}`.

use serde_json::json;

use hearth_core::settings::keys;
use hearth_core::{
    CategorySettings, CustomField, FieldType, LoginSettings, ProfileSettings, Setting,
    SettingCategory,
};
use hearth_forms::{FieldError, FormError, FormState, ToastLog, load_settings, open_settings_form};
use hearth_integration_tests::fixtures::profile_setting;
use hearth_integration_tests::{StubBackend, StubState};

fn login_setting(key: &str, value: &str) -> Setting {
    Setting::new(SettingCategory::Login, key, value)
}

#[tokio::test]
async fn test_saved_values_are_served_back() {
    let backend = StubBackend::spawn(StubState::default().with_settings(
        SettingCategory::Login,
        vec![login_setting(keys::LOGIN_MAX_ATTEMPTS, "3")],
    ))
    .await;
    let form = open_settings_form::<LoginSettings, _, _>(backend.client(), ToastLog::new()).await;

    assert_eq!(form.state(), FormState::Ready);
    assert_eq!(form.value(keys::LOGIN_MAX_ATTEMPTS), Some(json!(3)));

    form.change(keys::LOGIN_MAX_ATTEMPTS, json!("10"));
    form.change(keys::LOGIN_REMEMBER_ME_ENABLED, json!(false));
    let saved = form.submit().await.expect("Save failed");

    assert_eq!(saved.max_attempts, 10);
    assert!(!saved.remember_me_enabled);
    backend.inspect(|s| {
        let (category, updates) = &s.settings_writes[0];
        assert_eq!(category, "login");
        assert!(
            updates
                .iter()
                .any(|u| u.key == keys::LOGIN_MAX_ATTEMPTS && u.value == "10")
        );
    });

    // A fresh load sees the stored values.
    let reloaded: LoginSettings = load_settings(&backend.client(), &ToastLog::new()).await;
    assert_eq!(reloaded, saved);
}

#[tokio::test]
async fn test_out_of_range_value_blocked_before_request() {
    let backend = StubBackend::spawn(StubState::default()).await;
    let form = open_settings_form::<LoginSettings, _, _>(backend.client(), ToastLog::new()).await;

    form.change(keys::LOGIN_MAX_ATTEMPTS, json!("0"));
    assert!(matches!(
        form.field_error(keys::LOGIN_MAX_ATTEMPTS),
        Some(FieldError::OutOfRange { min: 1, .. })
    ));
    assert!(matches!(form.submit().await, Err(FormError::Invalid(_))));
    backend.inspect(|s| assert!(s.settings_writes.is_empty()));
}

#[tokio::test]
async fn test_disabling_every_identifier_rejected() {
    let backend = StubBackend::spawn(StubState::default()).await;
    let form = open_settings_form::<LoginSettings, _, _>(backend.client(), ToastLog::new()).await;

    form.change(keys::LOGIN_EMAIL_ENABLED, json!(false));
    form.change(keys::LOGIN_USERNAME_ENABLED, json!(false));

    let Err(FormError::Invalid(errors)) = form.submit().await else {
        panic!("Expected a validation failure");
    };
    assert!(matches!(
        errors.get(keys::LOGIN_USERNAME_ENABLED),
        Some(FieldError::Rejected { .. })
    ));
    backend.inspect(|s| assert!(s.settings_writes.is_empty()));
}

#[tokio::test]
async fn test_profile_save_keeps_custom_fields() {
    let fields = ProfileSettings {
        custom_fields: vec![CustomField::new("pronouns", "Pronouns", FieldType::Text)].into(),
        ..ProfileSettings::default()
    }
    .to_updates()
    .expect("Failed to serialize settings")
    .into_iter()
    .map(|u| profile_setting(&u.key, &u.value))
    .collect();
    let backend =
        StubBackend::spawn(StubState::default().with_settings(SettingCategory::Profile, fields))
            .await;
    let form =
        open_settings_form::<ProfileSettings, _, _>(backend.client(), ToastLog::new()).await;

    form.change(keys::PROFILE_OCCUPATION_ENABLED, json!(true));
    let saved = form.submit().await.expect("Save failed");

    assert!(saved.occupation_enabled);
    assert!(saved.custom_fields.get("pronouns").is_some());
    assert_eq!(
        form.notifier().toasts().last().map(|t| t.message.clone()),
        Some("Settings saved".to_owned())
    );
}

#[tokio::test]
async fn test_save_after_failed_load_keeps_custom_fields() {
    let fields = ProfileSettings {
        custom_fields: vec![CustomField::new("pronouns", "Pronouns", FieldType::Text)].into(),
        ..ProfileSettings::default()
    }
    .to_updates()
    .expect("Failed to serialize settings")
    .into_iter()
    .map(|u| profile_setting(&u.key, &u.value))
    .collect();
    let backend = StubBackend::spawn(StubState {
        settings_unavailable: true,
        ..StubState::default().with_settings(SettingCategory::Profile, fields)
    })
    .await;

    // The form opens on defaults, which carry no custom fields.
    let log = ToastLog::new();
    let form = open_settings_form::<ProfileSettings, _, _>(backend.client(), log.clone()).await;
    assert_eq!(log.errors().len(), 1);
    assert!(form.submitter().current().custom_fields.is_empty());

    backend.update(|s| s.settings_unavailable = false);
    form.change(keys::PROFILE_SOCIAL_LINKS_ENABLED, json!(true));
    form.submit().await.expect("Save failed");

    backend.inspect(|s| {
        let (_, updates) = &s.settings_writes[0];
        assert!(updates.iter().all(|u| u.key != keys::PROFILE_CUSTOM_FIELDS));
    });
    let reloaded: ProfileSettings = load_settings(&backend.client(), &ToastLog::new()).await;
    assert!(reloaded.social_links_enabled);
    assert_eq!(reloaded.custom_fields.len(), 1);
}
