//! First-run setup wizard posting to the stub backend.

use serde_json::{Map, Value, json};

use hearth_forms::{FormValues, SetupWizard, ToastLog, WizardError, WizardStep};
use hearth_integration_tests::{StubBackend, StubState, unreachable_client};

fn values(pairs: Value) -> FormValues {
    match pairs {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn completed_wizard() -> SetupWizard {
    let mut wizard = SetupWizard::new();
    wizard
        .submit_step(values(json!({
            "site_name": "Hearth Demo",
            "site_url": "https://demo.hearth.test",
        })))
        .expect("Site step failed");
    wizard
        .submit_step(values(json!({
            "admin_name": "Ada Admin",
            "admin_email": "admin@hearth.test",
            "admin_username": "admin",
            "admin_password": "correct horse",
            "admin_password_confirm": "correct horse",
        })))
        .expect("Administrator step failed");
    wizard
        .submit_step(values(json!({
            "registration_enabled": false,
            "privacy_controls_enabled": true,
        })))
        .expect("Features step failed");
    wizard
}

#[tokio::test]
async fn test_finish_posts_combined_payload() {
    let backend = StubBackend::spawn(StubState::default()).await;
    let toasts = ToastLog::new();
    let mut wizard = completed_wizard();
    assert_eq!(wizard.step(), WizardStep::Review);

    wizard
        .finish(&backend.client(), &toasts)
        .await
        .expect("Finish failed");

    assert!(wizard.is_finished());
    let sent = backend.inspect(|s| s.setups[0].clone());
    assert_eq!(sent["site"]["name"], json!("Hearth Demo"));
    assert_eq!(sent["site"].get("tagline"), None);
    assert_eq!(sent["admin"]["email"], json!("admin@hearth.test"));
    assert_eq!(sent["admin"]["password"], json!("correct horse"));

    let settings = sent["settings"].as_array().cloned().unwrap_or_default();
    let flag = |key: &str| {
        settings
            .iter()
            .find(|s| s["key"] == json!(key))
            .map(|s| s["value"].clone())
    };
    assert_eq!(flag("REGISTRATION_ENABLED"), Some(json!("false")));
    assert_eq!(flag("PROFILE_PRIVACY_CONTROLS_ENABLED"), Some(json!("true")));
    assert_eq!(toasts.toasts().len(), 1);
    assert!(toasts.errors().is_empty());
}

#[tokio::test]
async fn test_finish_twice_is_rejected_locally() {
    let backend = StubBackend::spawn(StubState::default()).await;
    let toasts = ToastLog::new();
    let mut wizard = completed_wizard();

    wizard
        .finish(&backend.client(), &toasts)
        .await
        .expect("Finish failed");
    let again = wizard.finish(&backend.client(), &toasts).await;

    assert!(matches!(again, Err(WizardError::AlreadyFinished)));
    backend.inspect(|s| assert_eq!(s.setups.len(), 1));
}

#[tokio::test]
async fn test_server_conflict_keeps_wizard_open() {
    let backend = StubBackend::spawn(StubState::default()).await;
    backend.update(|s| s.setups.push(json!({ "site": "earlier" })));
    let toasts = ToastLog::new();
    let mut wizard = completed_wizard();

    let result = wizard.finish(&backend.client(), &toasts).await;

    assert!(matches!(result, Err(WizardError::Api(_))));
    assert!(!wizard.is_finished());
    assert_eq!(wizard.step(), WizardStep::Review);
    assert_eq!(
        toasts.errors()[0].message,
        "Setup has already been completed"
    );
    assert_eq!(
        wizard.values(WizardStep::Site).get("site_name"),
        Some(&json!("Hearth Demo"))
    );
}

#[tokio::test]
async fn test_unreachable_backend_reports_toast() {
    let toasts = ToastLog::new();
    let mut wizard = completed_wizard();

    let result = wizard.finish(&unreachable_client(), &toasts).await;

    assert!(matches!(result, Err(WizardError::Api(_))));
    assert_eq!(toasts.errors()[0].message, "Could not reach the server");
}

#[tokio::test]
async fn test_finish_before_review_sends_nothing() {
    let backend = StubBackend::spawn(StubState::default()).await;
    let mut wizard = SetupWizard::new();

    let result = wizard.finish(&backend.client(), &ToastLog::new()).await;

    assert!(matches!(result, Err(WizardError::NotOnReview(WizardStep::Site))));
    backend.inspect(|s| assert!(s.setups.is_empty()));
}
