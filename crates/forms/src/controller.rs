//! Form state controller.
//!
//! One [`FormController`] per form instance. It owns the schema, the current
//! values and the per-field errors, and drives the state machine:
//!
//! ```text
//! Idle -> Loading -> Ready -> Submitting -> (Success | Error) -> Ready
//!            \-> Error (load failed)
//! ```
//!
//! The controller is a cheap, cloneable handle. State sits behind a
//! `std::sync::Mutex` that is never held across an `.await`; the only
//! suspension point is the submitter's write request.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::client::{ApiClient, ApiError};
use crate::notify::Notifier;
use crate::payload::{FormPayload, assemble};
use crate::schema::{FieldError, FormValues, RuleKind, Schema, ValidationErrors};

/// Lifecycle state of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormState {
    /// Created, nothing fetched yet.
    Idle,
    /// Fetching settings and initial data.
    Loading,
    /// Editable and submittable.
    Ready,
    /// A write request is in flight.
    Submitting,
    /// The last write succeeded. Passes straight back to `Ready`.
    Success,
    /// Loading failed, or the last write failed (then back to `Ready`).
    Error,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    /// A write is in flight.
    #[error("A submission is already in progress")]
    AlreadySubmitting,

    /// Still loading, or loading failed.
    #[error("The form cannot be submitted while {0}")]
    NotReady(FormState),

    /// Local validation failed; nothing was sent.
    #[error("Please fix the highlighted fields: {0}")]
    Invalid(ValidationErrors),

    /// Initial data could not be fetched.
    #[error("Failed to load form data: {0}")]
    Load(ApiError),

    /// The write failed, or was refused before it was sent.
    #[error(transparent)]
    Submit(#[from] ApiError),
}

/// Sends an assembled payload to the backend.
#[async_trait]
pub trait Submitter: Send + Sync {
    type Output: Send;

    async fn submit(&self, payload: &FormPayload) -> Result<Self::Output, ApiError>;

    /// Checks the schema cannot express, run after field validation.
    ///
    /// # Errors
    ///
    /// Returns the offending fields.
    fn check(&self, _payload: &FormPayload) -> Result<(), ValidationErrors> {
        Ok(())
    }

    /// Text of the success toast.
    fn success_message(&self) -> &str {
        "Changes saved"
    }
}

/// Submits to a fixed endpoint and returns the raw JSON response.
#[derive(Debug, Clone)]
pub struct EndpointSubmitter {
    client: ApiClient,
    method: Method,
    path: String,
    success_message: String,
}

impl EndpointSubmitter {
    #[must_use]
    pub fn new(client: ApiClient, method: Method, path: impl Into<String>) -> Self {
        Self {
            client,
            method,
            path: path.into(),
            success_message: "Changes saved".to_string(),
        }
    }

    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }
}

#[async_trait]
impl Submitter for EndpointSubmitter {
    type Output = Value;

    async fn submit(&self, payload: &FormPayload) -> Result<Value, ApiError> {
        self.client
            .submit_form(self.method.clone(), &self.path, payload)
            .await
    }

    fn success_message(&self) -> &str {
        &self.success_message
    }
}

#[derive(Debug)]
struct FormInner {
    state: FormState,
    schema: Schema,
    values: FormValues,
    errors: ValidationErrors,
    touched: BTreeSet<String>,
    load_error: Option<String>,
}

struct Shared<S, N> {
    name: String,
    submitter: S,
    notifier: N,
    inner: Mutex<FormInner>,
    state_tx: watch::Sender<FormState>,
}

/// Handle to one form instance.
pub struct FormController<S, N> {
    shared: Arc<Shared<S, N>>,
}

impl<S, N> Clone for FormController<S, N> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, N> fmt::Debug for FormController<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<S: Submitter, N: Notifier> FormController<S, N> {
    #[must_use]
    pub fn new(name: impl Into<String>, submitter: S, notifier: N) -> Self {
        let (state_tx, _) = watch::channel(FormState::Idle);
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                submitter,
                notifier,
                inner: Mutex::new(FormInner {
                    state: FormState::Idle,
                    schema: Schema::new(),
                    values: FormValues::new(),
                    errors: ValidationErrors::new(),
                    touched: BTreeSet::new(),
                    load_error: None,
                }),
                state_tx,
            }),
        }
    }

    /// Submit the current values.
    ///
    /// Only one submission may be in flight; a second call while the first
    /// is pending fails with [`FormError::AlreadySubmitting`] and sends
    /// nothing. Validation errors are stored per field and returned without
    /// a toast. The values are kept whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is not ready, a submission is already
    /// running, validation fails, or the write request fails.
    pub async fn submit(&self) -> Result<S::Output, FormError> {
        let payload = {
            let mut inner = self.lock();
            match inner.state {
                FormState::Ready => {}
                FormState::Submitting => return Err(FormError::AlreadySubmitting),
                other => return Err(FormError::NotReady(other)),
            }
            if let Err(errors) = inner.schema.validate(&inner.values) {
                tracing::debug!(form = %self.shared.name, errors = errors.len(), "Submit blocked by validation");
                inner.errors = errors.clone();
                return Err(FormError::Invalid(errors));
            }
            let payload = assemble(&inner.schema, &inner.values);
            if let Err(errors) = self.shared.submitter.check(&payload) {
                inner.errors = errors.clone();
                return Err(FormError::Invalid(errors));
            }
            inner.errors = ValidationErrors::new();
            self.transition(&mut inner, FormState::Submitting);
            payload
        };

        let guard = SubmitGuard { form: self };
        let result = self.shared.submitter.submit(&payload).await;
        std::mem::forget(guard);

        let mut inner = self.lock();
        match result {
            Ok(output) => {
                self.transition(&mut inner, FormState::Success);
                self.transition(&mut inner, FormState::Ready);
                drop(inner);
                tracing::info!(form = %self.shared.name, "Form submitted");
                self.shared
                    .notifier
                    .success(self.shared.submitter.success_message());
                Ok(output)
            }
            Err(e) => {
                self.transition(&mut inner, FormState::Error);
                self.transition(&mut inner, FormState::Ready);
                drop(inner);
                tracing::warn!(form = %self.shared.name, error = %e, "Form submission failed");
                self.shared.notifier.error(e.user_message());
                Err(FormError::Submit(e))
            }
        }
    }
}

impl<S, N> FormController<S, N> {
    fn lock(&self) -> MutexGuard<'_, FormInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut FormInner, next: FormState) {
        tracing::debug!(form = %self.shared.name, from = %inner.state, to = %next, "Form state");
        inner.state = next;
        self.shared.state_tx.send_replace(next);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[must_use]
    pub fn state(&self) -> FormState {
        self.lock().state
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.shared.state_tx.subscribe()
    }

    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.shared.notifier
    }

    #[must_use]
    pub fn submitter(&self) -> &S {
        &self.shared.submitter
    }

    #[must_use]
    pub fn schema(&self) -> Schema {
        self.lock().schema.clone()
    }

    #[must_use]
    pub fn values(&self) -> FormValues {
        self.lock().values.clone()
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.lock().values.get(name).cloned()
    }

    #[must_use]
    pub fn errors(&self) -> ValidationErrors {
        self.lock().errors.clone()
    }

    #[must_use]
    pub fn field_error(&self, name: &str) -> Option<FieldError> {
        self.lock().errors.get(name).cloned()
    }

    #[must_use]
    pub fn is_touched(&self, name: &str) -> bool {
        self.lock().touched.contains(name)
    }

    /// Message of the failure that stopped loading, if any.
    #[must_use]
    pub fn load_error(&self) -> Option<String> {
        self.lock().load_error.clone()
    }

    /// Start (or restart) loading.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::AlreadySubmitting`] while a write is in flight.
    pub fn begin_loading(&self) -> Result<(), FormError> {
        let mut inner = self.lock();
        if inner.state == FormState::Submitting {
            return Err(FormError::AlreadySubmitting);
        }
        inner.load_error = None;
        self.transition(&mut inner, FormState::Loading);
        Ok(())
    }

    /// Install the schema and initial values and make the form editable.
    ///
    /// Every schema field starts from its default; `initial` overrides it.
    /// Names outside the schema are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::AlreadySubmitting`] while a write is in flight;
    /// the form is left untouched.
    pub fn ready(&self, schema: Schema, initial: FormValues) -> Result<(), FormError> {
        let mut values = schema.default_values();
        for (name, value) in initial {
            if schema.contains(&name) {
                values.insert(name, value);
            }
        }

        let mut inner = self.lock();
        if inner.state == FormState::Submitting {
            return Err(FormError::AlreadySubmitting);
        }
        inner.schema = schema;
        inner.values = values;
        inner.errors = ValidationErrors::new();
        inner.touched.clear();
        inner.load_error = None;
        self.transition(&mut inner, FormState::Ready);
        Ok(())
    }

    /// Replace the schema after a settings change, keeping values of fields
    /// that still exist.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::AlreadySubmitting`] while a write is in flight.
    pub fn rebuild(&self, schema: Schema) -> Result<(), FormError> {
        let mut inner = self.lock();
        if inner.state == FormState::Submitting {
            return Err(FormError::AlreadySubmitting);
        }
        let mut values = schema.default_values();
        for (name, value) in &inner.values {
            if schema.contains(name) {
                values.insert(name.clone(), value.clone());
            }
        }
        inner.errors = ValidationErrors::new();
        inner.touched.retain(|name| schema.contains(name));
        inner.values = values;
        inner.schema = schema;
        Ok(())
    }

    /// Loading failed; the form stays unusable until loaded again.
    pub fn fail_loading(&self, message: impl Into<String>)
    where
        N: Notifier,
    {
        let message = message.into();
        {
            let mut inner = self.lock();
            inner.load_error = Some(message.clone());
            self.transition(&mut inner, FormState::Error);
        }
        tracing::warn!(form = %self.shared.name, error = %message, "Form failed to load");
        self.shared.notifier.error(message);
    }

    /// Set a field value and re-validate that field.
    ///
    /// `parent.child` addresses a field of a nested object. Names outside
    /// the schema are ignored.
    pub fn change(&self, name: &str, value: Value) {
        let mut inner = self.lock();
        let top = name.split_once('.').map_or(name, |(parent, _)| parent);
        let known = match (inner.schema.get(top), name.contains('.')) {
            (Some(rule), true) => matches!(rule.kind, RuleKind::Object(_)),
            (Some(_), false) => true,
            (None, _) => false,
        };
        if !known {
            tracing::debug!(form = %self.shared.name, field = %name, "Ignoring change to unknown field");
            return;
        }

        match name.split_once('.') {
            Some((parent, child)) => {
                let entry = inner
                    .values
                    .entry(parent.to_owned())
                    .or_insert_with(|| Value::Object(FormValues::new()));
                if !entry.is_object() {
                    *entry = Value::Object(FormValues::new());
                }
                if let Value::Object(children) = entry {
                    children.insert(child.to_owned(), value);
                }
            }
            None => {
                inner.values.insert(name.to_owned(), value);
            }
        }

        revalidate(&mut inner, top);
    }

    /// Mark a field as visited and validate it.
    pub fn blur(&self, name: &str) {
        let mut inner = self.lock();
        let top = name.split_once('.').map_or(name, |(parent, _)| parent);
        if !inner.schema.contains(top) {
            return;
        }
        inner.touched.insert(top.to_owned());
        revalidate(&mut inner, top);
    }

    /// Validate every field and store the result.
    ///
    /// # Errors
    ///
    /// Returns all field errors when the form is invalid.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut inner = self.lock();
        let result = inner.schema.validate(&inner.values);
        inner.errors = result.clone().err().unwrap_or_default();
        result
    }
}

fn revalidate(inner: &mut FormInner, field: &str) {
    inner.errors.clear_field(field);
    if let Err(errors) = inner.schema.validate_field(field, &inner.values) {
        inner.errors.extend(errors);
    }
}

/// Puts the form back to `Ready` if a submit future is dropped mid-flight.
struct SubmitGuard<'a, S, N> {
    form: &'a FormController<S, N>,
}

impl<S, N> Drop for SubmitGuard<'_, S, N> {
    fn drop(&mut self) {
        let mut inner = self.form.lock();
        if inner.state == FormState::Submitting {
            tracing::debug!(form = %self.form.shared.name, "Submission abandoned");
            self.form.transition(&mut inner, FormState::Ready);
        }
    }
}
