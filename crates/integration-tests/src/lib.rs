//! Integration tests for Hearth.
//!
//! The tests drive the real [`hearth_forms::ApiClient`] against an axum
//! server bound to an ephemeral local port. The server keeps everything in
//! memory and records every write so tests can assert on what went over the
//! wire.
//!
//! ```rust,ignore
//! let backend = StubBackend::spawn(StubState::default()).await;
//! let client = backend.client();
//! let settings: ProfileSettings = load_settings(&client, &ToastLog::new()).await;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};

use hearth_core::{Setting, SettingCategory, SettingUpdate, UserProfile};
use hearth_forms::{ApiClient, ClientConfig};

/// A file received by `POST /media/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// Everything the stub serves and records.
#[derive(Debug, Default)]
pub struct StubState {
    /// Records per category path segment.
    pub settings: HashMap<String, Vec<Setting>>,
    pub profiles: HashMap<String, UserProfile>,
    /// Answer `GET /settings/*` with a 500.
    pub settings_unavailable: bool,
    /// Reject `PUT /profile/*` with a 422 and this message.
    pub reject_profile_update: Option<String>,
    /// Delay applied to `PUT /profile/*` before answering.
    pub profile_update_delay: Duration,
    pub settings_writes: Vec<(String, Vec<SettingUpdate>)>,
    pub profile_writes: Vec<Value>,
    pub uploads: Vec<ReceivedUpload>,
    pub setups: Vec<Value>,
}

impl StubState {
    /// Serve `records` under `category`.
    #[must_use]
    pub fn with_settings(mut self, category: SettingCategory, records: Vec<Setting>) -> Self {
        self.settings.insert(category.as_str().to_owned(), records);
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.id.to_string(), profile);
        self
    }
}

/// Shared handle to the stub's state.
#[derive(Clone, Default)]
struct AppState {
    inner: Arc<Mutex<StubState>>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error body in the backend's `{ "error": "..." }` shape.
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiError { error: msg.into() })).into_response()
}

/// A running stub backend. The server stops when the test runtime ends.
pub struct StubBackend {
    addr: SocketAddr,
    state: AppState,
}

impl StubBackend {
    /// Bind to an ephemeral port and start serving `state`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn(state: StubState) -> Self {
        let state = AppState {
            inner: Arc::new(Mutex::new(state)),
        };
        let app = router().with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Stub backend stopped");
            }
        });

        Self { addr, state }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// A client pointed at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        let config = ClientConfig::new(&self.base_url())
            .expect("Invalid stub URL")
            .with_token("integration-test-token");
        ApiClient::new(&config).expect("Failed to build client")
    }

    /// Run `f` with the recorded state.
    pub fn inspect<R>(&self, f: impl FnOnce(&StubState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Mutate the state between requests.
    pub fn update(&self, f: impl FnOnce(&mut StubState)) {
        f(&mut self.state.lock());
    }
}

/// A client pointed at a port nothing listens on.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn unreachable_client() -> ApiClient {
    let config = ClientConfig::new("http://127.0.0.1:9/api/").expect("Invalid URL");
    ApiClient::new(&config).expect("Failed to build client")
}

fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/settings/{category}",
            get(fetch_settings).put(update_settings),
        )
        .route("/api/profile/{id}", get(fetch_profile).put(update_profile))
        .route("/api/media/upload", post(upload_media))
        .route("/api/setup", post(complete_setup))
}

// ============================================================================
// Handlers
// ============================================================================

async fn fetch_settings(State(state): State<AppState>, Path(category): Path<String>) -> Response {
    let state = state.lock();
    if state.settings_unavailable {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Settings service is down");
    }
    Json(state.settings.get(&category).cloned().unwrap_or_default()).into_response()
}

async fn update_settings(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(updates): Json<Vec<SettingUpdate>>,
) -> Response {
    let Ok(parsed) = category.parse::<SettingCategory>() else {
        return api_error(StatusCode::NOT_FOUND, format!("Unknown category '{category}'"));
    };

    let mut state = state.lock();
    let records = state.settings.entry(category.clone()).or_default();
    for update in &updates {
        match records.iter_mut().find(|r| r.key == update.key) {
            Some(record) => record.value.clone_from(&update.value),
            None => records.push(Setting::new(parsed, &update.key, &update.value)),
        }
    }
    state.settings_writes.push((category, updates));
    StatusCode::NO_CONTENT.into_response()
}

async fn fetch_profile(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.lock().profiles.get(&id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "Profile not found"),
    }
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let delay = state.lock().profile_update_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock();
    state.profile_writes.push(payload.clone());

    if let Some(message) = state.reject_profile_update.clone() {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, message);
    }
    let Some(current) = state.profiles.get(&id) else {
        return api_error(StatusCode::NOT_FOUND, "Profile not found");
    };

    // Payload keys share the profile's camelCase wire names.
    let mut merged = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        _ => return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Corrupt profile"),
    };
    if let Value::Object(fields) = payload {
        merged.extend(fields);
    }

    match serde_json::from_value::<UserProfile>(Value::Object(merged)) {
        Ok(updated) => {
            state.profiles.insert(id, updated.clone());
            Json(updated).into_response()
        }
        Err(e) => api_error(StatusCode::BAD_REQUEST, format!("Invalid profile: {e}")),
    }
}

async fn upload_media(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return api_error(StatusCode::BAD_REQUEST, "Missing file part"),
            Err(e) => return api_error(StatusCode::BAD_REQUEST, e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return api_error(StatusCode::BAD_REQUEST, e.body_text()),
        };

        let url = format!("https://cdn.hearth.test/media/{file_name}");
        state.lock().uploads.push(ReceivedUpload {
            file_name,
            content_type,
            size: bytes.len(),
        });
        return Json(json!({ "url": url })).into_response();
    }
}

async fn complete_setup(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let mut state = state.lock();
    if !state.setups.is_empty() {
        return api_error(StatusCode::CONFLICT, "Setup has already been completed");
    }
    state.setups.push(payload);
    StatusCode::CREATED.into_response()
}

/// Records and profiles shared by the test files.
pub mod fixtures {
    use std::collections::BTreeMap;

    use hearth_core::{Email, Setting, SettingCategory, UserId, UserProfile};

    /// A complete profile with a bio and website but no links or extras.
    ///
    /// # Panics
    ///
    /// Never; the fixture email is valid.
    #[must_use]
    pub fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(id),
            name: "Grace Hopper".to_owned(),
            username: "grace".to_owned(),
            email: Email::parse("grace@example.com").expect("Invalid fixture email"),
            bio: Some("Compilers".to_owned()),
            location: Some("Arlington".to_owned()),
            website: Some("https://grace.dev".to_owned()),
            occupation: None,
            avatar: None,
            cover_image: None,
            social_links: None,
            custom_fields: BTreeMap::new(),
            privacy: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn profile_setting(key: &str, value: &str) -> Setting {
        Setting::new(SettingCategory::Profile, key, value)
    }
}
