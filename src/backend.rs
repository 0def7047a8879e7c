// src/backend.rs

use crate::assignment::{AssignmentResponse, AssignmentSource, EmployeeAssignment};
use crate::config::AppConfig;
use crate::store::{KeyValueStore, StoreError};
use crate::workplace::{WorkplaceLocation, WorkplaceLocationsResponse, WorkplaceSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_PROFILE_KEY: &str = "user_profile";

// --- Backend Error Type ---

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Not logged in (no stored auth token)")]
    MissingToken,

    #[error("Unauthorized: the backend rejected the auth token")]
    Unauthorized,

    #[error("Rate limit exceeded (Status 429)")]
    RateLimited,

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: HashMap<String, Vec<String>>,
    },

    #[error("Backend API error: Status={status}, Message='{message}'")]
    Api { status: StatusCode, message: String },

    #[error("Local store error")]
    Store(#[from] StoreError),
}

// Helper to create context-aware IO errors
fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> BackendError {
    BackendError::Io {
        source: source.into(),
        context: context.into(),
    }
}

// --- Backend API Data Structures ---
//
// Every payload is parsed once at this boundary into an explicit type;
// nothing downstream touches raw JSON.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Position evidence attached to a clock-in/out submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    pub employee_id: String,
    pub workplace_location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workplace_location_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRequest {
    pub item_name: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignmentRequest {
    pub requested_location_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetEntry {
    pub id: String,
    pub email: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetListResponse {
    pub requests: Vec<PasswordResetEntry>,
}

/// Generic acknowledgement body returned by the submission endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAck {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user: UserProfile,
}

// Error body shapes the backend produces. 422 carries field-by-field
// messages; everything else carries at most a `message`.
#[derive(Debug, Clone, Deserialize)]
struct ValidationErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorPayload {
    #[serde(default)]
    message: Option<String>,
}

/// Builds the full request URL from the configured base and an endpoint
/// path, validating the result.
fn join_endpoint(base_url: &str, endpoint: &str) -> Result<String, BackendError> {
    let url = if endpoint.starts_with("http") {
        endpoint.to_string()
    } else if endpoint.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), endpoint)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), endpoint)
    };
    Url::parse(&url)?;
    Ok(url)
}

/// Maps a non-success response body to the matching error variant. 422
/// bodies become structured validation errors rather than opaque failures.
fn error_for_status(status: StatusCode, body: &str) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited,
        StatusCode::UNPROCESSABLE_ENTITY => {
            match serde_json::from_str::<ValidationErrorPayload>(body) {
                Ok(payload) => BackendError::Validation {
                    message: payload
                        .message
                        .unwrap_or_else(|| "The given data was invalid".to_string()),
                    errors: payload.errors,
                },
                Err(_) => BackendError::Validation {
                    message: body.to_string(),
                    errors: HashMap::new(),
                },
            }
        }
        _ => {
            let message = match serde_json::from_str::<ApiErrorPayload>(body) {
                Ok(payload) => payload.message.unwrap_or_else(|| body.to_string()),
                Err(_) => body.to_string(),
            };
            BackendError::Api { status, message }
        }
    }
}

// --- Backend Client Implementation ---

/// Bearer-token REST client for the field-operations backend. The token is
/// obtained at login, persisted in the key-value store, and attached to
/// every subsequent request. No automatic retries; callers re-trigger
/// failed operations themselves.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http_client: Client,
    store: Arc<dyn KeyValueStore>,
    token: Arc<Mutex<Option<String>>>,
}

impl BackendClient {
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http_client,
            store,
            token: Arc::new(Mutex::new(None)),
        })
    }

    // --- Token Lifecycle ---

    /// In-memory token first, then the persisted copy from a previous run.
    async fn access_token(&self) -> Result<String, BackendError> {
        let mut token_guard = self.token.lock().await;
        if let Some(token) = token_guard.as_ref() {
            return Ok(token.clone());
        }

        match self.store.get_raw(AUTH_TOKEN_KEY)? {
            Some(stored) => {
                debug!("Loaded auth token from local store");
                *token_guard = Some(stored.clone());
                Ok(stored)
            }
            None => Err(BackendError::MissingToken),
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.access_token().await.is_ok()
    }

    /// Authenticates against the backend, persisting the issued token and
    /// the user profile for later sessions.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, BackendError> {
        info!("Logging in as {}", email);
        let url = join_endpoint(&self.base_url, "/auth/login")?;
        let request = self
            .http_client
            .request(Method::POST, &url)
            .header(ACCEPT, "application/json")
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });

        let response: LoginResponse = self.send_and_deserialize(request, "login").await?;

        self.store.set_raw(AUTH_TOKEN_KEY, response.token.clone())?;
        crate::store::set_json(self.store.as_ref(), USER_PROFILE_KEY, &response.user)?;
        *self.token.lock().await = Some(response.token);

        info!("Logged in as {} ({})", response.user.name, response.user.id);
        Ok(response.user)
    }

    /// Clears the token and cached profile locally. The backend token is
    /// simply abandoned; it expires server-side.
    pub async fn logout(&self) -> Result<(), BackendError> {
        *self.token.lock().await = None;
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.store.remove(USER_PROFILE_KEY)?;
        info!("Logged out; local token and profile cleared");
        Ok(())
    }

    /// Last profile stored at login, without a network call.
    pub fn cached_user(&self) -> Result<Option<UserProfile>, BackendError> {
        Ok(crate::store::get_json(self.store.as_ref(), USER_PROFILE_KEY)?)
    }

    // --- Request Plumbing ---

    pub async fn build_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, BackendError> {
        let access_token = self.access_token().await?;
        let url = join_endpoint(&self.base_url, endpoint)?;

        Ok(self
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    /// Like [`build_request`] but without a content type, for multipart
    /// bodies that set their own boundary.
    async fn build_multipart_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, BackendError> {
        let access_token = self.access_token().await?;
        let url = join_endpoint(&self.base_url, endpoint)?;

        Ok(self
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .header(ACCEPT, "application/json"))
    }

    pub async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, BackendError> {
        let request = match request_builder.build() {
            Ok(req) => req,
            Err(e) => {
                error!("Request build failed for '{}': {}", context_msg, e);
                return Err(BackendError::Request(e));
            }
        };
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to {}", context_msg, request_url);

        let response = match self.http_client.execute(request).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    "HTTP execution failed for '{}' (URL: {}): {}",
                    context_msg, request_url, e
                );
                return Err(BackendError::Request(e));
            }
        };

        let status = response.status();
        debug!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );

        if status.is_success() {
            let bytes = response.bytes().await.map_err(BackendError::Request)?;
            match serde_json::from_slice::<T>(&bytes) {
                Ok(data) => Ok(data),
                Err(e) => {
                    error!(
                        "JSON deserialization failed for '{}' (URL: {}): {}",
                        context_msg, request_url, e
                    );
                    Err(BackendError::Json(e))
                }
            }
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            warn!(
                "API error response for '{}': Status={}, Body='{}'",
                context_msg, status, body
            );
            Err(error_for_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        context_msg: &str,
    ) -> Result<T, BackendError> {
        let request = self.build_request(Method::GET, endpoint).await?;
        self.send_and_deserialize(request, context_msg).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        context_msg: &str,
    ) -> Result<T, BackendError> {
        let request = self.build_request(Method::POST, endpoint).await?.json(body);
        self.send_and_deserialize(request, context_msg).await
    }

    // --- Endpoints ---

    pub async fn current_user(&self) -> Result<UserProfile, BackendError> {
        let response: CurrentUserResponse = self.get("/auth/me", "current user").await?;
        crate::store::set_json(self.store.as_ref(), USER_PROFILE_KEY, &response.user)?;
        Ok(response.user)
    }

    pub async fn fetch_locations(&self) -> Result<Vec<WorkplaceLocation>, BackendError> {
        let response: WorkplaceLocationsResponse =
            self.get("/locations", "workplace locations").await?;
        Ok(response.locations)
    }

    pub async fn fetch_assignment(
        &self,
        employee_id: Option<&str>,
    ) -> Result<Option<EmployeeAssignment>, BackendError> {
        let endpoint = match employee_id {
            Some(id) => format!("/assignments/{}", id),
            None => "/assignments/me".to_string(),
        };
        let response: AssignmentResponse = self.get(&endpoint, "assignment").await?;
        Ok(response.assignment)
    }

    pub async fn submit_check_in(
        &self,
        submission: &AttendanceSubmission,
    ) -> Result<SubmissionAck, BackendError> {
        info!(
            "Submitting clock-in for {} at location {}",
            submission.employee_id, submission.workplace_location_id
        );
        self.post_json("/attendance/check-in", submission, "attendance check-in")
            .await
    }

    pub async fn submit_check_out(
        &self,
        submission: &AttendanceSubmission,
    ) -> Result<SubmissionAck, BackendError> {
        info!(
            "Submitting clock-out for {} at location {}",
            submission.employee_id, submission.workplace_location_id
        );
        self.post_json("/attendance/check-out", submission, "attendance check-out")
            .await
    }

    /// Incident reports carry their media (photos, videos) as multipart
    /// file parts alongside the text fields.
    pub async fn submit_incident_report(
        &self,
        report: &IncidentReport,
        media: &[PathBuf],
    ) -> Result<SubmissionAck, BackendError> {
        info!(
            "Submitting incident report '{}' with {} media file(s)",
            report.title,
            media.len()
        );

        let mut form = Form::new()
            .text("title", report.title.clone())
            .text("description", report.description.clone());
        if let Some(severity) = &report.severity {
            form = form.text("severity", severity.clone());
        }
        if let Some(location_id) = &report.workplace_location_id {
            form = form.text("workplaceLocationId", location_id.clone());
        }
        for path in media {
            form = form.part("media[]", file_part(path)?);
        }

        let request = self
            .build_multipart_request(Method::POST, "/incidents")
            .await?
            .multipart(form);
        self.send_and_deserialize(request, "incident report").await
    }

    pub async fn submit_inventory_request(
        &self,
        request: &InventoryRequest,
    ) -> Result<SubmissionAck, BackendError> {
        info!(
            "Submitting inventory request: {} x{}",
            request.item_name, request.quantity
        );
        self.post_json("/inventory-requests", request, "inventory request")
            .await
    }

    pub async fn submit_reassignment_request(
        &self,
        request: &ReassignmentRequest,
    ) -> Result<SubmissionAck, BackendError> {
        info!(
            "Submitting reassignment request to location {}",
            request.requested_location_id
        );
        self.post_json("/reassignment-requests", request, "reassignment request")
            .await
    }

    /// Password resets are requested before the user can log in, so this
    /// endpoint takes no auth token.
    pub async fn submit_password_reset(&self, email: &str) -> Result<SubmissionAck, BackendError> {
        info!("Submitting password reset request for {}", email);
        let url = join_endpoint(&self.base_url, "/password-resets")?;
        let request = self
            .http_client
            .request(Method::POST, &url)
            .header(ACCEPT, "application/json")
            .json(&PasswordResetRequest {
                email: email.to_string(),
            });
        self.send_and_deserialize(request, "password reset request")
            .await
    }

    pub async fn list_password_resets(&self) -> Result<Vec<PasswordResetEntry>, BackendError> {
        let response: PasswordResetListResponse =
            self.get("/password-resets", "password reset list").await?;
        Ok(response.requests)
    }
}

fn file_part(path: &Path) -> Result<Part, BackendError> {
    let bytes = fs::read(path)
        .map_err(|e| io_context(e, format!("Failed to read media file: {:?}", path)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

// The directory and resolver consume the client through their source
// traits, so tests can swap in counting mocks.

#[async_trait]
impl WorkplaceSource for BackendClient {
    async fn fetch_workplace_locations(&self) -> Result<Vec<WorkplaceLocation>, BackendError> {
        self.fetch_locations().await
    }
}

#[async_trait]
impl AssignmentSource for BackendClient {
    async fn fetch_my_assignment(&self) -> Result<Option<EmployeeAssignment>, BackendError> {
        self.fetch_assignment(None).await
    }

    async fn fetch_assignment_for(
        &self,
        employee_id: &str,
    ) -> Result<Option<EmployeeAssignment>, BackendError> {
        self.fetch_assignment(Some(employee_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_endpoint_handles_slashes_and_absolute_urls() {
        let base = "https://api.example.com/api/v1";
        assert_eq!(
            join_endpoint(base, "/locations").unwrap(),
            "https://api.example.com/api/v1/locations"
        );
        assert_eq!(
            join_endpoint(base, "locations").unwrap(),
            "https://api.example.com/api/v1/locations"
        );
        assert_eq!(
            join_endpoint("https://api.example.com/api/v1/", "/locations").unwrap(),
            "https://api.example.com/api/v1/locations"
        );
        assert_eq!(
            join_endpoint(base, "https://other.example.com/x").unwrap(),
            "https://other.example.com/x"
        );
        assert!(join_endpoint("not a url", "/locations").is_err());
    }

    #[test]
    fn unprocessable_entity_parses_into_field_errors() {
        let body = r#"{
            "message": "The given data was invalid",
            "errors": {
                "email": ["The email field is required."],
                "quantity": ["Must be at least 1.", "Must be an integer."]
            }
        }"#;
        match error_for_status(StatusCode::UNPROCESSABLE_ENTITY, body) {
            BackendError::Validation { message, errors } => {
                assert_eq!(message, "The given data was invalid");
                assert_eq!(errors["email"].len(), 1);
                assert_eq!(errors["quantity"].len(), 2);
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_422_body_still_surfaces_as_validation() {
        match error_for_status(StatusCode::UNPROCESSABLE_ENTITY, "<html>oops</html>") {
            BackendError::Validation { message, errors } => {
                assert_eq!(message, "<html>oops</html>");
                assert!(errors.is_empty());
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn status_specific_errors_map_to_variants() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, ""),
            BackendError::Unauthorized
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, ""),
            BackendError::RateLimited
        ));
        match error_for_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"boom"}"#) {
            BackendError::Api { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }
}
