pub mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::account::{Account, AccountFlags, AccountPayload};
use crate::core::settings::Settings;

pub use http::HttpApi;

const DEFAULT_UNAUTHORIZED: &str = "not authorized";
const DEFAULT_FAILURE: &str = "request failed";

/// Failure classification for every client-side operation.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// HTTP 401. Always accompanied by the token being cleared and the
    /// session forced back to the login view.
    #[error("{0}")]
    Unauthorized(String),
    /// Any other non-success condition: bad HTTP status, non-zero
    /// envelope code, or a transport failure.
    #[error("{0}")]
    RequestFailed(String),
    /// Rejected locally before any request was issued.
    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

/// The uniform `{code, message, data}` wrapper every endpoint returns.
///
/// `code == 0` is the sole success discriminant; a body that fails to
/// parse is treated as an empty envelope, which fails that check.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn message_or(self, fallback: &str) -> String {
        match self.message {
            Some(m) if !m.is_empty() => m,
            _ => fallback.to_string(),
        }
    }
}

/// Classify a raw response per the envelope contract.
///
/// Evaluated in order: 401 wins over everything, then the combined
/// HTTP-status / envelope-code success check. On success the envelope's
/// `data` field is returned.
pub(crate) fn decode_envelope(status: StatusCode, body: &[u8]) -> Result<Value, ApiError> {
    let envelope: Envelope = serde_json::from_slice(body).unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(envelope.message_or(DEFAULT_UNAUTHORIZED)));
    }
    if !status.is_success() || envelope.code != Some(0) {
        return Err(ApiError::RequestFailed(envelope.message_or(DEFAULT_FAILURE)));
    }
    Ok(envelope.data)
}

/// Data of a successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

/// One entry of the check-in action's result list. The shape is loose;
/// the client only counts entries and echoes whatever fields are there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckinOutcome {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The endpoint set of the automation service, as consumed by the
/// controllers. `HttpApi` is the production implementation; tests script
/// a fake.
#[async_trait]
pub trait Api {
    async fn login(&self, password: &str) -> Result<LoginGrant, ApiError>;
    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError>;
    async fn create_account(&self, payload: &AccountPayload) -> Result<Account, ApiError>;
    async fn update_account(&self, id: &str, payload: &AccountPayload) -> Result<Account, ApiError>;
    async fn patch_account_flags(&self, id: &str, flags: AccountFlags) -> Result<Account, ApiError>;
    async fn delete_account(&self, id: &str) -> Result<(), ApiError>;
    async fn fetch_settings(&self) -> Result<Settings, ApiError>;
    async fn save_settings(&self, settings: &Settings) -> Result<Settings, ApiError>;
    async fn run_checkin(&self) -> Result<Vec<CheckinOutcome>, ApiError>;
}
