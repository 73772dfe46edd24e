use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::core::account::{Account, AccountFlags, AccountPayload};
use crate::core::settings::Settings;
use crate::store::TokenStore;

use super::{decode_envelope, Api, ApiError, CheckinOutcome, LoginGrant};

/// reqwest-backed client for the automation service.
///
/// The single point of token attachment: every request carries
/// `Authorization: Bearer <token>` while a token exists, and a 401
/// response clears the store before the error is returned.
pub struct HttpApi {
    base_url: String,
    http: Client,
    tokens: TokenStore,
}

impl HttpApi {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::RequestFailed(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");
        if let Some(token) = self.tokens.get() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        log::debug!("{} {}", method, url);
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(format!("request failed: {}", e)))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::RequestFailed(format!("request failed: {}", e)))?;

        self.intercept(decode_envelope(status, &bytes))
    }

    /// Apply the 401 side effect: an unauthorized response invalidates
    /// the stored token no matter which endpoint produced it.
    fn intercept(&self, result: Result<Value, ApiError>) -> Result<Value, ApiError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                log::info!("Server rejected the session token, clearing it");
                self.tokens.clear();
            }
        }
        result
    }
}

fn from_data<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::RequestFailed(format!("unexpected response shape: {}", e)))
}

#[async_trait]
impl Api for HttpApi {
    async fn login(&self, password: &str) -> Result<LoginGrant, ApiError> {
        let body = serde_json::json!({ "password": password });
        let data = self.request(Method::POST, "api/login", Some(&body)).await?;
        from_data(data)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        let data = self.request(Method::GET, "api/accounts", None).await?;
        from_data(data)
    }

    async fn create_account(&self, payload: &AccountPayload) -> Result<Account, ApiError> {
        let body = serde_json::to_value(payload).expect("payload serializes");
        let data = self.request(Method::POST, "api/accounts", Some(&body)).await?;
        from_data(data)
    }

    async fn update_account(&self, id: &str, payload: &AccountPayload) -> Result<Account, ApiError> {
        let body = serde_json::to_value(payload).expect("payload serializes");
        let data = self
            .request(Method::PUT, &format!("api/accounts/{}", id), Some(&body))
            .await?;
        from_data(data)
    }

    async fn patch_account_flags(&self, id: &str, flags: AccountFlags) -> Result<Account, ApiError> {
        let body = serde_json::to_value(flags).expect("flags serialize");
        let data = self
            .request(Method::PATCH, &format!("api/accounts/{}", id), Some(&body))
            .await?;
        from_data(data)
    }

    async fn delete_account(&self, id: &str) -> Result<(), ApiError> {
        // data is `{deleted: true}`; nothing in it is meaningful here.
        self.request(Method::DELETE, &format!("api/accounts/{}", id), None)
            .await?;
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<Settings, ApiError> {
        let data = self.request(Method::GET, "api/system/settings", None).await?;
        from_data(data)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        let body = serde_json::to_value(settings).expect("settings serialize");
        let data = self
            .request(Method::PUT, "api/system/settings", Some(&body))
            .await?;
        from_data(data)
    }

    async fn run_checkin(&self) -> Result<Vec<CheckinOutcome>, ApiError> {
        let data = self
            .request(Method::POST, "api/actions/checkin", None)
            .await?;
        from_data(data)
    }
}
