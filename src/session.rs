use futures::future;

use crate::api::{Api, ApiError};
use crate::core::account::Account;
use crate::core::settings::Settings;
use crate::store::TokenStore;

/// Which top-level view is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Loading,
    Dashboard,
}

/// Everything the dashboard needs on entry, fetched as one gate.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub accounts: Vec<Account>,
    pub settings: Settings,
}

/// Result of a successful login, including the grant metadata the
/// backend reports alongside the token.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub dashboard: DashboardData,
    pub expires_in_days: Option<i64>,
}

/// The session controller: owns the token lifecycle and decides between
/// the login and dashboard views. All other controllers run only while
/// this one is in `Dashboard`.
pub struct Session<A: Api> {
    api: A,
    tokens: TokenStore,
    state: SessionState,
}

impl<A: Api> Session<A> {
    pub fn new(api: A, tokens: TokenStore) -> Self {
        Self {
            api,
            tokens,
            state: SessionState::LoggedOut,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Initial entry. With no persisted token this settles in `LoggedOut`
    /// immediately; otherwise accounts and settings are fetched
    /// concurrently and the dashboard opens only if both succeed. Any
    /// failure clears the token, so the next start lands on the login
    /// view without a doomed round trip.
    pub async fn start(&mut self) -> Result<Option<DashboardData>, ApiError> {
        if self.tokens.get().is_none() {
            self.state = SessionState::LoggedOut;
            return Ok(None);
        }

        self.state = SessionState::Loading;
        let entry = self.fetch_dashboard().await;
        match entry {
            Ok(data) => {
                self.state = SessionState::Dashboard;
                Ok(Some(data))
            }
            Err(e) => {
                log::info!("Dashboard entry failed, dropping stored token: {}", e);
                self.tokens.clear();
                self.state = SessionState::LoggedOut;
                Err(e)
            }
        }
    }

    /// Authenticate and enter the dashboard.
    ///
    /// An empty or whitespace password fails locally; no request leaves
    /// the client and the stored token is untouched. When the post-login
    /// fetch fails the session stays logged out but the fresh token is
    /// kept (unless the failure was a 401, which clears it at the API
    /// client), matching the original client.
    pub async fn login(&mut self, password: &str) -> Result<LoginSuccess, ApiError> {
        let password = password.trim();
        if password.is_empty() {
            return Err(ApiError::InvalidInput("password must not be empty".to_string()));
        }

        let grant = self.api.login(password).await?;
        self.tokens
            .set(Some(&grant.token))
            .map_err(|e| ApiError::RequestFailed(format!("failed to persist token: {}", e)))?;

        self.state = SessionState::Loading;
        let entry = self.fetch_dashboard().await;
        match entry {
            Ok(dashboard) => {
                self.state = SessionState::Dashboard;
                Ok(LoginSuccess {
                    dashboard,
                    expires_in_days: grant.expires_in_days,
                })
            }
            Err(e) => {
                self.state = SessionState::LoggedOut;
                Err(e)
            }
        }
    }

    /// Leave the dashboard and drop the token. Purely local.
    pub fn logout(&mut self) {
        self.tokens.clear();
        self.state = SessionState::LoggedOut;
    }

    /// Action-boundary hook: an unauthorized failure from any feature
    /// forces the logged-out view, regardless of what triggered it.
    pub fn note_failure(&mut self, error: &ApiError) {
        if error.is_unauthorized() {
            self.tokens.clear();
            self.state = SessionState::LoggedOut;
        }
    }

    async fn fetch_dashboard(&self) -> Result<DashboardData, ApiError> {
        let (accounts, settings) =
            future::try_join(self.api.list_accounts(), self.api.fetch_settings()).await?;
        Ok(DashboardData {
            accounts,
            settings: settings.normalized(),
        })
    }
}
