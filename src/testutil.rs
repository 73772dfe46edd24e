use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::api::{Api, ApiError, CheckinOutcome, LoginGrant};
use crate::core::account::{Account, AccountFlags, AccountPayload};
use crate::core::settings::Settings;
use crate::store::TokenStore;

/// Scripted in-memory backend for controller and session tests.
///
/// Records every call, serves a mutable account collection, and can be
/// told to fail individual operations. When given a token store it
/// mirrors the production client's 401 side effect (clearing the token
/// before returning the error).
pub(crate) struct FakeApi {
    pub accounts: Mutex<Vec<Account>>,
    pub settings: Mutex<Settings>,
    pub checkin_results: Mutex<Vec<CheckinOutcome>>,
    pub calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    tokens: Option<TokenStore>,
    next_id: AtomicU64,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            settings: Mutex::new(Settings::default()),
            checkin_results: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            tokens: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let api = Self::new();
        *api.accounts.lock().unwrap() = accounts;
        api
    }

    /// Mirror 401 handling into `tokens`, as `HttpApi` does.
    pub fn with_token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Make `op` (e.g. `"fetch_settings"`) fail with `error`.
    pub fn fail(&self, op: &'static str, error: ApiError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, op: &'static str, detail: &str) -> Result<(), ApiError> {
        let call = if detail.is_empty() {
            op.to_string()
        } else {
            format!("{}:{}", op, detail)
        };
        self.calls.lock().unwrap().push(call);

        if let Some(error) = self.failures.lock().unwrap().get(op).cloned() {
            if error.is_unauthorized() {
                if let Some(tokens) = &self.tokens {
                    tokens.clear();
                }
            }
            return Err(error);
        }
        Ok(())
    }

    pub fn account(id: &str, name: &str) -> Account {
        Account {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            ..Account::default()
        }
    }
}

#[async_trait]
impl Api for FakeApi {
    async fn login(&self, password: &str) -> Result<LoginGrant, ApiError> {
        self.enter("login", password)?;
        Ok(LoginGrant {
            token: "fake-token".to_string(),
            expires_in_days: Some(30),
        })
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.enter("list_accounts", "")?;
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn create_account(&self, payload: &AccountPayload) -> Result<Account, ApiError> {
        self.enter("create_account", &payload.name)?;
        let account = Account {
            id: format!("acc_{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            name: payload.name.clone(),
            username: payload.username.clone(),
            password: payload.password.clone(),
            api_key: payload.api_key.clone(),
            renew_products: payload.renew_products.clone(),
            enabled: payload.enabled,
            auto_renew: payload.auto_renew,
            last_status: None,
            last_checkin: None,
        };
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    async fn update_account(&self, id: &str, payload: &AccountPayload) -> Result<Account, ApiError> {
        self.enter("update_account", id)?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::RequestFailed("account not found".to_string()))?;
        account.name = payload.name.clone();
        account.username = payload.username.clone();
        account.password = payload.password.clone();
        account.api_key = payload.api_key.clone();
        account.renew_products = payload.renew_products.clone();
        account.enabled = payload.enabled;
        account.auto_renew = payload.auto_renew;
        Ok(account.clone())
    }

    async fn patch_account_flags(&self, id: &str, flags: AccountFlags) -> Result<Account, ApiError> {
        self.enter("patch_account_flags", id)?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ApiError::RequestFailed("account not found".to_string()))?;
        if let Some(enabled) = flags.enabled {
            account.enabled = enabled;
        }
        if let Some(auto_renew) = flags.auto_renew {
            account.auto_renew = auto_renew;
        }
        Ok(account.clone())
    }

    async fn delete_account(&self, id: &str) -> Result<(), ApiError> {
        self.enter("delete_account", id)?;
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() == before {
            return Err(ApiError::RequestFailed("account not found".to_string()));
        }
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<Settings, ApiError> {
        self.enter("fetch_settings", "")?;
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        self.enter("save_settings", "")?;
        *self.settings.lock().unwrap() = settings.clone();
        Ok(settings.clone())
    }

    async fn run_checkin(&self) -> Result<Vec<CheckinOutcome>, ApiError> {
        self.enter("run_checkin", "")?;
        Ok(self.checkin_results.lock().unwrap().clone())
    }
}
