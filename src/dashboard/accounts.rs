use crate::api::{Api, ApiError};
use crate::core::account::{
    Account, AccountFlags, AccountPayload, format_renew_products, parse_renew_products,
};

/// An identity-scoped action on one rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAction {
    pub id: String,
    pub kind: RowKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Edit,
    Delete,
    SetEnabled(bool),
}

/// Interactive confirmation seam for destructive row actions.
pub trait ConfirmDelete {
    fn confirm_delete(&mut self, label: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> ConfirmDelete for F {
    fn confirm_delete(&mut self, label: &str) -> bool {
        self(label)
    }
}

/// What a dispatched row action produced.
#[derive(Debug)]
pub enum RowOutcome {
    /// Edit: the form to show, filled from a fresh copy of the account.
    Editing(AccountForm),
    /// Edit: the id vanished between render and dispatch. Not an error;
    /// the next refresh will drop the row.
    NotFound,
    Deleted,
    DeleteCancelled,
    FlagsUpdated(Account),
}

/// The rendered account collection.
///
/// There is no incremental diffing and no durable local copy: every
/// refresh re-fetches the full collection and replaces the rows
/// wholesale, and only after the fetch succeeded, so a failed refresh
/// leaves the previous render intact.
#[derive(Debug, Default)]
pub struct AccountList {
    rows: Vec<Account>,
}

impl AccountList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the dashboard-entry fetch.
    pub fn from_rows(rows: Vec<Account>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Account] {
        &self.rows
    }

    /// Full rebuild from the server.
    pub async fn refresh(&mut self, api: &impl Api) -> Result<(), ApiError> {
        let rows = api.list_accounts().await?;
        self.rows = rows;
        Ok(())
    }

    /// Route a row action to its handler.
    pub async fn dispatch(
        &mut self,
        api: &impl Api,
        confirm: &mut impl ConfirmDelete,
        action: RowAction,
    ) -> Result<RowOutcome, ApiError> {
        match action.kind {
            RowKind::Edit => {
                // Deliberately re-fetch instead of reusing the rendered
                // rows: another session may have changed the account
                // since the last render, and editing from a stale
                // snapshot would silently resurrect old values.
                let accounts = api.list_accounts().await?;
                match accounts.into_iter().find(|a| a.id == action.id) {
                    Some(account) => Ok(RowOutcome::Editing(AccountForm::fill(&account))),
                    None => Ok(RowOutcome::NotFound),
                }
            }
            RowKind::Delete => {
                let label = self
                    .rows
                    .iter()
                    .find(|a| a.id == action.id)
                    .map(|a| a.label().to_string())
                    .unwrap_or_else(|| action.id.clone());
                if !confirm.confirm_delete(&label) {
                    return Ok(RowOutcome::DeleteCancelled);
                }
                api.delete_account(&action.id).await?;
                // The delete succeeding already implies the row is gone,
                // but the refreshed fetch stays the single source of
                // truth for what is rendered.
                self.refresh(api).await?;
                Ok(RowOutcome::Deleted)
            }
            RowKind::SetEnabled(enabled) => {
                let flags = AccountFlags {
                    enabled: Some(enabled),
                    auto_renew: None,
                };
                let account = api.patch_account_flags(&action.id, flags).await?;
                self.refresh(api).await?;
                Ok(RowOutcome::FlagsUpdated(account))
            }
        }
    }
}

/// Result of a successful form save.
#[derive(Debug)]
pub enum SavedAccount {
    Created(Account),
    Updated(Account),
}

impl SavedAccount {
    pub fn account(&self) -> &Account {
        match self {
            SavedAccount::Created(a) | SavedAccount::Updated(a) => a,
        }
    }
}

/// The single editable account record and its mode.
///
/// `editing_id` absent means create mode. Field values mirror the
/// on-screen form; renew products are held as the comma-separated
/// display string until save.
#[derive(Debug, Clone)]
pub struct AccountForm {
    editing_id: Option<String>,
    pub name: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub renew_products: String,
    pub enabled: bool,
    pub auto_renew: bool,
}

impl Default for AccountForm {
    fn default() -> Self {
        Self {
            editing_id: None,
            name: String::new(),
            username: String::new(),
            password: String::new(),
            api_key: String::new(),
            renew_products: String::new(),
            enabled: true,
            auto_renew: false,
        }
    }
}

impl AccountForm {
    /// A blank form in create mode; new accounts default to enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all fields and return to create mode.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Enter edit mode for `account`, mirroring every field.
    pub fn fill(account: &Account) -> Self {
        Self {
            editing_id: Some(account.id.clone()),
            name: account.name.clone(),
            username: account.username.clone(),
            password: account.password.clone(),
            api_key: account.api_key.clone(),
            renew_products: format_renew_products(&account.renew_products),
            enabled: account.enabled,
            auto_renew: account.auto_renew,
        }
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    /// Build the request payload from the current field values: text
    /// fields trimmed, renew products parsed from the display string.
    pub fn payload(&self) -> Result<AccountPayload, ApiError> {
        let renew_products = parse_renew_products(&self.renew_products)
            .map_err(|token| ApiError::InvalidInput(format!("invalid renew product: {}", token)))?;
        Ok(AccountPayload {
            name: self.name.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            renew_products,
            enabled: self.enabled,
            auto_renew: self.auto_renew,
        })
    }

    /// Create or update depending on mode. On success the form resets to
    /// create mode and the list is refreshed; on any failure the fields
    /// stay populated so the operator can retry.
    pub async fn save(
        &mut self,
        api: &impl Api,
        list: &mut AccountList,
    ) -> Result<SavedAccount, ApiError> {
        let payload = self.payload()?;
        let saved = match &self.editing_id {
            Some(id) => SavedAccount::Updated(api.update_account(id, &payload).await?),
            None => SavedAccount::Created(api.create_account(&payload).await?),
        };
        self.reset();
        list.refresh(api).await?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeApi;

    fn deny(_: &str) -> bool {
        false
    }

    fn allow(_: &str) -> bool {
        true
    }

    #[tokio::test]
    async fn refresh_replaces_rows_wholesale() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "one")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();
        assert_eq!(list.rows().len(), 1);

        api.accounts.lock().unwrap().clear();
        list.refresh(&api).await.unwrap();
        assert!(list.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_render() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "one")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();

        api.fail("list_accounts", ApiError::RequestFailed("down".to_string()));
        assert!(list.refresh(&api).await.is_err());
        assert_eq!(list.rows().len(), 1);
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let api = FakeApi::with_accounts(vec![
            FakeApi::account("acc_1", "one"),
            FakeApi::account("acc_2", "two"),
        ]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();
        let first: Vec<String> = list.rows().iter().map(|a| a.id.clone()).collect();
        list.refresh(&api).await.unwrap();
        let second: Vec<String> = list.rows().iter().map(|a| a.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn edit_uses_fresh_server_state() {
        // The row still shows the old name; the form must not.
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "old name")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();
        api.accounts.lock().unwrap()[0].name = "renamed elsewhere".to_string();

        let outcome = list
            .dispatch(
                &api,
                &mut deny,
                RowAction {
                    id: "acc_1".to_string(),
                    kind: RowKind::Edit,
                },
            )
            .await
            .unwrap();
        match outcome {
            RowOutcome::Editing(form) => {
                assert_eq!(form.editing_id(), Some("acc_1"));
                assert_eq!(form.name, "renamed elsewhere");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn edit_of_vanished_id_is_a_silent_noop() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "one")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();
        api.accounts.lock().unwrap().clear();

        let outcome = list
            .dispatch(
                &api,
                &mut deny,
                RowAction {
                    id: "acc_1".to_string(),
                    kind: RowKind::Edit,
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, RowOutcome::NotFound));
    }

    #[tokio::test]
    async fn declined_delete_issues_no_request() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "one")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();
        api.calls.lock().unwrap().clear();

        let outcome = list
            .dispatch(
                &api,
                &mut deny,
                RowAction {
                    id: "acc_1".to_string(),
                    kind: RowKind::Delete,
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, RowOutcome::DeleteCancelled));
        assert!(api.calls().is_empty());
        assert_eq!(list.rows().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_and_refreshes() {
        let api = FakeApi::with_accounts(vec![
            FakeApi::account("acc_1", "one"),
            FakeApi::account("acc_2", "two"),
        ]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();

        let outcome = list
            .dispatch(
                &api,
                &mut allow,
                RowAction {
                    id: "acc_1".to_string(),
                    kind: RowKind::Delete,
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, RowOutcome::Deleted));
        assert_eq!(list.rows().len(), 1);
        assert_eq!(list.rows()[0].id, "acc_2");
        assert_eq!(
            api.calls(),
            vec!["list_accounts", "delete_account:acc_1", "list_accounts"]
        );
    }

    #[tokio::test]
    async fn set_enabled_patches_flags_and_refreshes() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "one")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();

        let outcome = list
            .dispatch(
                &api,
                &mut deny,
                RowAction {
                    id: "acc_1".to_string(),
                    kind: RowKind::SetEnabled(false),
                },
            )
            .await
            .unwrap();
        match outcome {
            RowOutcome::FlagsUpdated(account) => assert!(!account.enabled),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!list.rows()[0].enabled);
    }

    #[tokio::test]
    async fn save_in_create_mode_resets_and_refreshes() {
        let api = FakeApi::new();
        let mut list = AccountList::new();
        let mut form = AccountForm::new();
        form.name = "  new account  ".to_string();
        form.username = "user@example.com".to_string();
        form.renew_products = "1, 2,,3".to_string();

        let saved = form.save(&api, &mut list).await.unwrap();
        match &saved {
            SavedAccount::Created(account) => {
                assert_eq!(account.name, "new account");
                assert_eq!(account.renew_products, vec![1, 2, 3]);
                assert!(account.enabled);
            }
            other => panic!("unexpected: {:?}", other),
        }
        // Form back to create-mode defaults, list showing the new row.
        assert_eq!(form.editing_id(), None);
        assert!(form.name.is_empty());
        assert!(form.enabled);
        assert_eq!(list.rows().len(), 1);
    }

    #[tokio::test]
    async fn save_in_edit_mode_updates_in_place() {
        let api = FakeApi::with_accounts(vec![FakeApi::account("acc_1", "before")]);
        let mut list = AccountList::new();
        list.refresh(&api).await.unwrap();

        let mut form = AccountForm::fill(&list.rows()[0]);
        form.name = "after".to_string();
        let saved = form.save(&api, &mut list).await.unwrap();
        assert!(matches!(saved, SavedAccount::Updated(_)));
        assert_eq!(list.rows().len(), 1);
        assert_eq!(list.rows()[0].name, "after");
        assert_eq!(form.editing_id(), None);
    }

    #[tokio::test]
    async fn failed_save_leaves_form_populated() {
        let api = FakeApi::new();
        api.fail("create_account", ApiError::RequestFailed("rejected".to_string()));
        let mut list = AccountList::new();
        let mut form = AccountForm::new();
        form.name = "keep me".to_string();
        form.renew_products = "7".to_string();

        assert!(form.save(&api, &mut list).await.is_err());
        assert_eq!(form.name, "keep me");
        assert_eq!(form.renew_products, "7");
    }

    #[tokio::test]
    async fn invalid_renew_token_fails_locally() {
        let api = FakeApi::new();
        let mut list = AccountList::new();
        let mut form = AccountForm::new();
        form.name = "broken".to_string();
        form.renew_products = "1,oops".to_string();

        let err = form.save(&api, &mut list).await.unwrap_err();
        match err {
            ApiError::InvalidInput(m) => assert_eq!(m, "invalid renew product: oops"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(api.calls().is_empty());
        assert_eq!(form.name, "broken");
    }

    #[test]
    fn fill_renders_renew_products_as_comma_string() {
        let mut account = FakeApi::account("acc_9", "nine");
        account.renew_products = vec![10086, 7];
        let form = AccountForm::fill(&account);
        assert_eq!(form.renew_products, "10086,7");
        assert_eq!(form.editing_id(), Some("acc_9"));
    }
}
