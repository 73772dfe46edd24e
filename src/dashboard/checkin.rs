use crate::api::{Api, ApiError, CheckinOutcome};
use crate::dashboard::accounts::AccountList;

/// Summary of one batch check-in run.
#[derive(Debug, Clone)]
pub struct CheckinReport {
    pub outcomes: Vec<CheckinOutcome>,
}

impl CheckinReport {
    /// The number the notification reports: one result per processed
    /// account.
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

/// Fire the one-shot check-in action for all enabled accounts, then
/// refresh the list so updated `last_status`/`last_checkin` values are
/// visible. On failure the list is left as rendered.
pub async fn run_checkin(
    api: &impl Api,
    list: &mut AccountList,
) -> Result<CheckinReport, ApiError> {
    let outcomes = api.run_checkin().await?;
    list.refresh(api).await?;
    Ok(CheckinReport { outcomes })
}
