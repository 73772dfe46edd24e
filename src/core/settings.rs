use serde::{Deserialize, Serialize};

pub const DEFAULT_RENEW_THRESHOLD_DAYS: i64 = 7;
pub const DEFAULT_CRON_SCHEDULE: &str = "0 8 * * *";

/// The global automation settings record. Singleton, replaced wholesale
/// on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub renew_threshold_days: i64,
    #[serde(default)]
    pub cron_schedule: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_renew: false,
            renew_threshold_days: DEFAULT_RENEW_THRESHOLD_DAYS,
            cron_schedule: DEFAULT_CRON_SCHEDULE.to_string(),
        }
    }
}

impl Settings {
    /// Apply the falsy-field defaulting used on both load and save.
    ///
    /// A threshold of 0 (or below) and a blank cron schedule count as
    /// unset, matching the original client. Whether 0 days could ever be
    /// a legitimate value is an open question upstream; the conflation
    /// is kept as-is.
    pub fn normalized(mut self) -> Self {
        if self.renew_threshold_days <= 0 {
            self.renew_threshold_days = DEFAULT_RENEW_THRESHOLD_DAYS;
        }
        if self.cron_schedule.trim().is_empty() {
            self.cron_schedule = DEFAULT_CRON_SCHEDULE.to_string();
        } else {
            self.cron_schedule = self.cron_schedule.trim().to_string();
        }
        self
    }
}
