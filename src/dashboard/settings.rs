use crate::api::{Api, ApiError};
use crate::core::settings::Settings;

/// The global-settings editor: three fields, loaded with defaulting and
/// saved back wholesale (no partial updates).
#[derive(Debug, Clone, Default)]
pub struct SettingsPanel {
    pub auto_renew: bool,
    pub renew_threshold_days: i64,
    pub cron_schedule: String,
}

impl SettingsPanel {
    pub fn from_settings(settings: &Settings) -> Self {
        let settings = settings.clone().normalized();
        Self {
            auto_renew: settings.auto_renew,
            renew_threshold_days: settings.renew_threshold_days,
            cron_schedule: settings.cron_schedule,
        }
    }

    /// Fetch the settings record, defaulting any falsy field.
    pub async fn load(api: &impl Api) -> Result<Self, ApiError> {
        let settings = api.fetch_settings().await?;
        Ok(Self::from_settings(&settings))
    }

    /// The record that would be saved right now, with the same
    /// defaulting rules applied to the current field values.
    pub fn to_settings(&self) -> Settings {
        Settings {
            auto_renew: self.auto_renew,
            renew_threshold_days: self.renew_threshold_days,
            cron_schedule: self.cron_schedule.clone(),
        }
        .normalized()
    }

    /// Replace the server-side record with the current fields.
    pub async fn save(&self, api: &impl Api) -> Result<Settings, ApiError> {
        api.save_settings(&self.to_settings()).await
    }
}
