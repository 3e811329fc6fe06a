use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::SharedState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub appointment_reminders: bool,
    pub medication_reminders: bool,
    pub lab_result_alerts: bool,
    pub emergency_alerts: bool,
    pub marketing_emails: bool,
    pub weekly_health_tips: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            sms_notifications: true,
            appointment_reminders: true,
            medication_reminders: true,
            lab_result_alerts: true,
            emergency_alerts: true,
            marketing_emails: false,
            weekly_health_tips: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub profile_visibility: String,
    pub share_data_for_research: bool,
    pub allow_telemedicine: bool,
    pub two_factor_auth: bool,
    /// Minutes.
    pub session_timeout: u32,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: "private".into(),
            share_data_for_research: false,
            allow_telemedicine: true,
            two_factor_auth: false,
            session_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub language: String,
    pub timezone: String,
    pub date_format: String,
    pub theme: String,
    pub font_size: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".into(),
            timezone: "America/New_York".into(),
            date_format: "MM/DD/YYYY".into(),
            theme: "light".into(),
            font_size: "medium".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub privacy: PrivacySettings,
    #[serde(default)]
    pub preferences: Preferences,
}

pub async fn get_settings(state: &SharedState) -> Result<AppSettings, String> {
    let storage = state.lock().await.storage.clone();
    let guard = storage.lock().map_err(|e| format!("Lock poisoned: {e}"))?;

    let settings = guard
        .load_settings::<AppSettings>()
        .map_err(|e| format!("Corrupt settings JSON: {e}"))?;
    Ok(settings.unwrap_or_default())
}

pub async fn update_settings(state: &SharedState, settings: AppSettings) -> Result<(), String> {
    let storage = state.lock().await.storage.clone();
    let mut guard = storage.lock().map_err(|e| format!("Lock poisoned: {e}"))?;

    guard
        .save_settings(&settings)
        .map_err(|e| format!("Failed to save settings: {e}"))?;

    info!(theme = %settings.preferences.theme, "Settings updated");
    Ok(())
}
