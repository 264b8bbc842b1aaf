use anyhow::Result;
use serde::Deserialize;

use crate::db::Database;
use crate::error::GatewayError;
use crate::models::{Settings, SubmissionLog};
use crate::services::gateway::RemoteBillGateway;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct SettingsPayload {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub email: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub fn load_settings(db: &Database) -> Result<Settings> {
    let api_url = db.get_setting("api_url")?;
    let api_token = db.get_setting("api_token")?;
    let email = db.get_setting("email")?;
    let timeout_secs = db
        .get_setting("timeout_secs")?
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Ok(Settings {
        api_url,
        api_token,
        email,
        timeout_secs,
    })
}

/// Stores the provided fields. An empty value clears the setting.
pub fn save_settings(db: &Database, payload: &SettingsPayload) -> Result<Settings> {
    let text_fields = [
        ("api_url", &payload.api_url),
        ("api_token", &payload.api_token),
        ("email", &payload.email),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            let value = value.trim();
            if value.is_empty() {
                db.delete_setting(key)?;
            } else {
                db.set_setting(key, value)?;
            }
        }
    }
    if let Some(timeout) = payload.timeout_secs {
        db.set_setting("timeout_secs", &timeout.max(1).to_string())?;
    }
    tracing::info!("settings saved");
    load_settings(db)
}

pub fn masked_token(settings: &Settings) -> Option<String> {
    let token = settings.api_token.as_ref()?;
    let tail: String = token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    Some(format!("****{}", tail))
}

/// Issues one list call and reports how many bills the backend returned.
pub async fn test_connection(gateway: &dyn RemoteBillGateway) -> Result<usize, GatewayError> {
    gateway.list().await.map(|bills| bills.len())
}

pub fn get_history(db: &Database, limit: usize) -> Result<Vec<SubmissionLog>> {
    Ok(db.recent_submissions(limit)?)
}
