use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Settings, SettingsUpdate, SettingsView};
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_settings(path: &Path) -> Settings {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(settings) => settings,
            Err(err) => {
                error!("failed to parse settings file: {err}");
                Settings::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            error!("failed to read settings file: {err}");
            Settings::default()
        }
    }
}

pub async fn persist_settings(path: &Path, settings: &Settings) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(settings).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

/// Merges a partial update. Blank strings clear the stored value so the
/// environment default applies again.
pub fn apply_update(settings: &mut Settings, update: SettingsUpdate) {
    fn merge(slot: &mut Option<String>, value: Option<String>) {
        if let Some(value) = value {
            let value = value.trim().to_string();
            *slot = if value.is_empty() { None } else { Some(value) };
        }
    }

    if let Some(usuario) = update.usuario {
        settings.usuario = if usuario.codigo.trim().is_empty() {
            None
        } else {
            Some(usuario)
        };
    }
    merge(&mut settings.spreadsheet_id, update.spreadsheet_id);
    merge(&mut settings.sheets_api_key, update.sheets_api_key);
    merge(&mut settings.apps_script_url, update.apps_script_url);
    if update.apps_script_mode.is_some() {
        settings.apps_script_mode = update.apps_script_mode;
    }
}

/// Effective settings as shown to the dashboard, secrets masked.
pub fn settings_view(settings: &Settings, config: &AppConfig) -> SettingsView {
    SettingsView {
        usuario: settings.usuario.clone(),
        config_ia: settings.config_ia.clone(),
        spreadsheet_id: settings
            .spreadsheet_id
            .clone()
            .or_else(|| config.spreadsheet_id.clone()),
        sheets_api_key: settings
            .sheets_api_key
            .as_deref()
            .or(config.sheets_api_key.as_deref())
            .map(mask_secret),
        apps_script_url: settings
            .apps_script_url
            .clone()
            .or_else(|| config.apps_script_url.clone()),
        apps_script_mode: settings.apps_script_mode.unwrap_or(config.apps_script_mode),
    }
}

pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
