use crate::models::SubmitMode;
use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Startup configuration read from the environment.
///
/// Sheets credentials and the Apps Script URL can later be overridden from
/// the settings file; everything else is fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub sheets_api_base: String,
    pub spreadsheet_id: Option<String>,
    pub sheets_api_key: Option<String>,
    pub apps_script_url: Option<String>,
    pub apps_script_mode: SubmitMode,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = get("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let apps_script_mode = match get("APPS_SCRIPT_MODE") {
            Some(value) => SubmitMode::parse(&value).unwrap_or_else(|| {
                warn!("unknown APPS_SCRIPT_MODE {value:?}, using form");
                SubmitMode::Form
            }),
            None => SubmitMode::Form,
        };

        Self {
            port,
            data_path: get("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/settings.json")),
            sheets_api_base: get("SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            spreadsheet_id: get("SHEETS_SPREADSHEET_ID"),
            sheets_api_key: get("SHEETS_API_KEY"),
            apps_script_url: get("APPS_SCRIPT_URL"),
            apps_script_mode,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        }
    }
}
