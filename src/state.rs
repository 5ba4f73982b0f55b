use crate::apps_script::AppsScriptClient;
use crate::config::AppConfig;
use crate::errors::UpstreamError;
use crate::models::Settings;
use crate::openai::ChatClient;
use crate::sheets::SheetsClient;
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: Client,
    pub settings: Arc<Mutex<Settings>>,
}

impl AppState {
    pub fn new(config: AppConfig, settings: Settings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("followup-crystal/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            settings: Arc::new(Mutex::new(settings)),
        })
    }

    pub async fn sheets(&self) -> Result<SheetsClient, UpstreamError> {
        let settings = self.settings.lock().await;
        SheetsClient::new(
            self.http.clone(),
            self.config.sheets_api_base.clone(),
            settings
                .spreadsheet_id
                .clone()
                .or_else(|| self.config.spreadsheet_id.clone()),
            settings
                .sheets_api_key
                .clone()
                .or_else(|| self.config.sheets_api_key.clone()),
        )
    }

    pub async fn apps_script(&self) -> Result<AppsScriptClient, UpstreamError> {
        let settings = self.settings.lock().await;
        AppsScriptClient::new(
            self.http.clone(),
            settings
                .apps_script_url
                .clone()
                .or_else(|| self.config.apps_script_url.clone()),
            settings.apps_script_mode.unwrap_or(self.config.apps_script_mode),
        )
    }

    pub fn chat(&self) -> Result<ChatClient, UpstreamError> {
        ChatClient::new(
            self.http.clone(),
            self.config.openai_base_url.clone(),
            self.config.openai_api_key.clone(),
        )
    }
}
