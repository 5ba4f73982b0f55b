//! Writes go through the Apps Script web app, which appends rows to the
//! spreadsheet on our behalf.

use crate::errors::UpstreamError;
use crate::models::{AiConfig, HistoricoItem, SubmitMode};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPayload {
    pub sequencia: String,
    pub data_hora: String,
    pub status: String,
    pub observacoes: String,
    pub codigo_vendedor: String,
    pub vendedor: String,
}

impl From<&HistoricoItem> for FollowUpPayload {
    fn from(item: &HistoricoItem) -> Self {
        Self {
            sequencia: item.sequencia.clone(),
            data_hora: item.data_hora.clone(),
            status: item.status.clone(),
            observacoes: item.observacoes.clone(),
            codigo_vendedor: item.codigo_vendedor.clone(),
            vendedor: item.vendedor.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigPayload {
    pub config: AiConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action")]
pub enum WritePayload {
    #[serde(rename = "addFollowUp")]
    FollowUp(FollowUpPayload),
    #[serde(rename = "updateConfigIA")]
    ConfigUpdate(ConfigPayload),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteAck {
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct AppsScriptClient {
    http: Client,
    url: String,
    mode: SubmitMode,
}

impl AppsScriptClient {
    pub fn new(http: Client, url: Option<String>, mode: SubmitMode) -> Result<Self, UpstreamError> {
        let url = url
            .filter(|value| !value.trim().is_empty())
            .ok_or(UpstreamError::NotConfigured("URL do Apps Script"))?;
        Ok(Self { http, url, mode })
    }

    pub async fn submit(&self, payload: &WritePayload) -> Result<WriteAck, UpstreamError> {
        let request = match self.mode {
            SubmitMode::Json => self.http.post(&self.url).json(payload),
            SubmitMode::Form => {
                let json_data = serde_json::to_string(payload)
                    .map_err(|err| UpstreamError::Parse(err.to_string()))?;
                self.http.post(&self.url).form(&[("json_data", json_data)])
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("apps script returned {status}");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: summarize(&body),
            });
        }

        let ack = interpret_response(&body)?;
        info!("apps script accepted write ({:?} mode)", self.mode);
        Ok(ack)
    }
}

/// The script answers with JSON when posted to directly and with an HTML
/// page when reached through a form submission.
pub fn interpret_response(body: &str) -> Result<WriteAck, UpstreamError> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body.trim()) else {
        return Ok(WriteAck::default());
    };

    let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
    let message = text("message").or_else(|| text("error"));

    match map.get("success").and_then(Value::as_bool) {
        Some(false) => Err(UpstreamError::Rejected(
            message.unwrap_or_else(|| "sem detalhes".to_string()),
        )),
        _ => Ok(WriteAck { message }),
    }
}

fn summarize(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
