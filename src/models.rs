use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the `Orçamentos` sheet before any derived field is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRow {
    pub data: String,
    pub sequencia: String,
    pub cliente: String,
    pub valor: f64,
    pub codigo_vendedor: String,
    pub vendedor: String,
    pub contato: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricoItem {
    pub sequencia: String,
    pub data_hora: String,
    pub status: String,
    pub observacoes: String,
    pub codigo_vendedor: String,
    pub vendedor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub data: String,
    pub sequencia: String,
    pub cliente: String,
    pub valor: f64,
    pub codigo_vendedor: String,
    pub vendedor: String,
    pub contato: String,
    pub email: String,
    pub status: String,
    pub dias_em_aberto: i64,
    pub faixa: String,
    pub ultimo_follow_up: Option<String>,
    pub observacoes: String,
    pub historico: Vec<HistoricoItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vendedor {
    pub codigo: String,
    pub nome: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperatura: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_sistema: Option<String>,
}

impl AiConfig {
    /// Overwrites only the keys `update` carries; the sheet keeps the rest.
    pub fn merge(&mut self, update: AiConfig) {
        if update.modelo.is_some() {
            self.modelo = update.modelo;
        }
        if update.temperatura.is_some() {
            self.temperatura = update.temperatura;
        }
        if update.max_tokens.is_some() {
            self.max_tokens = update.max_tokens;
        }
        if update.prompt_sistema.is_some() {
            self.prompt_sistema = update.prompt_sistema;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BudgetQuery {
    pub vendedor: Option<String>,
    pub status: Option<String>,
    pub faixa: Option<String>,
    pub cliente: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    pub status: String,
    #[serde(default)]
    pub observacoes: String,
    pub codigo_vendedor: Option<String>,
    pub vendedor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowUpResponse {
    pub registrado: bool,
    pub item: HistoricoItem,
    pub mensagem: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body accepted by the chat route. Either `messages` or a single `message`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub message: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub response: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisRequest {
    pub pergunta: Option<String>,
    pub vendedor: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    Json,
    #[default]
    Form,
}

impl SubmitMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "form" => Some(Self::Form),
            _ => None,
        }
    }
}

/// What the service persists between restarts.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub usuario: Option<Vendedor>,
    #[serde(default)]
    pub config_ia: Option<AiConfig>,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub sheets_api_key: Option<String>,
    #[serde(default)]
    pub apps_script_url: Option<String>,
    #[serde(default)]
    pub apps_script_mode: Option<SubmitMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub usuario: Option<Vendedor>,
    pub spreadsheet_id: Option<String>,
    pub sheets_api_key: Option<String>,
    pub apps_script_url: Option<String>,
    pub apps_script_mode: Option<SubmitMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsView {
    pub usuario: Option<Vendedor>,
    pub config_ia: Option<AiConfig>,
    pub spreadsheet_id: Option<String>,
    pub sheets_api_key: Option<String>,
    pub apps_script_url: Option<String>,
    pub apps_script_mode: SubmitMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GroupTotals {
    pub quantidade: u64,
    pub valor: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: GroupTotals,
    pub por_status: BTreeMap<String, GroupTotals>,
    pub por_vendedor: BTreeMap<String, GroupTotals>,
    pub por_faixa: BTreeMap<String, GroupTotals>,
    pub ganhos: GroupTotals,
    pub perdidos: GroupTotals,
    pub em_aberto: GroupTotals,
    pub taxa_conversao: f64,
    pub ticket_medio: f64,
    pub sem_follow_up: u64,
}
