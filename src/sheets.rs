//! Read access to the spreadsheet through the Sheets REST API.
//!
//! Every sheet is consumed positionally; the first row is a header. The row
//! parsers are plain functions so they can be tested without the network.

use crate::errors::UpstreamError;
use crate::models::{AiConfig, BudgetRow, HistoricoItem, Vendedor};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

pub const RANGE_VENDEDOR: &str = "Vendedor!A:C";
pub const RANGE_ORCAMENTOS: &str = "Orçamentos!A:H";
pub const RANGE_HISTORICO: &str = "Historico!A:F";
pub const RANGE_CONFIG_IA: &str = "ConfigIA!A:B";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    api_base: String,
    spreadsheet_id: String,
    api_key: String,
}

impl SheetsClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        spreadsheet_id: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, UpstreamError> {
        let spreadsheet_id = spreadsheet_id
            .filter(|value| !value.trim().is_empty())
            .ok_or(UpstreamError::NotConfigured("ID da planilha"))?;
        let api_key = api_key
            .filter(|value| !value.trim().is_empty())
            .ok_or(UpstreamError::NotConfigured("Chave da API do Google Sheets"))?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            spreadsheet_id,
            api_key,
        })
    }

    /// `GET {base}/v4/spreadsheets/{id}/values/{range}?key={apiKey}`
    pub fn values_url(&self, range: &str) -> Result<Url, UpstreamError> {
        let mut url =
            Url::parse(&self.api_base).map_err(|err| UpstreamError::Url(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    pub async fn values(&self, range: &str) -> Result<Vec<Vec<String>>, UpstreamError> {
        let url = self.values_url(range)?;
        debug!("reading sheet range {range}");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            warn!("sheets api returned {status} for {range}: {message}");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ValueRange = response
            .json()
            .await
            .map_err(|err| UpstreamError::Parse(err.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    pub async fn vendedores(&self) -> Result<Vec<Vendedor>, UpstreamError> {
        Ok(parse_vendedores(&self.values(RANGE_VENDEDOR).await?))
    }

    pub async fn orcamentos(&self) -> Result<Vec<BudgetRow>, UpstreamError> {
        Ok(parse_orcamentos(&self.values(RANGE_ORCAMENTOS).await?))
    }

    pub async fn historico(&self) -> Result<Vec<HistoricoItem>, UpstreamError> {
        Ok(parse_historico(&self.values(RANGE_HISTORICO).await?))
    }

    pub async fn config_ia(&self) -> Result<AiConfig, UpstreamError> {
        Ok(parse_config_ia(&self.values(RANGE_CONFIG_IA).await?))
    }
}

/// Text of a cell as returned by the API; numbers keep their plain form.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}

fn data_rows(rows: &[Vec<String>]) -> impl Iterator<Item = &Vec<String>> {
    rows.iter().skip(1)
}

/// Accepts `1234.5`, `1.234,56`, `1.500` and `R$ 1.234,56`. Dots that group
/// digits in threes are thousands separators. Blank or unreadable is 0.
pub fn parse_money(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    normalized.parse().unwrap_or_else(|_| {
        warn!("unreadable money cell {raw:?}");
        0.0
    })
}

fn is_thousands_grouped(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let all_digits = |group: &str| group.chars().all(|c| c.is_ascii_digit());
    let groups: Vec<&str> = digits.split('.').collect();
    match groups.split_first() {
        Some((head, tail)) => {
            (1..=3).contains(&head.len())
                && all_digits(*head)
                && !tail.is_empty()
                && tail.iter().all(|group| group.len() == 3 && all_digits(*group))
        }
        None => false,
    }
}

pub fn parse_vendedores(rows: &[Vec<String>]) -> Vec<Vendedor> {
    data_rows(rows)
        .filter(|row| !cell(row, 0).is_empty())
        .map(|row| Vendedor {
            codigo: cell(row, 0),
            nome: cell(row, 1),
            email: cell(row, 2),
        })
        .collect()
}

pub fn parse_orcamentos(rows: &[Vec<String>]) -> Vec<BudgetRow> {
    data_rows(rows)
        .filter(|row| !cell(row, 1).is_empty())
        .map(|row| BudgetRow {
            data: cell(row, 0),
            sequencia: cell(row, 1),
            cliente: cell(row, 2),
            valor: parse_money(&cell(row, 3)),
            codigo_vendedor: cell(row, 4),
            vendedor: cell(row, 5),
            contato: cell(row, 6),
            email: cell(row, 7),
        })
        .collect()
}

pub fn parse_historico(rows: &[Vec<String>]) -> Vec<HistoricoItem> {
    data_rows(rows)
        .filter(|row| !cell(row, 0).is_empty())
        .map(|row| HistoricoItem {
            sequencia: cell(row, 0),
            data_hora: cell(row, 1),
            status: cell(row, 2),
            observacoes: cell(row, 3),
            codigo_vendedor: cell(row, 4),
            vendedor: cell(row, 5),
        })
        .collect()
}

pub fn parse_config_ia(rows: &[Vec<String>]) -> AiConfig {
    let mut config = AiConfig::default();
    for row in data_rows(rows) {
        let value = cell(row, 1);
        if value.is_empty() {
            continue;
        }
        match cell(row, 0).to_ascii_lowercase().as_str() {
            "modelo" | "model" => config.modelo = Some(value),
            "temperatura" | "temperature" => {
                config.temperatura = value.replace(',', ".").parse().ok();
            }
            "max_tokens" | "maxtokens" => config.max_tokens = value.parse().ok(),
            "prompt_sistema" | "system_prompt" => config.prompt_sistema = Some(value),
            other => debug!("ignoring ConfigIA key {other:?}"),
        }
    }
    config
}
