use crate::dates::{normalize_date_at, parse_sheet_date, to_iso_date, to_iso_timestamp};
use crate::models::{Budget, BudgetQuery, BudgetRow, HistoricoItem};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Status of a budget nobody has followed up on yet.
pub const DEFAULT_STATUS: &str = "Pendente";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpBucket {
    Week,
    Fortnight,
    Month,
    TwoMonths,
    Stale,
}

impl FollowUpBucket {
    pub const ALL: [FollowUpBucket; 5] = [
        FollowUpBucket::Week,
        FollowUpBucket::Fortnight,
        FollowUpBucket::Month,
        FollowUpBucket::TwoMonths,
        FollowUpBucket::Stale,
    ];

    pub fn for_days(days: i64) -> Self {
        match days {
            i64::MIN..=7 => Self::Week,
            8..=15 => Self::Fortnight,
            16..=30 => Self::Month,
            31..=60 => Self::TwoMonths,
            _ => Self::Stale,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Week => "0-7 dias",
            Self::Fortnight => "8-15 dias",
            Self::Month => "16-30 dias",
            Self::TwoMonths => "31-60 dias",
            Self::Stale => "60+ dias",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Won,
    Lost,
    Open,
}

const WON: [&str; 4] = ["fechado", "aprovado", "ganho", "vendido"];
const LOST: [&str; 3] = ["perdido", "cancelado", "recusado"];

pub fn classify_status(status: &str) -> StatusClass {
    let folded = fold(status);
    if WON.iter().any(|word| folded.contains(word)) {
        StatusClass::Won
    } else if LOST.iter().any(|word| folded.contains(word)) {
        StatusClass::Lost
    } else {
        StatusClass::Open
    }
}

/// Lowercases and strips Portuguese diacritics so "Negociação" matches
/// "negociacao".
pub fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

pub fn days_open(created: NaiveDate, today: NaiveDate) -> i64 {
    (today - created).num_days().max(0)
}

/// Joins history rows to budgets and computes every derived field.
///
/// Current status is the status of the latest history entry by timestamp;
/// entries with equal timestamps keep sheet order, so the later row wins.
pub fn assemble_budgets_at(
    rows: Vec<BudgetRow>,
    history: Vec<HistoricoItem>,
    today: NaiveDate,
) -> Vec<Budget> {
    let mut by_sequence: HashMap<String, Vec<(Option<NaiveDateTime>, HistoricoItem)>> =
        HashMap::new();
    for mut item in history {
        let stamp = parse_sheet_date(&item.data_hora);
        if let Some(value) = stamp {
            item.data_hora = to_iso_timestamp(value);
        }
        by_sequence
            .entry(item.sequencia.trim().to_string())
            .or_default()
            .push((stamp, item));
    }

    let by_sequence: HashMap<String, Vec<HistoricoItem>> = by_sequence
        .into_iter()
        .map(|(sequencia, mut entries)| {
            entries.sort_by_key(|(stamp, _)| *stamp);
            (sequencia, entries.into_iter().map(|(_, item)| item).collect())
        })
        .collect();

    rows.into_iter()
        .map(|row| {
            let historico = by_sequence
                .get(row.sequencia.trim())
                .cloned()
                .unwrap_or_default();
            build_budget(row, historico, today)
        })
        .collect()
}

fn build_budget(row: BudgetRow, historico: Vec<HistoricoItem>, today: NaiveDate) -> Budget {
    let created = normalize_date_at(&row.data, today);
    let dias_em_aberto = days_open(created, today);
    let latest = historico.last();

    Budget {
        data: to_iso_date(created),
        status: latest
            .map(|item| item.status.trim())
            .filter(|status| !status.is_empty())
            .unwrap_or(DEFAULT_STATUS)
            .to_string(),
        ultimo_follow_up: latest.map(|item| item.data_hora.clone()),
        observacoes: latest.map(|item| item.observacoes.clone()).unwrap_or_default(),
        faixa: FollowUpBucket::for_days(dias_em_aberto).label().to_string(),
        dias_em_aberto,
        sequencia: row.sequencia.trim().to_string(),
        cliente: row.cliente,
        valor: row.valor,
        codigo_vendedor: row.codigo_vendedor,
        vendedor: row.vendedor,
        contato: row.contato,
        email: row.email,
        historico,
    }
}

/// Filters parsed from the query string of the budget and stats routes.
#[derive(Debug, Default, Clone)]
pub struct BudgetFilter {
    vendedor: Option<String>,
    status: Option<String>,
    faixa: Option<String>,
    cliente: Option<String>,
}

impl BudgetFilter {
    pub fn from_query(query: &BudgetQuery) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(fold)
                .filter(|value| !value.is_empty())
        };
        Self {
            vendedor: clean(&query.vendedor),
            status: clean(&query.status),
            faixa: clean(&query.faixa),
            cliente: clean(&query.cliente),
        }
    }

    pub fn for_vendedor(vendedor: Option<&str>) -> Self {
        Self {
            vendedor: vendedor.map(fold).filter(|value| !value.is_empty()),
            ..Self::default()
        }
    }

    pub fn matches(&self, budget: &Budget) -> bool {
        if let Some(vendedor) = &self.vendedor {
            if fold(&budget.codigo_vendedor) != *vendedor && fold(&budget.vendedor) != *vendedor {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if fold(&budget.status) != *status {
                return false;
            }
        }
        if let Some(faixa) = &self.faixa {
            if fold(&budget.faixa) != *faixa {
                return false;
            }
        }
        if let Some(cliente) = &self.cliente {
            if !fold(&budget.cliente).contains(cliente.as_str()) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, budgets: Vec<Budget>) -> Vec<Budget> {
        budgets.into_iter().filter(|budget| self.matches(budget)).collect()
    }
}
