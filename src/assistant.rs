//! Request shaping for the chat and analysis routes.

use crate::errors::AppError;
use crate::followup::{StatusClass, classify_status};
use crate::models::{AiConfig, Budget, ChatMessage, ChatRequest, StatsResponse};
use crate::openai::ChatParams;
use std::fmt::Write;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const OLDEST_OPEN_LIMIT: usize = 10;

pub const ANALYSIS_PROMPT: &str = "Você é um analista comercial. Analise a carteira de \
orçamentos apresentada, aponte riscos, oportunidades e quais clientes priorizar no \
follow-up. Responda em português, de forma objetiva.";

/// Request values win, then the spreadsheet config, then service defaults.
pub fn resolve_params(
    model: Option<&str>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    ai: &AiConfig,
    default_model: &str,
) -> ChatParams {
    ChatParams {
        model: model
            .filter(|value| !value.trim().is_empty())
            .or(ai.modelo.as_deref())
            .unwrap_or(default_model)
            .to_string(),
        temperature: temperature.or(ai.temperatura).unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: max_tokens.or(ai.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS).max(1),
    }
}

/// Temperatures outside `0..=2` are refused rather than adjusted.
pub fn validate_temperature(temperature: Option<f32>) -> Result<(), AppError> {
    match temperature {
        Some(value) if !(0.0..=2.0).contains(&value) => {
            Err(AppError::bad_request("A temperatura deve estar entre 0 e 2"))
        }
        _ => Ok(()),
    }
}

pub fn build_messages(request: &ChatRequest, ai: &AiConfig) -> Result<Vec<ChatMessage>, AppError> {
    let mut messages = match (&request.messages, &request.message) {
        (Some(messages), _) if !messages.is_empty() => messages.clone(),
        (_, Some(message)) if !message.trim().is_empty() => vec![ChatMessage::user(message.trim())],
        _ => return Err(AppError::bad_request("Envie 'messages' ou 'message'")),
    };

    let has_system = messages.iter().any(|message| message.role == "system");
    if let Some(prompt) = ai.prompt_sistema.as_deref().filter(|p| !p.trim().is_empty()) {
        if !has_system {
            messages.insert(0, ChatMessage::system(prompt));
        }
    }

    Ok(messages)
}

/// Portfolio summary handed to the model for the analysis route.
pub fn analysis_prompt(stats: &StatsResponse, budgets: &[Budget], pergunta: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Resumo da carteira de orçamentos:");
    let _ = writeln!(
        out,
        "- Total: {} orçamentos, R$ {:.2}",
        stats.total.quantidade, stats.total.valor
    );
    let _ = writeln!(
        out,
        "- Ganhos: {} (R$ {:.2}); Perdidos: {} (R$ {:.2}); Em aberto: {} (R$ {:.2})",
        stats.ganhos.quantidade,
        stats.ganhos.valor,
        stats.perdidos.quantidade,
        stats.perdidos.valor,
        stats.em_aberto.quantidade,
        stats.em_aberto.valor
    );
    let _ = writeln!(
        out,
        "- Taxa de conversão: {:.1}%; ticket médio: R$ {:.2}; sem follow-up: {}",
        stats.taxa_conversao * 100.0,
        stats.ticket_medio,
        stats.sem_follow_up
    );

    let _ = writeln!(out, "\nPor status:");
    for (status, group) in &stats.por_status {
        let _ = writeln!(out, "- {status}: {} (R$ {:.2})", group.quantidade, group.valor);
    }

    let _ = writeln!(out, "\nPor vendedor:");
    for (vendedor, group) in &stats.por_vendedor {
        let _ = writeln!(out, "- {vendedor}: {} (R$ {:.2})", group.quantidade, group.valor);
    }

    let mut open: Vec<&Budget> = budgets
        .iter()
        .filter(|budget| classify_status(&budget.status) == StatusClass::Open)
        .collect();
    open.sort_by(|a, b| b.dias_em_aberto.cmp(&a.dias_em_aberto));

    if !open.is_empty() {
        let _ = writeln!(out, "\nOrçamentos em aberto mais antigos:");
        for budget in open.iter().take(OLDEST_OPEN_LIMIT) {
            let _ = writeln!(
                out,
                "- #{} {} | R$ {:.2} | {} dias | status: {} | vendedor: {}",
                budget.sequencia,
                budget.cliente,
                budget.valor,
                budget.dias_em_aberto,
                budget.status,
                budget.vendedor
            );
        }
    }

    if let Some(pergunta) = pergunta.map(str::trim).filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "\nPergunta: {pergunta}");
    }

    out
}
