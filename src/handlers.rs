use crate::apps_script::{ConfigPayload, FollowUpPayload, WritePayload};
use crate::assistant::{
    ANALYSIS_PROMPT, analysis_prompt, build_messages, resolve_params, validate_temperature,
};
use crate::dates::{now_local, to_iso_timestamp, to_sheet_timestamp, today_local};
use crate::errors::AppError;
use crate::followup::{BudgetFilter, assemble_budgets_at};
use crate::models::{
    AiConfig, AnalysisRequest, Budget, BudgetQuery, ChatMessage, ChatRequest, ChatResponse,
    FollowUpRequest, FollowUpResponse, HistoricoItem, Settings, SettingsUpdate, SettingsView,
    StatsResponse, Vendedor,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::storage::{apply_update, persist_settings, settings_view};
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Html,
};
use serde_json::{Value, json};
use tracing::{info, warn};

pub async fn index() -> Html<&'static str> {
    Html(render_index())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_budgets(
    State(state): State<AppState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<Vec<Budget>>, AppError> {
    let budgets = load_budgets(&state).await?;
    Ok(Json(BudgetFilter::from_query(&query).apply(budgets)))
}

pub async fn get_budget(
    State(state): State<AppState>,
    Path(sequencia): Path<String>,
) -> Result<Json<Budget>, AppError> {
    let sequencia = sequencia.trim();
    load_budgets(&state)
        .await?
        .into_iter()
        .find(|budget| budget.sequencia == sequencia)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Orçamento {sequencia} não encontrado")))
}

pub async fn add_follow_up(
    State(state): State<AppState>,
    Path(sequencia): Path<String>,
    Json(payload): Json<FollowUpRequest>,
) -> Result<Json<FollowUpResponse>, AppError> {
    let sequencia = sequencia.trim().to_string();
    let status = payload.status.trim();
    if status.is_empty() {
        return Err(AppError::bad_request("Informe o status do follow-up"));
    }

    let sheets = state
        .sheets()
        .await
        .map_err(|err| AppError::upstream("Erro ao carregar orçamentos", err))?;
    let rows = sheets
        .orcamentos()
        .await
        .map_err(|err| AppError::upstream("Erro ao carregar orçamentos", err))?;
    if !rows.iter().any(|row| row.sequencia.trim() == sequencia) {
        return Err(AppError::not_found(format!("Orçamento {sequencia} não encontrado")));
    }

    let usuario = state.settings.lock().await.usuario.clone();
    let codigo_vendedor = non_blank(payload.codigo_vendedor)
        .or_else(|| usuario.as_ref().map(|user| user.codigo.clone()))
        .unwrap_or_default();
    let vendedor = non_blank(payload.vendedor)
        .or_else(|| usuario.as_ref().map(|user| user.nome.clone()))
        .unwrap_or_default();

    let now = now_local();
    let mut item = HistoricoItem {
        sequencia,
        data_hora: to_sheet_timestamp(now),
        status: status.to_string(),
        observacoes: payload.observacoes.trim().to_string(),
        codigo_vendedor,
        vendedor,
    };

    let client = state
        .apps_script()
        .await
        .map_err(|err| AppError::upstream("Erro ao registrar follow-up", err))?;
    let ack = client
        .submit(&WritePayload::FollowUp(FollowUpPayload::from(&item)))
        .await
        .map_err(|err| AppError::upstream("Erro ao registrar follow-up", err))?;

    info!("follow-up recorded for budget {} ({})", item.sequencia, item.status);
    item.data_hora = to_iso_timestamp(now);

    Ok(Json(FollowUpResponse {
        registrado: true,
        item,
        mensagem: ack.message,
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let budgets = BudgetFilter::from_query(&query).apply(load_budgets(&state).await?);
    Ok(Json(build_stats(&budgets)))
}

pub async fn list_vendedores(State(state): State<AppState>) -> Result<Json<Vec<Vendedor>>, AppError> {
    let sheets = state
        .sheets()
        .await
        .map_err(|err| AppError::upstream("Erro ao carregar vendedores", err))?;
    let vendedores = sheets
        .vendedores()
        .await
        .map_err(|err| AppError::upstream("Erro ao carregar vendedores", err))?;
    Ok(Json(vendedores))
}

pub async fn get_config_ia(State(state): State<AppState>) -> Result<Json<AiConfig>, AppError> {
    let fetched = match state.sheets().await {
        Ok(sheets) => sheets.config_ia().await,
        Err(err) => Err(err),
    };

    match fetched {
        Ok(config) => {
            if let Err(err) = cache_ai_config(&state, config.clone()).await {
                warn!("could not cache ai config: {}", err.message);
            }
            Ok(Json(config))
        }
        Err(err) => {
            warn!("could not read ConfigIA sheet: {err}");
            match state.settings.lock().await.config_ia.clone() {
                Some(cached) => Ok(Json(cached)),
                None => Err(AppError::upstream("Erro ao carregar configuração da IA", err)),
            }
        }
    }
}

pub async fn put_config_ia(
    State(state): State<AppState>,
    Json(update): Json<AiConfig>,
) -> Result<Json<AiConfig>, AppError> {
    validate_temperature(update.temperatura)?;

    let client = state
        .apps_script()
        .await
        .map_err(|err| AppError::upstream("Erro ao salvar configuração da IA", err))?;
    client
        .submit(&WritePayload::ConfigUpdate(ConfigPayload {
            config: update.clone(),
        }))
        .await
        .map_err(|err| AppError::upstream("Erro ao salvar configuração da IA", err))?;

    // The sheet only rewrites the keys it was sent.
    let mut config = current_ai_config(&state).await;
    config.merge(update);
    cache_ai_config(&state, config.clone()).await?;
    info!("ai config updated");
    Ok(Json(config))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_temperature(request.temperature)?;
    let ai = current_ai_config(&state).await;
    let messages = build_messages(&request, &ai)?;
    let params = resolve_params(
        request.model.as_deref(),
        request.temperature,
        request.max_tokens,
        &ai,
        &state.config.openai_model,
    );

    let client = state
        .chat()
        .map_err(|err| AppError::upstream("Erro ao consultar o assistente", err))?;
    let completion = client
        .complete(&messages, &params)
        .await
        .map_err(|err| AppError::upstream("Erro ao consultar o assistente", err))?;

    Ok(Json(ChatResponse {
        response: completion.content.clone(),
        content: completion.content,
        usage: completion.usage,
    }))
}

pub async fn analysis(
    State(state): State<AppState>,
    payload: Option<Json<AnalysisRequest>>,
) -> Result<Json<ChatResponse>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let budgets =
        BudgetFilter::for_vendedor(request.vendedor.as_deref()).apply(load_budgets(&state).await?);
    let stats = build_stats(&budgets);

    let ai = current_ai_config(&state).await;
    let system = ai
        .prompt_sistema
        .clone()
        .filter(|prompt| !prompt.trim().is_empty())
        .unwrap_or_else(|| ANALYSIS_PROMPT.to_string());
    let messages = vec![
        ChatMessage::system(system),
        ChatMessage::user(analysis_prompt(&stats, &budgets, request.pergunta.as_deref())),
    ];
    let params = resolve_params(None, None, None, &ai, &state.config.openai_model);

    let client = state
        .chat()
        .map_err(|err| AppError::upstream("Erro ao gerar análise", err))?;
    let completion = client
        .complete(&messages, &params)
        .await
        .map_err(|err| AppError::upstream("Erro ao gerar análise", err))?;

    Ok(Json(ChatResponse {
        response: completion.content.clone(),
        content: completion.content,
        usage: completion.usage,
    }))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsView> {
    let settings = state.settings.lock().await;
    Json(settings_view(&settings, &state.config))
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, AppError> {
    let mut settings = state.settings.lock().await;
    let mut next = settings.clone();
    apply_update(&mut next, update);
    persist_settings(&state.config.data_path, &next).await?;
    *settings = next;
    info!("settings updated");
    Ok(Json(settings_view(&settings, &state.config)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

async fn load_budgets(state: &AppState) -> Result<Vec<Budget>, AppError> {
    let sheets = state
        .sheets()
        .await
        .map_err(|err| AppError::upstream("Erro ao carregar orçamentos", err))?;
    let (rows, history) = tokio::try_join!(sheets.orcamentos(), sheets.historico())
        .map_err(|err| AppError::upstream("Erro ao carregar orçamentos", err))?;
    Ok(assemble_budgets_at(rows, history, today_local()))
}

/// Cached config, or a fresh read of the sheet when nothing is cached yet.
async fn current_ai_config(state: &AppState) -> AiConfig {
    if let Some(cached) = state.settings.lock().await.config_ia.clone() {
        return cached;
    }

    let fetched = match state.sheets().await {
        Ok(sheets) => sheets.config_ia().await,
        Err(err) => Err(err),
    };
    match fetched {
        Ok(config) => {
            if let Err(err) = cache_ai_config(state, config.clone()).await {
                warn!("could not cache ai config: {}", err.message);
            }
            config
        }
        Err(err) => {
            warn!("using default ai config: {err}");
            AiConfig::default()
        }
    }
}

async fn cache_ai_config(state: &AppState, config: AiConfig) -> Result<(), AppError> {
    let mut settings = state.settings.lock().await;
    if settings.config_ia.as_ref() == Some(&config) {
        return Ok(());
    }
    let next = Settings {
        config_ia: Some(config),
        ..settings.clone()
    };
    persist_settings(&state.config.data_path, &next).await?;
    *settings = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    // A directory path cannot be written as a file, so every persist fails.
    fn unwritable_state() -> AppState {
        let mut config = AppConfig::from_lookup(|_| None);
        config.data_path = std::env::temp_dir();
        AppState::new(config, Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn failed_settings_write_leaves_memory_untouched() {
        let state = unwritable_state();
        let update = SettingsUpdate {
            spreadsheet_id: Some("nova-planilha".to_string()),
            ..SettingsUpdate::default()
        };

        let err = put_settings(State(state.clone()), Json(update)).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*state.settings.lock().await, Settings::default());
    }

    #[tokio::test]
    async fn failed_cache_write_keeps_previous_config() {
        let state = unwritable_state();
        let config = AiConfig {
            modelo: Some("gpt-test".to_string()),
            ..AiConfig::default()
        };

        assert!(cache_ai_config(&state, config).await.is_err());
        assert_eq!(state.settings.lock().await.config_ia, None);
    }
}
