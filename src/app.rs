use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/budgets", get(handlers::list_budgets))
        .route("/api/budgets/:sequencia", get(handlers::get_budget))
        .route("/api/budgets/:sequencia/follow-up", post(handlers::add_follow_up))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/vendedores", get(handlers::list_vendedores))
        .route(
            "/api/config-ia",
            get(handlers::get_config_ia).put(handlers::put_config_ia),
        )
        .route("/api/chat", post(handlers::chat))
        .route("/api/analysis", post(handlers::analysis))
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::put_settings),
        )
        .with_state(state)
}
