use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }

    /// Wraps an upstream failure with a user-facing prefix, e.g.
    /// "Erro ao carregar orçamentos".
    pub fn upstream(context: &str, err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotConfigured(what) => {
                Self::service_unavailable(format!("{context}: {what} não configurado"))
            }
            other => Self::bad_gateway(format!("{context}: {other}")),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = axum::Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Failure talking to Google Sheets, Apps Script or the chat API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("falha de comunicação: {0}")]
    Network(#[from] reqwest::Error),

    #[error("resposta {status}: {message}")]
    Status { status: u16, message: String },

    #[error("resposta inválida: {0}")]
    Parse(String),

    #[error("operação recusada: {0}")]
    Rejected(String),

    #[error("URL inválida: {0}")]
    Url(String),
}
