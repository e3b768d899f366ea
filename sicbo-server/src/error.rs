use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Échecs de la collecte auprès de la source amont. Jamais fatals : le cycle est sauté.
#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    #[error("source injoignable : {0}")]
    Unavailable(String),
    #[error("statut HTTP inattendu : {0}")]
    Status(u16),
    #[error("réponse invalide : {0}")]
    Malformed(String),
    #[error("aucune phiên dans la réponse")]
    Empty,
}

impl SourceError {
    /// Seules les pannes transitoires justifient une nouvelle tentative.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Unavailable(_) => true,
            SourceError::Status(code) => *code == 429 || *code >= 500,
            SourceError::Malformed(_) | SourceError::Empty => false,
        }
    }
}

/// Erreurs renvoyées par l'API HTTP.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("Dữ liệu đang tải...")]
    NotReady,
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
