use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::services::catalog::CatalogError;
use crate::services::feedback::SinkError;
use crate::services::ranking::RankingError;
use crate::services::scoring::ScoringError;
use crate::services::session::SessionError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Catalog and model are inconsistent: {0}")]
    StartupInconsistency(String),

    #[error("Scoring engine error: {0}")]
    ScoringEngine(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Feedback could not be saved: {0}")]
    FeedbackSink(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::OutOfRange(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::ScoringEngine(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::FeedbackSink(_) => StatusCode::BAD_GATEWAY,
            AppError::StartupInconsistency(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownItem(key) => AppError::NotFound(format!("book {}", key)),
            CatalogError::Inconsistent(msg) => AppError::StartupInconsistency(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound(_) | SessionError::NotRecommended(_) => {
                AppError::NotFound(err.to_string())
            }
            SessionError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
        }
    }
}

impl From<RankingError> for AppError {
    fn from(err: RankingError) -> Self {
        match err {
            RankingError::OutOfRange { .. } => AppError::OutOfRange(err.to_string()),
            RankingError::LengthMismatch { .. } => AppError::ScoringEngine(err.to_string()),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::ScoringEngine(err.to_string())
    }
}

impl From<SinkError> for AppError {
    fn from(err: SinkError) -> Self {
        AppError::FeedbackSink(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
