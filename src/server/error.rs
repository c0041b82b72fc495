use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::catalog_api::CatalogError;
use crate::experiment::ExperimentError;
use crate::library::{ClassificationError, LibraryError};

/// Every handler failure, mapped to a status code and a JSON body of the form
/// `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("provider request failed (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "internal server error".to_string()
            }
            ApiError::Upstream { status, message } => {
                warn!("Provider failure {}: {}", status, message);
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ExperimentError> for ApiError {
    fn from(err: ExperimentError) -> Self {
        match err {
            ExperimentError::SessionNotFound(_)
            | ExperimentError::PhaseNotFound(_)
            | ExperimentError::ParticipantNotFound(_) => ApiError::NotFound(err.to_string()),
            ExperimentError::PhaseAlreadySelected(_) => ApiError::Conflict(err.to_string()),
            ExperimentError::MissingSelection
            | ExperimentError::TerminalPhase
            | ExperimentError::StaleNavigation(_) => ApiError::BadRequest(err.to_string()),
            ExperimentError::NotActingParticipant(_) => ApiError::Forbidden(err.to_string()),
            ExperimentError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthorized => ApiError::Unauthorized,
            CatalogError::Upstream { status, body } => ApiError::Upstream {
                status,
                message: body,
            },
            CatalogError::Transport(_) | CatalogError::Decode(_) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: err.to_string(),
            },
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Catalog(err) => err.into(),
            LibraryError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl From<ClassificationError> for ApiError {
    fn from(err: ClassificationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
