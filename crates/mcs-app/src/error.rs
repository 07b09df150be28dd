use std::collections::BTreeMap;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unprocessable request: {0}")]
    UnprocessableRequest(String),

    #[error("Validation failed")]
    Validation(garde::Report),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] mcs_dal::Error),

    #[error("Store error: {0}")]
    Store(#[from] mcs_store::error::StoreError),

    #[error("Token error: {0}")]
    Token(#[from] mcs_auth::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Field-error map for the client: garde path -> messages.
fn report_to_map(report: &garde::Report) -> BTreeMap<String, Vec<String>> {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, error) in report.iter() {
        fields
            .entry(path.to_string())
            .or_default()
            .push(error.to_string());
    }
    fields
}

fn validation_response(report: &garde::Report) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(serde_json::json!({ "errors": report_to_map(report) })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use mcs_dal::Error as DalError;
        match self {
            ApiError::Database(DalError::RecordNotFound(what)) => {
                (StatusCode::NOT_FOUND, what).into_response()
            }
            ApiError::Database(DalError::ValidationFailed(report)) => validation_response(&report),
            ApiError::Validation(report) => validation_response(&report),
            ApiError::Database(DalError::DuplicateReview { .. }) => (
                StatusCode::BAD_REQUEST,
                "Movie already reviewed by this user",
            )
                .into_response(),
            ApiError::Database(DalError::NotOwner) => StatusCode::FORBIDDEN.into_response(),
            ApiError::Database(DalError::InvalidCredentials) => {
                (StatusCode::BAD_REQUEST, "Invalid credentials").into_response()
            }
            ApiError::Database(DalError::EmailTaken) => {
                (StatusCode::BAD_REQUEST, "Email already registered").into_response()
            }
            ApiError::Database(DalError::InvalidOrderByField(field)) => {
                (StatusCode::BAD_REQUEST, format!("Invalid sort field: {field}")).into_response()
            }
            ApiError::Database(other) => {
                error!("Database error: {other}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::InvalidQuery(msg) | ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::UnprocessableRequest(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response()
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::Multipart(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            ApiError::Store(e) => {
                error!("Store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::Token(e) => {
                error!("Token error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::Internal(e) => {
                error!("Internal error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
