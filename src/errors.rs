use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::status::WorkOrderStatus;

/// Error payload returned on every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional structured details (conflicting ids, counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// The expected, user-facing outcomes of core operations.
///
/// Everything short of `DatabaseError`/`EventError`/`InternalError` is a
/// normal business result the caller can act on; only storage and
/// infrastructure faults are treated as unexpected.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Concurrent modification of record {0}")]
    ConcurrentModification(Uuid),

    #[error("Conflicting assignment: overlaps work order(s) {conflicting:?}")]
    ConflictingAssignment { conflicting: Vec<Uuid> },

    #[error("Incomplete required tasks: {answered} of {required} answered")]
    IncompleteRequiredTasks { answered: u32, required: u32 },

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for the error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition { .. }
            | Self::InvalidState(_)
            | Self::IncompleteRequiredTasks { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConcurrentModification(_) | Self::ConflictingAssignment { .. } => {
                StatusCode::CONFLICT
            }
            Self::DatabaseError(_) | Self::EventError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message suitable for HTTP responses. Internal faults return a generic
    /// message so implementation details never leak to clients.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::EventError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn response_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::ConflictingAssignment { conflicting } => {
                Some(serde_json::json!({ "conflicting_work_orders": conflicting }))
            }
            Self::IncompleteRequiredTasks { answered, required } => {
                Some(serde_json::json!({ "answered": answered, "required": required }))
            }
            Self::InvalidTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.response_details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_class_maps_to_409() {
        assert_eq!(
            ServiceError::ConcurrentModification(Uuid::new_v4()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ConflictingAssignment {
                conflicting: vec![]
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_faults_do_not_leak_details() {
        let err = ServiceError::InternalError("connection pool exhausted".into());
        assert_eq!(err.response_message(), "Internal server error");
    }
}
