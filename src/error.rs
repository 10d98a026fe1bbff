// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::DatabaseError;
use crate::grading::{BatchFailure, GradingError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 409 Conflict carrying the per-student failure list of a batch
    BatchConflict {
        message: String,
        failures: Vec<BatchFailure>,
    },

    // 422 Unprocessable Entity: a rejected score batch with its failure list
    BatchRejected {
        message: String,
        failures: Vec<BatchFailure>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::BatchConflict { .. } => 409,
            ApiError::BatchRejected { .. } => 422,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::BatchConflict { message, .. } => message,
            ApiError::BatchRejected { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::BatchConflict { .. } => "BATCH_CONFLICT",
            ApiError::BatchRejected { .. } => "BATCH_REJECTED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            ApiError::BatchRejected { message, failures }
            | ApiError::BatchConflict { message, failures } => {
                json!({
                    "error": true,
                    "message": message,
                    "code": self.error_code(),
                    "failures": failures
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(var) => {
                tracing::error!("Missing configuration: {}", var);
                ApiError::service_unavailable("Service is not fully configured")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::Validation(e) => {
                ApiError::validation_error(e.to_string(), Some(e.field_errors()))
            }
            GradingError::SchemeNotFound
            | GradingError::ClassNotFound
            | GradingError::SubjectNotFound => ApiError::not_found(err.to_string()),
            GradingError::ScoreNotFound { .. } | GradingError::NotEnrolled { .. } => {
                ApiError::not_found(err.to_string())
            }
            GradingError::ClassMismatch => ApiError::bad_request(err.to_string()),
            GradingError::DuplicateScheme
            | GradingError::DuplicateScore { .. }
            | GradingError::SchemeInUse => ApiError::conflict(err.to_string()),
            GradingError::TeacherNotApproved
            | GradingError::SubjectNotApproved
            | GradingError::NotSchemeOwner => ApiError::forbidden(err.to_string()),
            GradingError::BatchRejected { failures } => ApiError::BatchRejected {
                message: "Score batch rejected; no rows were written".to_string(),
                failures,
            },
            GradingError::BatchConflict { failures } => ApiError::BatchConflict {
                message: "Score batch entries target the wrong path; no rows were written"
                    .to_string(),
                failures,
            },
            GradingError::Database(db) => db.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{ValidationError, Violation};
    use uuid::Uuid;

    #[test]
    fn validation_error_carries_field_errors() {
        let err: ApiError = GradingError::Validation(ValidationError::new(vec![
            Violation::WeightSumMismatch(99),
        ]))
        .into();
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["components"]
            .as_str()
            .unwrap()
            .contains("99"));
    }

    #[test]
    fn batch_rejection_enumerates_failures() {
        let student_id = Uuid::new_v4();
        let err: ApiError = GradingError::BatchRejected {
            failures: vec![BatchFailure {
                student_id,
                reason: "not enrolled in the scheme's class".to_string(),
            }],
        }
        .into();
        assert_eq!(err.status_code(), 422);
        let body = err.to_json();
        assert_eq!(body["failures"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["failures"][0]["student_id"],
            json!(student_id.to_string())
        );
    }

    #[test]
    fn duplicate_score_maps_to_conflict() {
        let err: ApiError = GradingError::DuplicateScore {
            student_id: Uuid::new_v4(),
        }
        .into();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "CONFLICT");
    }
}
