//! HTTP surface shared by the credit service and the client directory.
//!
//! Every response uses the same envelope: `{success: true, data|count|message}`
//! on success and `{success: false, error}` on failure.

pub mod credits;
pub mod customers;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::Environment;
use crate::error::{CreditError, DirectoryError, ErrorKind};
use crate::validation;

pub use credits::credit_app;
pub use customers::directory_app;

// ============================================================================
// Success envelope
// ============================================================================

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self {
            success: true,
            message: None,
            count: Some(items.len()),
            data: Some(items),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}

// ============================================================================
// Failure envelope
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation(details: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_string(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn from_credit(err: CreditError, environment: Environment) -> Self {
        let kind = err.kind();
        Self::classified(kind, err.to_string(), environment)
    }

    pub fn from_directory(err: DirectoryError, environment: Environment) -> Self {
        let kind = err.kind();
        Self::classified(kind, err.to_string(), environment)
    }

    fn classified(kind: ErrorKind, message: String, environment: Environment) -> Self {
        match kind {
            ErrorKind::Validation | ErrorKind::InvalidStateTransition => Self::bad_request(message),
            ErrorKind::NotFound => Self::not_found(message),
            ErrorKind::DependencyUnavailable => {
                warn!(%message, "answering 503");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "client directory temporarily unavailable, please try again",
                )
            }
            ErrorKind::Internal => {
                error!(%message, "internal error");
                let message = if environment.exposes_internal_errors() {
                    message
                } else {
                    "internal server error".to_string()
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = if self.details.is_empty() {
            json!({ "success": false, "error": self.message })
        } else {
            json!({ "success": false, "error": self.message, "details": self.details })
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Extraction helpers
// ============================================================================

/// Unwrap a JSON body, reporting malformed input in the failure envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Unwrap a numeric path segment that must be a positive id.
pub fn path_id(path: Result<Path<i64>, PathRejection>, field: &str) -> Result<i64, ApiError> {
    let id = path
        .map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request(format!("{} must be a positive integer", field)))?;
    validation::positive_id(field, id).map_err(ApiError::bad_request)?;
    Ok(id)
}

// ============================================================================
// Shared routes and layers
// ============================================================================

pub fn health_body(service: &str) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": format!("{} - OK", service),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Answer unknown routes inside the failure envelope.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("endpoint not found")
}

pub type HttpLayers = ServiceBuilder<
    Stack<CorsLayer, Stack<TraceLayer<SharedClassifier<ServerErrorsAsFailures>>, Identity>>,
>;

/// Request tracing outermost, then CORS.
pub fn http_layers(cors_origin: &str) -> HttpLayers {
    ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
}

pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match origin {
        "*" => layer.allow_origin(Any),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin, "invalid CORS_ORIGIN, allowing any origin");
                layer.allow_origin(Any)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CreditAction, CreditStatus};
    use crate::error::StoreError;

    #[test]
    fn test_success_envelope_shapes() {
        let list = serde_json::to_value(ApiResponse::list(vec![1, 2, 3])).unwrap();
        assert_eq!(list, json!({ "success": true, "count": 3, "data": [1, 2, 3] }));

        let message = serde_json::to_value(ApiResponse::message("removed")).unwrap();
        assert_eq!(message, json!({ "success": true, "message": "removed" }));
    }

    #[test]
    fn test_error_kinds_map_to_statuses() {
        let env = Environment::Development;
        let refused = CreditAction::Approve.apply(CreditStatus::Approved).unwrap_err();

        let cases = [
            (CreditError::MissingReason, StatusCode::BAD_REQUEST),
            (CreditError::UnknownCustomer(3), StatusCode::BAD_REQUEST),
            (CreditError::NotFound(3), StatusCode::NOT_FOUND),
            (CreditError::InvalidStateTransition(refused), StatusCode::BAD_REQUEST),
            (
                CreditError::DependencyUnavailable("timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (CreditError::Store(StoreError::Poisoned), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_credit(err, env).status(), status);
        }
    }

    #[test]
    fn test_production_hides_internal_messages() {
        let err = ApiError::from_credit(
            CreditError::Store(StoreError::Poisoned),
            Environment::Production,
        );
        assert_eq!(err.message, "internal server error");

        let err = ApiError::from_credit(
            CreditError::Store(StoreError::Poisoned),
            Environment::Development,
        );
        assert!(err.message.contains("poisoned"));
    }
}
