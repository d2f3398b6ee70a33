//! API error handling for the AgriChain gateway
//!
//! Every failure leaves a handler as an [`ApiError`] and renders as
//! `{success: false, error, details}`. Domain errors are first classified
//! into [`GatewayError`], which fixes the HTTP status.

use crate::identity::IdentityError;
use crate::records::ValidationErrors;
use crate::storage::StorageError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Gateway error taxonomy
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    StorageUpload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::StorageUpload(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Upload(message) => GatewayError::StorageUpload(message),
            StorageError::NotFound { content_id, .. } => {
                GatewayError::NotFound(format!("Content {} not found", content_id))
            }
            StorageError::Io(e) => GatewayError::Internal(e.to_string()),
            StorageError::Serialization(e) => GatewayError::Internal(e.to_string()),
        }
    }
}

impl From<IdentityError> for GatewayError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidAddress(_) => GatewayError::BadRequest(err.to_string()),
            other => GatewayError::Auth(other.to_string()),
        }
    }
}

/// Marker placed on responses whose details must not leave the process
/// outside development mode
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorMarker;

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: u16,
    #[serde(rename = "error")]
    pub message: String,
    pub details: Option<serde_json::Value>,
    #[serde(skip)]
    internal: bool,
}

impl ApiError {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
            internal: false,
        }
    }

    pub fn with_details(code: u16, message: &str, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(401, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(404, message)
    }

    /// 500 whose `details` are redacted outside development mode
    pub fn internal_server_error(details: &str) -> Self {
        Self {
            internal: true,
            ..Self::with_details(500, "Internal server error", details.into())
        }
    }

    pub fn storage_upload(reason: &str) -> Self {
        Self::with_details(500, "Storage upload failed", reason.into())
    }

    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::with_details(
            400,
            &format!("Missing or invalid fields: {}", errors.field_names().join(", ")),
            serde_json::to_value(&errors.errors).unwrap_or(serde_json::Value::Null),
        )
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let internal = self.internal;
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
            "details": self.details,
        });

        let mut response = (status, Json(body)).into_response();
        if internal {
            response.extensions_mut().insert(InternalErrorMarker);
        }
        response
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let code = err.status().as_u16();
        match err {
            GatewayError::Validation(errors) => Self::validation(&errors),
            GatewayError::StorageUpload(reason) => Self::storage_upload(&reason),
            GatewayError::Internal(reason) => Self::internal_server_error(&reason),
            other => Self::new(code, &other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::validation(&err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_server_error(&err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(&format!("JSON parsing error: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::with_details(400, "Invalid JSON body", err.body_text().into())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self::with_details(400, "Invalid multipart request", err.body_text().into())
    }
}

/// Oversized bodies surface as 413 from the multipart reader and are
/// reported as 400 `File too large`
impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::with_details(400, "File too large", err.body_text().into())
        } else {
            Self::with_details(400, "Invalid multipart request", err.body_text().into())
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_codes() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "name is required");

        assert_eq!(GatewayError::from(errors).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::from(StorageError::Upload("503: busy".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(StorageError::NotFound {
                content_id: "bafy".into(),
                status: 404
            })
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(GatewayError::Auth("no".into()).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "name is required");
        errors.add("landSize", "landSize must be a positive number");

        let api = ApiError::from(errors);
        assert_eq!(api.code, 400);
        assert!(api.message.contains("name"));
        assert!(api.message.contains("landSize"));
        assert_eq!(api.details.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_storage_message_passes_through() {
        let api = ApiError::from(StorageError::Upload("401: bad key".into()));
        assert_eq!(api.code, 500);
        assert!(!api.is_internal());
        assert_eq!(api.details, Some(serde_json::json!("401: bad key")));
    }

    #[test]
    fn test_internal_errors_are_marked() {
        let api = ApiError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(api.is_internal());

        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<InternalErrorMarker>().is_some());
    }
}
