pub mod auth;
pub mod health;
pub mod insights;
pub mod records;
pub mod storage;

use crate::api::errors::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, turning extractor rejections into the uniform error
/// shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}
