use super::json_body;
use crate::api::errors::{ApiError, ApiResponse, ApiResult};
use crate::api::validation::require_wallet_address;
use crate::identity::{issue_challenge, verify_signature};
use crate::records::ValidationErrors;
use axum::{extract::rejection::JsonRejection, Json};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub message: String,
    pub timestamp: i64,
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub wallet_address: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub wallet_address: String,
}

/// Nothing is stored; the caller must echo the message back verbatim
pub async fn challenge(
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<ChallengeResponse>>> {
    let request = json_body(payload)?;

    let mut errors = ValidationErrors::new();
    let address = errors.require_text("walletAddress", request.wallet_address.as_deref());
    errors.into_result()?;
    let address = address.unwrap_or_default();

    let challenge = issue_challenge(&address)?;
    info!("Issued sign-in challenge for {}", challenge.address);

    Ok(ApiResponse::ok(ChallengeResponse {
        message: challenge.message,
        timestamp: challenge.issued_at,
        wallet_address: challenge.address,
    }))
}

/// 401 unless the signature recovers to the claimed wallet
pub async fn verify(
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<VerifyResponse>>> {
    let request = json_body(payload)?;

    let mut errors = ValidationErrors::new();
    let address = require_wallet_address(&mut errors, "walletAddress", request.wallet_address.as_deref());
    let signature = errors.require_text("signature", request.signature.as_deref());
    let message = match request.message {
        Some(m) if !m.trim().is_empty() => Some(m),
        _ => {
            errors.add("message", "message is required");
            None
        }
    };

    let (address, signature, message) = match (address, signature, message) {
        (Some(a), Some(s), Some(m)) if errors.is_empty() => (a, s, m),
        _ => return Err(errors.into()),
    };

    if !verify_signature(&message, &signature, &address) {
        warn!("Signature verification failed for {}", address);
        return Err(ApiError::unauthorized("Signature verification failed"));
    }

    info!("Wallet {} authenticated", address);
    Ok(ApiResponse::ok(VerifyResponse {
        authenticated: true,
        wallet_address: address,
    }))
}
