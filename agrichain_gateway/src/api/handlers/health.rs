use crate::api::errors::ApiResponse;
use crate::api::AppState;
use crate::bridges::LedgerCallInfo;
use crate::storage::now_millis;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub storage: bool,
    pub chain: bool,
    pub timestamp: i64,
}

/// Always 200; dependency trouble shows up in the flags
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let (storage, chain) = tokio::join!(state.store.ping(), state.ledger.is_reachable());

    let status = if storage && chain { "healthy" } else { "degraded" };

    ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage,
        chain,
        timestamp: now_millis(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: String,
    pub ledger_calls: Vec<LedgerCallInfo>,
    pub storage_gateway: String,
}

pub async fn network_info(State(state): State<AppState>) -> Json<ApiResponse<NetworkInfo>> {
    let chain = state.ledger.chain();

    ApiResponse::ok(NetworkInfo {
        network: chain.network.name().to_string(),
        chain_id: chain.network.chain_id(),
        rpc_url: chain.rpc_url.clone(),
        contract_address: chain.contract_address.clone(),
        ledger_calls: state.ledger.interface(),
        storage_gateway: state.config.storage.gateway_url.clone(),
    })
}
