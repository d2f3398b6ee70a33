use super::json_body;
use crate::ai_services::RandomNoise;
use crate::api::errors::{ApiResponse, ApiResult};
use crate::api::AppState;
use crate::records::{
    append_supply_chain_event, build_crop_record, build_farmer_record, build_supply_chain_record,
    CropInput, CropRecord, FarmerInput, FarmerRecord, SupplyChainEventInput, SupplyChainInput,
    SupplyChainRecord, SupplyChainUpdate,
};
use crate::storage::{now_millis, upload_json};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use log::info;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerRegistration {
    pub farmer_id: String,
    pub content_id: String,
    pub url: String,
    pub farmer: FarmerRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRegistration {
    pub crop_id: String,
    pub content_id: String,
    pub url: String,
    pub crop: CropRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainCreated {
    pub supply_chain_id: String,
    pub content_id: String,
    pub url: String,
    pub record: SupplyChainRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainUpdated {
    pub supply_chain_id: String,
    pub content_id: String,
    pub url: String,
    pub update: SupplyChainUpdate,
}

pub async fn register_farmer(
    State(state): State<AppState>,
    payload: Result<Json<FarmerInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<FarmerRegistration>>> {
    let farmer = build_farmer_record(json_body(payload)?, now_millis())?;

    let stored = upload_json(state.store.as_ref(), &farmer, &format!("{}.json", farmer.id)).await?;
    info!("Registered farmer {} as {}", farmer.id, stored.content_id);

    Ok(ApiResponse::ok(FarmerRegistration {
        farmer_id: farmer.id.clone(),
        content_id: stored.content_id,
        url: stored.access_url,
        farmer,
    }))
}

pub async fn register_crop(
    State(state): State<AppState>,
    payload: Result<Json<CropInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CropRegistration>>> {
    let input = json_body(payload)?;
    let crop = build_crop_record(input, now_millis(), &mut RandomNoise::from_entropy())?;

    let stored = upload_json(state.store.as_ref(), &crop, &format!("{}.json", crop.id)).await?;
    info!(
        "Registered crop {} ({}) for {} as {}",
        crop.id, crop.crop_type, crop.farmer_id, stored.content_id
    );

    Ok(ApiResponse::ok(CropRegistration {
        crop_id: crop.id.clone(),
        content_id: stored.content_id,
        url: stored.access_url,
        crop,
    }))
}

pub async fn create_supply_chain(
    State(state): State<AppState>,
    payload: Result<Json<SupplyChainInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SupplyChainCreated>>> {
    let record = build_supply_chain_record(json_body(payload)?, now_millis())?;

    let stored = upload_json(state.store.as_ref(), &record, &format!("{}.json", record.id)).await?;
    info!("Created supply chain {} at stage {}", record.id, record.status);

    Ok(ApiResponse::ok(SupplyChainCreated {
        supply_chain_id: record.id.clone(),
        content_id: stored.content_id,
        url: stored.access_url,
        record,
    }))
}

/// The update is its own document; the original record is left untouched
pub async fn update_supply_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SupplyChainEventInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SupplyChainUpdated>>> {
    let now = now_millis();
    let update = append_supply_chain_event(&id, json_body(payload)?, now)?;

    let filename = format!("{}_update_{}.json", update.supply_chain_id, now);
    let stored = upload_json(state.store.as_ref(), &update, &filename).await?;
    info!(
        "Supply chain {} moved to {} ({})",
        update.supply_chain_id, update.update.stage, stored.content_id
    );

    Ok(ApiResponse::ok(SupplyChainUpdated {
        supply_chain_id: update.supply_chain_id.clone(),
        content_id: stored.content_id,
        url: stored.access_url,
        update,
    }))
}
