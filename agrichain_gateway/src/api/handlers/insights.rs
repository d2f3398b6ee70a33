use super::json_body;
use crate::ai_services::{
    self, predict_crop, soil_recommendations, CropPrediction, FarmerAnalytics, MarketIntelligence,
    RandomNoise, SearchHit, SearchKind,
};
use crate::api::errors::{ApiError, ApiResponse, ApiResult};
use crate::api::validation::validate_search_query;
use crate::api::AppState;
use crate::records::{Lenient, SoilData, ValidationErrors};
use crate::storage::{now_millis, upload_json};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Region used when the caller names none
pub const DEFAULT_REGION: &str = "Global";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilDataInput {
    #[serde(rename = "pH", alias = "ph")]
    pub ph: Option<Lenient<f64>>,
    pub moisture: Option<Lenient<f64>>,
    pub organic_matter: Option<Lenient<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictYieldRequest {
    pub crop_type: Option<Lenient<String>>,
    pub soil_data: Option<Lenient<SoilDataInput>>,
    pub location: Option<Lenient<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPrediction {
    pub crop_type: String,
    pub location: String,
    pub soil_data: SoilData,
    #[serde(flatten)]
    pub estimate: CropPrediction,
    pub recommendations: Vec<String>,
    pub generated_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictYieldResponse {
    pub prediction: YieldPrediction,
    /// Null when the prediction could not be stored
    pub content_id: Option<String>,
}

/// Storage here is best effort: a failed upload still returns the prediction
pub async fn predict_yield(
    State(state): State<AppState>,
    payload: Result<Json<PredictYieldRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<PredictYieldResponse>>> {
    let request = json_body(payload)?;

    let mut errors = ValidationErrors::new();
    let crop_type = errors.require_string("cropType", request.crop_type);
    let readings = errors
        .optional("soilData", request.soil_data, "an object")
        .unwrap_or_default();
    let defaults = SoilData::default();
    let soil = SoilData {
        ph: errors
            .optional("soilData.pH", readings.ph, "a number")
            .unwrap_or(defaults.ph),
        moisture: errors
            .optional("soilData.moisture", readings.moisture, "a number")
            .unwrap_or(defaults.moisture),
        organic_matter: errors
            .optional("soilData.organicMatter", readings.organic_matter, "a number")
            .unwrap_or(defaults.organic_matter),
    };
    soil.check(&mut errors, "soilData.pH", "soilData.moisture", "soilData.organicMatter");
    let location = errors.optional("location", request.location, "a string");
    errors.into_result()?;
    let crop_type = crop_type.unwrap_or_default();

    let location = location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let estimate = predict_crop(
        &crop_type,
        &location,
        soil.ph,
        soil.moisture,
        soil.organic_matter,
        &mut RandomNoise::from_entropy(),
    );
    let generated_at = now_millis();
    let prediction = YieldPrediction {
        recommendations: soil_recommendations(soil.ph, soil.moisture, soil.organic_matter),
        crop_type,
        location,
        soil_data: soil,
        estimate,
        generated_at,
    };

    let filename = format!("prediction_{}.json", generated_at);
    let content_id = match upload_json(state.store.as_ref(), &prediction, &filename).await {
        Ok(stored) => Some(stored.content_id),
        Err(e) => {
            warn!("Prediction for {} not stored: {}", prediction.crop_type, e);
            None
        }
    };
    info!(
        "Predicted {} t/ha for {} in {}",
        prediction.estimate.expected_yield, prediction.crop_type, prediction.location
    );

    Ok(ApiResponse::ok(PredictYieldResponse {
        prediction,
        content_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    pub region: Option<String>,
}

pub async fn market_intelligence(Query(query): Query<MarketQuery>) -> Json<ApiResponse<MarketIntelligence>> {
    let region = query
        .region
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    ApiResponse::ok(ai_services::market_intelligence(
        &region,
        now_millis(),
        &mut RandomNoise::from_entropy(),
    ))
}

pub async fn farmer_analytics(Path(id): Path<String>) -> ApiResult<Json<ApiResponse<FarmerAnalytics>>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::bad_request("Farmer id is required"));
    }
    Ok(ApiResponse::ok(ai_services::farmer_analytics(id, now_millis())))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: Option<SearchKind>,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

pub async fn search(Query(query): Query<SearchQuery>) -> ApiResult<Json<ApiResponse<SearchResponse>>> {
    let q = validate_search_query(query.q.as_deref())?;

    let kind = match query.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        None | Some("all") => None,
        Some(raw) => Some(SearchKind::parse(raw).ok_or_else(|| {
            ApiError::with_details(
                400,
                "Unknown search type",
                serde_json::json!({ "type": raw, "allowed": ["crop", "region", "all"] }),
            )
        })?),
    };

    let results = ai_services::search_catalogue(&q, kind);
    Ok(ApiResponse::ok(SearchResponse {
        query: q,
        kind,
        total: results.len(),
        results,
    }))
}
