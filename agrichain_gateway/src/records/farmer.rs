use super::{record_id, ExtraFields, Lenient, ValidationErrors};
use crate::identity::is_valid_address;
use serde::{Deserialize, Serialize};

/// Registration request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerInput {
    pub name: Option<Lenient<String>>,
    pub location: Option<Lenient<String>>,
    pub crop_types: Option<Lenient<Vec<String>>>,
    pub land_size: Option<Lenient<f64>>,
    pub wallet_address: Option<Lenient<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FarmerRecord {
    pub id: String,
    pub name: String,
    pub location: String,
    pub crop_types: Vec<String>,
    pub land_size: f64,
    pub wallet_address: String,
    pub verified: bool,
    pub registered_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Validate `input` and build a new, unverified farmer record
pub fn build_farmer_record(input: FarmerInput, now_ms: i64) -> Result<FarmerRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = errors.require_string("name", input.name);
    let location = errors.require_string("location", input.location);

    let crop_types: Vec<String> = errors
        .optional("cropTypes", input.crop_types, "a list of strings")
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if crop_types.is_empty() && !errors.contains("cropTypes") {
        errors.add("cropTypes", "at least one crop type is required");
    }

    let land_size = match input.land_size {
        Some(Lenient::Valid(size)) if size.is_finite() && size > 0.0 => Some(size),
        Some(_) => {
            errors.add("landSize", "landSize must be a positive number");
            None
        }
        None => {
            errors.add("landSize", "landSize is required");
            None
        }
    };

    let wallet_address = match input.wallet_address {
        Some(Lenient::Valid(addr)) if is_valid_address(addr.trim()) => Some(addr.trim().to_lowercase()),
        Some(_) => {
            errors.add("walletAddress", "walletAddress is not a valid address");
            None
        }
        None => {
            errors.add("walletAddress", "walletAddress is required");
            None
        }
    };

    match (name, location, land_size, wallet_address) {
        (Some(name), Some(location), Some(land_size), Some(wallet_address)) if errors.is_empty() => {
            Ok(FarmerRecord {
                id: record_id("farmer", now_ms),
                name,
                location,
                crop_types,
                land_size,
                wallet_address,
                verified: false,
                registered_at: now_ms,
                extra: input.extra,
            })
        }
        _ => Err(errors),
    }
}
