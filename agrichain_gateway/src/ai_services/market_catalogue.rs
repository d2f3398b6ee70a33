//! Static market intelligence, farmer analytics and catalogue search.
//!
//! None of this is backed by real aggregation; prices come from the
//! estimator tables and everything else is fixed labels.

use super::crop_estimator::{
    base_yield, predict_market_price, BASE_PRICES, BASE_YIELDS, REGION_MULTIPLIERS,
};
use super::noise::NoiseSource;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropMarketEntry {
    pub crop_type: String,
    pub current_price: u64,
    pub price_unit: String,
    pub trend: String,
    pub demand: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketIntelligence {
    pub region: String,
    pub regional_multiplier: f64,
    pub crops: Vec<CropMarketEntry>,
    pub insights: Vec<String>,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerAnalytics {
    pub farmer_id: String,
    pub total_crops: u32,
    pub active_crops: u32,
    pub harvested_crops: u32,
    pub average_yield: f64,
    pub sustainability_score: u32,
    pub yield_history: Vec<SeasonYield>,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonYield {
    pub season: String,
    pub yield_tonnes_per_hectare: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Crop,
    Region,
}

impl SearchKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "crop" | "crops" => Some(SearchKind::Crop),
            "region" | "regions" => Some(SearchKind::Region),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub kind: SearchKind,
    pub name: String,
    pub detail: String,
}

/// Fixed trend/demand labels per crop
fn market_labels(crop_type: &str) -> (&'static str, &'static str) {
    match crop_type {
        "Rice" | "Wheat" => ("stable", "high"),
        "Soybean" | "Cotton" => ("rising", "high"),
        "Maize" | "Corn" | "Barley" => ("stable", "medium"),
        "Tomato" | "Potato" => ("volatile", "medium"),
        _ => ("falling", "low"),
    }
}

pub fn market_intelligence(
    region: &str,
    generated_at: i64,
    noise: &mut impl NoiseSource,
) -> MarketIntelligence {
    let crops: Vec<CropMarketEntry> = BASE_PRICES
        .iter()
        .map(|(crop, _)| {
            let (trend, demand) = market_labels(crop);
            CropMarketEntry {
                crop_type: crop.to_string(),
                current_price: predict_market_price(crop, region, noise),
                price_unit: "USD/tonne".to_string(),
                trend: trend.to_string(),
                demand: demand.to_string(),
            }
        })
        .collect();

    MarketIntelligence {
        region: region.to_string(),
        regional_multiplier: super::crop_estimator::region_multiplier(region),
        crops,
        insights: vec![
            "Oilseed demand continues to outpace supply".to_string(),
            "Staple grain prices remain within seasonal range".to_string(),
            "Certified-origin produce commands a price premium".to_string(),
        ],
        generated_at,
    }
}

/// Synthetic analytics for a farmer id; the figures do not depend on any
/// stored record
pub fn farmer_analytics(farmer_id: &str, generated_at: i64) -> FarmerAnalytics {
    let reference = base_yield("Rice");
    let yield_history = [("2022", 0.92), ("2023", 1.0), ("2024", 1.07)]
        .iter()
        .map(|(season, factor)| SeasonYield {
            season: season.to_string(),
            yield_tonnes_per_hectare: (reference * factor * 100.0).round() / 100.0,
        })
        .collect::<Vec<_>>();
    let average_yield = yield_history
        .iter()
        .map(|s| s.yield_tonnes_per_hectare)
        .sum::<f64>()
        / yield_history.len() as f64;

    FarmerAnalytics {
        farmer_id: farmer_id.to_string(),
        total_crops: 5,
        active_crops: 3,
        harvested_crops: 2,
        average_yield: (average_yield * 100.0).round() / 100.0,
        sustainability_score: 82,
        yield_history,
        generated_at,
    }
}

/// Case-insensitive substring search over crops and regions
pub fn search_catalogue(query: &str, kind: Option<SearchKind>) -> Vec<SearchHit> {
    let needle = query.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();

    if kind.map_or(true, |k| k == SearchKind::Crop) {
        for (crop, base) in BASE_YIELDS {
            if crop.to_ascii_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: SearchKind::Crop,
                    name: crop.to_string(),
                    detail: format!("base yield {} tonnes/hectare", base),
                });
            }
        }
    }

    if kind.map_or(true, |k| k == SearchKind::Region) {
        for (region, multiplier) in REGION_MULTIPLIERS {
            if region.to_ascii_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: SearchKind::Region,
                    name: region.to_string(),
                    detail: format!("price multiplier {}", multiplier),
                });
            }
        }
    }

    hits
}
