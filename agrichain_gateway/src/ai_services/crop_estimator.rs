//! Crop heuristics: yield, quality grade and market price
//!
//! Deterministic table lookups and threshold factors, multiplied by a
//! uniform noise term that stands in for weather. Callers pin the noise
//! through [`NoiseSource`] when they need exact values.

use super::noise::NoiseSource;
use serde::{Deserialize, Serialize};

/// Base yield used for crops missing from [`BASE_YIELDS`]
pub const DEFAULT_BASE_YIELD: f64 = 5.0;
/// Base price used for crops missing from [`BASE_PRICES`]
pub const DEFAULT_BASE_PRICE: f64 = 300.0;
/// Multiplier used for regions missing from [`REGION_MULTIPLIERS`]
pub const DEFAULT_REGION_MULTIPLIER: f64 = 1.0;

/// Tonnes per hectare
pub const BASE_YIELDS: &[(&str, f64)] = &[
    ("Rice", 4.5),
    ("Wheat", 3.5),
    ("Maize", 5.5),
    ("Corn", 5.5),
    ("Soybean", 2.8),
    ("Cotton", 2.0),
    ("Sugarcane", 70.0),
    ("Potato", 20.0),
    ("Tomato", 25.0),
    ("Barley", 3.0),
];

/// USD per tonne
pub const BASE_PRICES: &[(&str, f64)] = &[
    ("Rice", 350.0),
    ("Wheat", 280.0),
    ("Maize", 220.0),
    ("Corn", 220.0),
    ("Soybean", 480.0),
    ("Cotton", 650.0),
    ("Sugarcane", 40.0),
    ("Potato", 180.0),
    ("Tomato", 250.0),
    ("Barley", 240.0),
];

pub const REGION_MULTIPLIERS: &[(&str, f64)] = &[
    ("North America", 1.2),
    ("Europe", 1.15),
    ("Oceania", 1.1),
    ("South America", 0.95),
    ("Asia", 0.9),
    ("Africa", 0.85),
];

const YIELD_NOISE: (f64, f64) = (0.9, 1.1);
const QUALITY_NOISE: (f64, f64) = (-5.0, 5.0);
const PRICE_VOLATILITY: (f64, f64) = (-0.075, 0.075);

/// Ordered quality bands, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    #[serde(rename = "Premium Grade")]
    Premium,
    #[serde(rename = "Grade A")]
    A,
    #[serde(rename = "Grade B")]
    B,
    #[serde(rename = "Grade C")]
    C,
    #[serde(rename = "Grade D")]
    D,
}

impl QualityGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            QualityGrade::Premium
        } else if score >= 70.0 {
            QualityGrade::A
        } else if score >= 55.0 {
            QualityGrade::B
        } else if score >= 40.0 {
            QualityGrade::C
        } else {
            QualityGrade::D
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityGrade::Premium => "Premium Grade",
            QualityGrade::A => "Grade A",
            QualityGrade::B => "Grade B",
            QualityGrade::C => "Grade C",
            QualityGrade::D => "Grade D",
        }
    }
}

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    let key = key.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| *value)
}

pub fn base_yield(crop_type: &str) -> f64 {
    lookup(BASE_YIELDS, crop_type).unwrap_or(DEFAULT_BASE_YIELD)
}

pub fn base_price(crop_type: &str) -> f64 {
    lookup(BASE_PRICES, crop_type).unwrap_or(DEFAULT_BASE_PRICE)
}

pub fn region_multiplier(region: &str) -> f64 {
    lookup(REGION_MULTIPLIERS, region).unwrap_or(DEFAULT_REGION_MULTIPLIER)
}

pub fn is_ph_optimal(soil_ph: f64) -> bool {
    (6.0..=7.0).contains(&soil_ph)
}

pub fn is_moisture_optimal(soil_moisture: f64) -> bool {
    (60.0..=80.0).contains(&soil_moisture)
}

/// ×1.15 in the optimal band, ×0.85 when clearly acidic or alkaline
pub fn ph_factor(soil_ph: f64) -> f64 {
    if is_ph_optimal(soil_ph) {
        1.15
    } else if !(5.5..=7.5).contains(&soil_ph) {
        0.85
    } else {
        1.0
    }
}

/// ×1.1 in the optimal band, ×0.9 when too dry or waterlogged
pub fn moisture_factor(soil_moisture: f64) -> f64 {
    if is_moisture_optimal(soil_moisture) {
        1.1
    } else if !(40.0..=90.0).contains(&soil_moisture) {
        0.9
    } else {
        1.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tonnes per hectare, rounded to two decimals
pub fn predict_yield(
    crop_type: &str,
    soil_ph: f64,
    soil_moisture: f64,
    noise: &mut impl NoiseSource,
) -> f64 {
    let weather = noise.uniform(YIELD_NOISE.0, YIELD_NOISE.1);
    round2(base_yield(crop_type) * ph_factor(soil_ph) * moisture_factor(soil_moisture) * weather)
}

/// Raw quality score before banding
pub fn quality_score(
    soil_ph: f64,
    soil_moisture: f64,
    organic_matter: f64,
    noise: &mut impl NoiseSource,
) -> f64 {
    let mut score = 50.0;
    if is_ph_optimal(soil_ph) {
        score += 20.0;
    }
    if is_moisture_optimal(soil_moisture) {
        score += 15.0;
    }
    if organic_matter > 3.0 {
        score += 10.0;
    }
    score + noise.uniform(QUALITY_NOISE.0, QUALITY_NOISE.1)
}

/// Quality band for a crop grown under the given soil conditions.
///
/// The crop type does not change the score today; it is accepted so
/// callers keep one signature across estimators.
pub fn assess_quality(
    _crop_type: &str,
    soil_ph: f64,
    soil_moisture: f64,
    organic_matter: f64,
    noise: &mut impl NoiseSource,
) -> QualityGrade {
    QualityGrade::from_score(quality_score(soil_ph, soil_moisture, organic_matter, noise))
}

/// USD per tonne, rounded to the nearest whole dollar
pub fn predict_market_price(crop_type: &str, region: &str, noise: &mut impl NoiseSource) -> u64 {
    let volatility = noise.uniform(PRICE_VOLATILITY.0, PRICE_VOLATILITY.1);
    let price = base_price(crop_type) * region_multiplier(region) * (1.0 + volatility);
    price.round().max(0.0) as u64
}

/// Agronomic advice from threshold checks on the soil readings
pub fn soil_recommendations(soil_ph: f64, soil_moisture: f64, organic_matter: f64) -> Vec<String> {
    let mut advice = Vec::new();

    if soil_ph < 6.0 {
        advice.push("Soil is acidic: apply agricultural lime to raise pH".to_string());
    } else if soil_ph > 7.5 {
        advice.push("Soil is alkaline: apply elemental sulphur to lower pH".to_string());
    }

    if soil_moisture < 40.0 {
        advice.push("Soil moisture is low: increase irrigation frequency".to_string());
    } else if soil_moisture > 80.0 {
        advice.push("Soil moisture is high: improve field drainage".to_string());
    }

    if organic_matter <= 3.0 {
        advice.push("Organic matter is low: incorporate compost or cover crops".to_string());
    }

    if advice.is_empty() {
        advice.push("Soil conditions are optimal: maintain current practices".to_string());
    }

    advice
}

/// Heuristic block embedded in crop records and yield predictions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CropPrediction {
    pub expected_yield: f64,
    pub yield_unit: String,
    pub quality_grade: QualityGrade,
    pub market_price: u64,
    pub price_unit: String,
}

/// Run the yield, quality and price estimators for one set of readings
pub fn predict_crop(
    crop_type: &str,
    region: &str,
    soil_ph: f64,
    soil_moisture: f64,
    organic_matter: f64,
    noise: &mut impl NoiseSource,
) -> CropPrediction {
    CropPrediction {
        expected_yield: predict_yield(crop_type, soil_ph, soil_moisture, noise),
        yield_unit: "tonnes/hectare".to_string(),
        quality_grade: assess_quality(crop_type, soil_ph, soil_moisture, organic_matter, noise),
        market_price: predict_market_price(crop_type, region, noise),
        price_unit: "USD/tonne".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_services::noise::{FixedNoise, RandomNoise};

    #[test]
    fn test_rice_optimal_yield_bounds() {
        let low = predict_yield("Rice", 6.5, 70.0, &mut FixedNoise::low());
        let high = predict_yield("Rice", 6.5, 70.0, &mut FixedNoise::high());
        assert_eq!(low, 5.12);
        assert_eq!(high, 6.26);

        let mut noise = RandomNoise::seeded(7);
        for _ in 0..500 {
            let y = predict_yield("Rice", 6.5, 70.0, &mut noise);
            assert!((5.12..=6.27).contains(&y), "yield {} out of band", y);
        }
    }

    #[test]
    fn test_acidic_soil_uses_penalty_factor() {
        assert_eq!(ph_factor(5.0), 0.85);
        assert_eq!(ph_factor(6.5), 1.15);
        assert_eq!(ph_factor(5.8), 1.0);
        assert_eq!(ph_factor(7.8), 0.85);

        let acidic = predict_yield("Rice", 5.0, 70.0, &mut FixedNoise::midpoint());
        let optimal = predict_yield("Rice", 6.5, 70.0, &mut FixedNoise::midpoint());
        assert!((acidic - 4.5 * 0.85 * 1.1).abs() < 0.01);
        assert!((optimal - 4.5 * 1.15 * 1.1).abs() < 0.01);
    }

    #[test]
    fn test_moisture_factor_bands() {
        assert_eq!(moisture_factor(70.0), 1.1);
        assert_eq!(moisture_factor(30.0), 0.9);
        assert_eq!(moisture_factor(95.0), 0.9);
        assert_eq!(moisture_factor(50.0), 1.0);
    }

    #[test]
    fn test_unknown_crop_uses_default_base() {
        let y = predict_yield("Quinoa", 5.8, 50.0, &mut FixedNoise::midpoint());
        assert_eq!(y, 5.0);
        assert_eq!(base_yield("rice"), 4.5);
    }

    #[test]
    fn test_ideal_conditions_are_always_premium() {
        for position in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let grade = assess_quality("Wheat", 6.5, 70.0, 4.0, &mut FixedNoise::at(position));
            assert_eq!(grade, QualityGrade::Premium);
        }
        assert_eq!(quality_score(6.5, 70.0, 4.0, &mut FixedNoise::midpoint()), 95.0);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(QualityGrade::from_score(85.0), QualityGrade::Premium);
        assert_eq!(QualityGrade::from_score(84.9), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(70.0), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(55.0), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(40.0), QualityGrade::C);
        assert_eq!(QualityGrade::from_score(39.9), QualityGrade::D);
        assert!(QualityGrade::Premium < QualityGrade::D);
        assert_eq!(serde_json::to_string(&QualityGrade::A).unwrap(), "\"Grade A\"");
    }

    #[test]
    fn test_market_price_tables() {
        assert_eq!(predict_market_price("Rice", "Asia", &mut FixedNoise::midpoint()), 315);
        assert_eq!(predict_market_price("Dragonfruit", "Mars", &mut FixedNoise::midpoint()), 300);
        assert_eq!(predict_market_price("wheat", "europe", &mut FixedNoise::high()), 346);

        let mut noise = RandomNoise::seeded(11);
        for _ in 0..200 {
            let p = predict_market_price("Cotton", "Africa", &mut noise);
            assert!((511..=594).contains(&p), "price {} out of band", p);
        }
    }

    #[test]
    fn test_recommendations() {
        let advice = soil_recommendations(5.2, 30.0, 1.0);
        assert_eq!(advice.len(), 3);
        assert!(advice[0].contains("lime"));
        assert!(advice[1].contains("irrigation"));

        let ideal = soil_recommendations(6.5, 70.0, 4.0);
        assert_eq!(ideal.len(), 1);
        assert!(ideal[0].contains("optimal"));
    }
}
