use super::{record_id, ExtraFields, Lenient, ValidationErrors};
use crate::ai_services::{predict_crop, soil_recommendations, CropPrediction, NoiseSource};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOIL_PH: f64 = 6.5;
pub const DEFAULT_SOIL_MOISTURE: f64 = 60.0;
pub const DEFAULT_ORGANIC_MATTER: f64 = 2.5;

/// Crop registration request body. Soil readings fall back to neutral
/// defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropInput {
    pub crop_type: Option<Lenient<String>>,
    pub planting_date: Option<Lenient<String>>,
    pub expected_harvest_date: Option<Lenient<String>>,
    pub farmer_id: Option<Lenient<String>>,
    #[serde(rename = "soilPH")]
    pub soil_ph: Option<Lenient<f64>>,
    pub soil_moisture: Option<Lenient<f64>>,
    pub organic_matter: Option<Lenient<f64>>,
    pub location: Option<Lenient<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoilData {
    #[serde(rename = "pH")]
    pub ph: f64,
    pub moisture: f64,
    pub organic_matter: f64,
}

impl Default for SoilData {
    fn default() -> Self {
        Self {
            ph: DEFAULT_SOIL_PH,
            moisture: DEFAULT_SOIL_MOISTURE,
            organic_matter: DEFAULT_ORGANIC_MATTER,
        }
    }
}

impl SoilData {
    /// Record every out-of-range reading against the given field names
    pub fn check(&self, errors: &mut ValidationErrors, ph_field: &str, moisture_field: &str, om_field: &str) {
        if !(0.0..=14.0).contains(&self.ph) {
            errors.add(ph_field, "pH must be between 0 and 14");
        }
        if !(0.0..=100.0).contains(&self.moisture) {
            errors.add(moisture_field, "moisture must be between 0 and 100");
        }
        if !self.organic_matter.is_finite() || self.organic_matter < 0.0 {
            errors.add(om_field, "organic matter must not be negative");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CropRecord {
    pub id: String,
    pub crop_type: String,
    pub farmer_id: String,
    pub planting_date: String,
    pub expected_harvest_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub soil_data: SoilData,
    pub predictions: CropPrediction,
    pub recommendations: Vec<String>,
    pub status: String,
    pub registered_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Validate `input`, run the estimators and build a freshly planted crop
pub fn build_crop_record(
    input: CropInput,
    now_ms: i64,
    noise: &mut impl NoiseSource,
) -> Result<CropRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let crop_type = errors.require_string("cropType", input.crop_type);
    let planting_date = errors.require_string("plantingDate", input.planting_date);
    let expected_harvest_date = errors.require_string("expectedHarvestDate", input.expected_harvest_date);
    let farmer_id = errors.require_string("farmerId", input.farmer_id);

    let soil = SoilData {
        ph: errors
            .optional("soilPH", input.soil_ph, "a number")
            .unwrap_or(DEFAULT_SOIL_PH),
        moisture: errors
            .optional("soilMoisture", input.soil_moisture, "a number")
            .unwrap_or(DEFAULT_SOIL_MOISTURE),
        organic_matter: errors
            .optional("organicMatter", input.organic_matter, "a number")
            .unwrap_or(DEFAULT_ORGANIC_MATTER),
    };
    soil.check(&mut errors, "soilPH", "soilMoisture", "organicMatter");

    let location = errors
        .optional("location", input.location, "a string")
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let (crop_type, planting_date, expected_harvest_date, farmer_id) =
        match (crop_type, planting_date, expected_harvest_date, farmer_id) {
            (Some(c), Some(p), Some(h), Some(f)) if errors.is_empty() => (c, p, h, f),
            _ => return Err(errors),
        };

    let region = location.as_deref().unwrap_or_default();
    let predictions = predict_crop(
        &crop_type,
        region,
        soil.ph,
        soil.moisture,
        soil.organic_matter,
        noise,
    );
    let recommendations = soil_recommendations(soil.ph, soil.moisture, soil.organic_matter);

    Ok(CropRecord {
        id: record_id("crop", now_ms),
        crop_type,
        farmer_id,
        planting_date,
        expected_harvest_date,
        location,
        soil_data: soil,
        predictions,
        recommendations,
        status: "Planted".to_string(),
        registered_at: now_ms,
        extra: input.extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_services::{FixedNoise, QualityGrade};
    use serde_json::json;

    fn rice_input() -> CropInput {
        serde_json::from_value(json!({
            "cropType": "Rice",
            "plantingDate": "2024-06-01",
            "expectedHarvestDate": "2024-10-15",
            "farmerId": "farmer_1700000000000",
            "soilPH": 6.5,
            "soilMoisture": 70.0,
            "organicMatter": 4.0,
            "location": "Asia"
        }))
        .unwrap()
    }

    #[test]
    fn test_crop_record_carries_predictions() {
        let record = build_crop_record(rice_input(), 42, &mut FixedNoise::midpoint()).unwrap();

        assert_eq!(record.id, "crop_42");
        assert_eq!(record.status, "Planted");
        assert_eq!(record.predictions.quality_grade, QualityGrade::Premium);
        // Asia multiplier, no volatility at the midpoint
        assert_eq!(record.predictions.market_price, 315);
        assert!(record.predictions.expected_yield >= 5.12 && record.predictions.expected_yield <= 6.26);
        assert_eq!(record.recommendations.len(), 1);
    }

    #[test]
    fn test_missing_required_fields_are_all_listed() {
        let errors = build_crop_record(CropInput::default(), 1, &mut FixedNoise::midpoint()).unwrap_err();
        assert_eq!(
            errors.field_names(),
            vec!["cropType", "plantingDate", "expectedHarvestDate", "farmerId"]
        );
    }

    #[test]
    fn test_soil_defaults_and_ranges() {
        let mut input = rice_input();
        input.soil_ph = None;
        input.soil_moisture = None;
        input.organic_matter = None;
        let record = build_crop_record(input, 1, &mut FixedNoise::midpoint()).unwrap();
        assert_eq!(record.soil_data, SoilData::default());

        let mut input = rice_input();
        input.soil_ph = Some(Lenient::Valid(15.0));
        input.soil_moisture = Some(Lenient::Valid(-1.0));
        let errors = build_crop_record(input, 1, &mut FixedNoise::midpoint()).unwrap_err();
        assert_eq!(errors.field_names(), vec!["soilPH", "soilMoisture"]);
    }

    #[test]
    fn test_non_numeric_soil_reading_is_listed() {
        let mut input = rice_input();
        input.soil_ph = Some(Lenient::Invalid(json!("acidic")));
        input.crop_type = Some(Lenient::Invalid(json!(["Rice"])));

        let errors = build_crop_record(input, 1, &mut FixedNoise::midpoint()).unwrap_err();
        assert_eq!(errors.field_names(), vec!["cropType", "soilPH"]);
        assert_eq!(errors.errors[1].message, "soilPH must be a number");
    }

    #[test]
    fn test_wire_names() {
        let input: CropInput = serde_json::from_value(json!({
            "cropType": "Wheat",
            "plantingDate": "2024-01-01",
            "expectedHarvestDate": "2024-05-01",
            "farmerId": "farmer_1",
            "soilPH": 5.0,
            "soilMoisture": 30,
            "organicMatter": 1.0,
            "variety": "durum"
        }))
        .unwrap();
        let record = build_crop_record(input, 7, &mut FixedNoise::low()).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["soilData"]["pH"], 5.0);
        assert_eq!(json["variety"], "durum");
        assert!(json.get("location").is_none());
        assert_eq!(json["recommendations"].as_array().unwrap().len(), 3);
    }
}
