use super::{record_id, ExtraFields, Lenient, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Body of `POST /supply-chain/create`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainInput {
    pub crop_id: Option<Lenient<String>>,
    pub farmer_id: Option<Lenient<String>>,
    pub product_name: Option<Lenient<String>>,
    pub stage: Option<Lenient<String>>,
    pub location: Option<Lenient<String>>,
    pub actor: Option<Lenient<String>>,
    pub notes: Option<Lenient<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Body of `POST /supply-chain/update/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainEventInput {
    pub stage: Option<Lenient<String>>,
    pub location: Option<Lenient<String>>,
    pub actor: Option<Lenient<String>>,
    pub notes: Option<Lenient<String>>,
    /// Content id of the prior version, when the caller tracks it
    pub previous_content_id: Option<Lenient<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainEvent {
    pub stage: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainRecord {
    pub id: String,
    pub crop_id: String,
    pub farmer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub status: String,
    pub timeline: Vec<SupplyChainEvent>,
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A standalone update document. It is uploaded on its own and never
/// rewrites the record it refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChainUpdate {
    pub supply_chain_id: String,
    pub update: SupplyChainEvent,
    /// Always serialized; null unless the caller supplied a prior content id
    pub previous_update: Option<String>,
    pub timestamp: i64,
}

fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<Lenient<String>>) -> Option<String> {
    errors
        .optional(field, value, "a string")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create a supply-chain record whose timeline holds the first event
pub fn build_supply_chain_record(
    input: SupplyChainInput,
    now_ms: i64,
) -> Result<SupplyChainRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let crop_id = errors.require_string("cropId", input.crop_id);
    let farmer_id = errors.require_string("farmerId", input.farmer_id);
    let product_name = optional_text(&mut errors, "productName", input.product_name);
    let stage = errors.require_string("stage", input.stage);
    let location = errors.require_string("location", input.location);
    let actor = optional_text(&mut errors, "actor", input.actor);
    let notes = optional_text(&mut errors, "notes", input.notes);

    match (crop_id, farmer_id, stage, location) {
        (Some(crop_id), Some(farmer_id), Some(stage), Some(location)) if errors.is_empty() => {
            let first = SupplyChainEvent {
                stage: stage.clone(),
                location,
                actor,
                notes,
                timestamp: now_ms,
                extra: ExtraFields::new(),
            };
            Ok(SupplyChainRecord {
                id: record_id("supply", now_ms),
                crop_id,
                farmer_id,
                product_name,
                status: stage,
                timeline: vec![first],
                created_at: now_ms,
                extra: input.extra,
            })
        }
        _ => Err(errors),
    }
}

/// Build the update document for one new event on `supply_chain_id`
pub fn append_supply_chain_event(
    supply_chain_id: &str,
    input: SupplyChainEventInput,
    now_ms: i64,
) -> Result<SupplyChainUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let id = errors.require_text("id", Some(supply_chain_id));
    let stage = errors.require_string("stage", input.stage);
    let location = errors.require_string("location", input.location);
    let actor = optional_text(&mut errors, "actor", input.actor);
    let notes = optional_text(&mut errors, "notes", input.notes);
    let previous_update = optional_text(&mut errors, "previousContentId", input.previous_content_id);

    match (id, stage, location) {
        (Some(id), Some(stage), Some(location)) if errors.is_empty() => Ok(SupplyChainUpdate {
            supply_chain_id: id,
            update: SupplyChainEvent {
                stage,
                location,
                actor,
                notes,
                timestamp: now_ms,
                extra: input.extra,
            },
            previous_update,
            timestamp: now_ms,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<Lenient<String>> {
        Some(Lenient::Valid(value.to_string()))
    }

    fn harvest() -> SupplyChainInput {
        SupplyChainInput {
            crop_id: text("crop_10"),
            farmer_id: text("farmer_1"),
            product_name: text("Basmati"),
            stage: text("Harvested"),
            location: text("Amritsar"),
            actor: text("Farm crew"),
            notes: None,
            extra: ExtraFields::new(),
        }
    }

    #[test]
    fn test_record_starts_with_single_event() {
        let record = build_supply_chain_record(harvest(), 99).unwrap();

        assert_eq!(record.id, "supply_99");
        assert_eq!(record.status, "Harvested");
        assert_eq!(record.timeline.len(), 1);
        assert_eq!(record.timeline[0].location, "Amritsar");
        assert_eq!(record.timeline[0].timestamp, 99);
    }

    #[test]
    fn test_record_requires_ids_and_stage() {
        let errors = build_supply_chain_record(SupplyChainInput::default(), 1).unwrap_err();
        assert_eq!(errors.field_names(), vec!["cropId", "farmerId", "stage", "location"]);
    }

    #[test]
    fn test_update_previous_is_null_by_default() {
        let input = SupplyChainEventInput {
            stage: text("Shipped"),
            location: text("Mumbai port"),
            ..Default::default()
        };

        let update = append_supply_chain_event("supply_99", input, 120).unwrap();
        assert_eq!(update.supply_chain_id, "supply_99");
        assert!(update.previous_update.is_none());

        let json = serde_json::to_value(&update).unwrap();
        assert!(json.as_object().unwrap().contains_key("previousUpdate"));
        assert!(json["previousUpdate"].is_null());
        assert_eq!(json["update"]["stage"], "Shipped");
    }

    #[test]
    fn test_update_keeps_caller_supplied_previous() {
        let input = SupplyChainEventInput {
            stage: text("Delivered"),
            location: text("Rotterdam"),
            previous_content_id: text("bafkreiexample"),
            ..Default::default()
        };

        let update = append_supply_chain_event("supply_99", input, 130).unwrap();
        assert_eq!(update.previous_update.as_deref(), Some("bafkreiexample"));
    }

    #[test]
    fn test_update_rejects_blank_id() {
        let errors = append_supply_chain_event(" ", SupplyChainEventInput::default(), 1).unwrap_err();
        assert_eq!(errors.field_names(), vec!["id", "stage", "location"]);
    }

    #[test]
    fn test_non_text_fields_are_listed() {
        let input: SupplyChainEventInput = serde_json::from_value(serde_json::json!({
            "stage": "Shipped",
            "location": { "lat": 19.0 },
            "notes": 12
        }))
        .unwrap();

        let errors = append_supply_chain_event("supply_1", input, 1).unwrap_err();
        assert_eq!(errors.field_names(), vec!["location", "notes"]);
    }
}
