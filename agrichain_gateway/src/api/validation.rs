//! Request validation utilities for the gateway API

use crate::api::errors::ApiError;
use crate::identity::is_valid_address;
use crate::records::ValidationErrors;
use crate::storage::migration::MAX_MIGRATION_FILES;
use crate::storage::parse_content_id;

/// Longest accepted search query
pub const MAX_QUERY_LEN: usize = 100;

/// Require a wallet address field, returning it lower-cased
pub fn require_wallet_address(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<String> {
    let address = errors.require_text(field, value)?;
    if is_valid_address(&address) {
        Some(address.to_lowercase())
    } else {
        errors.add(field, format!("{} is not a valid address", field));
        None
    }
}

/// Validate an optional wallet address; blank counts as absent
pub fn optional_wallet_address(value: Option<&str>) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(addr) if is_valid_address(addr) => Ok(Some(addr.to_lowercase())),
        Some(_) => {
            let mut errors = ValidationErrors::new();
            errors.add("walletAddress", "walletAddress is not a valid address");
            Err(errors.into())
        }
    }
}

/// Content ids must parse as a CID (v0 or v1)
pub fn validate_content_id(content_id: &str) -> Result<(), ApiError> {
    if content_id.trim().is_empty() {
        return Err(ApiError::bad_request("Content id cannot be empty"));
    }

    parse_content_id(content_id).map(|_| ()).map_err(|e| {
        ApiError::with_details(
            400,
            "Invalid content id",
            serde_json::json!({ "contentId": content_id, "reason": e.to_string() }),
        )
    })
}

/// Trimmed, non-empty, bounded search query
pub fn validate_search_query(query: Option<&str>) -> Result<String, ApiError> {
    let query = query.map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search query 'q' is required"));
    }
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ApiError::bad_request(&format!(
            "Search query must be at most {} characters",
            MAX_QUERY_LEN
        )));
    }
    Ok(query.to_string())
}

/// Reject a migration batch before any upload starts
pub fn validate_migration_count(count: usize) -> Result<(), ApiError> {
    if count == 0 {
        return Err(ApiError::bad_request("No files provided"));
    }
    if count > MAX_MIGRATION_FILES {
        return Err(ApiError::with_details(
            400,
            "Too many files",
            serde_json::json!({ "maximum": MAX_MIGRATION_FILES, "received": count }),
        ));
    }
    Ok(())
}

/// Tags arrive either as a JSON array or as a comma-separated string
pub fn parse_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let tags: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => raw.split(',').map(str::to_string).collect(),
    };

    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::raw_content_id;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("soil, rice ,"), vec!["soil", "rice"]);
        assert_eq!(parse_tags(r#"["a", " b "]"#), vec!["a", "b"]);
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn test_validate_content_id() {
        let v1 = raw_content_id(b"harvest");
        assert!(validate_content_id("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").is_ok());
        assert!(validate_content_id(&v1).is_ok());
        assert_eq!(validate_content_id("not-a-cid").unwrap_err().code, 400);
        assert_eq!(validate_content_id("").unwrap_err().code, 400);
    }

    #[test]
    fn test_search_query_bounds() {
        assert_eq!(validate_search_query(Some("  rice ")).unwrap(), "rice");
        assert!(validate_search_query(Some("   ")).is_err());
        assert!(validate_search_query(None).is_err());
        assert!(validate_search_query(Some(&"x".repeat(MAX_QUERY_LEN + 1))).is_err());
    }

    #[test]
    fn test_migration_count() {
        assert!(validate_migration_count(1).is_ok());
        assert!(validate_migration_count(MAX_MIGRATION_FILES).is_ok());
        assert!(validate_migration_count(MAX_MIGRATION_FILES + 1).is_err());
        assert!(validate_migration_count(0).is_err());
    }

    #[test]
    fn test_wallet_address_helpers() {
        let mut errors = ValidationErrors::new();
        let addr = require_wallet_address(
            &mut errors,
            "walletAddress",
            Some("0x742D35Cc6634C0532925a3b844Bc454e4438f44e"),
        );
        assert_eq!(addr.as_deref(), Some("0x742d35cc6634c0532925a3b844bc454e4438f44e"));
        assert!(errors.is_empty());

        require_wallet_address(&mut errors, "walletAddress", Some("0xabc"));
        assert!(errors.contains("walletAddress"));

        assert_eq!(optional_wallet_address(Some(" ")).unwrap(), None);
        assert!(optional_wallet_address(Some("nope")).is_err());
    }
}
