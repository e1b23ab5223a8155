//! Typed validation at the pipeline's trust boundaries.
//!
//! Every payload entering the pipeline — an HTTP response body or a
//! persisted file being re-read — passes through one of these entry points
//! before anything downstream touches it. Validation is all-or-nothing per
//! record; unrecognized fields are passed through on the record shapes.

use crate::model::{Document, Lga, PollingUnit, RemotePollingUnit, RemoteWard, State, Ward};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{shape} rejected at {context}: {source}")]
    Shape {
        shape: &'static str,
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// One row of the per-state listing: an LGA, its embedded parent state, and
/// the LGA's wards.
#[derive(Debug, Clone, Deserialize)]
pub struct StateListingRow {
    pub state: State,
    pub lga: Lga,
    pub wards: Vec<RemoteWard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateListing {
    pub data: Vec<StateListingRow>,
}

/// One row of the per-ward polling-unit listing. `document` is null or
/// absent until a result sheet has been uploaded.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingUnitRow {
    pub polling_unit: RemotePollingUnit,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub old_documents: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingUnitListing {
    pub data: Vec<PollingUnitRow>,
}

fn validate<T: DeserializeOwned>(shape: &'static str, context: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| ValidationError::Shape {
        shape,
        context: context.to_string(),
        source,
    })
}

pub fn parse_state_listing(value: Value, context: &str) -> Result<StateListing> {
    validate("state listing", context, value)
}

pub fn parse_polling_unit_listing(value: Value, context: &str) -> Result<PollingUnitListing> {
    validate("polling unit listing", context, value)
}

pub fn parse_ward(value: Value, context: &str) -> Result<Ward> {
    validate("ward record", context, value)
}

pub fn parse_polling_units(value: Value, context: &str) -> Result<Vec<PollingUnit>> {
    validate("polling unit records", context, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_field_by_name() {
        let err = parse_ward(
            json!({ "_id": "w1", "ward_id": 3, "name": "Ojodu", "state_name": "Lagos" }),
            "results/24-lagos/7-ikeja/3-ojodu/ward.json",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("lga_name"), "unexpected message: {}", message);
        assert!(message.contains("ward.json"), "unexpected message: {}", message);
    }

    #[test]
    fn accepts_null_and_missing_document() {
        let listing = parse_polling_unit_listing(
            json!({ "data": [
                { "polling_unit": { "name": "A", "pu_code": "PU1" }, "document": null },
                { "polling_unit": { "name": "B", "pu_code": "PU2" } }
            ]}),
            "ward Ojodu",
        )
        .unwrap();
        assert_eq!(listing.data.len(), 2);
        assert!(listing.data[0].document.is_none());
        assert!(listing.data[1].document.is_none());
    }

    #[test]
    fn passes_unrecognized_fields_through() {
        let listing = parse_state_listing(
            json!({ "data": [{
                "state": { "state_id": 24, "name": "Lagos", "code": "LA" },
                "lga": { "_id": "l1", "lga_id": 7, "name": "Ikeja", "zone": "west" },
                "wards": [{ "_id": "w1", "ward_id": 3, "name": "Ojodu" }]
            }]}),
            "state 24",
        )
        .unwrap();
        let row = &listing.data[0];
        assert_eq!(row.state.extra.get("code"), Some(&json!("LA")));
        assert_eq!(row.lga.extra.get("zone"), Some(&json!("west")));
    }

    #[test]
    fn rejects_non_listing_payload() {
        let err = parse_state_listing(json!({ "error": "not found" }), "state 99").unwrap_err();
        assert!(err.to_string().contains("state listing"));
    }
}
