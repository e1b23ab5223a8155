use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root of the administrative hierarchy. Written once per archive run and
/// read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub state_id: u32,
    pub name: String,
    /// Remote fields the pipeline does not interpret, carried through
    /// losslessly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Local government area, child of exactly one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lga {
    /// Remote correlation id tying a listing row to its ward list.
    #[serde(rename = "_id")]
    pub remote_id: String,
    pub lga_id: u32,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ward as it appears inside a state listing row, before parent names are
/// attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteWard {
    #[serde(rename = "_id")]
    pub remote_id: String,
    pub ward_id: u32,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Archived ward record. Carries denormalized parent names so it is
/// self-describing when read in isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    #[serde(rename = "_id")]
    pub remote_id: String,
    pub ward_id: u32,
    pub name: String,
    pub state_name: String,
    pub lga_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ward {
    pub fn from_listing(ward: RemoteWard, state_name: &str, lga_name: &str) -> Ward {
        Ward {
            remote_id: ward.remote_id,
            ward_id: ward.ward_id,
            name: ward.name,
            state_name: state_name.to_string(),
            lga_name: lga_name.to_string(),
            extra: ward.extra,
        }
    }
}

/// Result-sheet document attached to a polling unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Polling unit as it appears in a remote listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePollingUnit {
    pub name: String,
    pub pu_code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Archived polling unit, annotated with its ancestor names. `document` is
/// absent until a result sheet has been uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingUnit {
    pub name: String,
    pub pu_code: String,
    pub state_name: String,
    pub lga_name: String,
    pub ward_name: String,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub old_documents: Option<Vec<Value>>,
    pub has_old_documents: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PollingUnit {
    /// Annotate a listing row with its ward's denormalized names.
    /// `has_old_documents` holds iff `old_documents` is non-empty.
    pub fn from_row(
        unit: RemotePollingUnit,
        document: Option<Document>,
        old_documents: Option<Vec<Value>>,
        ward: &Ward,
    ) -> PollingUnit {
        let has_old_documents = old_documents.as_ref().map_or(false, |docs| !docs.is_empty());
        PollingUnit {
            name: unit.name,
            pu_code: unit.pu_code,
            state_name: ward.state_name.clone(),
            lga_name: ward.lga_name.clone(),
            ward_name: ward.name.clone(),
            document,
            old_documents,
            has_old_documents,
            extra: unit.extra,
        }
    }
}

/// Per-ward upload-timing summary, one row of the statistics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardUploadStats {
    pub state: String,
    pub lga: String,
    pub ward: String,
    pub total: usize,
    pub pending: usize,
    pub valid: usize,
    pub invalid: InvalidUploads,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidUploads {
    pub total: usize,
    pub offset: OffsetStats,
}

/// Statistics over one ward's late-upload offsets. All zero when the ward
/// has no late uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetStats {
    pub min: i64,
    pub max: i64,
    pub avg: f64,
    pub median: i64,
}
