//! Stage three: flatten each state's archived polling units into one CSV.
//!
//! The aggregate is re-derived from the raw per-ward records on every run,
//! sorted, and written to `{state}/polling-units.csv`. A malformed ward is
//! reported and skipped rather than aborting the state's aggregate; the run
//! still exits non-zero when anything was skipped.

use crate::commands::{csv_into_string, read_json, PipelineError, Result};
use crate::config::Config;
use crate::discover;
use crate::model::PollingUnit;
use crate::schema;
use crate::storage::{Storage, POLLING_UNITS_CSV, POLLING_UNITS_JSON};
use crate::util::url_join;
use colored::Colorize;
use std::path::Path;

/// One output row, denormalized with the published location of its raw
/// source record.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub state_name: String,
    pub lga_name: String,
    pub ward_name: String,
    pub name: String,
    pub pu_code: String,
    pub document_url: String,
    pub uploaded_at: String,
    pub has_old_documents: bool,
    pub json_url: String,
}

pub fn run<S>(config: &Config, storage: &S) -> Result<()>
where
    S: Storage + ?Sized,
{
    let state_dirs = discover::state_directories(&config.results_dir).map_err(|source| {
        PipelineError::Read {
            path: config.results_dir.clone(),
            source,
        }
    })?;

    let mut wards = 0usize;
    let mut skipped = 0usize;
    for state_dir in state_dirs {
        println!("{}", state_dir.display());
        let outcome = aggregate_state(config, storage, &state_dir)?;
        wards += outcome.wards;
        skipped += outcome.skipped;
    }

    if skipped == 0 {
        Ok(())
    } else {
        Err(PipelineError::Partial {
            failed: skipped,
            total: wards,
            subject: "wards",
        })
    }
}

pub(crate) struct StateOutcome {
    pub wards: usize,
    pub skipped: usize,
}

/// Aggregate one state directory. Returns how many wards were seen and how
/// many had to be skipped.
pub(crate) fn aggregate_state<S>(
    config: &Config,
    storage: &S,
    state_dir: &Path,
) -> Result<StateOutcome>
where
    S: Storage + ?Sized,
{
    let ward_dirs = discover::ward_directories_in_state(state_dir).map_err(|source| {
        PipelineError::Read {
            path: state_dir.to_path_buf(),
            source,
        }
    })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for ward_dir in &ward_dirs {
        match ward_rows(config, ward_dir) {
            Ok(Some(ward_rows)) => rows.extend(ward_rows),
            Ok(None) => {
                println!(
                    "{}",
                    format!("skipping {} (not yet archived)", ward_dir.display()).yellow()
                );
                skipped += 1;
            }
            Err(err) => {
                eprintln!("{} skipping {}: {}", "✗".red(), ward_dir.display(), err);
                skipped += 1;
            }
        }
    }

    sort_rows(&mut rows);
    let csv = aggregate_csv(&rows)?;
    storage.write_text(&state_dir.join(POLLING_UNITS_CSV), &csv)?;

    Ok(StateOutcome {
        wards: ward_dirs.len(),
        skipped,
    })
}

/// Rows for one ward, or `None` when the ward has no raw record file yet.
fn ward_rows(config: &Config, ward_dir: &Path) -> Result<Option<Vec<AggregateRow>>> {
    let raw_path = ward_dir.join(POLLING_UNITS_JSON);
    if !raw_path.is_file() {
        return Ok(None);
    }
    let units =
        schema::parse_polling_units(read_json(&raw_path)?, &raw_path.display().to_string())?;
    let json_url = published_json_url(config, ward_dir);
    let rows = units
        .into_iter()
        .map(|unit| row_for(unit, &json_url))
        .collect();
    Ok(Some(rows))
}

/// The published location of a ward's raw record: the results base URL plus
/// the ward's path segments, always joined with forward slashes.
fn published_json_url(config: &Config, ward_dir: &Path) -> String {
    let segments: Vec<String> = ward_dir
        .strip_prefix(&config.results_dir)
        .unwrap_or(ward_dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let mut url = url_join(&config.aggregate_base_url, segments);
    url.push('/');
    url.push_str(POLLING_UNITS_JSON);
    url
}

fn row_for(unit: PollingUnit, json_url: &str) -> AggregateRow {
    let document_url = unit
        .document
        .as_ref()
        .map(|d| d.url.clone())
        .unwrap_or_default();
    let uploaded_at = unit
        .document
        .as_ref()
        .and_then(|d| d.updated_at.clone())
        .unwrap_or_default();
    AggregateRow {
        state_name: unit.state_name,
        lga_name: unit.lga_name,
        ward_name: unit.ward_name,
        name: unit.name,
        pu_code: unit.pu_code,
        document_url,
        uploaded_at,
        has_old_documents: unit.has_old_documents,
        json_url: json_url.to_string(),
    }
}

/// Stable ascending sort on the five-key identity; ties keep input order.
fn sort_rows(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| {
        a.state_name
            .cmp(&b.state_name)
            .then_with(|| a.lga_name.cmp(&b.lga_name))
            .then_with(|| a.ward_name.cmp(&b.ward_name))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.pu_code.cmp(&b.pu_code))
    });
}

fn aggregate_csv(rows: &[AggregateRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&[
        "state_name",
        "lga_name",
        "ward_name",
        "name",
        "pu_code",
        "document",
        "uploaded_at",
        "has_old_documents",
        "json_url",
    ])?;
    for row in rows {
        writer.write_record(&[
            row.state_name.as_str(),
            row.lga_name.as_str(),
            row.ward_name.as_str(),
            row.name.as_str(),
            row.pu_code.as_str(),
            row.document_url.as_str(),
            row.uploaded_at.as_str(),
            if row.has_old_documents { "true" } else { "false" },
            row.json_url.as_str(),
        ])?;
    }
    csv_into_string(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FsStorage, WARD_RECORD};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn write_ward(
        state_dir: &Path,
        lga_seg: &str,
        ward_seg: &str,
        ward_name: &str,
        units: serde_json::Value,
    ) -> PathBuf {
        let ward_dir = state_dir.join(lga_seg).join(ward_seg);
        fs::create_dir_all(&ward_dir).unwrap();
        fs::write(
            ward_dir.join(WARD_RECORD),
            serde_json::to_string_pretty(&json!({
                "_id": format!("w-{}", ward_seg),
                "ward_id": 1,
                "name": ward_name,
                "state_name": "Lagos",
                "lga_name": "Ikeja"
            }))
            .unwrap(),
        )
        .unwrap();
        fs::write(
            ward_dir.join(POLLING_UNITS_JSON),
            serde_json::to_string_pretty(&units).unwrap(),
        )
        .unwrap();
        ward_dir
    }

    fn unit(ward: &str, name: &str, pu_code: &str) -> serde_json::Value {
        json!({
            "name": name,
            "pu_code": pu_code,
            "state_name": "Lagos",
            "lga_name": "Ikeja",
            "ward_name": ward,
            "document": null,
            "has_old_documents": false
        })
    }

    #[test]
    fn rows_are_sorted_across_wards_regardless_of_scan_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.results_dir = tmp.path().join("results");
        config.aggregate_base_url = "https://archive.example/results".to_string();
        let state_dir = config.results_dir.join("1-lagos");

        // Scan order is 1-a before 2-b, but ward B's rows must not come
        // first just because its directory sorts first.
        write_ward(&state_dir, "7-ikeja", "1-a", "B", json!([unit("B", "Z", "PU9")]));
        write_ward(&state_dir, "7-ikeja", "2-b", "A", json!([unit("A", "Y", "PU1")]));

        let outcome = aggregate_state(&config, &FsStorage, &state_dir).unwrap();
        assert_eq!(outcome.wards, 2);
        assert_eq!(outcome.skipped, 0);

        let csv = fs::read_to_string(state_dir.join(POLLING_UNITS_CSV)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].starts_with("Lagos,Ikeja,A,Y,PU1"));
        assert!(lines[2].starts_with("Lagos,Ikeja,B,Z,PU9"));
    }

    #[test]
    fn missing_document_renders_empty_fields_and_json_url_uses_slashes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.results_dir = tmp.path().join("results");
        config.aggregate_base_url = "https://archive.example/results".to_string();
        let state_dir = config.results_dir.join("1-lagos");
        write_ward(
            &state_dir,
            "7-ikeja",
            "3-ojodu",
            "Ojodu",
            json!([unit("Ojodu", "Town Hall", "PU1")]),
        );

        aggregate_state(&config, &FsStorage, &state_dir).unwrap();
        let csv = fs::read_to_string(state_dir.join(POLLING_UNITS_CSV)).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(
            ",,false,https://archive.example/results/1-lagos/7-ikeja/3-ojodu/polling-units.json"
        ));
    }

    #[test]
    fn malformed_ward_is_skipped_and_counted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.results_dir = tmp.path().join("results");
        let state_dir = config.results_dir.join("1-lagos");
        write_ward(
            &state_dir,
            "7-ikeja",
            "3-ojodu",
            "Ojodu",
            json!([unit("Ojodu", "Town Hall", "PU1")]),
        );
        let bad = write_ward(&state_dir, "7-ikeja", "4-bad", "Bad", json!([]));
        fs::write(bad.join(POLLING_UNITS_JSON), "{ not json").unwrap();

        let outcome = aggregate_state(&config, &FsStorage, &state_dir).unwrap();
        assert_eq!(outcome.wards, 2);
        assert_eq!(outcome.skipped, 1);

        // The good ward still made it into the aggregate.
        let csv = fs::read_to_string(state_dir.join(POLLING_UNITS_CSV)).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn ties_on_all_keys_preserve_input_order() {
        let mut rows = vec![
            AggregateRow {
                state_name: "S".into(),
                lga_name: "L".into(),
                ward_name: "W".into(),
                name: "N".into(),
                pu_code: "P".into(),
                document_url: "first".into(),
                uploaded_at: String::new(),
                has_old_documents: false,
                json_url: String::new(),
            },
            AggregateRow {
                state_name: "S".into(),
                lga_name: "L".into(),
                ward_name: "W".into(),
                name: "N".into(),
                pu_code: "P".into(),
                document_url: "second".into(),
                uploaded_at: String::new(),
                has_old_documents: false,
                json_url: String::new(),
            },
        ];
        sort_rows(&mut rows);
        assert_eq!(rows[0].document_url, "first");
        assert_eq!(rows[1].document_url, "second");
    }
}
