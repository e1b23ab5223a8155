//! Stage four: per-ward upload-timing statistics.
//!
//! Every polling unit is classified against the cutoff instant: `pending`
//! when no document or timestamp was ever uploaded, `valid` when the upload
//! landed strictly before the cutoff, `invalid` when it landed at or after.
//! Offset statistics are computed over the invalid subset only, and one
//! sorted row per ward goes into a single report under the results root.

use crate::commands::{csv_into_string, read_json, PipelineError, Result};
use crate::config::Config;
use crate::discover;
use crate::model::{InvalidUploads, OffsetStats, PollingUnit, WardUploadStats};
use crate::schema;
use crate::storage::{Storage, POLLING_UNITS_JSON, UPLOAD_STATS_CSV, WARD_RECORD};
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;

pub fn run<S>(config: &Config, storage: &S) -> Result<()>
where
    S: Storage + ?Sized,
{
    let ward_dirs =
        discover::ward_directories(&config.results_dir).map_err(|source| PipelineError::Read {
            path: config.results_dir.clone(),
            source,
        })?;
    let total = ward_dirs.len();

    let mut stats = Vec::new();
    let mut skipped = 0usize;
    for (index, ward_dir) in ward_dirs.iter().enumerate() {
        match ward_stats(config, ward_dir) {
            Ok(Some(row)) => stats.push(row),
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
        println!("{} of {}", index + 1, total);
    }

    stats.sort_by(|a, b| {
        a.state
            .cmp(&b.state)
            .then_with(|| a.lga.cmp(&b.lga))
            .then_with(|| a.ward.cmp(&b.ward))
    });

    let csv = stats_csv(&stats)?;
    storage.write_text(&config.results_dir.join(UPLOAD_STATS_CSV), &csv)?;

    if skipped == 0 {
        Ok(())
    } else {
        Err(PipelineError::Partial {
            failed: skipped,
            total,
            subject: "wards",
        })
    }
}

/// Statistics for one ward, or `None` when the ward has no raw record file
/// yet.
fn ward_stats(config: &Config, ward_dir: &Path) -> Result<Option<WardUploadStats>> {
    let raw_path = ward_dir.join(POLLING_UNITS_JSON);
    if !raw_path.is_file() {
        return Ok(None);
    }
    let units =
        schema::parse_polling_units(read_json(&raw_path)?, &raw_path.display().to_string())?;
    let ward_path = ward_dir.join(WARD_RECORD);
    let ward = schema::parse_ward(read_json(&ward_path)?, &ward_path.display().to_string())?;

    let mut pending = 0usize;
    let mut valid = 0usize;
    let mut invalid_offsets = Vec::new();
    for unit in &units {
        match classify(unit, config.cutoff) {
            UploadClass::Pending => pending += 1,
            UploadClass::Malformed => {
                eprintln!(
                    "{}",
                    format!(
                        "unparseable upload timestamp for {} in {}; counting as pending",
                        unit.pu_code, ward.name
                    )
                    .yellow()
                );
                pending += 1;
            }
            UploadClass::Valid(_) => valid += 1,
            UploadClass::Invalid(offset) => invalid_offsets.push(offset),
        }
    }

    Ok(Some(WardUploadStats {
        state: ward.state_name,
        lga: ward.lga_name,
        ward: ward.name,
        total: units.len(),
        pending,
        valid,
        invalid: InvalidUploads {
            total: invalid_offsets.len(),
            offset: offset_stats(invalid_offsets),
        },
    }))
}

pub(crate) enum UploadClass {
    /// No document or no upload timestamp.
    Pending,
    /// A timestamp is present but does not parse.
    Malformed,
    /// Uploaded strictly before the cutoff; offset is negative.
    Valid(i64),
    /// Uploaded at or after the cutoff; offset is non-negative.
    Invalid(i64),
}

/// Signed whole seconds between the upload and the cutoff decide the class.
pub(crate) fn classify(unit: &PollingUnit, cutoff: DateTime<Utc>) -> UploadClass {
    let stamp = match unit.document.as_ref().and_then(|d| d.updated_at.as_deref()) {
        Some(stamp) => stamp,
        None => return UploadClass::Pending,
    };
    let uploaded = match DateTime::parse_from_rfc3339(stamp) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(_) => return UploadClass::Malformed,
    };
    let offset = uploaded.signed_duration_since(cutoff).num_seconds();
    if offset < 0 {
        UploadClass::Valid(offset)
    } else {
        UploadClass::Invalid(offset)
    }
}

/// Min, max, mean and median of the given offsets; all zero for an empty
/// list. The median is the element at index `(n - 1) / 2` of the sorted
/// list for both parities — the lower middle for even counts, which
/// downstream reports already assume.
pub(crate) fn offset_stats(mut offsets: Vec<i64>) -> OffsetStats {
    if offsets.is_empty() {
        return OffsetStats {
            min: 0,
            max: 0,
            avg: 0.0,
            median: 0,
        };
    }
    offsets.sort_unstable();
    let min = offsets[0];
    let max = offsets[offsets.len() - 1];
    let avg = offsets.iter().sum::<i64>() as f64 / offsets.len() as f64;
    let median = offsets[(offsets.len() - 1) / 2];
    OffsetStats {
        min,
        max,
        avg,
        median,
    }
}

fn stats_csv(stats: &[WardUploadStats]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&[
        "state",
        "lga",
        "ward",
        "total",
        "pending",
        "valid",
        "invalid.total",
        "invalid.offset.min",
        "invalid.offset.max",
        "invalid.offset.avg",
        "invalid.offset.median",
    ])?;
    for row in stats {
        let record = vec![
            row.state.clone(),
            row.lga.clone(),
            row.ward.clone(),
            row.total.to_string(),
            row.pending.to_string(),
            row.valid.to_string(),
            row.invalid.total.to_string(),
            row.invalid.offset.min.to_string(),
            row.invalid.offset.max.to_string(),
            row.invalid.offset.avg.to_string(),
            row.invalid.offset.median.to_string(),
        ];
        writer.write_record(&record)?;
    }
    csv_into_string(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use chrono::TimeZone;
    use serde_json::Map;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 2, 26, 0, 0, 0).unwrap()
    }

    fn unit_with(updated_at: Option<&str>) -> PollingUnit {
        PollingUnit {
            name: "Town Hall".to_string(),
            pu_code: "PU1".to_string(),
            state_name: "Lagos".to_string(),
            lga_name: "Ikeja".to_string(),
            ward_name: "Ojodu".to_string(),
            document: updated_at.map(|stamp| Document {
                url: "https://docs.example/1.jpg".to_string(),
                updated_at: Some(stamp.to_string()),
                extra: Map::new(),
            }),
            old_documents: None,
            has_old_documents: false,
            extra: Map::new(),
        }
    }

    #[test]
    fn classification_is_a_partition() {
        // Exactly one class applies to each unit.
        assert!(matches!(classify(&unit_with(None), cutoff()), UploadClass::Pending));
        assert!(matches!(
            classify(&unit_with(Some("2023-02-25T23:00:00Z")), cutoff()),
            UploadClass::Valid(-3600)
        ));
        assert!(matches!(
            classify(&unit_with(Some("2023-02-26T00:00:00Z")), cutoff()),
            UploadClass::Invalid(0)
        ));
        assert!(matches!(
            classify(&unit_with(Some("2023-02-26T01:00:00Z")), cutoff()),
            UploadClass::Invalid(3600)
        ));
        assert!(matches!(
            classify(&unit_with(Some("yesterday-ish")), cutoff()),
            UploadClass::Malformed
        ));
    }

    #[test]
    fn document_without_timestamp_is_pending() {
        let mut unit = unit_with(Some("2023-02-26T01:00:00Z"));
        unit.document.as_mut().unwrap().updated_at = None;
        assert!(matches!(classify(&unit, cutoff()), UploadClass::Pending));
    }

    #[test]
    fn median_uses_the_lower_middle_for_even_counts() {
        let stats = offset_stats(vec![30, -5, 20, 10]);
        assert_eq!(stats.min, -5);
        assert_eq!(stats.max, 30);
        assert_eq!(stats.avg, 13.75);
        assert_eq!(stats.median, 10);
    }

    #[test]
    fn median_of_odd_counts_is_the_middle_element() {
        let stats = offset_stats(vec![30, 10, 20]);
        assert_eq!(stats.median, 20);
    }

    #[test]
    fn empty_invalid_subset_reports_zeros() {
        let stats = offset_stats(Vec::new());
        assert_eq!(
            stats,
            OffsetStats {
                min: 0,
                max: 0,
                avg: 0.0,
                median: 0
            }
        );
    }

    #[test]
    fn whole_second_averages_render_without_a_fraction() {
        let row = WardUploadStats {
            state: "Lagos".to_string(),
            lga: "Ikeja".to_string(),
            ward: "Ojodu".to_string(),
            total: 3,
            pending: 1,
            valid: 1,
            invalid: InvalidUploads {
                total: 1,
                offset: OffsetStats {
                    min: 3600,
                    max: 3600,
                    avg: 3600.0,
                    median: 3600,
                },
            },
        };
        let csv = stats_csv(&[row]).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "Lagos,Ikeja,Ojodu,3,1,1,1,3600,3600,3600,3600"
        );
    }
}
