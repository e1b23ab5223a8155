//! Stage two: archive polling units for every archived ward.
//!
//! The work list comes from scanning the results tree for ward records, so
//! the stage resumes from disk state alone. Wards whose output files both
//! exist are skipped untouched. The rest are fetched in fixed-size batches,
//! concurrent within a batch and sequential across batches, with a progress
//! line after each batch. A ward's failure is reported and counted without
//! aborting its batch.

use crate::client::ElectionApi;
use crate::commands::{csv_into_string, read_json, PipelineError, Result};
use crate::config::Config;
use crate::discover;
use crate::model::PollingUnit;
use crate::schema;
use crate::storage::{write_record, Storage, POLLING_UNITS_CSV, POLLING_UNITS_JSON, WARD_RECORD};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

pub async fn run<A, S>(config: &Config, api: Arc<A>, storage: Arc<S>) -> Result<()>
where
    A: ElectionApi + 'static,
    S: Storage + 'static,
{
    let ward_dirs =
        discover::ward_directories(&config.results_dir).map_err(|source| PipelineError::Read {
            path: config.results_dir.clone(),
            source,
        })?;
    let total = ward_dirs.len();
    if total == 0 {
        println!(
            "no archived wards under {}; run archive-states first",
            config.results_dir.display()
        );
        return Ok(());
    }

    let mut processed = 0usize;
    let mut failed = 0usize;

    for batch in ward_dirs.chunks(config.batch_size.max(1)) {
        let mut tasks = JoinSet::new();
        for ward_dir in batch {
            processed += 1;
            if storage.is_archived(ward_dir) {
                continue;
            }
            let api = api.clone();
            let storage = storage.clone();
            let ward_dir = ward_dir.clone();
            tasks.spawn(async move {
                let result = archive_ward(&*api, &*storage, &ward_dir).await;
                (ward_dir, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let (ward_dir, result) = joined
                .map_err(|err| PipelineError::Assertion(format!("ward task panicked: {}", err)))?;
            if let Err(err) = result {
                eprintln!("{} {}: {}", "✗".red(), ward_dir.display(), err);
                failed += 1;
            }
        }
        let pct = processed as f64 / total as f64 * 100.0;
        println!(
            "{}",
            format!("=================== {:.0}% ===================", pct).bright_green()
        );
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(PipelineError::Partial {
            failed,
            total,
            subject: "wards",
        })
    }
}

async fn archive_ward<A, S>(api: &A, storage: &S, ward_dir: &Path) -> Result<()>
where
    A: ElectionApi + ?Sized,
    S: Storage + ?Sized,
{
    let ward_path = ward_dir.join(WARD_RECORD);
    let ward = schema::parse_ward(read_json(&ward_path)?, &ward_path.display().to_string())?;

    println!(
        "Archiving {} {} {} {} {}",
        "State".bold(),
        ward.state_name,
        "LGA".bold(),
        ward.lga_name,
        ward.name
    );

    let payload = api.fetch_polling_units(&ward.remote_id).await?;
    let listing = schema::parse_polling_unit_listing(
        payload,
        &format!("ward {} ({})", ward.name, ward.remote_id),
    )?;
    let polling_units: Vec<PollingUnit> = listing
        .data
        .into_iter()
        .map(|row| PollingUnit::from_row(row.polling_unit, row.document, row.old_documents, &ward))
        .collect();

    write_record(storage, &ward_dir.join(POLLING_UNITS_JSON), &polling_units)?;
    let csv = ward_csv(&polling_units)?;
    storage.write_text(&ward_dir.join(POLLING_UNITS_CSV), &csv)?;
    Ok(())
}

/// Flattened tabular form of one ward's polling units. Missing documents
/// render as empty fields.
fn ward_csv(polling_units: &[PollingUnit]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&[
        "state_name",
        "lga_name",
        "ward_name",
        "name",
        "pu_code",
        "document.url",
        "has_old_documents",
    ])?;
    for unit in polling_units {
        let url = unit.document.as_ref().map(|d| d.url.as_str()).unwrap_or("");
        writer.write_record(&[
            unit.state_name.as_str(),
            unit.lga_name.as_str(),
            unit.ward_name.as_str(),
            unit.name.as_str(),
            unit.pu_code.as_str(),
            url,
            if unit.has_old_documents { "true" } else { "false" },
        ])?;
    }
    csv_into_string(writer)
}
