//! Stage one: archive the state/LGA/ward hierarchy.
//!
//! One request per state returns the full LGA/ward listing. The listing is
//! validated, the embedded state record is taken from the first row, and the
//! tree is written under `results/{state}/{lga}/{ward}/` with normalized
//! directory names. States are fetched with a bounded fan-out; one state's
//! failure never aborts its siblings.

use crate::client::ElectionApi;
use crate::commands::{PipelineError, Result};
use crate::config::Config;
use crate::model::{Lga, Ward};
use crate::schema::{self, StateListing};
use crate::storage::{write_record, Storage, LGA_RECORD, STATE_RECORD, WARD_RECORD};
use crate::util::dir_name;
use colored::Colorize;
use itertools::Itertools;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;

pub async fn run<A, S>(config: &Config, api: Arc<A>, storage: Arc<S>) -> Result<()>
where
    A: ElectionApi + 'static,
    S: Storage + 'static,
{
    let mut pending: VecDeque<u32> = config.state_ids.clone().collect();
    let total = pending.len();
    let cap = config.state_concurrency.max(1);
    let mut tasks = JoinSet::new();
    let mut failed = 0usize;

    while !pending.is_empty() || !tasks.is_empty() {
        while tasks.len() < cap {
            let state_id = match pending.pop_front() {
                Some(id) => id,
                None => break,
            };
            let api = api.clone();
            let storage = storage.clone();
            let config = config.clone();
            tasks.spawn(async move {
                let result = archive_state(&config, &*api, &*storage, state_id).await;
                (state_id, result)
            });
        }
        if let Some(joined) = tasks.join_next().await {
            let (state_id, result) = joined
                .map_err(|err| PipelineError::Assertion(format!("state task panicked: {}", err)))?;
            if let Err(err) = result {
                eprintln!("{} state {}: {}", "✗".red(), state_id, err);
                failed += 1;
            }
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(PipelineError::Partial {
            failed,
            total,
            subject: "states",
        })
    }
}

async fn archive_state<A, S>(config: &Config, api: &A, storage: &S, state_id: u32) -> Result<()>
where
    A: ElectionApi + ?Sized,
    S: Storage + ?Sized,
{
    let payload = api.fetch_state_listing(state_id).await?;
    let listing = schema::parse_state_listing(payload, &format!("state {} listing", state_id))?;
    write_state_tree(config, storage, state_id, &listing)
}

/// Persist one validated listing. All rows embed the same state; the record
/// is taken from the first row.
fn write_state_tree<S>(
    config: &Config,
    storage: &S,
    state_id: u32,
    listing: &StateListing,
) -> Result<()>
where
    S: Storage + ?Sized,
{
    let first = listing.data.first().ok_or_else(|| {
        PipelineError::Assertion(format!("state {} listing has no rows", state_id))
    })?;
    let state = &first.state;

    println!("Archiving {}", state.name.bright_cyan());

    let state_dir = config.results_dir.join(dir_name(state.state_id, &state.name));
    storage.ensure_directory(&state_dir)?;
    write_record(storage, &state_dir.join(STATE_RECORD), state)?;

    // One listing row per LGA in practice; dedup preserves first-seen order.
    let lgas: Vec<&Lga> = listing
        .data
        .iter()
        .map(|row| &row.lga)
        .unique_by(|lga| lga.remote_id.clone())
        .collect();

    for lga in lgas {
        let lga_dir = state_dir.join(dir_name(lga.lga_id, &lga.name));
        storage.ensure_directory(&lga_dir)?;
        write_record(storage, &lga_dir.join(LGA_RECORD), lga)?;

        let row = listing
            .data
            .iter()
            .find(|row| row.lga.remote_id == lga.remote_id)
            .ok_or_else(|| {
                PipelineError::Assertion(format!(
                    "no ward listing for lga {} in state {}",
                    lga.name, state.name
                ))
            })?;
        for ward in &row.wards {
            let ward_dir = lga_dir.join(dir_name(ward.ward_id, &ward.name));
            storage.ensure_directory(&ward_dir)?;
            let record = Ward::from_listing(ward.clone(), &state.name, &lga.name);
            write_record(storage, &ward_dir.join(WARD_RECORD), &record)?;
        }
    }
    Ok(())
}
