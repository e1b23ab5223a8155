use chrono::{DateTime, TimeZone, Utc};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Stage configuration with the defaults the pipeline is operated with.
///
/// Every constant the stages depend on lives here so operators and tests can
/// substitute their own values instead of editing module-level globals.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the archived results tree.
    pub results_dir: PathBuf,
    /// Base URL of the remote results API, up to and including `/api/v1`.
    pub api_base: String,
    /// Identifier of the election being archived.
    pub election_id: String,
    /// Numeric ids of the states to archive.
    pub state_ids: RangeInclusive<u32>,
    /// Maximum states fetched concurrently.
    pub state_concurrency: usize,
    /// Wards fetched concurrently within one batch; batches run
    /// sequentially.
    pub batch_size: usize,
    /// Retries per request after the first attempt.
    pub retries: u32,
    /// Base delay for exponential retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Instant separating on-time document uploads from late ones.
    pub cutoff: DateTime<Utc>,
    /// Base URL under which the archived tree is published. Only rendered
    /// into the aggregate `json_url` column, never fetched.
    pub aggregate_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            results_dir: PathBuf::from("results"),
            api_base: "https://lv001-g.inecelectionresults.ng/api/v1".to_string(),
            election_id: "63f8f25b594e164f8146a213".to_string(),
            state_ids: 1..=36,
            state_concurrency: 8,
            batch_size: 16,
            retries: 3,
            retry_base_delay_ms: 500,
            request_timeout_secs: 30,
            // Midnight UTC on the day after the election.
            cutoff: Utc.with_ymd_and_hms(2023, 2, 26, 0, 0, 0).unwrap(),
            aggregate_base_url: "https://inec-archive.org/results".to_string(),
        }
    }
}
