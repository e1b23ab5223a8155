mod client;
mod commands;
mod config;
mod discover;
mod model;
mod schema;
mod storage;
mod util;

use crate::client::HttpApi;
use crate::commands::{aggregate, archive_polling_units, archive_states, upload_stats};
use crate::config::Config;
use crate::storage::FsStorage;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[clap(about = "Archive and aggregate election results published by the INEC result-viewing API")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Archive the state/LGA/ward hierarchy for every state.
    ArchiveStates {
        /// Results directory
        #[clap(long, default_value = "results")]
        results_dir: PathBuf,
        /// Base URL of the remote results API
        #[clap(long)]
        api_base: Option<String>,
        /// Maximum states fetched concurrently
        #[clap(long)]
        concurrency: Option<usize>,
    },
    /// Fetch and archive polling units for every archived ward.
    ArchivePollingUnits {
        /// Results directory
        #[clap(long, default_value = "results")]
        results_dir: PathBuf,
        /// Base URL of the remote results API
        #[clap(long)]
        api_base: Option<String>,
        /// Wards fetched concurrently within one batch
        #[clap(long)]
        batch_size: Option<usize>,
    },
    /// Aggregate archived polling units into one CSV per state.
    Aggregate {
        /// Results directory
        #[clap(long, default_value = "results")]
        results_dir: PathBuf,
        /// Base URL rendered into each row's json_url column
        #[clap(long)]
        base_url: Option<String>,
    },
    /// Classify document uploads against the cutoff and write per-ward
    /// statistics.
    UploadStats {
        /// Results directory
        #[clap(long, default_value = "results")]
        results_dir: PathBuf,
        /// Cutoff instant (RFC 3339), default midnight UTC on 2023-02-26
        #[clap(long)]
        cutoff: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    let result = match opts.command {
        Command::ArchiveStates {
            results_dir,
            api_base,
            concurrency,
        } => {
            let mut config = Config::default();
            config.results_dir = results_dir;
            if let Some(api_base) = api_base {
                config.api_base = api_base;
            }
            if let Some(concurrency) = concurrency {
                config.state_concurrency = concurrency;
            }
            run_archive_states(config).await
        }
        Command::ArchivePollingUnits {
            results_dir,
            api_base,
            batch_size,
        } => {
            let mut config = Config::default();
            config.results_dir = results_dir;
            if let Some(api_base) = api_base {
                config.api_base = api_base;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            run_archive_polling_units(config).await
        }
        Command::Aggregate {
            results_dir,
            base_url,
        } => {
            let mut config = Config::default();
            config.results_dir = results_dir;
            if let Some(base_url) = base_url {
                config.aggregate_base_url = base_url;
            }
            aggregate::run(&config, &FsStorage)
        }
        Command::UploadStats {
            results_dir,
            cutoff,
        } => {
            let mut config = Config::default();
            config.results_dir = results_dir;
            if let Some(cutoff) = cutoff {
                config.cutoff = cutoff;
            }
            upload_stats::run(&config, &FsStorage)
        }
    };

    if let Err(err) = result {
        eprintln!("{} {}", "✗".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run_archive_states(config: Config) -> commands::Result<()> {
    let api = Arc::new(HttpApi::new(&config)?);
    archive_states::run(&config, api, Arc::new(FsStorage)).await
}

async fn run_archive_polling_units(config: Config) -> commands::Result<()> {
    let api = Arc::new(HttpApi::new(&config)?);
    archive_polling_units::run(&config, api, Arc::new(FsStorage)).await
}
