#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the care access coverage pipeline.
//!
//! Each subcommand runs one stage (county model, care-center resolution,
//! coverage, loading) or the dataset edit workflow (validate, publish).
//! `run` chains the three pipeline stages.
//!
//! Logging goes through [`care_access_cli_utils::init_logger`] so log lines
//! and progress bars never fight for the terminal.

mod edit;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "care_access", about = "County access to certified care centers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the county population-at-risk model from raw population counts
    Model {
        /// County population CSV
        #[arg(long)]
        population: PathBuf,
        /// The population CSV is a bridged-race extract (one row per county,
        /// age group and reference year) rather than a tidy table
        #[arg(long)]
        bridged_race: bool,
        /// TOML file overriding the prevalence parameters
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Resolve care-center coordinates and write the centers table
    Centers {
        /// Care-center CSV
        #[arg(long)]
        input: PathBuf,
        /// Never call the geocoding service; centers without coordinates
        /// fall back to their state centroid
        #[arg(long)]
        no_geocode: bool,
        /// TOML file overriding the geocoding service definition
        #[arg(long)]
        geocoder_config: Option<PathBuf>,
    },
    /// Compute nearest-center coverage for every modeled county
    Coverage {
        /// County centroid CSV path or `http(s)` URL. Defaults to the local
        /// lookup table, then the public county-centers dataset.
        #[arg(long)]
        centroids: Option<String>,
        /// Place counties missing from the centroid table at their state
        /// centroid instead of leaving them unknown
        #[arg(long)]
        state_fallback: bool,
    },
    /// Run model, centers and coverage in sequence
    Run {
        /// County population CSV
        #[arg(long)]
        population: PathBuf,
        /// Care-center CSV
        #[arg(long)]
        centers: PathBuf,
        /// The population CSV is a bridged-race extract
        #[arg(long)]
        bridged_race: bool,
        /// TOML file overriding the prevalence parameters
        #[arg(long)]
        params: Option<PathBuf>,
        /// Never call the geocoding service
        #[arg(long)]
        no_geocode: bool,
        /// TOML file overriding the geocoding service definition
        #[arg(long)]
        geocoder_config: Option<PathBuf>,
        /// County centroid CSV path or `http(s)` URL
        #[arg(long)]
        centroids: Option<String>,
        /// Fall back to state centroids for unplaced counties
        #[arg(long)]
        state_fallback: bool,
    },
    /// Normalize a coverage table, backfill coordinates and write the
    /// enriched cache
    Load {
        /// Coverage CSV to load. Defaults to the final coverage table.
        #[arg(long)]
        source: Option<PathBuf>,
        /// County centroid CSV path or `http(s)` URL used for backfilling
        #[arg(long)]
        centroids: Option<String>,
    },
    /// Validate an edited dataset against its original
    Validate {
        /// The table as published
        #[arg(long)]
        original: PathBuf,
        /// The edited table
        #[arg(long)]
        edited: PathBuf,
        /// Dataset kind (`coverage`, `county_model`, `centers`). Inferred
        /// from the file name when omitted.
        #[arg(long)]
        kind: Option<String>,
    },
    /// Validate an edited dataset and open a change request for it
    Publish {
        /// The table as published
        #[arg(long)]
        original: PathBuf,
        /// The edited table
        #[arg(long)]
        edited: PathBuf,
        /// File name to publish under. Defaults to the original's file name.
        #[arg(long)]
        name: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Also save the working table to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = care_access_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Model {
            population,
            bridged_race,
            params,
        } => {
            pipeline::model(&population, bridged_race, params.as_deref())?;
        }
        Commands::Centers {
            input,
            no_geocode,
            geocoder_config,
        } => {
            pipeline::centers(&multi, &input, no_geocode, geocoder_config.as_deref()).await?;
        }
        Commands::Coverage {
            centroids,
            state_fallback,
        } => {
            pipeline::coverage(&multi, centroids.as_deref(), state_fallback).await?;
        }
        Commands::Run {
            population,
            centers,
            bridged_race,
            params,
            no_geocode,
            geocoder_config,
            centroids,
            state_fallback,
        } => {
            let options = pipeline::RunOptions {
                population,
                centers,
                bridged_race,
                params,
                no_geocode,
                geocoder_config,
                centroids,
                state_fallback,
            };
            pipeline::run(&multi, &options).await?;
        }
        Commands::Load { source, centroids } => {
            pipeline::load(source, centroids.as_deref()).await?;
        }
        Commands::Validate {
            original,
            edited,
            kind,
        } => {
            edit::validate(&original, &edited, kind.as_deref())?;
        }
        Commands::Publish {
            original,
            edited,
            name,
            yes,
            save,
        } => {
            edit::publish(&original, &edited, name, yes, save.as_deref()).await?;
        }
    }

    Ok(())
}
