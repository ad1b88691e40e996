#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for zoning feasibility reports.
//!
//! ```text
//! nyc_zoning evaluate --facts lot.json
//! nyc_zoning lookup --house-number 120 --street "Broadway" --borough MN
//! nyc_zoning lookup ... --transit-zones transit_zones.geojson
//! nyc_zoning districts
//! ```
//!
//! `lookup` needs `NYC_GEOCLIENT_KEY` in the environment. Set `RUST_LOG`
//! for step-by-step logging on stderr; reports go to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nyc_zoning_facts::geoclient::AddressQuery;
use nyc_zoning_facts::pipeline::new_report_id;
use nyc_zoning_facts::transit::LocalTransitStep;
use nyc_zoning_facts::{FactsPipeline, MemoryReportStore};
use nyc_zoning_models::{Borough, ParcelFacts};

#[derive(Parser)]
#[command(
    name = "nyc_zoning",
    about = "Zoning feasibility reports for NYC tax lots"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a parcel facts JSON file
    Evaluate {
        /// Path to a JSON file holding parcel facts
        #[arg(long)]
        facts: PathBuf,
    },
    /// Collect facts for an address from the city's services and evaluate
    Lookup {
        /// House number (e.g., 120 or 42-15)
        #[arg(long)]
        house_number: String,
        /// Street name
        #[arg(long)]
        street: String,
        /// Borough name, abbreviation (MN, BX, BK, QN, SI), or code (1-5)
        #[arg(long, value_parser = parse_borough)]
        borough: Borough,
        /// Answer transit zone queries from this GeoJSON file instead of
        /// the remote layer
        #[arg(long)]
        transit_zones: Option<PathBuf>,
        /// Feature property holding the zone label in the GeoJSON file
        #[arg(long, default_value = "label")]
        label_property: String,
        /// Report id to store step outputs under (random if omitted)
        #[arg(long)]
        report_id: Option<String>,
    },
    /// List every district code the lookup tables know about
    Districts,
}

fn parse_borough(raw: &str) -> Result<Borough, String> {
    Borough::parse_loose(raw).ok_or_else(|| format!("unknown borough: {raw}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { facts } => {
            let contents = std::fs::read_to_string(&facts)?;
            let parcel: ParcelFacts = serde_json::from_str(&contents)?;
            log::info!("Evaluating facts from {}", facts.display());

            let report = nyc_zoning::evaluate(&parcel);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Lookup {
            house_number,
            street,
            borough,
            transit_zones,
            label_property,
            report_id,
        } => {
            let local_transit = transit_zones
                .map(|path| LocalTransitStep::from_file(&path, &label_property))
                .transpose()?;
            let pipeline =
                FactsPipeline::from_env(Arc::new(MemoryReportStore::new()), local_transit)?;

            let report_id = report_id.unwrap_or_else(new_report_id);
            let address = AddressQuery {
                house_number,
                street,
                borough,
            };
            let collected = pipeline.collect(&report_id, &address).await?;
            let report = nyc_zoning::evaluate(&collected.facts);

            let output = serde_json::json!({
                "collected": collected,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Districts => {
            let districts = nyc_zoning::tables::tables().known_districts();
            for district in &districts {
                println!("{district}");
            }
            println!("\n{} district(s)", districts.len());
        }
    }

    Ok(())
}
