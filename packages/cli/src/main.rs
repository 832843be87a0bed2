#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the Lyon POI data service.
//!
//! Exercises the full fetch → normalize → cache → rank/cluster pipeline
//! against the live Grand Lyon WFS endpoint. Useful for smoke-testing
//! layer schemas and for exploring the datasets without a map UI.

use std::str::FromStr as _;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lyon_poi::registry;
use lyon_poi_models::{Coordinate, Domain, PoiDetails};
use lyon_poi_service::{PoiService, ServiceConfig, WfsClient, WfsConfig};
use lyon_proximity::cluster::{ClusterConfig, ClusterEngine, Viewport};

#[derive(Parser)]
#[command(name = "lyon-poi", about = "Lyon open-data POI query tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registered POI domains
    Domains,
    /// Fetch a full domain and print a sample
    Fetch {
        /// Domain identifier (e.g., "`toilets`")
        domain: String,
        /// How many records to print
        #[arg(long, default_value = "10")]
        sample: usize,
    },
    /// Rank a domain's records by distance from a point
    Nearby {
        /// Domain identifier (e.g., "`drinking_fountains`")
        domain: String,
        /// Reference latitude
        #[arg(long)]
        lat: f64,
        /// Reference longitude
        #[arg(long)]
        lon: f64,
        /// Maximum distance in meters
        #[arg(long, default_value = "1000")]
        radius: f64,
        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Cluster a domain's records for a map viewport
    Clusters {
        /// Domain identifier (e.g., "`glass_silos`")
        domain: String,
        /// Viewport center latitude
        #[arg(long)]
        lat: f64,
        /// Viewport center longitude
        #[arg(long)]
        lon: f64,
        /// Viewport span in degrees (both axes)
        #[arg(long, default_value = "0.02")]
        span: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Domains => {
            println!("{:<20} {:<45} LABEL", "DOMAIN", "LAYER");
            println!("{}", "-".repeat(90));
            for schema in registry::all_schemas() {
                println!(
                    "{:<20} {:<45} {}",
                    schema.domain.to_string(),
                    schema.layer,
                    schema.label
                );
            }
        }
        Commands::Fetch { domain, sample } => {
            let domain = parse_domain(&domain)?;
            let service = build_service()?;
            log::info!("Fetching the full {domain} layer...");
            let records = service.get_or_fetch(domain, None).await?;
            println!("{} records for {domain}", records.len());
            for poi in records.iter().take(sample) {
                println!(
                    "  {:<12} ({:.5}, {:.5})  {} — {}",
                    poi.id,
                    poi.coordinate.latitude,
                    poi.coordinate.longitude,
                    poi.display_name,
                    poi.address
                );
            }
        }
        Commands::Nearby {
            domain,
            lat,
            lon,
            radius,
            limit,
        } => {
            let domain = parse_domain(&domain)?;
            let service = build_service()?;
            let reference = Coordinate::new(lat, lon);
            let ranked = service
                .nearby(domain, reference, Some(radius), Some(limit))
                .await?;
            if ranked.is_empty() {
                println!("Nothing within {radius} m");
            }
            for entry in ranked {
                println!(
                    "{:>7.0} m  {} — {}{}",
                    entry.distance_m,
                    entry.poi.display_name,
                    entry.poi.address,
                    detail_suffix(&entry.poi.details)
                );
            }
        }
        Commands::Clusters {
            domain,
            lat,
            lon,
            span,
        } => {
            let domain = parse_domain(&domain)?;
            let service = build_service()?;
            let center = Coordinate::new(lat, lon);
            let records = service.get_or_fetch(domain, Some(center)).await?;

            let mut engine = ClusterEngine::new(ClusterConfig::default());
            let viewport = Viewport {
                center,
                lat_span: span,
                lon_span: span,
            };
            let clusters = engine.clusters(&records, &viewport);
            println!("{} clusters over {} records", clusters.len(), records.len());
            for cluster in clusters {
                println!(
                    "  {:>3} member(s) at ({:.5}, {:.5})  [{}]",
                    cluster.members.len(),
                    cluster.centroid.latitude,
                    cluster.centroid.longitude,
                    cluster.id
                );
            }
        }
    }

    Ok(())
}

/// Builds the production service over the Grand Lyon endpoint.
fn build_service() -> Result<PoiService, Box<dyn std::error::Error>> {
    let client = WfsClient::new(WfsConfig::default())?;
    Ok(PoiService::new(Arc::new(client), ServiceConfig::default()))
}

/// Resolves a domain identifier, listing the valid ones on failure.
fn parse_domain(raw: &str) -> Result<Domain, String> {
    Domain::from_str(raw).map_err(|_| {
        let known: Vec<String> = Domain::ALL.iter().map(ToString::to_string).collect();
        format!("Unknown domain '{raw}'. Expected one of: {}", known.join(", "))
    })
}

/// A short, human-readable attribute suffix for list output.
fn detail_suffix(details: &PoiDetails) -> String {
    match details {
        PoiDetails::Toilets { accessible: true }
        | PoiDetails::GlassSilos { accessible: true } => "  (accessible)".to_string(),
        PoiDetails::Benches { shaded: true } => "  (shaded)".to_string(),
        PoiDetails::DrinkingFountains { in_service: false }
        | PoiDetails::CompostBins { in_service: false } => "  (out of service)".to_string(),
        PoiDetails::Parks {
            area_sq_m: Some(area),
            ..
        } => format!("  ({area:.0} m2)"),
        PoiDetails::ChargingStations {
            power_kw,
            point_count,
            is_free,
            ..
        } => {
            let mut parts = vec![format!("{point_count} point(s)")];
            if let Some(power) = power_kw {
                parts.push(format!("{power:.0} kW"));
            }
            if *is_free {
                parts.push("free".to_string());
            }
            format!("  ({})", parts.join(", "))
        }
        PoiDetails::HikingLoops {
            length_km: Some(length),
            ..
        } => format!("  ({length:.1} km)"),
        _ => String::new(),
    }
}
