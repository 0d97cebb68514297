//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::config::ConfigArgs;
use super::commands::geocode::GeocodeArgs;
use super::commands::sample::SampleArgs;

#[derive(Parser, Debug)]
#[command(name = "address-sampler")]
#[command(about = "Sample deliverable postal addresses inside a polygon", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of address-sampler.yaml
    #[arg(short, long, global = true, env = "ADDRESS_SAMPLER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample N deliverable addresses inside a polygon
    Sample(SampleArgs),

    /// Validate a single UPRN against OS Places
    Geocode(GeocodeArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sample() {
        let cli = Cli::parse_from([
            "address-sampler",
            "sample",
            "--polygon",
            "area.geojson",
            "--n",
            "5",
            "--json",
        ]);

        assert!(cli.json);
        match cli.command {
            Commands::Sample(args) => {
                assert_eq!(args.n, 5);
                assert_eq!(args.polygon, Some(PathBuf::from("area.geojson")));
                assert!(args.fixture.is_none());
            }
            other => panic!("expected sample, got {other:?}"),
        }
    }

    #[test]
    fn test_seed_requires_fixture() {
        let result = Cli::try_parse_from(["address-sampler", "sample", "--seed", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_geocode() {
        let cli = Cli::parse_from(["address-sampler", "geocode", "100023336956"]);
        match cli.command {
            Commands::Geocode(args) => assert_eq!(args.uprn, "100023336956"),
            other => panic!("expected geocode, got {other:?}"),
        }
    }
}
