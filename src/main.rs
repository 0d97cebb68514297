//! Address sampler CLI entry point.

use anyhow::Result;
use clap::Parser;

use address_sampler::cli::{commands, handle_error, Cli, Commands};
use address_sampler::infrastructure::logging::{LogConfig, LoggerImpl};
use address_sampler::{Config, ConfigLoader};

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from_settings(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Sample(args) => commands::sample::execute(args, &config, cli.json).await,
        Commands::Geocode(args) => commands::geocode::execute(args, &config, cli.json).await,
        Commands::Config(args) => commands::config::execute(args, &config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
