//! `geocode` command: validate one UPRN directly.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{create_spinner, output, CommandOutput, ProgressBarExt};
use crate::domain::models::{Config, LocationId};
use crate::infrastructure::places::DpaRecord;
use crate::infrastructure::setup::build_places_client;

#[derive(Args, Debug)]
pub struct GeocodeArgs {
    /// Unique Property Reference Number to look up
    pub uprn: String,
}

#[derive(Debug, Serialize)]
pub struct GeocodeOutput {
    pub uprn: String,
    pub deliverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<crate::domain::models::ValidatedAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GeocodeOutput {
    fn from_record(id: &LocationId, record: Option<DpaRecord>) -> Self {
        let outcome = record.map(|record| record.into_validated(id));
        let (address, reason) = match outcome {
            Some(Ok(address)) => (Some(address), None),
            Some(Err(rejection)) => (None, Some(rejection.to_string())),
            None => (None, Some("no DPA record".to_string())),
        };

        Self {
            uprn: id.to_string(),
            deliverable: address.is_some(),
            address,
            reason,
        }
    }
}

impl CommandOutput for GeocodeOutput {
    fn to_human(&self) -> String {
        match (&self.address, &self.reason) {
            (Some(address), _) => {
                let mut lines = vec![
                    format!("UPRN: {}", address.uprn),
                    format!("Address: {}", address.address.full),
                    format!("Postcode: {}", address.address.postcode),
                    format!("Town: {}", address.address.town),
                    format!("Position: {:.6}, {:.6}", address.lat, address.lon),
                    format!(
                        "Classification: {} ({})",
                        address.classification.code, address.classification.description
                    ),
                ];
                if let Some(udprn) = &address.address.udprn {
                    lines.insert(1, format!("UDPRN: {udprn}"));
                }
                lines.join("\n")
            }
            (None, Some(reason)) => format!("UPRN {} is not deliverable: {reason}", self.uprn),
            (None, None) => format!("UPRN {} is not deliverable", self.uprn),
        }
    }
}

pub async fn execute(args: GeocodeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let client = build_places_client(config)?;
    let id = LocationId::new(args.uprn.trim());

    let spinner = (!json_mode).then(|| create_spinner(format!("Looking up {id}")));
    let record = client.lookup(&id).await;
    if let Some(spinner) = &spinner {
        match &record {
            Ok(_) => spinner.finish_success(format!("Looked up {id}")),
            Err(err) => spinner.finish_error(err.to_string()),
        }
    }

    let record = record.with_context(|| format!("OS Places lookup failed for {id}"))?;
    output(&GeocodeOutput::from_record(&id, record), json_mode);
    Ok(())
}
