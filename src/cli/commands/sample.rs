//! `sample` command: run one job and follow its events.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::cli::output::{
    create_percent_bar, output, CommandOutput, ProgressBarExt, TableFormatter,
};
use crate::domain::models::{
    Config, Geometry, JobId, JobRequest, JobStatus, NotificationEvent, ValidatedAddress,
};
use crate::infrastructure::setup::{build_runtime, SpatialSource};

/// Small area in north London used when no polygon file is given.
const DEMO_POLYGON: &str = r#"{
  "type": "Polygon",
  "coordinates": [[
    [-0.15333263205036454, 51.65357400909667],
    [-0.11796920746246552, 51.65081934523486],
    [-0.10402635944212646, 51.63926726533617],
    [-0.13012051635169955, 51.630806762703116],
    [-0.16096614660898595, 51.63902555859106],
    [-0.15333263205036454, 51.65357400909667]
  ]]
}"#;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// GeoJSON Polygon, MultiPolygon or Feature file (WGS84)
    #[arg(short, long)]
    pub polygon: Option<PathBuf>,

    /// Number of deliverable addresses to find
    #[arg(short, long, default_value_t = 3, allow_negative_numbers = true)]
    pub n: i64,

    /// Run offline against a fixture file instead of PostGIS and OS Places
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Seed for fixture sampling (random when omitted)
    #[arg(long, requires = "fixture")]
    pub seed: Option<u64>,

    /// Print every job event as a JSON line while the job runs
    #[arg(long)]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct SampleOutput {
    pub job_id: JobId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub addresses: Vec<ValidatedAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SampleOutput {
    fn from_status(job_id: JobId, status: JobStatus, seed: Option<u64>) -> Self {
        let label = status.label().to_string();
        let (addresses, error) = match status {
            JobStatus::Succeeded { result } => (result, None),
            JobStatus::Failed { reason, partial } => (partial, Some(reason)),
            JobStatus::Cancelled => (Vec::new(), Some("job cancelled".to_string())),
            JobStatus::Queued | JobStatus::Running => (Vec::new(), None),
        };

        Self {
            job_id,
            status: label,
            seed,
            addresses,
            error,
        }
    }
}

impl CommandOutput for SampleOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Job {} {}", self.job_id, self.status)];
        if let Some(seed) = self.seed {
            lines.push(format!("Seed: {seed}"));
        }
        if let Some(error) = &self.error {
            lines.push(format!("Error: {error}"));
        }
        if self.addresses.is_empty() {
            lines.push("No addresses.".to_string());
        } else {
            lines.push(TableFormatter::new().format_addresses(&self.addresses));
        }
        lines.join("\n")
    }
}

/// Read a polygon file, or fall back to the demo area.
pub fn load_polygon(path: Option<&Path>) -> Result<Geometry> {
    let contents = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read polygon file {}", path.display()))?,
        None => DEMO_POLYGON.to_string(),
    };

    Ok(Geometry::from_geojson_str(&contents)?)
}

pub async fn execute(args: SampleArgs, config: &Config, json_mode: bool) -> Result<()> {
    let polygon = load_polygon(args.polygon.as_deref())?;

    let (source, seed) = match args.fixture {
        Some(path) => {
            let seed = args.seed.unwrap_or_else(rand::random);
            (SpatialSource::Fixture { path, seed }, Some(seed))
        }
        None => (SpatialSource::Live, None),
    };

    let runtime = build_runtime(config, &source)?;
    let (job_id, mut events) = runtime
        .jobs
        .submit_and_subscribe(JobRequest::new(polygon, args.n))
        .await
        .context("Sampling request rejected")?;

    let pb = create_percent_bar(!json_mode && !args.stream);
    pb.set_message(format!("job {job_id} queued"));

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if args.stream {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    match event {
                        NotificationEvent::Progress { current_step, progress, .. } => {
                            ProgressBarExt::update(&pb, u64::from(progress), current_step);
                        }
                        NotificationEvent::Complete { result, .. } => {
                            pb.finish_success(format!("{} addresses", result.len()));
                            break;
                        }
                        NotificationEvent::Error { error, .. } => {
                            pb.finish_error(error);
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "progress display fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                runtime.jobs.cancel(job_id).await;
            }
        }
    }

    let snapshot = runtime
        .jobs
        .wait(job_id)
        .await
        .context("Job disappeared from the registry")?;

    let failed = !matches!(snapshot.status, JobStatus::Succeeded { .. });
    let result = SampleOutput::from_status(job_id, snapshot.status, seed);
    output(&result, json_mode);

    if failed {
        bail!(
            "{}",
            result.error.unwrap_or_else(|| "job did not complete".to_string())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Classification, LocationId, PostalAddress};

    #[test]
    fn test_demo_polygon_is_valid() {
        let polygon = load_polygon(None).unwrap();
        polygon.validate().unwrap();
        let bbox = polygon.bounding_box().unwrap();
        assert!(bbox.min_lon < -0.15 && bbox.max_lat > 51.65);
    }

    #[test]
    fn test_missing_polygon_file() {
        let err = load_polygon(Some(Path::new("/nonexistent/area.geojson"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read polygon file"));
    }

    #[test]
    fn test_failed_output_carries_partial_results() {
        let partial = vec![ValidatedAddress {
            uprn: LocationId::new("1"),
            address: PostalAddress::default(),
            lat: 0.0,
            lon: 0.0,
            classification: Classification::default(),
        }];
        let output = SampleOutput::from_status(
            JobId::new(),
            JobStatus::Failed {
                reason: "could not find 3 deliverable addresses after 20 attempts".to_string(),
                partial,
            },
            Some(9),
        );

        assert_eq!(output.status, "failed");
        assert_eq!(output.addresses.len(), 1);
        let json = output.to_json();
        assert_eq!(json["seed"], 9);
        assert_eq!(
            json["error"],
            "could not find 3 deliverable addresses after 20 attempts"
        );
    }
}
