//! Offline fixtures: regions, candidate pools and known addresses loaded
//! from a JSON file, for running the full engine without PostGIS or the
//! places API.
//!
//! ```json
//! {
//!   "regions": [
//!     { "geometry": { "type": "Polygon", "coordinates": [...] },
//!       "candidates": [ { "id": "100023336956", "lat": 51.50, "lon": -0.12 } ] }
//!   ],
//!   "addresses": [ { "uprn": "100023336956", "address": {...}, ... } ]
//! }
//! ```
//!
//! When `addresses` is omitted every candidate validates with a synthesized
//! address; when present, only the listed identifiers are deliverable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::seeded_sampler::SeededCandidateSampler;
use crate::domain::models::{
    CandidateRef, Classification, ClippedRegion, Geometry, LocationId, PostalAddress,
    ValidatedAddress,
};
use crate::domain::ports::{AddressValidator, SpatialError, SpatialIntersector};

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRegion {
    pub geometry: Geometry,
    #[serde(default)]
    pub candidates: Vec<CandidateRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub regions: Vec<FixtureRegion>,
    #[serde(default)]
    pub addresses: Option<Vec<ValidatedAddress>>,
}

impl Fixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(contents)?;
        for (index, region) in fixture.regions.iter().enumerate() {
            region
                .geometry
                .validate()
                .with_context(|| format!("Region {index} has invalid geometry"))?;
        }
        Ok(fixture)
    }

    /// Split into the three ports the engine needs.
    pub fn into_parts(self, seed: u64) -> (FixtureIntersector, SeededCandidateSampler, FixtureValidator) {
        let mut regions = Vec::with_capacity(self.regions.len());
        let mut pools = Vec::with_capacity(self.regions.len());
        let mut positions = HashMap::new();

        for region in self.regions {
            for candidate in &region.candidates {
                positions.insert(candidate.id.clone(), (candidate.lat, candidate.lon));
            }
            regions.push(region.geometry);
            pools.push(region.candidates);
        }

        let validator = match self.addresses {
            Some(addresses) => FixtureValidator::Known(
                addresses
                    .into_iter()
                    .map(|address| (address.uprn.clone(), address))
                    .collect(),
            ),
            None => FixtureValidator::Synthesized(positions),
        };

        (
            FixtureIntersector { regions },
            SeededCandidateSampler::from_pools(pools, seed),
            validator,
        )
    }
}

/// Returns every fixture region whose bounding box overlaps the polygon's.
///
/// Regions are not clipped geometrically. Each overlapping region carries
/// the job polygon as its geometry, so the sampler only draws the region's
/// candidates that fall inside the polygon.
pub struct FixtureIntersector {
    regions: Vec<Geometry>,
}

#[async_trait]
impl SpatialIntersector for FixtureIntersector {
    async fn intersect(&self, polygon: &Geometry) -> Result<Vec<ClippedRegion>, SpatialError> {
        let Some(bbox) = polygon.bounding_box() else {
            return Ok(Vec::new());
        };

        Ok(self
            .regions
            .iter()
            .enumerate()
            .filter(|(_, geometry)| {
                geometry
                    .bounding_box()
                    .is_some_and(|region_bbox| region_bbox.intersects(&bbox))
            })
            .map(|(index, _)| ClippedRegion {
                index,
                geometry: polygon.clone(),
            })
            .collect())
    }
}

pub enum FixtureValidator {
    /// Only these identifiers are deliverable.
    Known(HashMap<LocationId, ValidatedAddress>),
    /// Every known candidate is deliverable, with a placeholder address.
    Synthesized(HashMap<LocationId, (f64, f64)>),
}

#[async_trait]
impl AddressValidator for FixtureValidator {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress> {
        match self {
            Self::Known(addresses) => addresses.get(id).cloned(),
            Self::Synthesized(positions) => {
                let &(lat, lon) = positions.get(id)?;
                Some(ValidatedAddress {
                    uprn: id.clone(),
                    address: PostalAddress {
                        full: format!("FIXTURE ADDRESS {id}"),
                        postcode: "ZZ99 9ZZ".to_string(),
                        town: "FIXTURE".to_string(),
                        ..PostalAddress::default()
                    },
                    lat,
                    lon,
                    classification: Classification {
                        code: "RD".to_string(),
                        description: "Residential Dwelling".to_string(),
                    },
                })
            }
        }
    }
}
