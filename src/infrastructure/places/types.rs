//! Wire types for the OS Places `uprn` endpoint.
//!
//! The service is loose about scalar types: identifiers and codes arrive as
//! JSON strings or numbers depending on the record, and optional parts may
//! be missing, `null` or `""`. Everything is normalized here so the rest of
//! the crate only sees [`ValidatedAddress`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::models::{Classification, LocationId, PostalAddress, ValidatedAddress};

/// Top-level response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub results: Vec<PlacesResult>,
}

impl PlacesResponse {
    /// The DPA record of the first result. Later results are never
    /// consulted, even when the first carries no DPA record.
    pub fn first_dpa(self) -> Option<DpaRecord> {
        self.results.into_iter().next().and_then(|result| result.dpa)
    }
}

/// One entry of `results`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacesResult {
    #[serde(rename = "DPA", default)]
    pub dpa: Option<DpaRecord>,
}

/// Delivery Point Address record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DpaRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub uprn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub udprn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub post_town: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dependent_locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub double_dependent_locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thoroughfare_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dependent_thoroughfare_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub building_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub building_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub_building_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_address_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub logical_status_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub classification_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub classification_code_description: Option<String>,
}

/// Why a DPA record was not turned into a validated address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not an approved, live, primary delivery point.
    NotDeliverable {
        postal_address_code: Option<String>,
        status: Option<String>,
        logical_status_code: Option<String>,
    },
    /// `LAT`/`LNG` missing or not finite.
    MissingCoordinates,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDeliverable {
                postal_address_code,
                status,
                logical_status_code,
            } => write!(
                f,
                "not deliverable (postal_address_code={}, status={}, logical_status_code={})",
                postal_address_code.as_deref().unwrap_or("-"),
                status.as_deref().unwrap_or("-"),
                logical_status_code.as_deref().unwrap_or("-"),
            ),
            Self::MissingCoordinates => f.write_str("missing coordinates"),
        }
    }
}

impl DpaRecord {
    /// Approved, currently active, primary delivery point.
    pub fn is_deliverable(&self) -> bool {
        self.postal_address_code.as_deref() == Some("D")
            && self.status.as_deref() == Some("APPROVED")
            && self.logical_status_code.as_deref() == Some("1")
    }

    /// Convert into a [`ValidatedAddress`].
    ///
    /// `requested` is used as the identifier when the record omits `UPRN`.
    pub fn into_validated(self, requested: &LocationId) -> Result<ValidatedAddress, Rejection> {
        if !self.is_deliverable() {
            return Err(Rejection::NotDeliverable {
                postal_address_code: self.postal_address_code,
                status: self.status,
                logical_status_code: self.logical_status_code,
            });
        }

        let (Some(lat), Some(lon)) = (self.lat, self.lng) else {
            return Err(Rejection::MissingCoordinates);
        };

        Ok(ValidatedAddress {
            uprn: self
                .uprn
                .map_or_else(|| requested.clone(), LocationId::new),
            address: PostalAddress {
                udprn: self.udprn,
                full: self.address.unwrap_or_default(),
                postcode: self.postcode.unwrap_or_default(),
                town: self.post_town.unwrap_or_default(),
                dependent_locality: self.dependent_locality,
                double_dependent_locality: self.double_dependent_locality,
                thoroughfare: self.thoroughfare_name,
                dependent_thoroughfare: self.dependent_thoroughfare_name,
                building_number: self.building_number,
                building_name: self.building_name,
                sub_building_name: self.sub_building_name,
            },
            lat,
            lon,
            classification: Classification {
                code: self.classification_code.unwrap_or_default(),
                description: self.classification_code_description.unwrap_or_default(),
            },
        })
    }
}

/// Accept a string, number or bool; `null` and `""` become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept a number or numeric string; anything non-finite becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}
