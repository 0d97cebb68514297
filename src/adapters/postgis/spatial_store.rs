//! PostGIS implementation of the spatial ports.
//!
//! Both tables are expected in the projected SRID (British National Grid by
//! default); input and output geometry is GeoJSON in WGS84.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::domain::models::{CandidateRef, ClippedRegion, DatabaseConfig, Geometry};
use crate::domain::ports::{CandidateSampler, SpatialError, SpatialIntersector};

/// True for a plain or schema-qualified SQL identifier such as
/// `built_up_areas` or `os.uprns`.
pub fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Table names used by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialTables {
    pub boundary_table: String,
    pub address_table: String,
    pub projected_srid: i32,
}

impl Default for SpatialTables {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for SpatialTables {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            boundary_table: config.boundary_table.clone(),
            address_table: config.address_table.clone(),
            projected_srid: config.projected_srid,
        }
    }
}

impl SpatialTables {
    fn validate(&self) -> Result<(), SpatialError> {
        for table in [&self.boundary_table, &self.address_table] {
            if !is_sql_identifier(table) {
                return Err(SpatialError::Configuration(format!(
                    "invalid table name {table:?}"
                )));
            }
        }
        if self.projected_srid <= 0 {
            return Err(SpatialError::Configuration(format!(
                "invalid SRID {}",
                self.projected_srid
            )));
        }
        Ok(())
    }

    /// `$1` input GeoJSON, `$2` projected SRID.
    fn intersect_sql(&self) -> String {
        format!(
            r"WITH input AS (
    SELECT ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON($1), 4326), $2) AS g
),
clipped AS (
    SELECT ST_CollectionExtract(ST_Intersection(b.geom, i.g), 3) AS g
    FROM {boundary} b
    CROSS JOIN input i
    WHERE ST_Intersects(b.geom, i.g)
)
SELECT ST_AsGeoJSON(ST_Transform(g, 4326)) AS clipped_geom
FROM clipped
WHERE NOT ST_IsEmpty(g)",
            boundary = self.boundary_table
        )
    }

    /// `$1` region GeoJSON, `$2` projected SRID, `$3` limit.
    fn sample_sql(&self) -> String {
        format!(
            r"WITH region AS (
    SELECT ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON($1), 4326), $2) AS g
),
candidates AS (
    SELECT a.uprn::text AS uprn, ST_Transform(a.geom, 4326) AS g
    FROM {addresses} a
    CROSS JOIN region r
    WHERE ST_Within(a.geom, r.g)
    ORDER BY RANDOM()
    LIMIT $3
)
SELECT uprn, ST_Y(g) AS lat, ST_X(g) AS lon FROM candidates",
            addresses = self.address_table
        )
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    uprn: String,
    lat: f64,
    lon: f64,
}

impl From<CandidateRow> for CandidateRef {
    fn from(row: CandidateRow) -> Self {
        Self::new(row.uprn, row.lat, row.lon)
    }
}

/// PostGIS-backed [`SpatialIntersector`] and [`CandidateSampler`].
#[derive(Clone)]
pub struct PostgisSpatialStore {
    pool: PgPool,
    tables: SpatialTables,
}

impl PostgisSpatialStore {
    pub fn new(pool: PgPool, tables: SpatialTables) -> Result<Self, SpatialError> {
        tables.validate()?;
        Ok(Self { pool, tables })
    }
}

#[async_trait]
impl SpatialIntersector for PostgisSpatialStore {
    async fn intersect(&self, polygon: &Geometry) -> Result<Vec<ClippedRegion>, SpatialError> {
        let rows: Vec<String> = sqlx::query_scalar(&self.tables.intersect_sql())
            .bind(polygon.to_geojson_string())
            .bind(self.tables.projected_srid)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SpatialError::Query(e.to_string()))?;

        let regions = rows
            .iter()
            .enumerate()
            .map(|(index, geojson)| {
                Geometry::from_geojson_str(geojson)
                    .map(|geometry| ClippedRegion { index, geometry })
                    .map_err(|e| SpatialError::InvalidGeometry(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(regions = regions.len(), "Intersected polygon with boundaries");
        Ok(regions)
    }
}

#[async_trait]
impl CandidateSampler for PostgisSpatialStore {
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(count).unwrap_or(i64::MAX);

        let rows: Vec<CandidateRow> = sqlx::query_as(&self.tables.sample_sql())
            .bind(region.geometry.to_geojson_string())
            .bind(self.tables.projected_srid)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SpatialError::Query(e.to_string()))?;

        debug!(region = region.index, requested = count, got = rows.len(), "Sampled candidates");
        Ok(rows.into_iter().map(CandidateRef::from).collect())
    }
}
