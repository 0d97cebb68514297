//! GeoJSON polygon geometry in WGS84 longitude/latitude.
//!
//! Only the two polygonal GeoJSON types are accepted. Positions are strictly
//! two-dimensional `[longitude, latitude]` pairs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

/// A closed linear ring. The first and last positions are identical.
pub type Ring = Vec<Position>;

/// Errors raised when a geometry fails validation or parsing.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Polygon has no rings")]
    NoRings,

    #[error("Ring {ring} has {len} positions, at least 4 are required")]
    RingTooShort { ring: usize, len: usize },

    #[error("Ring {ring} is not closed")]
    RingNotClosed { ring: usize },

    #[error("Position ({lon}, {lat}) is outside WGS84 bounds")]
    OutOfRange { lon: f64, lat: f64 },

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

/// A polygonal GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Outer ring followed by any holes.
    Polygon(Vec<Ring>),
    /// Several polygons, each an outer ring plus holes.
    MultiPolygon(Vec<Vec<Ring>>),
}

/// GeoJSON `Feature` wrapper, accepted when reading geometry files.
#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// True if the two boxes share any area or edge.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

impl Geometry {
    /// Parse a bare GeoJSON geometry or a `Feature` carrying one.
    pub fn from_geojson_str(input: &str) -> Result<Self, GeometryError> {
        let value: serde_json::Value =
            serde_json::from_str(input).map_err(|e| GeometryError::InvalidGeoJson(e.to_string()))?;

        let parsed = if value.get("type").and_then(serde_json::Value::as_str) == Some("Feature") {
            serde_json::from_value::<Feature>(value).map(|f| f.geometry)
        } else {
            serde_json::from_value::<Self>(value)
        };

        parsed.map_err(|e| GeometryError::InvalidGeoJson(e.to_string()))
    }

    /// Serialize back to a GeoJSON string.
    pub fn to_geojson_string(&self) -> String {
        // Serializing f64 arrays and a tagged enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Iterate every ring of every polygon.
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(rings.iter()),
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().flatten()),
        }
    }

    /// Check ring structure and coordinate bounds.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let polygons: Vec<&Vec<Ring>> = match self {
            Self::Polygon(rings) => vec![rings],
            Self::MultiPolygon(polygons) => polygons.iter().collect(),
        };

        if polygons.is_empty() || polygons.iter().any(|rings| rings.is_empty()) {
            return Err(GeometryError::NoRings);
        }

        for (ring_index, ring) in self.rings().enumerate() {
            if ring.len() < 4 {
                return Err(GeometryError::RingTooShort {
                    ring: ring_index,
                    len: ring.len(),
                });
            }
            if ring.first() != ring.last() {
                return Err(GeometryError::RingNotClosed { ring: ring_index });
            }
            for &[lon, lat] in ring {
                let in_range = lon.is_finite()
                    && lat.is_finite()
                    && (-180.0..=180.0).contains(&lon)
                    && (-90.0..=90.0).contains(&lat);
                if !in_range {
                    return Err(GeometryError::OutOfRange { lon, lat });
                }
            }
        }

        Ok(())
    }

    /// True if the point lies inside some polygon's outer ring and outside
    /// that polygon's holes. Points exactly on an edge may go either way.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        match self {
            Self::Polygon(rings) => polygon_contains(rings, lon, lat),
            Self::MultiPolygon(polygons) => polygons
                .iter()
                .any(|rings| polygon_contains(rings, lon, lat)),
        }
    }

    /// Bounding box over all rings, or `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut positions = self.rings().flatten();
        let &[lon, lat] = positions.next()?;
        let init = BoundingBox {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        };

        Some(positions.fold(init, |bbox, &[lon, lat]| BoundingBox {
            min_lon: bbox.min_lon.min(lon),
            min_lat: bbox.min_lat.min(lat),
            max_lon: bbox.max_lon.max(lon),
            max_lat: bbox.max_lat.max(lat),
        }))
    }
}

/// Outer ring minus holes. An empty ring list contains nothing.
fn polygon_contains(rings: &[Ring], lon: f64, lat: f64) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    ring_contains(outer, lon, lat) && !holes.iter().any(|hole| ring_contains(hole, lon, lat))
}

/// Even-odd crossing count of a ray cast towards increasing longitude.
fn ring_contains(ring: &[Position], lon: f64, lat: f64) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let [x1, y1] = edge[0];
        let [x2, y2] = edge[1];
        if (y1 > lat) != (y2 > lat) && lon < (x2 - x1) * (lat - y1) / (y2 - y1) + x1 {
            inside = !inside;
        }
    }
    inside
}

/// The intersection of a job's polygon with one urbanized-area boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClippedRegion {
    /// Position of this region in the intersector's output.
    pub index: usize,
    /// Clipped geometry in WGS84.
    pub geometry: Geometry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            [min, min],
            [max, min],
            [max, max],
            [min, max],
            [min, min],
        ]])
    }

    #[test]
    fn test_parse_bare_polygon() {
        let json = r#"{"type":"Polygon","coordinates":[[[-0.15,51.65],[-0.11,51.65],[-0.10,51.63],[-0.15,51.65]]]}"#;
        let geometry = Geometry::from_geojson_str(json).expect("polygon should parse");
        assert!(matches!(geometry, Geometry::Polygon(ref rings) if rings[0].len() == 4));
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_parse_feature_wrapper() {
        let json = r#"{"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}}"#;
        let geometry = Geometry::from_geojson_str(json).expect("feature should parse");
        assert!(matches!(geometry, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_parse_rejects_point() {
        let json = r#"{"type":"Point","coordinates":[0,0]}"#;
        assert!(matches!(
            Geometry::from_geojson_str(json),
            Err(GeometryError::InvalidGeoJson(_))
        ));
    }

    #[test]
    fn test_round_trip_matches_geojson_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&square(0.0, 1.0).to_geojson_string()).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"][0][2][0], 1.0);
    }

    #[test]
    fn test_validate_open_ring() {
        let geometry = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        assert_eq!(geometry.validate(), Err(GeometryError::RingNotClosed { ring: 0 }));
    }

    #[test]
    fn test_validate_short_ring() {
        let geometry = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]);
        assert_eq!(
            geometry.validate(),
            Err(GeometryError::RingTooShort { ring: 0, len: 3 })
        );
    }

    #[test]
    fn test_validate_out_of_range() {
        let geometry = square(0.0, 95.0);
        assert!(matches!(geometry.validate(), Err(GeometryError::OutOfRange { .. })));
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(Geometry::Polygon(vec![]).validate(), Err(GeometryError::NoRings));
        assert_eq!(Geometry::MultiPolygon(vec![]).validate(), Err(GeometryError::NoRings));
    }

    #[test]
    fn test_bounding_box() {
        let bbox = Geometry::MultiPolygon(vec![
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
            vec![vec![[-2.0, 3.0], [-1.0, 3.0], [-1.0, 4.0], [-2.0, 3.0]]],
        ])
        .bounding_box()
        .unwrap();

        assert_eq!(bbox.min_lon, -2.0);
        assert_eq!(bbox.max_lat, 4.0);
        assert!(bbox.intersects(&square(0.5, 0.6).bounding_box().unwrap()));
        assert!(!bbox.intersects(&square(10.0, 11.0).bounding_box().unwrap()));
    }

    #[test]
    fn test_contains_point() {
        let geometry = square(0.0, 10.0);
        assert!(geometry.contains_point(0.5, 0.5));
        assert!(geometry.contains_point(9.0, 9.0));
        assert!(!geometry.contains_point(10.5, 5.0));
        assert!(!geometry.contains_point(-0.5, 5.0));
    }

    #[test]
    fn test_contains_point_concave_and_holes() {
        // L-shape: the notch at the top right lies inside the bounding box only.
        let l_shape = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
            [0.0, 0.0],
        ]]);
        assert!(l_shape.contains_point(0.5, 1.5));
        assert!(l_shape.contains_point(1.5, 0.5));
        assert!(!l_shape.contains_point(1.5, 1.5));

        let Geometry::Polygon(mut rings) = square(0.0, 10.0) else {
            unreachable!()
        };
        let Geometry::Polygon(hole) = square(4.0, 6.0) else {
            unreachable!()
        };
        rings.extend(hole);
        let holed = Geometry::Polygon(rings);
        assert!(!holed.contains_point(5.0, 5.0));
        assert!(holed.contains_point(2.0, 2.0));
    }

    #[test]
    fn test_contains_point_multi_polygon() {
        let Geometry::Polygon(first) = square(0.0, 1.0) else {
            unreachable!()
        };
        let Geometry::Polygon(second) = square(40.0, 41.0) else {
            unreachable!()
        };
        let geometry = Geometry::MultiPolygon(vec![first, second]);

        assert!(geometry.contains_point(0.5, 0.5));
        assert!(geometry.contains_point(40.5, 40.5));
        assert!(!geometry.contains_point(20.0, 20.0));
        assert!(!Geometry::MultiPolygon(vec![]).contains_point(0.5, 0.5));
    }
}
