//! Polygon parsing and point-in-polygon queries for restricted regions.
//!
//! Regions arrive as serialized GeoJSON "Polygon" objects. They are parsed
//! once into a vertex ring and queried with the ray-casting (even-odd)
//! rule; points exactly on the boundary count as inside.

use serde::Deserialize;

/// Why a polygon encoding was rejected.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("polygon encoding is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("geometry type is {0:?}, expected \"Polygon\"")]
    NotAPolygon(String),
    #[error("polygon has no rings")]
    NoRings,
    #[error("outer ring is not closed (first vertex must equal last)")]
    OpenRing,
    #[error("outer ring has fewer than 3 distinct vertices")]
    TooFewVertices,
    #[error("outer ring is self-intersecting")]
    SelfIntersecting,
}

#[derive(Deserialize)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<[f64; 2]>>,
}

const VERTEX_EPSILON: f64 = 1e-9;

/// Parsed region geometry. Vertices are `[lon, lat]` pairs as in GeoJSON,
/// with the closing vertex dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGeometry {
    ring: Vec<[f64; 2]>,
}

impl ZoneGeometry {
    /// Parse a serialized GeoJSON "Polygon".
    ///
    /// Only the outer ring is considered; extra rings are ignored. The ring
    /// must be closed, carry at least 3 distinct vertices, and not
    /// self-intersect. Antimeridian crossings are not supported.
    pub fn parse(encoded: &str) -> Result<Self, GeometryError> {
        let polygon: GeoJsonPolygon = serde_json::from_str(encoded)?;
        if polygon.kind != "Polygon" {
            return Err(GeometryError::NotAPolygon(polygon.kind));
        }
        let outer = polygon.coordinates.first().ok_or(GeometryError::NoRings)?;
        if outer.len() < 4 {
            return Err(GeometryError::TooFewVertices);
        }

        let first = outer[0];
        let last = outer[outer.len() - 1];
        if !points_equal(first, last) {
            return Err(GeometryError::OpenRing);
        }

        // Drop the closing vertex; the ring wraps implicitly from here on.
        let mut ring: Vec<[f64; 2]> = outer[..outer.len() - 1].to_vec();
        ring.dedup_by(|a, b| points_equal(*a, *b));
        if ring.len() >= 2 && points_equal(ring[0], ring[ring.len() - 1]) {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(GeometryError::TooFewVertices);
        }
        if ring_self_intersects(&ring) {
            return Err(GeometryError::SelfIntersecting);
        }

        Ok(Self { ring })
    }

    /// Ray-casting point membership; boundary points are inside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let n = self.ring.len();

        for i in 0..n {
            let a = self.ring[i];
            let b = self.ring[(i + 1) % n];
            if point_on_segment([lon, lat], a, b) {
                return true;
            }
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let xi = self.ring[i][0];
            let yi = self.ring[i][1];
            let xj = self.ring[j][0];
            let yj = self.ring[j][1];

            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Deterministic (lat, lon, max-dimension-in-degrees) used by consumers
    /// to frame visualisations.
    pub fn centroid_and_extent(&self) -> (f64, f64, f64) {
        let n = self.ring.len() as f64;
        let (mut lon_sum, mut lat_sum) = (0.0, 0.0);
        let (mut lon_min, mut lon_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut lat_min, mut lat_max) = (f64::INFINITY, f64::NEG_INFINITY);

        for [lon, lat] in &self.ring {
            lon_sum += lon;
            lat_sum += lat;
            lon_min = lon_min.min(*lon);
            lon_max = lon_max.max(*lon);
            lat_min = lat_min.min(*lat);
            lat_max = lat_max.max(*lat);
        }

        let extent = (lon_max - lon_min).max(lat_max - lat_min);
        (lat_sum / n, lon_sum / n, extent)
    }

    /// Vertex count of the open ring.
    pub fn vertex_count(&self) -> usize {
        self.ring.len()
    }
}

fn points_equal(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).abs() < VERTEX_EPSILON && (a[1] - b[1]).abs() < VERTEX_EPSILON
}

fn point_on_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> bool {
    let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
    if cross.abs() > 1e-9 {
        return false;
    }
    let within_x = p[0] >= a[0].min(b[0]) - VERTEX_EPSILON && p[0] <= a[0].max(b[0]) + VERTEX_EPSILON;
    let within_y = p[1] >= a[1].min(b[1]) - VERTEX_EPSILON && p[1] <= a[1].max(b[1]) + VERTEX_EPSILON;
    within_x && within_y
}

/// Check every pair of non-adjacent edges for a proper crossing.
/// O(n^2) is fine at operator-drawn polygon sizes.
fn ring_self_intersects(ring: &[[f64; 2]]) -> bool {
    let n = ring.len();
    for i in 0..n {
        let a1 = ring[i];
        let a2 = ring[(i + 1) % n];
        for j in (i + 1)..n {
            // Skip adjacent edges (they share a vertex by construction).
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = ring[j];
            let b2 = ring[(j + 1) % n];
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn segments_cross(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn orientation(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    // The intrusion test zone: a 0.1 x 0.1 degree box.
    const ZONE: &str = r#"{"type":"Polygon","coordinates":[[[78.10,11.60],[78.20,11.60],[78.20,11.70],[78.10,11.70],[78.10,11.60]]]}"#;

    #[test]
    fn parses_closed_polygon() {
        let zone = ZoneGeometry::parse(ZONE).unwrap();
        assert_eq!(zone.vertex_count(), 4);
    }

    #[test]
    fn rejects_non_polygon_type() {
        let err = ZoneGeometry::parse(r#"{"type":"Point","coordinates":[[[0.0,0.0]]]}"#);
        assert!(matches!(err, Err(GeometryError::NotAPolygon(_))));
    }

    #[test]
    fn rejects_open_ring() {
        let open = r#"{"type":"Polygon","coordinates":[[[78.10,11.60],[78.20,11.60],[78.20,11.70],[78.10,11.70]]]}"#;
        assert!(matches!(
            ZoneGeometry::parse(open),
            Err(GeometryError::OpenRing)
        ));
    }

    #[test]
    fn rejects_degenerate_ring() {
        let line = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,1.0],[0.0,0.0]]]}"#;
        assert!(matches!(
            ZoneGeometry::parse(line),
            Err(GeometryError::TooFewVertices)
        ));
        let repeated = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[0.0,0.0],[1.0,1.0],[0.0,0.0]]]}"#;
        assert!(matches!(
            ZoneGeometry::parse(repeated),
            Err(GeometryError::TooFewVertices)
        ));
    }

    #[test]
    fn rejects_self_intersecting_ring() {
        // Bowtie: edges (0,0)-(1,1) and (1,0)-(0,1) cross.
        let bowtie = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,1.0],[1.0,0.0],[0.0,1.0],[0.0,0.0]]]}"#;
        assert!(matches!(
            ZoneGeometry::parse(bowtie),
            Err(GeometryError::SelfIntersecting)
        ));
    }

    #[test]
    fn contains_interior_point() {
        let zone = ZoneGeometry::parse(ZONE).unwrap();
        assert!(zone.contains(11.6052, 78.1202));
        assert!(!zone.contains(11.45, 77.85));
        assert!(!zone.contains(11.52, 78.08));
    }

    #[test]
    fn boundary_points_are_inside() {
        let zone = ZoneGeometry::parse(ZONE).unwrap();
        // On an edge and on a vertex.
        assert!(zone.contains(11.60, 78.15));
        assert!(zone.contains(11.60, 78.10));
    }

    #[test]
    fn extra_rings_are_ignored() {
        let with_hole = r#"{"type":"Polygon","coordinates":[[[78.10,11.60],[78.20,11.60],[78.20,11.70],[78.10,11.70],[78.10,11.60]],[[78.14,11.64],[78.16,11.64],[78.16,11.66],[78.14,11.66],[78.14,11.64]]]}"#;
        let zone = ZoneGeometry::parse(with_hole).unwrap();
        // A point inside the "hole" still counts: only the outer ring matters.
        assert!(zone.contains(11.65, 78.15));
    }

    #[test]
    fn centroid_is_deterministic() {
        let zone = ZoneGeometry::parse(ZONE).unwrap();
        let (lat, lon, extent) = zone.centroid_and_extent();
        assert!((lat - 11.65).abs() < 1e-9);
        assert!((lon - 78.15).abs() < 1e-9);
        assert!((extent - 0.1).abs() < 1e-9);
        assert_eq!(zone.centroid_and_extent(), zone.centroid_and_extent());
    }
}
