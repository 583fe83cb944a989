// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route geometry: encoded polylines, great-circle distance, map bounds.

use crate::models::Coordinates;
use geo::{BoundingRect, LineString};

/// Google encoded polylines use 5 decimal places.
pub const POLYLINE_PRECISION: u32 = 5;

/// Mean Earth radius used for client-side estimates.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Decode an encoded polyline into an ordered list of coordinates.
///
/// Any malformed chunk or out-of-range point rejects the whole string.
pub fn decode_route(encoded: &str) -> Result<Vec<Coordinates>, GeometryError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| GeometryError::Polyline(e.to_string()))?;

    let points: Vec<Coordinates> = line.coords().copied().map(Coordinates::from).collect();

    // Belt and braces: the decoder range-checks, but never hand out garbage
    if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
        return Err(GeometryError::OutOfRange(*bad));
    }

    Ok(points)
}

/// Encode coordinates as a Google polyline.
pub fn encode_route(points: &[Coordinates]) -> Result<String, GeometryError> {
    polyline::encode_coordinates(
        points.iter().copied().map(geo::Coord::<f64>::from),
        POLYLINE_PRECISION,
    )
    .map_err(|e| GeometryError::Polyline(e.to_string()))
}

/// Great-circle distance between two points in kilometers (Haversine).
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Total length of a polyline in kilometers.
pub fn path_length_km(points: &[Coordinates]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// South-west / north-east corners of a route, for fitting the map camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteBounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl RouteBounds {
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }
}

/// Bounding box of the given points, or `None` for an empty route.
pub fn route_bounds(points: &[Coordinates]) -> Option<RouteBounds> {
    let line = to_line_string(points);
    line.bounding_rect().map(|rect| RouteBounds {
        south_west: rect.min().into(),
        north_east: rect.max().into(),
    })
}

/// GeoJSON `LineString` geometry for the map layer.
pub fn route_geojson(points: &[Coordinates]) -> geojson::Geometry {
    let line = to_line_string(points);
    geojson::Geometry::new(geojson::Value::from(&line))
}

fn to_line_string(points: &[Coordinates]) -> LineString<f64> {
    points.iter().copied().map(geo::Coord::<f64>::from).collect()
}

/// Errors from geometry operations.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Failed to decode polyline: {0}")]
    Polyline(String),

    #[error("Coordinate out of range: {0:?}")]
    OutOfRange(Coordinates),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from the Google polyline algorithm documentation
    const GOOGLE_EXAMPLE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_decode_google_example() {
        let points = decode_route(GOOGLE_EXAMPLE).unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(points.len(), expected.len());
        for (p, (lat, lng)) in points.iter().zip(expected) {
            assert_close(p.latitude, lat);
            assert_close(p.longitude, lng);
        }
    }

    #[test]
    fn test_encode_decoded_example_gives_same_string() {
        let points = decode_route(GOOGLE_EXAMPLE).unwrap();
        assert_eq!(encode_route(&points).unwrap(), GOOGLE_EXAMPLE);
    }

    #[test]
    fn test_empty_polyline_is_empty_route() {
        assert!(decode_route("").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_polyline_is_rejected() {
        // Chunk with continuation bit set and nothing after it
        assert!(decode_route("_p~iF~ps|U_").is_err());
    }

    #[test]
    fn test_haversine_identity_and_symmetry() {
        let banjul = Coordinates::new(13.4549, -16.5790);
        let dakar = Coordinates::new(14.7167, -17.4677);
        assert_eq!(haversine_km(banjul, banjul), 0.0);
        assert_eq!(haversine_km(banjul, dakar), haversine_km(dakar, banjul));
        // Roughly 167 km as the crow flies
        let d = haversine_km(banjul, dakar);
        assert!(d > 160.0 && d < 175.0, "distance {}", d);
    }

    #[test]
    fn test_bounds_and_center() {
        let points = decode_route(GOOGLE_EXAMPLE).unwrap();
        let bounds = route_bounds(&points).unwrap();
        assert_close(bounds.south_west.latitude, 38.5);
        assert_close(bounds.north_east.latitude, 43.252);
        assert_close(bounds.south_west.longitude, -126.453);
        assert_close(bounds.north_east.longitude, -120.2);
        assert_close(bounds.center().latitude, (38.5 + 43.252) / 2.0);
        assert!(route_bounds(&[]).is_none());
    }

    #[test]
    fn test_geojson_line_string() {
        let points = decode_route(GOOGLE_EXAMPLE).unwrap();
        let geometry = route_geojson(&points);
        match geometry.value {
            geojson::Value::LineString(coords) => {
                assert_eq!(coords.len(), 3);
                // GeoJSON positions are [lng, lat]
                assert_close(coords[0][0], -120.2);
                assert_close(coords[0][1], 38.5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }
}
