// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coordinates and labelled addresses.

use serde::{Deserialize, Serialize, Serializer};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A WGS84 latitude/longitude pair in degrees.
///
/// Stored in Firestore as a native GeoPoint; other formats see a plain
/// `{latitude, longitude}` object.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `lat,lng` as expected by the Maps web services.
    pub fn to_query_param(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        firestore::FirestoreLatLng(firestore::FirestoreGeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        })
        .serialize(serializer)
    }
}

impl From<geo::Coord<f64>> for Coordinates {
    fn from(coord: geo::Coord<f64>) -> Self {
        // geo stores (x, y) = (longitude, latitude)
        Self::new(coord.y, coord.x)
    }
}

impl From<Coordinates> for geo::Coord<f64> {
    fn from(c: Coordinates) -> Self {
        geo::coord! { x: c.longitude, y: c.latitude }
    }
}

impl From<Coordinates> for geo::Point<f64> {
    fn from(c: Coordinates) -> Self {
        geo::Point::new(c.longitude, c.latitude)
    }
}

/// A labelled place: saved home/office/favorite, or a ride endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Address {
    /// Display label ("Home", "Pickup", "Gym", ...)
    pub label: String,
    /// Formatted street address
    pub address: String,
    pub coords: Coordinates,
}

impl Address {
    pub fn new(label: impl Into<String>, address: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
            coords,
        }
    }

    /// Same place, relabelled (e.g. as the ride's "Pickup").
    pub fn relabel(&self, label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinates::new(13.45, -16.58).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_geo_coord_axis_order() {
        let c = Coordinates::new(13.45, -16.58);
        let coord: geo::Coord<f64> = c.into();
        assert_eq!(coord.x, -16.58);
        assert_eq!(coord.y, 13.45);
        assert_eq!(Coordinates::from(coord), c);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(
            Coordinates::new(13.45, -16.58).to_query_param(),
            "13.45,-16.58"
        );
    }

    #[test]
    fn test_json_shape_is_plain_object() {
        let json = serde_json::to_value(Coordinates::new(13.45, -16.58)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"latitude": 13.45, "longitude": -16.58})
        );
    }

    #[test]
    fn test_firestore_stores_geopoint() {
        use gcloud_sdk::google::firestore::v1::value::ValueType;

        let home = Address::new("Home", "Kotu Layout", Coordinates::new(13.46, -16.70));
        let doc = firestore::FirestoreDb::serialize_to_doc("users/uid-1", &home).unwrap();
        match doc.fields.get("coords").and_then(|v| v.value_type.as_ref()) {
            Some(ValueType::GeoPointValue(point)) => {
                assert_eq!(point.latitude, 13.46);
                assert_eq!(point.longitude, -16.70);
            }
            other => panic!("expected a GeoPoint, got {:?}", other),
        }

        let back: Address = firestore::FirestoreDb::deserialize_doc_to(&doc).unwrap();
        assert_eq!(back, home);
    }
}
