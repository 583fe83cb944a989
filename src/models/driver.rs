// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Driver profile, read-only from the rider app.

use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<u16>,
    pub color: String,
    pub license_plate: String,
}

/// Driver document stored at `drivers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Driver {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_photo: Option<String>,
    /// Average rating (0-5)
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_rides: u32,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub current_location: Option<Coordinates>,
    pub vehicle: Vehicle,
}

impl Driver {
    /// Short vehicle description, e.g. "Toyota Corolla • ABC 123".
    pub fn vehicle_summary(&self) -> String {
        format!(
            "{} {} \u{2022} {}",
            self.vehicle.make, self.vehicle.model, self.vehicle.license_plate
        )
    }
}
