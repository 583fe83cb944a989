// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fare calculation.
//!
//! Prices are in Gambian dalasi (GMD): a fixed base fare plus per-kilometer
//! and per-minute rates, rounded up to the next 5-dalasi increment.

use serde::{Deserialize, Serialize};

/// Fare constants for one market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareSchedule {
    /// Flat amount charged for every ride (D 50)
    pub base_fare: f64,
    /// Rate per kilometer (D 15/km)
    pub per_km: f64,
    /// Rate per minute (D 5/min)
    pub per_minute: f64,
    /// Currency increment the total is rounded up to (D 5)
    pub rounding: f64,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            base_fare: 50.0,
            per_km: 15.0,
            per_minute: 5.0,
            rounding: 5.0,
        }
    }
}

impl FareSchedule {
    /// Price a trip of `distance_km` taking `duration_min`.
    ///
    /// Negative or non-finite inputs count as zero, so the result is always a
    /// non-negative multiple of `rounding` and never below the base fare.
    pub fn price(&self, distance_km: f64, duration_min: f64) -> f64 {
        let distance_km = sanitize(distance_km);
        let duration_min = sanitize(duration_min);

        let total = self.base_fare + distance_km * self.per_km + duration_min * self.per_minute;

        (total / self.rounding).ceil() * self.rounding
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Price with the default schedule.
pub fn calculate_price(distance_km: f64, duration_min: f64) -> f64 {
    FareSchedule::default().price(distance_km, duration_min)
}
