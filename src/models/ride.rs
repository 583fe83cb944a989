// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride document model and backend status machine.

use crate::models::{Address, Coordinates};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Backend ride status, written by this client (`pending`, `cancelled`) and
/// by the driver side (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// Statuses that count as the user's active ride.
    pub const ACTIVE: [RideStatus; 3] = [
        RideStatus::Pending,
        RideStatus::Accepted,
        RideStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RideStatus::Pending),
            "accepted" => Some(RideStatus::Accepted),
            "in_progress" => Some(RideStatus::InProgress),
            "completed" => Some(RideStatus::Completed),
            "cancelled" => Some(RideStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Field path of the phase timestamp written when entering this status.
    pub fn timestamp_field(&self) -> Option<&'static str> {
        match self {
            RideStatus::Pending => None,
            RideStatus::Accepted => Some("timestamps.accepted"),
            RideStatus::InProgress => Some("timestamps.started"),
            RideStatus::Completed => Some("timestamps.completed"),
            RideStatus::Cancelled => Some("timestamps.cancelled"),
        }
    }

    /// Forward-only lifecycle. Cancellation is allowed from any active status.
    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Accepted, InProgress)
                | (InProgress, Completed)
                | (Pending | Accepted | InProgress, Cancelled)
        )
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum RideType {
    #[default]
    Instant,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

/// Phase timestamps (RFC 3339), all stamped by the server. `created` is
/// empty until the insert is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct RideTimestamps {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<String>,
}

impl RideTimestamps {
    fn stamp(&mut self, status: RideStatus, now: &str) {
        let slot = match status {
            RideStatus::Pending => return,
            RideStatus::Accepted => &mut self.accepted,
            RideStatus::InProgress => &mut self.started,
            RideStatus::Completed => &mut self.completed,
            RideStatus::Cancelled => &mut self.cancelled,
        };
        *slot = Some(now.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct RideRatings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_comment: Option<String>,
}

/// Ride document stored at `rides/{ride_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Ride {
    /// Document ID, also stored in the document. Older documents may lack
    /// it; readers fill it from the document name.
    #[serde(default)]
    pub ride_id: String,
    /// Passenger uid
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub status: RideStatus,
    #[serde(rename = "type", default)]
    pub ride_type: RideType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    pub pickup: Address,
    pub destination: Address,
    /// Route distance in kilometers
    pub distance: f64,
    /// Route duration in minutes
    pub duration: f64,
    /// Quoted fare
    pub price: f64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Live driver position, written by the driver app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<RideRatings>,
    pub timestamps: RideTimestamps,
}

impl Ride {
    /// Move to `next`, stamping the phase timestamp.
    ///
    /// Returns `false` (and leaves the ride untouched) for transitions the
    /// lifecycle does not allow.
    pub fn advance(&mut self, next: RideStatus, now: &str) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.timestamps.stamp(next, now);
        true
    }
}

/// Fields a passenger supplies when ordering a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRide {
    pub pickup: Address,
    pub destination: Address,
    #[validate(range(min = 0.0))]
    pub distance: f64,
    #[validate(range(min = 0.0))]
    pub duration: f64,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub ride_type: RideType,
    pub scheduled_time: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl NewRide {
    /// Build the pending ride document for `user_id`.
    pub fn into_ride(self, ride_id: String, user_id: String, now: &str) -> Ride {
        Ride {
            ride_id,
            user_id,
            driver_id: None,
            status: RideStatus::Pending,
            ride_type: self.ride_type,
            scheduled_time: self.scheduled_time,
            pickup: self.pickup.relabel("Pickup"),
            destination: self.destination.relabel("Destination"),
            distance: self.distance,
            duration: self.duration,
            price: self.price,
            payment_method: self.payment_method.unwrap_or_default(),
            driver_location: None,
            ratings: None,
            timestamps: RideTimestamps {
                created: now.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Passenger rating for a completed ride.
#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
pub struct RatingInput {
    #[validate(range(min = 1, max = 5))]
    pub stars: u8,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}
