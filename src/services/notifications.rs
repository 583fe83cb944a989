// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Foreground push message handling.
//!
//! Device registration and topic subscription happen in the platform shell;
//! this module only names topics and turns incoming payloads into alerts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Broadcast topic every signed-in rider subscribes to.
pub const BROADCAST_TOPIC: &str = "all_users";

const DEFAULT_TITLE: &str = "New Notification";

/// Per-user topic name.
pub fn user_topic(uid: &str) -> String {
    format!("user_{}", uid)
}

/// Topics a signed-in user subscribes to.
pub fn topics_for(uid: &str) -> [String; 2] {
    [user_topic(uid), BROADCAST_TOPIC.to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum NotificationType {
    RideAccepted,
    DriverArrived,
    TripStarted,
    TripCompleted,
    RideCancelled,
}

impl NotificationType {
    fn default_title(&self) -> &'static str {
        match self {
            NotificationType::RideAccepted => "Ride Accepted",
            NotificationType::DriverArrived => "Driver Arrived",
            NotificationType::TripStarted => "Trip Started",
            NotificationType::TripCompleted => "Trip Completed",
            NotificationType::RideCancelled => "Ride Cancelled",
        }
    }
}

/// Ride payload carried in a message's data map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct RideNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub ride_id: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Message delivered while the app is in the foreground.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForegroundMessage {
    #[serde(default)]
    pub notification: Option<NotificationContent>,
    /// FCM data values are always strings
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Alert to show for a foreground message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct InAppAlert {
    pub title: String,
    pub body: String,
}

impl ForegroundMessage {
    /// Typed ride payload, if the data map carries one.
    pub fn ride_notification(&self) -> Option<RideNotification> {
        if !self.data.contains_key("type") {
            return None;
        }
        let value = serde_json::to_value(&self.data).ok()?;
        match serde_json::from_value(value) {
            Ok(notification) => Some(notification),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed ride notification payload");
                None
            }
        }
    }

    pub fn to_alert(&self) -> InAppAlert {
        let content = self.notification.clone().unwrap_or_default();
        let title = content.title.filter(|t| !t.is_empty()).unwrap_or_else(|| {
            self.ride_notification()
                .map(|n| n.kind.default_title().to_string())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string())
        });
        InAppAlert {
            title,
            body: content.body.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        assert_eq!(topics_for("abc"), ["user_abc".to_string(), "all_users".to_string()]);
    }

    #[test]
    fn test_alert_defaults() {
        let message = ForegroundMessage::default();
        assert_eq!(
            message.to_alert(),
            InAppAlert {
                title: "New Notification".to_string(),
                body: String::new(),
            }
        );
    }

    #[test]
    fn test_ride_payload() {
        let message: ForegroundMessage = serde_json::from_value(serde_json::json!({
            "notification": {"body": "Modou is on the way"},
            "data": {"type": "ride_accepted", "rideId": "r1", "driverName": "Modou"}
        }))
        .unwrap();

        let ride = message.ride_notification().unwrap();
        assert_eq!(ride.kind, NotificationType::RideAccepted);
        assert_eq!(ride.ride_id, "r1");
        assert_eq!(ride.driver_name.as_deref(), Some("Modou"));

        let alert = message.to_alert();
        assert_eq!(alert.title, "Ride Accepted");
        assert_eq!(alert.body, "Modou is on the way");
    }

    #[test]
    fn test_unknown_type_is_not_a_ride_payload() {
        let message: ForegroundMessage = serde_json::from_value(serde_json::json!({
            "notification": {"title": "Promo", "body": "20% off"},
            "data": {"type": "promo"}
        }))
        .unwrap();
        assert!(message.ride_notification().is_none());
        assert_eq!(message.to_alert().title, "Promo");
    }
}
