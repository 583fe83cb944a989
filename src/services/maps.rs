// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Maps web service client.
//!
//! Handles:
//! - Directions between two coordinates (distance, duration, overview polyline)
//! - Forward geocoding (address -> coordinates)
//! - Reverse geocoding (coordinates -> formatted address)
//!
//! Every endpoint reports a provider status string in the body, even on
//! HTTP 200. Anything other than `OK` is an error; there is no retry.

use crate::config::Config;
use crate::models::Coordinates;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Status values returned by the Maps web services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapsStatus {
    Ok,
    ZeroResults,
    NotFound,
    RequestDenied,
    OverQueryLimit,
    OverDailyLimit,
    InvalidRequest,
    MaxWaypointsExceeded,
    MaxRouteLengthExceeded,
    UnknownError,
    #[serde(other)]
    Unrecognized,
}

impl MapsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapsStatus::Ok => "OK",
            MapsStatus::ZeroResults => "ZERO_RESULTS",
            MapsStatus::NotFound => "NOT_FOUND",
            MapsStatus::RequestDenied => "REQUEST_DENIED",
            MapsStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            MapsStatus::OverDailyLimit => "OVER_DAILY_LIMIT",
            MapsStatus::InvalidRequest => "INVALID_REQUEST",
            MapsStatus::MaxWaypointsExceeded => "MAX_WAYPOINTS_EXCEEDED",
            MapsStatus::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
            MapsStatus::UnknownError => "UNKNOWN_ERROR",
            MapsStatus::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// Statuses caused by project setup (key restrictions, disabled API,
    /// billing) rather than by the request itself.
    pub fn is_configuration_problem(&self) -> bool {
        matches!(
            self,
            MapsStatus::RequestDenied | MapsStatus::OverDailyLimit
        )
    }
}

impl std::fmt::Display for MapsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the Maps web services.
#[derive(Debug, thiserror::Error)]
pub enum MapsError {
    #[error("Maps request failed: {0}")]
    Transport(String),

    #[error("Maps returned status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status {
        status: MapsStatus,
        message: Option<String>,
    },

    #[error("Maps response could not be parsed: {0}")]
    Parse(String),
}

impl MapsError {
    pub fn status(&self) -> Option<MapsStatus> {
        match self {
            MapsError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<MapsError> for crate::error::AppError {
    fn from(err: MapsError) -> Self {
        crate::error::AppError::MapsApi(crate::services::route::RouteError::Maps(err))
    }
}

/// Google Maps client.
#[derive(Clone)]
pub struct MapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapsClient {
    /// Create a new client against `base_url` (e.g. `https://maps.googleapis.com/maps/api`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.maps_base_url.clone(), config.maps_api_key.clone())
    }

    /// Get driving directions between two points.
    ///
    /// Succeeds only with status `OK` and at least one route.
    pub async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DirectionsResponse, MapsError> {
        tracing::debug!(?origin, ?destination, "Requesting directions");

        let url = format!("{}/directions/json", self.base_url);
        let response: DirectionsResponse = self
            .get_json(
                &url,
                &[
                    ("origin", origin.to_query_param()),
                    ("destination", destination.to_query_param()),
                ],
            )
            .await?;

        check_status(response.status, response.error_message.as_deref(), "directions")?;

        if response.routes.is_empty() {
            return Err(MapsError::Status {
                status: MapsStatus::ZeroResults,
                message: Some("no routes in response".to_string()),
            });
        }

        tracing::debug!(routes = response.routes.len(), "Directions received");
        Ok(response)
    }

    /// Geocode a free-form address to coordinates (first result).
    pub async fn geocode_address(&self, address: &str) -> Result<Coordinates, MapsError> {
        let url = format!("{}/geocode/json", self.base_url);
        let response: GeocodeResponse = self
            .get_json(&url, &[("address", address.to_string())])
            .await?;

        check_status(response.status, response.error_message.as_deref(), "geocode")?;

        response
            .results
            .first()
            .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))
            .ok_or(MapsError::Status {
                status: MapsStatus::ZeroResults,
                message: None,
            })
    }

    /// Reverse geocode coordinates to a formatted address (first result).
    pub async fn reverse_geocode(&self, coords: Coordinates) -> Result<String, MapsError> {
        let url = format!("{}/geocode/json", self.base_url);
        let response: GeocodeResponse = self
            .get_json(&url, &[("latlng", coords.to_query_param())])
            .await?;

        check_status(
            response.status,
            response.error_message.as_deref(),
            "reverse_geocode",
        )?;

        response
            .results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
            .ok_or(MapsError::Status {
                status: MapsStatus::ZeroResults,
                message: None,
            })
    }

    /// GET with query parameters plus the API key, parsed as JSON.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, MapsError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| MapsError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MapsError::Transport(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| MapsError::Parse(e.without_url().to_string()))
    }
}

/// Map a provider status to `Ok(())` or an error, logging as appropriate.
pub fn check_status(
    status: MapsStatus,
    error_message: Option<&str>,
    endpoint: &'static str,
) -> Result<(), MapsError> {
    match status {
        MapsStatus::Ok => Ok(()),
        s if s.is_configuration_problem() => {
            tracing::error!(
                endpoint,
                status = %s,
                message = error_message.unwrap_or("none"),
                "Maps request denied; check that the API is enabled for this key"
            );
            Err(MapsError::Status {
                status: s,
                message: error_message.map(str::to_string),
            })
        }
        s => {
            tracing::warn!(
                endpoint,
                status = %s,
                message = error_message.unwrap_or("none"),
                "Maps request returned no usable result"
            );
            Err(MapsError::Status {
                status: s,
                message: error_message.map(str::to_string),
            })
        }
    }
}

// ─── Response types ──────────────────────────────────────────────

/// Directions API response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: MapsStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
    #[serde(default)]
    pub overview_polyline: Option<EncodedPolyline>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsLeg {
    pub distance: TextValue,
    pub duration: TextValue,
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
}

/// `{ "text": "5.4 km", "value": 5432 }` pairs (meters / seconds).
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodedPolyline {
    #[serde(default)]
    pub points: Option<String>,
}

/// Geocoding API response.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: MapsStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: GeocodeGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeGeometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}
