// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route quoting: directions + polyline + fare.
//!
//! A quote is all-or-nothing. Any failure along the way (transport, provider
//! status, missing or malformed geometry) yields an error and no partial
//! result.

use crate::models::Coordinates;
use crate::services::fare::FareSchedule;
use crate::services::geometry::{self, GeometryError, RouteBounds};
use crate::services::maps::{DirectionsResponse, MapsClient, MapsError};
use async_trait::async_trait;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Average urban speed assumed for offline estimates.
const ESTIMATE_SPEED_KMH: f64 = 25.0;

/// Distance, duration, geometry and price of a trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct RouteQuote {
    /// Kilometers
    pub distance: f64,
    /// Minutes
    pub duration: f64,
    /// Ordered route coordinates for drawing
    pub route: Vec<Coordinates>,
    /// Fare in dalasi
    pub price: f64,
}

impl RouteQuote {
    /// Build a quote from a Directions response (first route, first leg).
    pub fn from_directions(
        response: &DirectionsResponse,
        fare: &FareSchedule,
    ) -> Result<Self, RouteError> {
        let route = response.routes.first().ok_or(RouteError::NoRoute)?;
        let leg = route.legs.first().ok_or(RouteError::NoRoute)?;

        let distance = leg.distance.value / 1000.0; // meters -> km
        let duration = leg.duration.value / 60.0; // seconds -> minutes

        let encoded = route
            .overview_polyline
            .as_ref()
            .and_then(|p| p.points.as_deref())
            .ok_or(RouteError::MissingPolyline)?;

        let points = geometry::decode_route(encoded)?;
        if points.is_empty() {
            tracing::warn!(summary = %route.summary, "Decoded route has no points");
        }

        let price = fare.price(distance, duration);

        tracing::debug!(
            distance_km = distance,
            duration_min = duration,
            points = points.len(),
            price,
            "Route quote computed"
        );

        Ok(Self {
            distance,
            duration,
            route: points,
            price,
        })
    }

    /// Map camera bounds of the route.
    pub fn bounds(&self) -> Option<RouteBounds> {
        geometry::route_bounds(&self.route)
    }
}

/// Errors from route quoting.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Maps(#[from] MapsError),

    #[error("Directions response has no route")]
    NoRoute,

    #[error("Directions response has no overview polyline")]
    MissingPolyline,

    #[error("Invalid route geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),
}

/// Source of route quotes.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Quote a trip between two points.
    async fn quote(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteQuote, RouteError>;

    /// Formatted address for a point.
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<String, RouteError>;
}

/// Route planner backed by the Google Maps client.
#[derive(Clone)]
pub struct RouteService {
    maps: MapsClient,
    fare: FareSchedule,
}

impl RouteService {
    pub fn new(maps: MapsClient, fare: FareSchedule) -> Self {
        Self { maps, fare }
    }

    pub fn fare_schedule(&self) -> &FareSchedule {
        &self.fare
    }

    /// Offline estimate from straight-line distance and an assumed speed.
    ///
    /// Used for display when directions are unavailable; never used to
    /// create a ride.
    pub fn estimate(&self, origin: Coordinates, destination: Coordinates) -> RouteQuote {
        estimate_quote(origin, destination, &self.fare)
    }
}

#[async_trait]
impl RoutePlanner for RouteService {
    async fn quote(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteQuote, RouteError> {
        let response = self.maps.directions(origin, destination).await?;
        RouteQuote::from_directions(&response, &self.fare)
    }

    async fn reverse_geocode(&self, coords: Coordinates) -> Result<String, RouteError> {
        Ok(self.maps.reverse_geocode(coords).await?)
    }
}

/// Straight-line quote between two points.
pub fn estimate_quote(
    origin: Coordinates,
    destination: Coordinates,
    fare: &FareSchedule,
) -> RouteQuote {
    let distance = geometry::haversine_km(origin, destination);
    let duration = distance / ESTIMATE_SPEED_KMH * 60.0;
    RouteQuote {
        distance,
        duration,
        route: vec![origin, destination],
        price: fare.price(distance, duration),
    }
}
