// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Home screen controller: pick endpoints, preview the quote, order, watch.
//!
//! Phases: `initial` (no ride) -> `preview` (route quoted) -> `connecting`
//! (ride pending) -> `active` (driver assigned). Terminal ride statuses go
//! back to `initial`.

use crate::db::RideBackend;
use crate::error::AppError;
use crate::flows::ride_observer::{project_status, ObserverUpdate, RideObserver, StatusOutcome};
use crate::flows::scope::ScreenScope;
use crate::flows::{Alert, Effect, RidePhase};
use crate::models::{Address, Coordinates, Driver, NewRide, PaymentMethod, Ride, RideType};
use crate::services::route::RoutePlanner;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const ROUTE_FAILED: &str =
    "Could not calculate route. Please check your locations and try again.";
pub const MISSING_LOCATIONS: &str = "Please select pickup and destination locations";
pub const CREATE_FAILED: &str = "Failed to create ride. Please try again.";
pub const CANCEL_FAILED: &str = "Failed to cancel ride. Please try again.";

/// Address used when the current position cannot be reverse geocoded.
pub const CURRENT_LOCATION: &str = "Current location";

/// Everything the home screen renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct RideRequestState {
    pub phase: RidePhase,
    pub pickup: Option<Address>,
    pub destination: Option<Address>,
    pub route: Vec<Coordinates>,
    /// Kilometers
    pub distance: f64,
    /// Minutes
    pub duration: f64,
    pub price: f64,
    pub ride_type: RideType,
    pub current_ride_id: Option<String>,
    pub driver_location: Option<Coordinates>,
    pub driver: Option<Driver>,
}

impl RideRequestState {
    fn clear_trip(&mut self) {
        self.destination = None;
        self.route.clear();
    }

    fn load_ride(&mut self, ride: &Ride) {
        self.current_ride_id = Some(ride.ride_id.clone());
        self.pickup = Some(ride.pickup.clone());
        self.destination = Some(ride.destination.clone());
        self.distance = ride.distance;
        self.duration = ride.duration;
        self.price = ride.price;
        self.ride_type = ride.ride_type;
        self.driver_location = ride.driver_location;
    }
}

/// Controller for the home screen.
pub struct RideRequestFlow {
    routes: Arc<dyn RoutePlanner>,
    rides: Arc<dyn RideBackend>,
    user_id: String,
    scope: ScreenScope,
    observer: RideObserver,
    state: RideRequestState,
}

impl RideRequestFlow {
    pub fn new(
        routes: Arc<dyn RoutePlanner>,
        rides: Arc<dyn RideBackend>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            routes,
            rides,
            user_id: user_id.into(),
            scope: ScreenScope::new(),
            observer: RideObserver::new(),
            state: RideRequestState::default(),
        }
    }

    pub fn state(&self) -> &RideRequestState {
        &self.state
    }

    pub fn phase(&self) -> RidePhase {
        self.state.phase
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_observing()
    }

    pub fn set_ride_type(&mut self, ride_type: RideType) {
        self.state.ride_type = ride_type;
    }

    /// Use the device position as pickup.
    ///
    /// A failed reverse geocode still sets the pickup, labelled
    /// "Current location".
    pub async fn locate(&mut self, coords: Coordinates) {
        let address = match self.scope.run(self.routes.reverse_geocode(coords)).await {
            Ok(Ok(address)) => address,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Reverse geocode failed; using fallback label");
                CURRENT_LOCATION.to_string()
            }
            Err(_) => return,
        };
        self.state.pickup = Some(Address::new("Pickup", address, coords));
    }

    pub fn set_pickup(&mut self, pickup: Address) {
        self.state.pickup = Some(pickup);
    }

    /// Choose a destination and quote the route.
    ///
    /// Nothing happens when the coordinates equal the current destination.
    /// Without a pickup the destination is kept and routing waits.
    pub async fn set_destination(
        &mut self,
        address: impl Into<String>,
        coords: Coordinates,
    ) -> Result<(), Alert> {
        if self
            .state
            .destination
            .as_ref()
            .is_some_and(|d| d.coords == coords)
        {
            tracing::debug!("Destination unchanged; skipping route calculation");
            return Ok(());
        }

        self.state.destination = Some(Address::new("Destination", address, coords));
        if self.state.pickup.is_none() {
            tracing::debug!("No pickup yet; route calculation deferred");
            return Ok(());
        }
        self.calculate_route().await
    }

    /// Quote pickup -> destination and enter `preview` on success.
    ///
    /// On failure the phase and any previous quote stay as they were.
    pub async fn calculate_route(&mut self) -> Result<(), Alert> {
        let (Some(pickup), Some(destination)) = (&self.state.pickup, &self.state.destination)
        else {
            return Err(Alert::error(MISSING_LOCATIONS));
        };
        let (origin, target) = (pickup.coords, destination.coords);

        let quote = match self.scope.run(self.routes.quote(origin, target)).await {
            Ok(Ok(quote)) => quote,
            Ok(Err(e)) => {
                let err = AppError::from(e);
                tracing::warn!(error = %err, no_route = err.is_no_route(), "Route calculation failed");
                return Err(Alert::error(ROUTE_FAILED));
            }
            Err(_) => return Ok(()),
        };

        if quote.route.is_empty() {
            tracing::warn!("Route quote has no geometry");
        }

        self.state.route = quote.route;
        self.state.distance = quote.distance;
        self.state.duration = quote.duration;
        self.state.price = quote.price;
        self.state.phase = RidePhase::Preview;
        Ok(())
    }

    /// Leave the preview and forget the destination.
    pub fn back(&mut self) {
        self.state.phase = RidePhase::Initial;
        self.state.clear_trip();
    }

    /// Create the ride for the previewed trip and start watching it.
    pub async fn order_ride(&mut self) -> Result<(), Alert> {
        let (Some(pickup), Some(destination)) =
            (self.state.pickup.clone(), self.state.destination.clone())
        else {
            return Err(Alert::error(MISSING_LOCATIONS));
        };

        let request = NewRide {
            pickup,
            destination,
            distance: self.state.distance,
            duration: self.state.duration,
            price: self.state.price,
            ride_type: self.state.ride_type,
            scheduled_time: None,
            payment_method: Some(PaymentMethod::Cash),
        };

        let ride = match self
            .scope
            .run(self.rides.create_ride(&self.user_id, request))
            .await
        {
            Ok(Ok(ride)) => ride,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to create ride");
                return Err(Alert::error(CREATE_FAILED));
            }
            Err(_) => return Ok(()),
        };

        self.state.current_ride_id = Some(ride.ride_id.clone());
        self.state.phase = RidePhase::Connecting;
        self.watch(&ride.ride_id).await;
        Ok(())
    }

    /// Cancel the current ride (if any) and go back to `initial`.
    pub async fn cancel_order(&mut self) -> Result<(), Alert> {
        if let Some(ride_id) = self.state.current_ride_id.clone() {
            match self.scope.run(self.rides.cancel_ride(&ride_id)).await {
                Ok(Ok(())) => {
                    tracing::info!(ride_id = %ride_id, "Ride cancelled by passenger");
                }
                Ok(Err(e)) => {
                    tracing::error!(ride_id = %ride_id, error = %e, "Failed to cancel ride");
                    return Err(Alert::error(CANCEL_FAILED));
                }
                Err(_) => return Ok(()),
            }
            self.observer.stop();
            self.state.current_ride_id = None;
            self.state.driver_location = None;
            self.state.driver = None;
        }

        self.state.phase = RidePhase::Initial;
        self.state.clear_trip();
        Ok(())
    }

    /// Pick up a ride left active by a previous session.
    ///
    /// Returns whether a ride was restored. Lookup failures are logged only.
    pub async fn restore_active_ride(&mut self) -> bool {
        let ride = match self
            .scope
            .run(self.rides.get_active_ride(&self.user_id))
            .await
        {
            Ok(Ok(Some(ride))) => ride,
            Ok(Ok(None)) | Err(_) => return false,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Error checking active ride");
                return false;
            }
        };

        tracing::info!(ride_id = %ride.ride_id, status = %ride.status, "Restoring active ride");
        self.state.load_ride(&ride);
        self.state.phase = match project_status(ride.status) {
            StatusOutcome::Active => RidePhase::Active,
            _ => RidePhase::Connecting,
        };
        self.watch(&ride.ride_id).await;
        self.load_driver(&ride).await;
        true
    }

    /// Wait for the next change of the watched ride and apply it.
    ///
    /// Returns the effect the UI must perform, if any, or `None` once nothing
    /// is being watched.
    pub async fn next_update(&mut self) -> Option<Option<Effect>> {
        let update = self.observer.next_update().await?;
        Some(self.apply_update(update).await)
    }

    /// Apply an observer update to the screen state.
    pub async fn apply_update(&mut self, update: ObserverUpdate) -> Option<Effect> {
        if self.state.current_ride_id.as_deref() != Some(update.ride_id.as_str()) {
            return None;
        }

        self.state.phase = update.phase;
        self.state.driver_location = update.driver_location;

        if update.finished {
            self.state.current_ride_id = None;
            self.state.driver = None;
            self.state.driver_location = None;
            if update.phase == RidePhase::Initial {
                self.state.clear_trip();
            }
        } else if let Some(ride) = &update.ride {
            if self.state.driver.is_none() {
                self.load_driver(ride).await;
            }
        }

        update.effect
    }

    async fn watch(&mut self, ride_id: &str) {
        if let Err(e) = self.observer.observe(self.rides.as_ref(), ride_id).await {
            tracing::error!(ride_id, error = %e, "Failed to listen to ride");
        }
    }

    async fn load_driver(&mut self, ride: &Ride) {
        let Some(driver_id) = &ride.driver_id else {
            return;
        };
        match self.scope.run(self.rides.get_driver(driver_id)).await {
            Ok(Ok(driver)) => self.state.driver = driver,
            Ok(Err(e)) => tracing::warn!(driver_id = %driver_id, error = %e, "Driver lookup failed"),
            Err(_) => {}
        }
    }
}

impl Drop for RideRequestFlow {
    fn drop(&mut self) {
        self.scope.cancel();
        self.observer.stop();
    }
}
