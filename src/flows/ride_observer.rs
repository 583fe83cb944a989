// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Projects a watched ride's backend status onto the home screen phase.
//!
//! The observer holds at most one [`RideSubscription`]. Watching a new ride
//! releases the previous listener first; terminal statuses, removal and
//! listener errors release it too. There is no automatic resubscription.

use crate::db::{RideBackend, RideEvent, RideSubscription};
use crate::error::AppError;
use crate::flows::{Alert, Effect, RidePhase};
use crate::models::{Coordinates, Ride, RideStatus};

pub const CANCELLED_TITLE: &str = "Ride Cancelled";
pub const CANCELLED_MESSAGE: &str = "Your ride has been cancelled.";

/// What a backend status means for the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Connecting,
    Active,
    Completed,
    Cancelled,
}

/// Map a backend status onto its screen outcome.
pub fn project_status(status: RideStatus) -> StatusOutcome {
    match status {
        RideStatus::Pending => StatusOutcome::Connecting,
        RideStatus::Accepted | RideStatus::InProgress => StatusOutcome::Active,
        RideStatus::Completed => StatusOutcome::Completed,
        RideStatus::Cancelled => StatusOutcome::Cancelled,
    }
}

/// Result of applying one listener event.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverUpdate {
    pub ride_id: String,
    /// Phase the screen should show now
    pub phase: RidePhase,
    /// Latest snapshot, if the event carried one
    pub ride: Option<Ride>,
    /// Driver marker position; `None` clears it
    pub driver_location: Option<Coordinates>,
    /// Set when the ride ended and the listener was released
    pub finished: bool,
    pub effect: Option<Effect>,
}

/// Holder of the single live ride listener.
#[derive(Debug, Default)]
pub struct RideObserver {
    subscription: Option<RideSubscription>,
    driver_location: Option<Coordinates>,
}

impl RideObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ride currently watched, if any.
    pub fn ride_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.ride_id())
    }

    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start watching `ride_id`, releasing any previous listener first.
    pub async fn observe(
        &mut self,
        backend: &dyn RideBackend,
        ride_id: &str,
    ) -> Result<(), AppError> {
        if self.ride_id() == Some(ride_id) {
            return Ok(());
        }
        self.stop();

        let subscription = backend.listen_to_ride(ride_id).await?;
        tracing::debug!(ride_id, "Observing ride");
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Release the listener, if any.
    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        self.driver_location = None;
    }

    /// Wait for the next event that changes the screen.
    ///
    /// Returns `None` when nothing is being watched or the listener ended.
    pub async fn next_update(&mut self) -> Option<ObserverUpdate> {
        loop {
            let event = self.subscription.as_mut()?.next().await;
            match event {
                Some(event) => {
                    if let Some(update) = self.apply(event) {
                        return Some(update);
                    }
                }
                None => {
                    tracing::debug!("Ride listener closed");
                    self.stop();
                    return None;
                }
            }
        }
    }

    /// Apply one event to the observer.
    ///
    /// Events for a ride other than the watched one, or arriving after the
    /// listener was released, are ignored.
    pub fn apply(&mut self, event: RideEvent) -> Option<ObserverUpdate> {
        let ride_id = self.ride_id()?.to_string();

        match event {
            RideEvent::Snapshot(ride) => {
                if ride.ride_id != ride_id {
                    tracing::warn!(watched = %ride_id, got = %ride.ride_id, "Snapshot for another ride");
                    return None;
                }
                self.apply_snapshot(ride_id, ride)
            }
            RideEvent::Removed => {
                tracing::warn!(ride_id = %ride_id, "Watched ride was removed");
                self.stop();
                Some(ObserverUpdate {
                    ride_id,
                    phase: RidePhase::Initial,
                    ride: None,
                    driver_location: None,
                    finished: true,
                    effect: None,
                })
            }
            RideEvent::Error(message) => {
                tracing::error!(ride_id = %ride_id, error = %message, "Ride listener failed");
                self.stop();
                None
            }
        }
    }

    fn apply_snapshot(&mut self, ride_id: String, ride: Ride) -> Option<ObserverUpdate> {
        let outcome = project_status(ride.status);
        tracing::debug!(ride_id = %ride_id, status = %ride.status, "Ride snapshot");

        let (phase, effect, finished) = match outcome {
            StatusOutcome::Connecting => (RidePhase::Connecting, None, false),
            StatusOutcome::Active => (RidePhase::Active, None, false),
            StatusOutcome::Completed => (
                RidePhase::Initial,
                Some(Effect::NavigateToRating {
                    ride_id: ride_id.clone(),
                }),
                true,
            ),
            StatusOutcome::Cancelled => (
                RidePhase::Initial,
                Some(Effect::Alert(Alert::new(CANCELLED_TITLE, CANCELLED_MESSAGE))),
                true,
            ),
        };

        if finished {
            tracing::info!(ride_id = %ride_id, status = %ride.status, "Ride finished");
            self.stop();
        } else if let Some(location) = ride.driver_location {
            self.driver_location = Some(location);
        }

        Some(ObserverUpdate {
            ride_id,
            phase,
            driver_location: self.driver_location,
            ride: Some(ride),
            finished,
            effect,
        })
    }
}
