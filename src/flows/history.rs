// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Past rides and the post-ride rating screen.

use crate::db::RideBackend;
use crate::flows::scope::ScreenScope;
use crate::flows::Alert;
use crate::models::{RatingInput, Ride};
use std::sync::Arc;

/// Rides shown on the history screen.
pub const HISTORY_LIMIT: u32 = 20;

pub const HISTORY_FAILED: &str = "Failed to load ride history. Please try again.";
pub const RATING_FAILED: &str = "Failed to submit rating. Please try again.";

/// Completed and cancelled rides, newest first.
pub struct RideHistory {
    rides: Arc<dyn RideBackend>,
    user_id: String,
    scope: ScreenScope,
}

impl RideHistory {
    pub fn new(rides: Arc<dyn RideBackend>, user_id: impl Into<String>) -> Self {
        Self {
            rides,
            user_id: user_id.into(),
            scope: ScreenScope::new(),
        }
    }

    pub async fn load(&self, limit: u32) -> Result<Vec<Ride>, Alert> {
        match self
            .scope
            .run(self.rides.ride_history(&self.user_id, limit))
            .await
        {
            Ok(Ok(rides)) => Ok(rides),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to load ride history");
                Err(Alert::error(HISTORY_FAILED))
            }
            Err(_) => Ok(Vec::new()),
        }
    }
}

/// Star rating for a finished ride.
pub struct RideRating {
    rides: Arc<dyn RideBackend>,
    ride_id: String,
    stars: u8,
    comment: String,
    scope: ScreenScope,
}

impl RideRating {
    pub fn new(rides: Arc<dyn RideBackend>, ride_id: impl Into<String>) -> Self {
        Self {
            rides,
            ride_id: ride_id.into(),
            stars: 0,
            comment: String::new(),
            scope: ScreenScope::new(),
        }
    }

    pub fn ride_id(&self) -> &str {
        &self.ride_id
    }

    pub fn stars(&self) -> u8 {
        self.stars
    }

    /// Select 1..=5 stars; other values are ignored.
    pub fn set_stars(&mut self, stars: u8) {
        if (1..=5).contains(&stars) {
            self.stars = stars;
        }
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn can_submit(&self) -> bool {
        self.stars > 0
    }

    /// Write the rating. Returns `false` without writing when no star is
    /// selected.
    pub async fn submit(&mut self) -> Result<bool, Alert> {
        if !self.can_submit() {
            return Ok(false);
        }
        let rating = RatingInput {
            stars: self.stars,
            comment: Some(self.comment.clone()).filter(|c| !c.trim().is_empty()),
        };

        match self
            .scope
            .run(self.rides.rate_ride(&self.ride_id, &rating))
            .await
        {
            Ok(Ok(())) => {
                tracing::info!(ride_id = %self.ride_id, stars = self.stars, "Ride rated");
                Ok(true)
            }
            Ok(Err(e)) => {
                tracing::error!(ride_id = %self.ride_id, error = %e, "Error submitting rating");
                Err(Alert::error(RATING_FAILED))
            }
            Err(_) => Ok(false),
        }
    }
}
