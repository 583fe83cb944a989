// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;
pub mod subscription;

pub use firestore::FirestoreDb;
pub use subscription::{RideEvent, RideSubscription};

use crate::error::AppError;
use crate::models::{Driver, NewRide, RatingInput, Ride, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const RIDES: &str = "rides";
    /// Driver profiles, written by the driver side
    pub const DRIVERS: &str = "drivers";
}

/// Ride documents as seen by the passenger.
#[async_trait]
pub trait RideBackend: Send + Sync {
    /// Write a new pending ride for `user_id` and return it.
    async fn create_ride(&self, user_id: &str, ride: NewRide) -> Result<Ride, AppError>;

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError>;

    /// Newest ride of the user that is still pending, accepted or in progress.
    async fn get_active_ride(&self, user_id: &str) -> Result<Option<Ride>, AppError>;

    /// Completed and cancelled rides, newest first.
    async fn ride_history(&self, user_id: &str, limit: u32) -> Result<Vec<Ride>, AppError>;

    /// Mark the ride cancelled. Cancelling an already cancelled ride is a no-op.
    async fn cancel_ride(&self, ride_id: &str) -> Result<(), AppError>;

    /// Store the passenger's rating of a ride.
    async fn rate_ride(&self, ride_id: &str, rating: &RatingInput) -> Result<(), AppError>;

    async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>, AppError>;

    /// Start a realtime listener on one ride.
    async fn listen_to_ride(&self, ride_id: &str) -> Result<RideSubscription, AppError>;
}

/// User profile documents.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;

    /// Create or replace the user's profile document.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Store a new PIN digest.
    async fn set_pin_hash(&self, uid: &str, pin_hash: &str) -> Result<(), AppError>;
}
