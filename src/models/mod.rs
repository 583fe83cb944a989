// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod driver;
pub mod location;
pub mod ride;
pub mod user;

pub use driver::{Driver, Vehicle};
pub use location::{Address, Coordinates};
pub use ride::{
    NewRide, PaymentMethod, RatingInput, Ride, RideRatings, RideStatus, RideTimestamps, RideType,
};
pub use user::{ProfileUpdate, User, UserRole};
