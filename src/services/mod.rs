// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend clients and pure business logic.

pub mod fare;
pub mod geometry;
pub mod maps;
pub mod notifications;
pub mod phone_auth;
pub mod pin;
pub mod route;
pub mod session;

pub use fare::{calculate_price, FareSchedule};
pub use maps::{MapsClient, MapsError, MapsStatus};
pub use phone_auth::{
    AuthErrorKind, AuthStep, Country, IdentityToolkitClient, PendingVerification,
    PhoneAuthProvider,
};
pub use route::{RouteError, RoutePlanner, RouteQuote, RouteService};
pub use session::{AuthSession, SessionHandle};
