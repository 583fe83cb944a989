// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Screen controllers.
//!
//! Each controller owns one screen's ephemeral state, calls the backends
//! through their traits, and reports what the UI should do as [`Effect`]s.
//! Failures become an [`Alert`] and leave the prior state in place.

pub mod account;
pub mod auth_state;
pub mod history;
pub mod ride_observer;
pub mod ride_request;
pub mod scope;
pub mod sign_in;

pub use account::AccountSetup;
pub use auth_state::AuthStateObserver;
pub use history::{RideHistory, RideRating};
pub use ride_observer::{project_status, ObserverUpdate, RideObserver, StatusOutcome};
pub use ride_request::{RideRequestFlow, RideRequestState};
pub use scope::{ScopeToken, ScreenScope};
pub use sign_in::{CodeVerification, PhoneSignIn, VerificationOutcome};

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Client-side screen phase, distinct from the backend ride status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum RidePhase {
    #[default]
    Initial,
    Preview,
    Connecting,
    Active,
}

/// A modal alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Alert titled "Error".
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

/// Something the UI shell must do in response to a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum Effect {
    Alert(Alert),
    #[serde(rename_all = "camelCase")]
    NavigateToRating { ride_id: String },
}
