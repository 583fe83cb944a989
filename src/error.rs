// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

use crate::services::maps::{MapsError, MapsStatus};
use crate::services::phone_auth::{AuthErrorKind, AuthStep};
use crate::services::route::RouteError;

/// Application error type.
///
/// Every failure is scoped to the user action that triggered it. Controllers
/// turn these into alerts via [`AppError::user_message`] and keep their prior
/// state.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Maps API error: {0}")]
    MapsApi(#[from] RouteError),

    #[error("Authentication failed: {0}")]
    Auth(AuthErrorKind),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Generic message shown when a backend write fails.
    pub const GENERIC_FAILURE: &'static str = "Something went wrong. Please try again.";

    /// Check if the error came from the Maps API reporting no usable route.
    pub fn is_no_route(&self) -> bool {
        matches!(
            self,
            AppError::MapsApi(RouteError::NoRoute)
                | AppError::MapsApi(RouteError::Maps(MapsError::Status {
                    status: MapsStatus::ZeroResults | MapsStatus::NotFound,
                    ..
                }))
        )
    }

    /// Check if the error is an authentication rejection the user can fix by
    /// re-entering input (as opposed to a transient or configuration problem).
    pub fn is_user_correctable(&self) -> bool {
        match self {
            AppError::Auth(kind) => kind.is_user_correctable(),
            AppError::BadRequest(_) => true,
            _ => false,
        }
    }

    /// Human-readable text for an alert.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "Please sign in to continue.".to_string(),
            AppError::Auth(kind) => kind.user_message(AuthStep::Session, None),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::MapsApi(_) => {
                "Could not calculate route. Please check your locations and try again.".to_string()
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                Self::GENERIC_FAILURE.to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                Self::GENERIC_FAILURE.to_string()
            }
            AppError::NotFound(_) | AppError::Storage(_) | AppError::Cancelled => {
                Self::GENERIC_FAILURE.to_string()
            }
        }
    }
}

impl From<AuthErrorKind> for AppError {
    fn from(kind: AuthErrorKind) -> Self {
        AppError::Auth(kind)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, AppError>;
