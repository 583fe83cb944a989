// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding after sign-in: profile, PIN choice, and PIN unlock.

use crate::db::UserDirectory;
use crate::error::AppError;
use crate::flows::Alert;
use crate::models::ProfileUpdate;
use crate::services::phone_auth::{AuthErrorKind, AuthStep};
use crate::services::pin::{self, PinError};
use crate::store::AppStore;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use validator::Validate;

pub const SAVE_PROFILE_FAILED: &str = "Failed to save profile. Please try again.";
pub const SAVE_PIN_FAILED: &str = "Failed to save PIN. Please try again.";

fn session_lost() -> Alert {
    Alert::error(AuthErrorKind::MissingConfirmation.user_message(AuthStep::Session, None))
}

/// Profile and PIN steps for the signed-in user in the store.
pub struct AccountSetup {
    users: Arc<dyn UserDirectory>,
    store: Arc<AppStore>,
}

impl AccountSetup {
    pub fn new(users: Arc<dyn UserDirectory>, store: Arc<AppStore>) -> Self {
        Self { users, store }
    }

    /// Save name and optional details on the user document.
    pub async fn save_profile(&self, update: &ProfileUpdate) -> Result<(), Alert> {
        let update = update.normalized();
        if let Err(e) = update.validate() {
            return Err(Alert::error(AppError::from(e).user_message()));
        }
        let Some(mut user) = self.store.user() else {
            return Err(session_lost());
        };

        update.apply_to(&mut user, &now_rfc3339());
        if let Err(e) = self.users.upsert_user(&user).await {
            tracing::error!(uid = %user.id, error = %e, "Failed to save profile");
            return Err(Alert::error(SAVE_PROFILE_FAILED));
        }
        self.store.set_user(user);
        Ok(())
    }

    /// Store the PIN after it was entered twice.
    ///
    /// Writes only the digest, then marks onboarding complete.
    pub async fn set_pin(&self, first: &str, second: &str) -> Result<(), Alert> {
        let digest = pin::confirm_pin(first, second).map_err(|e| Alert::error(e.to_string()))?;
        let Some(mut user) = self.store.user() else {
            return Err(session_lost());
        };

        if let Err(e) = self.users.set_pin_hash(&user.id, &digest).await {
            tracing::error!(uid = %user.id, error = %e, "Failed to save PIN");
            return Err(Alert::error(SAVE_PIN_FAILED));
        }

        tracing::info!(uid = %user.id, "PIN set");
        user.pin = Some(digest);
        self.store.set_user(user);
        self.store.complete_onboarding();
        Ok(())
    }

    /// Check an unlock attempt against the signed-in user's PIN.
    pub fn unlock(&self, entered: &str) -> Result<(), PinError> {
        let user = self.store.user();
        pin::verify_pin(entered, user.as_ref().and_then(|u| u.pin.as_deref()))
    }
}
