// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and the client store.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account role. This client only ever creates passengers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub enum UserRole {
    #[default]
    Passenger,
    Driver,
}

/// User profile stored in Firestore at `users/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct User {
    /// Firebase Auth uid (also used as document ID)
    pub id: String,
    /// E.164 phone number used to sign in
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Profile picture URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    /// Hex SHA-256 digest of the unlock PIN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// When the account was created (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last profile change (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl User {
    /// Minimal record for a signed-in account with no profile document yet.
    pub fn skeleton(id: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phone_number: phone_number.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            profile_photo: None,
            pin: None,
            role: UserRole::Passenger,
            created_at: None,
            updated_at: None,
        }
    }

    /// "First Last", trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether onboarding still has to collect the user's name.
    pub fn needs_profile(&self) -> bool {
        self.first_name.trim().is_empty()
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 80))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub profile_photo: Option<String>,
}

impl ProfileUpdate {
    /// Trimmed copy; blank optional fields become `None`.
    ///
    /// Validate this rather than the raw form, so an emptied email box is
    /// "no email" instead of an invalid one.
    pub fn normalized(&self) -> ProfileUpdate {
        fn optional(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        ProfileUpdate {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: optional(&self.email),
            profile_photo: optional(&self.profile_photo),
        }
    }

    /// Apply the update to a user record.
    pub fn apply_to(&self, user: &mut User, now: &str) {
        user.first_name = self.first_name.trim().to_string();
        user.last_name = self.last_name.trim().to_string();
        user.email = self.email.clone().filter(|e| !e.is_empty());
        if self.profile_photo.is_some() {
            user.profile_photo = self.profile_photo.clone();
        }
        user.updated_at = Some(now.to_string());
    }
}
