// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Global client state shared by all screens.
//!
//! Only [`PersistedState`] is written to disk, including the signed-in
//! session so a restart does not sign the rider out. The confirmation handle
//! of an in-flight phone sign-in and the current ride live in memory only.

use crate::models::{Address, Ride, User};
use crate::services::phone_auth::PendingVerification;
use crate::services::session::AuthSession;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// File stem of the persisted store.
pub const STORAGE_NAME: &str = "blu-maze-storage";

/// Schema version of the persisted envelope.
const STORAGE_VERSION: u32 = 0;

/// The part of the state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct PersistedState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub has_completed_onboarding: bool,
    #[serde(default)]
    pub home_address: Option<Address>,
    #[serde(default)]
    pub office_address: Option<Address>,
    #[serde(default)]
    pub favorite_addresses: Vec<Address>,
    /// Tokens of the signed-in rider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub session: Option<AuthSession>,
}

/// On-disk layout: `{"state": {...}, "version": 0}`.
#[derive(Serialize, Deserialize)]
struct PersistedEnvelope {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Default)]
struct AppState {
    persisted: PersistedState,
    confirmation: Option<PendingVerification>,
    current_ride: Option<Ride>,
}

/// Saved places, as the address book shows them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct SavedAddresses {
    pub home: Option<Address>,
    pub office: Option<Address>,
    pub favorites: Vec<Address>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents invalid: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for crate::error::AppError {
    fn from(err: StoreError) -> Self {
        crate::error::AppError::Storage(err.to_string())
    }
}

/// Process-wide client store.
pub struct AppStore {
    state: RwLock<AppState>,
    path: Option<PathBuf>,
}

impl AppStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(AppState::default()),
            path: None,
        }
    }

    /// Open the store at `path`, loading saved state if present.
    ///
    /// An unreadable file is logged and replaced by a fresh state on the next
    /// save rather than blocking start-up.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let persisted = match load(&path) {
            Ok(Some(state)) => {
                tracing::debug!(path = %path.display(), "Loaded persisted store");
                state
            }
            Ok(None) => PersistedState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable store");
                PersistedState::default()
            }
        };

        Self {
            state: RwLock::new(AppState {
                persisted,
                ..Default::default()
            }),
            path: Some(path),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the persisted subset to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let envelope = PersistedEnvelope {
            state: self.read().persisted.clone(),
            version: STORAGE_VERSION,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply a change to persisted state and save it.
    fn update_persisted(&self, change: impl FnOnce(&mut PersistedState)) {
        change(&mut self.write().persisted);
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist store");
        }
    }

    // ─── Auth ───────────────────────────────────────────────────

    /// Set the signed-in user. Also marks the session authenticated.
    pub fn set_user(&self, user: User) {
        self.update_persisted(|s| {
            s.user = Some(user);
            s.is_authenticated = true;
        });
    }

    /// Save or forget the signed-in session.
    pub fn set_session(&self, session: Option<AuthSession>) {
        self.update_persisted(|s| s.session = session);
    }

    pub fn set_confirmation(&self, confirmation: Option<PendingVerification>) {
        self.write().confirmation = confirmation;
    }

    pub fn logout(&self) {
        {
            let mut state = self.write();
            state.confirmation = None;
            state.current_ride = None;
        }
        self.update_persisted(|s| {
            s.user = None;
            s.is_authenticated = false;
            s.session = None;
        });
    }

    pub fn complete_onboarding(&self) {
        self.update_persisted(|s| s.has_completed_onboarding = true);
    }

    // ─── Ride ───────────────────────────────────────────────────

    pub fn set_current_ride(&self, ride: Option<Ride>) {
        self.write().current_ride = ride;
    }

    // ─── Addresses ──────────────────────────────────────────────

    pub fn set_home_address(&self, address: Option<Address>) {
        self.update_persisted(|s| s.home_address = address);
    }

    pub fn set_office_address(&self, address: Option<Address>) {
        self.update_persisted(|s| s.office_address = address);
    }

    pub fn add_favorite_address(&self, address: Address) {
        self.update_persisted(|s| s.favorite_addresses.push(address));
    }

    /// Remove every favorite with this label.
    pub fn remove_favorite_address(&self, label: &str) {
        self.update_persisted(|s| s.favorite_addresses.retain(|a| a.label != label));
    }

    // ─── Selectors ──────────────────────────────────────────────

    pub fn user(&self) -> Option<User> {
        self.read().persisted.user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().persisted.is_authenticated
    }

    pub fn has_completed_onboarding(&self) -> bool {
        self.read().persisted.has_completed_onboarding
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.read().persisted.session.clone()
    }

    pub fn confirmation(&self) -> Option<PendingVerification> {
        self.read().confirmation.clone()
    }

    pub fn current_ride(&self) -> Option<Ride> {
        self.read().current_ride.clone()
    }

    pub fn addresses(&self) -> SavedAddresses {
        let state = self.read();
        SavedAddresses {
            home: state.persisted.home_address.clone(),
            office: state.persisted.office_address.clone(),
            favorites: state.persisted.favorite_addresses.clone(),
        }
    }

    /// Snapshot of what would be written to disk.
    pub fn persisted(&self) -> PersistedState {
        self.read().persisted.clone()
    }
}

fn load(path: &Path) -> Result<Option<PersistedState>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let envelope: PersistedEnvelope = serde_json::from_slice(&bytes)?;
    Ok(Some(envelope.state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn place(label: &str) -> Address {
        Address::new(label, "Kairaba Ave", Coordinates::new(13.44, -16.69))
    }

    #[test]
    fn test_set_user_marks_authenticated() {
        let store = AppStore::in_memory();
        assert!(!store.is_authenticated());
        store.set_user(User::skeleton("uid-1", "+2207654321"));
        assert!(store.is_authenticated());
        assert_eq!(store.user().unwrap().id, "uid-1");
    }

    #[test]
    fn test_logout_clears_session_but_keeps_addresses() {
        let store = AppStore::in_memory();
        store.set_user(User::skeleton("uid-1", "+2207654321"));
        store.set_confirmation(Some(PendingVerification {
            session_info: "s".to_string(),
            phone_number: "+2207654321".to_string(),
        }));
        store.set_home_address(Some(place("Home")));
        store.complete_onboarding();

        store.logout();

        assert!(store.user().is_none());
        assert!(!store.is_authenticated());
        assert!(store.confirmation().is_none());
        assert!(store.has_completed_onboarding());
        assert_eq!(store.addresses().home, Some(place("Home")));
    }

    #[test]
    fn test_remove_favorite_by_label() {
        let store = AppStore::in_memory();
        store.add_favorite_address(place("Gym"));
        store.add_favorite_address(place("Market"));
        store.remove_favorite_address("Gym");
        let labels: Vec<String> = store
            .addresses()
            .favorites
            .into_iter()
            .map(|a| a.label)
            .collect();
        assert_eq!(labels, vec!["Market".to_string()]);
    }

    #[test]
    fn test_envelope_field_names() {
        let envelope = PersistedEnvelope {
            state: PersistedState {
                has_completed_onboarding: true,
                ..Default::default()
            },
            version: STORAGE_VERSION,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["version"], 0);
        assert_eq!(json["state"]["hasCompletedOnboarding"], true);
        assert_eq!(json["state"]["favoriteAddresses"], serde_json::json!([]));
        assert!(json["state"].get("confirmation").is_none());
        assert!(json["state"].get("session").is_none());
    }
}
