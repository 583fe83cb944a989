// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keeps the store's user in step with the auth session.

use crate::db::UserDirectory;
use crate::models::User;
use crate::services::session::SessionHandle;
use crate::store::AppStore;
use std::sync::Arc;
use tokio::sync::watch;

/// Mirrors sign-in and sign-out into the [`AppStore`].
///
/// On sign-in the user document `users/{uid}` is loaded; a missing
/// document yields a minimal record with only id and phone number. A lookup
/// failure is logged and leaves the store alone. Sign-out calls
/// [`AppStore::logout`].
pub struct AuthStateObserver {
    users: Arc<dyn UserDirectory>,
    store: Arc<AppStore>,
    session: SessionHandle,
    changes: watch::Receiver<Option<String>>,
}

impl AuthStateObserver {
    pub fn new(users: Arc<dyn UserDirectory>, store: Arc<AppStore>, session: SessionHandle) -> Self {
        let changes = session.subscribe();
        Self {
            users,
            store,
            session,
            changes,
        }
    }

    /// Sync once for the current session state.
    pub async fn sync_current(&mut self) {
        let uid = self.changes.borrow_and_update().clone();
        self.sync(uid).await;
    }

    /// Wait for the next session change and sync it.
    ///
    /// Returns `false` once the session handle is gone.
    pub async fn next_change(&mut self) -> bool {
        if self.changes.changed().await.is_err() {
            return false;
        }
        let uid = self.changes.borrow_and_update().clone();
        self.sync(uid).await;
        true
    }

    /// Follow session changes until the session handle is dropped.
    pub async fn run(mut self) {
        self.sync_current().await;
        while self.next_change().await {}
        tracing::debug!("Session handle dropped; auth observer stopping");
    }

    async fn sync(&self, uid: Option<String>) {
        let Some(uid) = uid else {
            tracing::debug!("Signed out");
            self.store.logout();
            return;
        };

        let phone_number = self
            .session
            .current()
            .await
            .map(|s| s.phone_number)
            .unwrap_or_default();

        match self.users.get_user(&uid).await {
            Ok(Some(mut user)) => {
                user.id = uid;
                if !phone_number.is_empty() {
                    user.phone_number = phone_number;
                }
                self.store.set_user(user);
            }
            Ok(None) => {
                tracing::debug!(uid = %uid, "No user document yet");
                self.store.set_user(User::skeleton(uid, phone_number));
            }
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "Error syncing user data");
            }
        }
    }
}
