// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in session: Firebase ID token, refresh token and expiry.
//!
//! The [`SessionHandle`] is shared between the auth flow, the auth state
//! observer and the Firestore token source. A handle opened with
//! [`SessionHandle::persisted`] writes every change through to the
//! [`AppStore`] so a restart keeps the rider signed in.

use crate::services::phone_auth::{AuthErrorKind, PhoneAuthProvider};
use crate::store::AppStore;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// Refresh this long before the ID token expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Placeholder presented to Firestore while signed out; security rules reject it.
const SIGNED_OUT_TOKEN: &str = "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJhbm9ueW1vdXMifQ.";

/// Claims we read from a Firebase ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl IdTokenClaims {
    /// Read claims without verifying the signature.
    ///
    /// The token came straight from the identity service over TLS; the
    /// backend verifies it on every request. Emulator tokens are unsigned
    /// (`alg: none`) and yield `None`.
    pub fn decode_unverified(token: &str) -> Option<Self> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        match decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "ID token claims not readable");
                None
            }
        }
    }

    pub fn uid(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.sub)
    }
}

/// A signed-in user's tokens.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub uid: String,
    pub phone_number: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// First sign-in for this phone number
    #[serde(skip)]
    pub is_new_user: bool,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("uid", &self.uid)
            .field("expires_at", &self.expires_at)
            .field("is_new_user", &self.is_new_user)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Build a session from an identity response.
    ///
    /// Claims in the ID token win over the response fields when readable.
    pub fn from_tokens(
        id_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        local_id: String,
        phone_number: String,
        is_new_user: bool,
    ) -> Self {
        let fallback_expiry = Utc::now() + Duration::seconds(expires_in_secs);

        let (uid, phone_number, expires_at) = match IdTokenClaims::decode_unverified(&id_token) {
            Some(claims) => (
                claims.uid().to_string(),
                claims.phone_number.clone().unwrap_or(phone_number),
                DateTime::from_timestamp(claims.exp, 0).unwrap_or(fallback_expiry),
            ),
            None => (local_id, phone_number, fallback_expiry),
        };

        Self {
            uid,
            phone_number,
            id_token,
            refresh_token,
            expires_at,
            is_new_user,
        }
    }

    /// Whether the ID token should be refreshed before use.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// Shared, observable slot for the current session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
    refresh_lock: Arc<Mutex<()>>,
    /// Signed-in uid, for observers
    changes: Arc<watch::Sender<Option<String>>>,
    store: Option<Arc<AppStore>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// Handle that lives in memory only.
    pub fn new() -> Self {
        Self::with_session(None, None)
    }

    /// Handle backed by `store`, starting from the session saved there.
    pub fn persisted(store: Arc<AppStore>) -> Self {
        let saved = store.session();
        if let Some(session) = &saved {
            tracing::debug!(uid = %session.uid, "Restored saved session");
        }
        Self::with_session(saved, Some(store))
    }

    fn with_session(session: Option<AuthSession>, store: Option<Arc<AppStore>>) -> Self {
        let (tx, _rx) = watch::channel(session.as_ref().map(|s| s.uid.clone()));
        Self {
            inner: Arc::new(RwLock::new(session)),
            refresh_lock: Arc::new(Mutex::new(())),
            changes: Arc::new(tx),
            store,
        }
    }

    fn persist(&self, session: Option<AuthSession>) {
        if let Some(store) = &self.store {
            store.set_session(session);
        }
    }

    /// Install a session and notify observers.
    pub async fn set(&self, session: AuthSession) {
        let uid = session.uid.clone();
        self.persist(Some(session.clone()));
        *self.inner.write().await = Some(session);
        self.changes.send_replace(Some(uid));
    }

    /// Drop the session (sign out) and notify observers.
    pub async fn clear(&self) {
        self.persist(None);
        *self.inner.write().await = None;
        self.changes.send_replace(None);
    }

    pub async fn current(&self) -> Option<AuthSession> {
        self.inner.read().await.clone()
    }

    pub async fn uid(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|s| s.uid.clone())
    }

    /// Receiver that yields the signed-in uid (or `None`) on every change.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.changes.subscribe()
    }

    /// Current ID token, refreshed first when close to expiry.
    ///
    /// Only one refresh runs at a time; waiters reuse its result. A session
    /// the backend revoked is cleared.
    pub async fn fresh_id_token(
        &self,
        provider: &dyn PhoneAuthProvider,
    ) -> Result<String, AuthErrorKind> {
        let now = Utc::now();
        match self.inner.read().await.as_ref() {
            None => return Err(AuthErrorKind::MissingConfirmation),
            Some(s) if !s.needs_refresh(now) => return Ok(s.id_token.clone()),
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        let current = match self.inner.read().await.clone() {
            None => return Err(AuthErrorKind::MissingConfirmation),
            Some(s) if !s.needs_refresh(now) => return Ok(s.id_token),
            Some(s) => s,
        };

        match provider.refresh(&current).await {
            Ok(refreshed) => {
                let token = refreshed.id_token.clone();
                self.persist(Some(refreshed.clone()));
                *self.inner.write().await = Some(refreshed);
                Ok(token)
            }
            Err(AuthErrorKind::SessionRevoked) => {
                tracing::warn!(uid = %current.uid, "Session revoked; signing out");
                self.clear().await;
                Err(AuthErrorKind::SessionRevoked)
            }
            Err(kind) => Err(kind),
        }
    }

    /// Token source for the Firestore client.
    ///
    /// Each request runs the lookup on its own task; the client needs a
    /// `Sync` future and the provider's refresh future is only `Send`.
    pub fn token_source(
        &self,
        provider: Arc<dyn PhoneAuthProvider>,
    ) -> gcloud_sdk::TokenSourceType {
        let handle = self.clone();
        let source = gcloud_sdk::ExternalJwtFunctionSource::new(move || {
            let task = tokio::spawn(firestore_token(handle.clone(), provider.clone()));
            async move {
                task.await.map_err(|e| {
                    tracing::warn!(error = %e, "Firestore token task failed");
                    gcloud_sdk::error::Error::from(gcloud_sdk::error::ErrorKind::TokenSource)
                })?
            }
        });
        gcloud_sdk::TokenSourceType::ExternalSource(Box::new(source))
    }
}

/// Bearer token for the next Firestore request.
///
/// Refresh failures fall back to the current token so the backend, not
/// this client, decides whether it is still acceptable.
async fn firestore_token(
    handle: SessionHandle,
    provider: Arc<dyn PhoneAuthProvider>,
) -> gcloud_sdk::error::Result<gcloud_sdk::Token> {
    let token = match handle.fresh_id_token(provider.as_ref()).await {
        Ok(token) => token,
        Err(kind) => {
            tracing::debug!(kind = %kind, "No fresh ID token for Firestore");
            handle
                .current()
                .await
                .map(|s| s.id_token)
                .unwrap_or_else(|| SIGNED_OUT_TOKEN.to_string())
        }
    };
    let expiry = handle
        .current()
        .await
        .map(|s| s.expires_at)
        .unwrap_or_else(|| Utc::now() + Duration::minutes(1));

    Ok(gcloud_sdk::Token {
        token_type: "Bearer".to_string(),
        token: gcloud_sdk::SecretValue::new(token.into()),
        expiry,
    })
}
