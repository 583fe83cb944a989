// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone number entry and SMS code verification screens.

use crate::db::UserDirectory;
use crate::flows::scope::ScreenScope;
use crate::flows::Alert;
use crate::models::User;
use crate::services::phone_auth::{
    normalize_phone_number, AuthErrorKind, AuthStep, Country, PendingVerification,
    PhoneAuthProvider,
};
use crate::services::session::{AuthSession, SessionHandle};
use crate::store::AppStore;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

/// Digits in an SMS verification code.
pub const CODE_LENGTH: usize = 6;

/// Seconds before a new code may be requested.
pub const RESEND_SECONDS: u32 = 60;

fn auth_alert(kind: AuthErrorKind, step: AuthStep, country: Option<&Country>) -> Alert {
    Alert::error(kind.user_message(step, country))
}

/// Phone number entry.
pub struct PhoneSignIn {
    auth: Arc<dyn PhoneAuthProvider>,
    store: Arc<AppStore>,
    country: Country,
    scope: ScreenScope,
}

impl PhoneSignIn {
    pub fn new(auth: Arc<dyn PhoneAuthProvider>, store: Arc<AppStore>) -> Self {
        Self {
            auth,
            store,
            country: Country::default(),
            scope: ScreenScope::new(),
        }
    }

    pub fn with_country(mut self, country: Country) -> Self {
        self.country = country;
        self
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn toggle_country(&mut self) -> Country {
        self.country = self.country.next();
        self.country
    }

    /// Request an SMS code for `input`.
    ///
    /// Returns the number the code was sent to, or `None` when the input is
    /// too short to send. The confirmation handle goes to the store.
    pub async fn submit(&mut self, input: &str) -> Result<Option<String>, Alert> {
        let Some(phone_number) = normalize_phone_number(input, &self.country) else {
            return Ok(None);
        };

        tracing::info!(country = %self.country.code, "Sending verification code");
        let pending = match self.scope.run(self.auth.send_code(&phone_number)).await {
            Ok(Ok(pending)) => pending,
            Ok(Err(kind)) => {
                tracing::error!(kind = %kind, "Failed to send verification code");
                return Err(auth_alert(kind, AuthStep::SendCode, Some(&self.country)));
            }
            Err(_) => return Ok(None),
        };

        self.store.set_confirmation(Some(pending));
        Ok(Some(phone_number))
    }
}

/// Where the user goes after a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// First sign-in, or the profile was never filled in
    NeedsProfile(User),
    /// Profile exists but no PIN was chosen yet
    NeedsPin(User),
    Ready(User),
}

impl VerificationOutcome {
    fn for_user(user: User) -> Self {
        if user.needs_profile() {
            VerificationOutcome::NeedsProfile(user)
        } else if user.pin.is_none() {
            VerificationOutcome::NeedsPin(user)
        } else {
            VerificationOutcome::Ready(user)
        }
    }

    pub fn user(&self) -> &User {
        match self {
            VerificationOutcome::NeedsProfile(user)
            | VerificationOutcome::NeedsPin(user)
            | VerificationOutcome::Ready(user) => user,
        }
    }
}

/// SMS code entry.
pub struct CodeVerification {
    auth: Arc<dyn PhoneAuthProvider>,
    users: Arc<dyn UserDirectory>,
    store: Arc<AppStore>,
    session: SessionHandle,
    code: String,
    seconds_left: u32,
    scope: ScreenScope,
}

impl CodeVerification {
    pub fn new(
        auth: Arc<dyn PhoneAuthProvider>,
        users: Arc<dyn UserDirectory>,
        store: Arc<AppStore>,
        session: SessionHandle,
    ) -> Self {
        Self {
            auth,
            users,
            store,
            session,
            code: String::new(),
            seconds_left: RESEND_SECONDS,
            scope: ScreenScope::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the code field; non-digits are dropped and the length capped.
    pub fn set_code(&mut self, input: &str) {
        self.code = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(CODE_LENGTH)
            .collect();
    }

    pub fn is_complete(&self) -> bool {
        self.code.len() == CODE_LENGTH
    }

    /// One second of the resend countdown.
    pub fn tick(&mut self) {
        self.seconds_left = self.seconds_left.saturating_sub(1);
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn can_resend(&self) -> bool {
        self.seconds_left == 0
    }

    /// Send a fresh code to the same number once the countdown is over.
    ///
    /// Returns whether a code was sent.
    pub async fn resend(&mut self) -> Result<bool, Alert> {
        if !self.can_resend() {
            return Ok(false);
        }
        let Some(previous) = self.store.confirmation() else {
            return Err(auth_alert(
                AuthErrorKind::MissingConfirmation,
                AuthStep::Session,
                None,
            ));
        };
        let country = Country::by_code_prefix(&previous.phone_number);

        match self.scope.run(self.auth.send_code(&previous.phone_number)).await {
            Ok(Ok(pending)) => {
                self.store.set_confirmation(Some(pending));
                self.seconds_left = RESEND_SECONDS;
                self.code.clear();
                Ok(true)
            }
            Ok(Err(kind)) => {
                tracing::error!(kind = %kind, "Failed to resend verification code");
                Err(auth_alert(kind, AuthStep::SendCode, country.as_ref()))
            }
            Err(_) => Ok(false),
        }
    }

    /// Check the entered code and sign in.
    ///
    /// Returns `None` while the code is incomplete. A wrong code clears the
    /// field and leaves the screen where it is.
    pub async fn confirm(&mut self) -> Result<Option<VerificationOutcome>, Alert> {
        if !self.is_complete() {
            return Ok(None);
        }
        let Some(pending) = self.store.confirmation() else {
            return Err(auth_alert(
                AuthErrorKind::MissingConfirmation,
                AuthStep::Session,
                None,
            ));
        };

        let result = self
            .scope
            .run(self.auth.confirm_code(&pending, &self.code))
            .await;
        let session = match result {
            Ok(Ok(session)) => session,
            Ok(Err(kind)) => {
                tracing::warn!(kind = %kind, "Verification failed");
                if kind == AuthErrorKind::InvalidVerificationCode {
                    self.code.clear();
                }
                return Err(auth_alert(kind, AuthStep::VerifyCode, None));
            }
            Err(_) => return Ok(None),
        };

        let user = match self.scope.run(self.load_or_create_user(&session, &pending)).await {
            Ok(user) => user,
            Err(_) => return Ok(None),
        };

        tracing::info!(uid = %session.uid, new_user = session.is_new_user, "Signed in");
        self.session.set(session).await;
        self.store.set_confirmation(None);
        self.store.set_user(user.clone());
        Ok(Some(VerificationOutcome::for_user(user)))
    }

    async fn load_or_create_user(&self, session: &AuthSession, pending: &PendingVerification) -> User {
        let phone_number = if session.phone_number.is_empty() {
            pending.phone_number.clone()
        } else {
            session.phone_number.clone()
        };

        match self.users.get_user(&session.uid).await {
            Ok(Some(user)) => return user,
            Ok(None) => {}
            Err(e) => {
                // Signed in anyway; the auth state observer syncs later
                tracing::error!(uid = %session.uid, error = %e, "Failed to load user");
                return User::skeleton(&session.uid, phone_number);
            }
        }

        let mut user = User::skeleton(&session.uid, phone_number);
        let now = now_rfc3339();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        if let Err(e) = self.users.upsert_user(&user).await {
            tracing::error!(uid = %session.uid, error = %e, "Failed to create user document");
        }
        user
    }
}
