// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase phone-number sign-in over the Identity Toolkit REST API.
//!
//! Handles:
//! - Sending the SMS verification code (returns the confirmation handle)
//! - Confirming the 6-digit code (returns an ID-token session)
//! - Refreshing the ID token through the secure-token endpoint
//!
//! Backend error codes (REST `INVALID_CODE`, SDK `auth/invalid-verification-code`,
//! ...) are translated into [`AuthErrorKind`] here and nowhere else.

use crate::config::Config;
use crate::services::session::AuthSession;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Country offered by the phone entry screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

pub const GAMBIA: Country = Country {
    code: "+220",
    name: "Gambia",
    flag: "\u{1F1EC}\u{1F1F2}",
};

pub const SENEGAL: Country = Country {
    code: "+221",
    name: "Senegal",
    flag: "\u{1F1F8}\u{1F1F3}",
};

/// Supported countries, in toggle order.
pub const COUNTRIES: [Country; 2] = [GAMBIA, SENEGAL];

impl Country {
    pub fn by_code(code: &str) -> Option<Country> {
        COUNTRIES.iter().copied().find(|c| c.code == code)
    }

    /// Country whose code starts the E.164 number `phone_number`.
    pub fn by_code_prefix(phone_number: &str) -> Option<Country> {
        COUNTRIES
            .iter()
            .copied()
            .find(|c| phone_number.starts_with(c.code))
    }

    /// The next country in toggle order.
    pub fn next(&self) -> Country {
        let idx = COUNTRIES.iter().position(|c| c == self).unwrap_or(0);
        COUNTRIES[(idx + 1) % COUNTRIES.len()]
    }
}

impl Default for Country {
    fn default() -> Self {
        SENEGAL
    }
}

/// Numbers shorter than this are not sent.
pub const MIN_PHONE_INPUT_LEN: usize = 7;

/// Turn user input into an E.164 number.
///
/// Input starting with `+` already carries a country code and is used as is.
/// Otherwise leading trunk zeros are dropped and the country code prefixed.
/// Returns `None` for input too short to send.
pub fn normalize_phone_number(input: &str, country: &Country) -> Option<String> {
    let input = input.trim();
    if input.chars().count() < MIN_PHONE_INPUT_LEN {
        return None;
    }
    if input.starts_with('+') {
        return Some(input.to_string());
    }
    Some(format!("{}{}", country.code, input.trim_start_matches('0')))
}

/// Closed set of authentication failures the UI knows how to explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthErrorKind {
    #[error("invalid-phone-number")]
    InvalidPhoneNumber,

    #[error("invalid-verification-code")]
    InvalidVerificationCode,

    #[error("code-expired")]
    CodeExpired,

    #[error("missing-confirmation")]
    MissingConfirmation,

    #[error("too-many-requests")]
    TooManyRequests,

    #[error("quota-exceeded")]
    QuotaExceeded,

    #[error("captcha-check-failed")]
    CaptchaCheckFailed,

    #[error("sms-region-not-enabled")]
    SmsRegionNotEnabled,

    #[error("operation-not-allowed")]
    PhoneAuthDisabled,

    #[error("user-disabled")]
    UserDisabled,

    #[error("session-revoked")]
    SessionRevoked,

    #[error("network-request-failed")]
    Network,

    #[error("unknown")]
    Unknown,
}

impl AuthErrorKind {
    /// Translate a backend error code.
    pub fn from_backend_code(code: &str) -> Self {
        Self::from_backend(code, None)
    }

    /// Translate a backend error code plus its free-text detail.
    ///
    /// Identity Toolkit codes may carry a suffix (`TOO_SHORT : ...`). The
    /// part before ` : ` is matched; the suffix counts as detail.
    pub fn from_backend(code: &str, detail: Option<&str>) -> Self {
        let (code, suffix) = match code.split_once(" : ") {
            Some((code, suffix)) => (code.trim(), Some(suffix)),
            None => (code.trim(), None),
        };
        let mentions_region = [detail, suffix]
            .into_iter()
            .flatten()
            .any(|d| d.contains("region") || d.contains("SMS"))
            || code.contains("REGION");

        match code {
            "INVALID_PHONE_NUMBER" | "TOO_SHORT" | "TOO_LONG" | "MISSING_PHONE_NUMBER"
            | "auth/invalid-phone-number" | "auth/missing-phone-number" => {
                AuthErrorKind::InvalidPhoneNumber
            }
            "INVALID_CODE" | "MISSING_CODE" | "auth/invalid-verification-code"
            | "auth/missing-verification-code" => AuthErrorKind::InvalidVerificationCode,
            "SESSION_EXPIRED" | "INVALID_SESSION_INFO" | "auth/code-expired"
            | "auth/session-expired" | "auth/invalid-verification-id" => AuthErrorKind::CodeExpired,
            "MISSING_SESSION_INFO" | "auth/missing-verification-id" => {
                AuthErrorKind::MissingConfirmation
            }
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => {
                AuthErrorKind::TooManyRequests
            }
            "QUOTA_EXCEEDED" | "auth/quota-exceeded" => AuthErrorKind::QuotaExceeded,
            "CAPTCHA_CHECK_FAILED" | "MISSING_RECAPTCHA_TOKEN" | "INVALID_RECAPTCHA_TOKEN"
            | "auth/captcha-check-failed" | "auth/missing-app-credential" => {
                AuthErrorKind::CaptchaCheckFailed
            }
            "OPERATION_NOT_ALLOWED" | "auth/operation-not-allowed" if mentions_region => {
                AuthErrorKind::SmsRegionNotEnabled
            }
            "OPERATION_NOT_ALLOWED" | "auth/operation-not-allowed" => {
                AuthErrorKind::PhoneAuthDisabled
            }
            "USER_DISABLED" | "auth/user-disabled" => AuthErrorKind::UserDisabled,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" | "INVALID_ID_TOKEN"
            | "auth/user-token-expired" | "auth/invalid-user-token" | "auth/user-not-found" => {
                AuthErrorKind::SessionRevoked
            }
            "auth/network-request-failed" => AuthErrorKind::Network,
            c if c.starts_with("SMS_REGION") || c.contains("REGION_NOT") => {
                AuthErrorKind::SmsRegionNotEnabled
            }
            other => {
                tracing::warn!(code = other, "Unrecognized auth error code");
                AuthErrorKind::Unknown
            }
        }
    }

    /// Whether the user can fix this by editing what they typed.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            AuthErrorKind::InvalidPhoneNumber
                | AuthErrorKind::InvalidVerificationCode
                | AuthErrorKind::CodeExpired
        )
    }

    /// Alert text. `step` picks the fallback wording for unknown failures;
    /// `country` adds the region hint for SMS policy failures.
    pub fn user_message(&self, step: AuthStep, country: Option<&Country>) -> String {
        match self {
            AuthErrorKind::InvalidPhoneNumber => "Invalid phone number format.".to_string(),
            AuthErrorKind::InvalidVerificationCode => "Invalid verification code".to_string(),
            AuthErrorKind::CodeExpired => {
                "Verification code expired. Please request a new code.".to_string()
            }
            AuthErrorKind::MissingConfirmation | AuthErrorKind::SessionRevoked => {
                "Session lost. Please log in again.".to_string()
            }
            AuthErrorKind::TooManyRequests => {
                "Too many requests. Please try again later.".to_string()
            }
            AuthErrorKind::QuotaExceeded => {
                "SMS quota exceeded. Please try again later.".to_string()
            }
            AuthErrorKind::CaptchaCheckFailed => {
                "Verification check failed. Please try again.".to_string()
            }
            AuthErrorKind::SmsRegionNotEnabled => match country {
                Some(c) => format!(
                    "SMS region not enabled for {} ({}). Allow the region under \
                     Authentication > Settings > SMS Region Policy in the Firebase console.",
                    c.name, c.code
                ),
                None => "SMS region not enabled for this country.".to_string(),
            },
            AuthErrorKind::PhoneAuthDisabled => {
                "Phone authentication not enabled. Enable the Phone provider under \
                 Authentication > Sign-in method in the Firebase console."
                    .to_string()
            }
            AuthErrorKind::UserDisabled => "This account has been disabled.".to_string(),
            AuthErrorKind::Network => {
                "Network error. Please check your connection and try again.".to_string()
            }
            AuthErrorKind::Unknown => match step {
                AuthStep::SendCode => "Failed to send verification code. Please try again.",
                AuthStep::VerifyCode => "Failed to verify code. Please try again.",
                AuthStep::Session => "Authentication failed. Please try again.",
            }
            .to_string(),
        }
    }
}

/// Which part of sign-in an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    /// Requesting the SMS
    SendCode,
    /// Checking the typed code
    VerifyCode,
    /// Using or refreshing an existing session
    Session,
}

/// Confirmation handle returned after the SMS was sent.
///
/// Lives only in the store's transient slot; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub session_info: String,
    pub phone_number: String,
}

/// Phone OTP sign-in backend.
#[async_trait]
pub trait PhoneAuthProvider: Send + Sync {
    /// Send a verification code to an E.164 number.
    async fn send_code(&self, phone_number: &str) -> Result<PendingVerification, AuthErrorKind>;

    /// Exchange the SMS code for a session.
    async fn confirm_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AuthSession, AuthErrorKind>;

    /// Get a fresh ID token for an existing session.
    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthErrorKind>;
}

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    identity_base_url: String,
    secure_token_base_url: String,
    api_key: String,
    recaptcha_token: Option<String>,
}

impl IdentityToolkitClient {
    pub fn new(
        identity_base_url: impl Into<String>,
        secure_token_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            identity_base_url: identity_base_url.into().trim_end_matches('/').to_string(),
            secure_token_base_url: secure_token_base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            recaptcha_token: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.identity_base_url.clone(),
            config.secure_token_base_url.clone(),
            config.firebase_api_key.clone(),
        )
    }

    /// App verification token sent with the next code request.
    ///
    /// Test numbers and the auth emulator do not need one.
    pub fn with_recaptcha_token(mut self, token: impl Into<String>) -> Self {
        self.recaptcha_token = Some(token.into());
        self
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AuthErrorKind> {
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e.without_url(), "Identity request failed");
                AuthErrorKind::Network
            })?;

        parse_response(response).await
    }
}

#[async_trait]
impl PhoneAuthProvider for IdentityToolkitClient {
    async fn send_code(&self, phone_number: &str) -> Result<PendingVerification, AuthErrorKind> {
        let url = format!("{}/accounts:sendVerificationCode", self.identity_base_url);
        let body = SendVerificationCodeRequest {
            phone_number,
            recaptcha_token: self.recaptcha_token.as_deref(),
        };

        let response: SendVerificationCodeResponse = self.post_json(&url, &body).await?;

        tracing::info!("Verification code sent");
        Ok(PendingVerification {
            session_info: response.session_info,
            phone_number: phone_number.to_string(),
        })
    }

    async fn confirm_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AuthSession, AuthErrorKind> {
        let url = format!("{}/accounts:signInWithPhoneNumber", self.identity_base_url);
        let body = SignInWithPhoneNumberRequest {
            session_info: &pending.session_info,
            code,
        };

        let response: SignInWithPhoneNumberResponse = self.post_json(&url, &body).await?;

        let session = AuthSession::from_tokens(
            response.id_token,
            response.refresh_token,
            parse_expires_in(&response.expires_in),
            response.local_id,
            response.phone_number.unwrap_or_else(|| pending.phone_number.clone()),
            response.is_new_user,
        );

        tracing::info!(uid = %session.uid, new_user = session.is_new_user, "Phone sign-in complete");
        Ok(session)
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthErrorKind> {
        let url = format!("{}/token", self.secure_token_base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e.without_url(), "Token refresh request failed");
                AuthErrorKind::Network
            })?;

        let refreshed: RefreshTokenResponse = parse_response(response).await?;

        tracing::debug!(uid = %refreshed.user_id, "ID token refreshed");
        Ok(AuthSession::from_tokens(
            refreshed.id_token,
            refreshed.refresh_token,
            parse_expires_in(&refreshed.expires_in),
            refreshed.user_id,
            session.phone_number.clone(),
            false,
        ))
    }
}

/// Parse a success body, or map the `{"error": {"message": CODE}}` body.
async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AuthErrorKind> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| {
            tracing::error!(error = %e.without_url(), "Identity response could not be parsed");
            AuthErrorKind::Unknown
        });
    }

    let body = response.text().await.unwrap_or_default();
    let kind = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => AuthErrorKind::from_backend(&envelope.error.message, None),
        Err(_) => {
            tracing::warn!(status = status.as_u16(), "Identity error without error body");
            AuthErrorKind::Unknown
        }
    };

    tracing::warn!(status = status.as_u16(), kind = %kind, "Identity request rejected");
    Err(kind)
}

/// `expiresIn` is a decimal string of seconds.
fn parse_expires_in(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(3600)
}

// ─── Wire types ──────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeRequest<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPhoneNumberRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPhoneNumberResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    is_new_user: bool,
    #[serde(default)]
    phone_number: Option<String>,
}

/// Secure-token responses use snake_case.
#[derive(Deserialize)]
struct RefreshTokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
