//! Application configuration loaded from environment variables.
//!
//! API keys are read once at start-up and kept in memory; they are never
//! written to logs.

use crate::services::fare::FareSchedule;
use std::env;
use std::path::PathBuf;

const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_SECURE_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Endpoints (non-sensitive) ---
    /// Google Maps REST base URL (directions, geocode)
    pub maps_base_url: String,
    /// Identity Toolkit base URL (phone OTP sign-in)
    pub identity_base_url: String,
    /// Secure token base URL (ID token refresh)
    pub secure_token_base_url: String,
    /// GCP / Firebase project ID
    pub gcp_project_id: String,

    // --- Device ---
    /// Directory holding the persisted client store
    pub storage_dir: PathBuf,
    /// Country code used when the user types a local number
    pub default_country_code: String,
    /// Fare constants for the current market
    pub fare: FareSchedule,

    // --- Secrets ---
    /// Google Maps API key
    pub maps_api_key: String,
    /// Firebase web API key
    pub firebase_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = FareSchedule::default();
        let fare = FareSchedule {
            base_fare: parse_or("FARE_BASE", defaults.base_fare)?,
            per_km: parse_or("FARE_PER_KM", defaults.per_km)?,
            per_minute: parse_or("FARE_PER_MIN", defaults.per_minute)?,
            rounding: parse_or("FARE_ROUNDING", defaults.rounding)?,
        };
        if fare.rounding <= 0.0 {
            return Err(ConfigError::Invalid("FARE_ROUNDING"));
        }

        Ok(Self {
            maps_base_url: env::var("MAPS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MAPS_BASE_URL.to_string()),
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_BASE_URL.to_string()),
            secure_token_base_url: env::var("SECURE_TOKEN_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SECURE_TOKEN_BASE_URL.to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_dir: env::var("BLU_MAZE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "+221".to_string()),
            fare,

            maps_api_key: env::var("GOOGLE_MAPS_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?,
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            maps_base_url: "http://localhost:9090/maps/api".to_string(),
            identity_base_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1"
                .to_string(),
            secure_token_base_url: "http://localhost:9099/securetoken.googleapis.com/v1"
                .to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_dir: env::temp_dir(),
            default_country_code: "+221".to_string(),
            fare: FareSchedule::default(),
            maps_api_key: "test_maps_key".to_string(),
            firebase_api_key: "test_firebase_key".to_string(),
        }
    }

    /// Path of the persisted client store.
    pub fn store_path(&self) -> PathBuf {
        self.storage_dir
            .join(format!("{}.json", crate::store::STORAGE_NAME))
    }
}

fn parse_or(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or(ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
