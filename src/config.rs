// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::services::proximity::DEFAULT_PROXIMITY_RADIUS_METERS;
use std::env;
use std::time::Duration;

/// Default per-call timeout for collaborator requests.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Which execution store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store. Records are lost on restart.
    Memory,
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            _ => Err(ConfigError::Invalid("EXECUTION_STORE", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Base URL of the tour catalog (tours and key points)
    pub tour_service_url: String,
    /// Base URL of the location simulator
    pub location_service_url: String,
    /// Base URL of the shopping service RPC endpoint
    pub shopping_service_url: String,
    /// Distance in meters within which a key point counts as reached
    pub proximity_radius_meters: f64,
    /// Bound on every collaborator call
    pub upstream_timeout: Duration,
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let proximity_radius_meters = match env::var("PROXIMITY_RADIUS_METERS") {
            Ok(raw) => parse_radius(&raw)?,
            Err(_) => DEFAULT_PROXIMITY_RADIUS_METERS,
        };

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("UPSTREAM_TIMEOUT_SECS", raw))?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let store_backend = env::var("EXECUTION_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let gcp_project_id = match store_backend {
            StoreBackend::Firestore => {
                env::var("GCP_PROJECT_ID").map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?
            }
            StoreBackend::Memory => {
                env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string())
            }
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            tour_service_url: base_url("TOUR_SERVICE_URL", "http://tour-service:8080"),
            location_service_url: base_url("LOCATION_SERVICE_URL", "http://tour-service:8080"),
            shopping_service_url: base_url("SHOPPING_SERVICE_URL", "http://shopping-service:8082"),
            proximity_radius_meters,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            store_backend,
            gcp_project_id,
        })
    }

    /// Config for tests: in-memory store, unroutable collaborators.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:4200".to_string(),
            tour_service_url: "http://127.0.0.1:9".to_string(),
            location_service_url: "http://127.0.0.1:9".to_string(),
            shopping_service_url: "http://127.0.0.1:9".to_string(),
            proximity_radius_meters: DEFAULT_PROXIMITY_RADIUS_METERS,
            upstream_timeout: Duration::from_secs(2),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
        }
    }
}

fn base_url(key: &str, default: &str) -> String {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_radius(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r >= 0.0)
        .ok_or_else(|| ConfigError::Invalid("PROXIMITY_RADIUS_METERS", raw.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
