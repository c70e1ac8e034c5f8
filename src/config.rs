//! Configuration management for the SnapChef backend.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub quota: QuotaConfig,
    pub debug: DebugConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the durable collection snapshots
    pub data_directory: PathBuf,
    /// Directory for request-scoped image staging
    pub tmp_directory: PathBuf,
}

/// External generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

/// Quota and lifecycle policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Free analyses per tracked week
    pub free_weekly_limit: u32,
    pub analyze_cooldown_seconds: u64,
    pub regen_cooldown_seconds: u64,
    /// Regenerations per scan lifetime for free users
    pub free_regen_limit: u32,
    /// Scans older than this are evicted
    pub scan_retention_days: i64,
}

/// Debug/testing overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Shared secret gating the premium-override endpoint; endpoint is
    /// disabled when unset
    pub premium_override_secret: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SNAPCHEF_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SNAPCHEF_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version =
            env::var("SNAPCHEF_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("SNAPCHEF_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let tmp_directory = env::var("SNAPCHEF_TMP_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("tmp"));

        let api_key = env::var("SNAPCHEF_AI_API_KEY")
            .map_err(|_| AppError::Validation("Generation API key required".to_string()))?;
        let api_base_url = env::var("SNAPCHEF_AI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        let model =
            env::var("SNAPCHEF_AI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());
        let request_timeout_secs = env::var("SNAPCHEF_AI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let free_weekly_limit = env::var("SNAPCHEF_FREE_WEEKLY_LIMIT")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .unwrap_or(4);
        let analyze_cooldown_seconds = env::var("SNAPCHEF_ANALYZE_COOLDOWN_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let regen_cooldown_seconds = env::var("SNAPCHEF_REGEN_COOLDOWN_SECONDS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);
        let free_regen_limit = env::var("SNAPCHEF_FREE_REGEN_LIMIT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);
        let scan_retention_days = env::var("SNAPCHEF_SCAN_RETENTION_DAYS")
            .unwrap_or_else(|_| "14".to_string())
            .parse()
            .unwrap_or(14);

        let premium_override_secret = env::var("SNAPCHEF_DEBUG_PREMIUM_SECRET").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                tmp_directory,
            },
            generation: GenerationConfig {
                api_key,
                api_base_url,
                model,
                request_timeout_secs,
            },
            quota: QuotaConfig {
                free_weekly_limit,
                analyze_cooldown_seconds,
                regen_cooldown_seconds,
                free_regen_limit,
                scan_retention_days,
            },
            debug: DebugConfig {
                premium_override_secret,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.generation.api_key.is_empty() {
            return Err(AppError::Validation(
                "Generation API key cannot be empty".to_string(),
            ));
        }

        if self.quota.free_weekly_limit == 0 {
            return Err(AppError::Validation(
                "Free weekly limit must be at least 1".to_string(),
            ));
        }

        if self.quota.scan_retention_days < 1 {
            return Err(AppError::Validation(
                "Scan retention must be at least one day".to_string(),
            ));
        }

        Ok(())
    }
}
