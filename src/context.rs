//! Application context and dependency injection.

use crate::{
    config::ServerConfig,
    error::{AppError, AppResult},
    generation::{GeminiClient, RecipeGenerator, VisionModel},
    quota::QuotaTracker,
    scans::ScanRegistry,
    store::{DiskBackend, StorageBackend},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub quota: Arc<QuotaTracker>,
    pub scans: Arc<ScanRegistry>,
    pub generator: Arc<RecipeGenerator>,
}

impl AppContext {
    /// Production wiring: disk-backed store and the real model client.
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;
        Self::ensure_directories(&config).await?;

        let backend: Arc<dyn StorageBackend> =
            Arc::new(DiskBackend::new(config.storage.data_directory.clone()));
        let model: Arc<dyn VisionModel> = Arc::new(GeminiClient::new(
            config.generation.api_base_url.clone(),
            config.generation.model.clone(),
            config.generation.api_key.clone(),
            config.generation.request_timeout_secs,
        )?);

        Self::assemble(config, backend, model).await
    }

    /// Wiring seam shared with tests (memory backend, scripted model).
    pub async fn assemble(
        config: ServerConfig,
        backend: Arc<dyn StorageBackend>,
        model: Arc<dyn VisionModel>,
    ) -> AppResult<Self> {
        let quota = Arc::new(QuotaTracker::open(Arc::clone(&backend)).await?);
        let scans = Arc::new(ScanRegistry::open(backend).await?);
        let generator = Arc::new(RecipeGenerator::new(model));

        Ok(Self {
            config: Arc::new(config),
            quota,
            scans,
            generator,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.tmp_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }
        Ok(())
    }

    /// Wall-clock epoch milliseconds; domain calls take this as a parameter
    /// so tests can inject their own clock.
    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
