use anyhow::Result;
use std::sync::Arc;

use crate::{AppError, Config};

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _validation) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    /// Create an application instance around an already loaded configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Prepare the data directory used by the persisted stores
    pub fn initialize(&mut self) -> Result<()> {
        let data_dir = &self.config.storage.data_dir;
        std::fs::create_dir_all(data_dir).map_err(AppError::Io)?;

        tracing::info!(
            data_dir = %data_dir.display(),
            search_configured = self.config.search.has_api_key(),
            "Application initialized successfully"
        );
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the configuration
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().join("nested").join("data");

        let mut app = App::with_config(config);
        app.initialize().unwrap();

        assert!(app.config().storage.data_dir.is_dir());
        app.shutdown().unwrap();
    }

    #[test]
    fn test_initialize_reports_unusable_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut config = Config::default();
        config.storage.data_dir = blocker.join("skycast");

        let mut app = App::with_config(config);
        let err = app.initialize().unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Io(_))));
    }
}
