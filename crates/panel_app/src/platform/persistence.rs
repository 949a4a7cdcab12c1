use std::fs;
use std::path::PathBuf;

use panel_engine::{AtomicFileWriter, ConfigStore, EngineConfig, StoreError};
use panel_logging::{panel_info, panel_warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "panel_config.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedConfig {
    browser_path: Option<String>,
    user_data_dir: String,
    headless: bool,
    wait_for_navigation: u64,
    max_retries: u32,
    tab_count: u32,
}

impl From<&EngineConfig> for PersistedConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            browser_path: config.browser_path.clone(),
            user_data_dir: config.user_data_dir.clone(),
            headless: config.headless,
            wait_for_navigation: config.wait_for_navigation,
            max_retries: config.max_retries,
            tab_count: config.tab_count,
        }
    }
}

impl From<PersistedConfig> for EngineConfig {
    fn from(persisted: PersistedConfig) -> Self {
        Self {
            browser_path: persisted.browser_path,
            user_data_dir: persisted.user_data_dir,
            headless: persisted.headless,
            wait_for_navigation: persisted.wait_for_navigation,
            max_retries: persisted.max_retries,
            tab_count: persisted.tab_count,
        }
    }
}

/// RON file store for the configuration record, written atomically.
pub(crate) struct RonConfigStore {
    dir: PathBuf,
}

impl RonConfigStore {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl ConfigStore for RonConfigStore {
    /// Lenient load: a missing or unreadable record is `None`, so a fresh
    /// install or a corrupted file both land on defaults.
    fn get(&self) -> Result<Option<EngineConfig>, StoreError> {
        let path = self.dir.join(CONFIG_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(err) => {
                panel_warn!("Failed to read configuration from {:?}: {}", path, err);
                return Ok(None);
            }
        };

        match ron::from_str::<PersistedConfig>(&content) {
            Ok(persisted) => {
                panel_info!("Loaded configuration from {:?}", path);
                Ok(Some(persisted.into()))
            }
            Err(err) => {
                panel_warn!("Failed to parse configuration from {:?}: {}", path, err);
                Ok(None)
            }
        }
    }

    /// A failed save is reported to the operator; saving is never retried.
    fn set(&self, config: &EngineConfig) -> Result<(), StoreError> {
        let persisted = PersistedConfig::from(config);
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&persisted, pretty)
            .map_err(|err| StoreError::new(err.to_string()))?;

        let writer = AtomicFileWriter::new(self.dir.clone());
        writer
            .write(CONFIG_FILENAME, &content)
            .map_err(|err| StoreError::new(err.to_string()))?;
        panel_info!("Saved configuration to {:?}", self.dir.join(CONFIG_FILENAME));
        Ok(())
    }
}
