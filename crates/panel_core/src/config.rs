use thiserror::Error;

/// Upper bound for `max_retries`, inclusive.
pub const MAX_RETRIES_LIMIT: u32 = 10;

const fn default_wait_for_navigation() -> u64 {
    5
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_tab_count() -> u32 {
    5
}

/// Browser launch parameters for one automation run.
///
/// The panel validates the numeric bounds but otherwise treats the record as
/// opaque: values are transported to the store and the engine unchanged.
/// In particular `max_retries` is forwarded, never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Browser executable override; the engine picks its own when unset.
    pub browser_path: Option<String>,
    /// Profile directory; the engine falls back to the platform default.
    pub user_data_dir: Option<String>,
    /// Launch the browser without a visible window.
    pub headless: bool,
    /// Seconds to wait after each navigation.
    pub wait_for_navigation_secs: u64,
    /// Per-job retry budget, forwarded opaquely to the engine.
    pub max_retries: u32,
    /// Number of browser tabs the engine may drive concurrently.
    pub tab_count: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            user_data_dir: None,
            headless: false,
            wait_for_navigation_secs: default_wait_for_navigation(),
            max_retries: default_max_retries(),
            tab_count: default_tab_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("navigation timeout must be at least 1 second")]
    NavigationTimeoutZero,
    #[error("max retries must be between 0 and {MAX_RETRIES_LIMIT}, got {0}")]
    MaxRetriesOutOfRange(u32),
    #[error("tab count must be at least 1")]
    TabCountZero,
}

impl RunConfig {
    /// Checks the documented numeric bounds; string fields are free-form.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_for_navigation_secs == 0 {
            return Err(ConfigError::NavigationTimeoutZero);
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::MaxRetriesOutOfRange(self.max_retries));
        }
        if self.tab_count == 0 {
            return Err(ConfigError::TabCountZero);
        }
        Ok(())
    }
}
