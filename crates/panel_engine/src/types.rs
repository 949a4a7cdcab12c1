use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(target_os = "windows")]
fn default_user_data_dir() -> String {
    format!(
        r#"{}\AppData\Local\Google\Chrome\User Data"#,
        std::env::var("USERPROFILE").unwrap_or_default()
    )
}

#[cfg(not(target_os = "windows"))]
fn default_user_data_dir() -> String {
    "~/.chromium".to_string()
}

const fn default_wait_for_navigation() -> u64 {
    5
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_tab_count() -> u32 {
    5
}

/// Wire-level configuration record, the shape the engine and the store see.
///
/// Field names are camelCase on the wire for compatibility with the engine's
/// own config parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub browser_path: Option<String>,

    #[serde(default = "default_user_data_dir")]
    pub user_data_dir: String,

    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_wait_for_navigation")]
    pub wait_for_navigation: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_tab_count")]
    pub tab_count: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            user_data_dir: default_user_data_dir(),
            headless: false,
            wait_for_navigation: default_wait_for_navigation(),
            max_retries: default_max_retries(),
            tab_count: default_tab_count(),
        }
    }
}

/// One event from the engine's outbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One-shot per run: the total job count for the run just started.
    TotalJobs(u64),
    /// Repeating per run: one job finished. Any payload is ignored.
    JobComplete,
    /// One-shot per run, terminal: the run finished on its own.
    RunCompleted,
    /// May arrive at any time; surfaced to the operator, nothing more.
    EngineError(String),
}

/// Bus topic key, one per event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TotalJobs,
    JobComplete,
    RunCompleted,
    EngineError,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::TotalJobs(_) => EventKind::TotalJobs,
            EngineEvent::JobComplete => EventKind::JobComplete,
            EngineEvent::RunCompleted => EventKind::RunCompleted,
            EngineEvent::EngineError(_) => EventKind::EngineError,
        }
    }
}

/// Failures at the engine/store boundary, matching what the operator sees.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration record could not be saved; no run was started.
    #[error("configuration could not be persisted: {0}")]
    Persistence(String),
    /// The engine rejected or failed the run command.
    #[error("engine rejected the run command: {0}")]
    Launch(String),
    /// The engine did not acknowledge the stop command; the run may still
    /// be live.
    #[error("engine did not acknowledge stop: {0}")]
    Stop(String),
    /// A line on the event stream did not parse.
    #[error("malformed engine event: {0}")]
    Protocol(String),
}
