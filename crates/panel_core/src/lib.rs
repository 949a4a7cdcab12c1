//! Panel core: pure run-lifecycle state machine and view-model helpers.
mod config;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use config::{ConfigError, RunConfig, MAX_RETRIES_LIMIT};
pub use effect::Effect;
pub use msg::Msg;
pub use state::{Notice, NoticeLevel, PanelState, RunStatus};
pub use update::update;
pub use view_model::{progress_percentage, PanelViewModel};
