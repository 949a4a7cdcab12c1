use chrono::TimeDelta;

use crate::{Notice, RunConfig, RunStatus};

/// Everything the presentation layer needs for one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelViewModel {
    pub status: RunStatus,
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub progress_percentage: u8,
    /// Set once at the terminal transition, never ticked while running.
    pub elapsed: Option<TimeDelta>,
    pub is_stoppable: bool,
    pub config: RunConfig,
    pub last_notice: Option<Notice>,
    pub dirty: bool,
}

/// Derived on every read, never stored, so it cannot drift from the counts.
/// Clamped to 100 even for counts that exceed the total.
pub fn progress_percentage(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
