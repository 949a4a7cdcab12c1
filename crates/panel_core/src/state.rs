use chrono::{DateTime, TimeDelta, Utc};

use crate::view_model::{progress_percentage, PanelViewModel};
use crate::RunConfig;

/// Exhaustive run status; `Completed` and `Stopped` are resting states that
/// the next run leaves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// User-visible notification (the toast equivalent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelState {
    status: RunStatus,
    total_jobs: u64,
    completed_jobs: u64,
    started_at: Option<DateTime<Utc>>,
    elapsed: Option<TimeDelta>,
    /// Set between `RunClicked` and the launch outcome so a second click
    /// cannot race a launch that has not been accepted yet.
    launch_in_flight: bool,
    config: RunConfig,
    last_notice: Option<Notice>,
    dirty: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PanelViewModel {
        PanelViewModel {
            status: self.status,
            total_jobs: self.total_jobs,
            completed_jobs: self.completed_jobs,
            progress_percentage: progress_percentage(self.completed_jobs, self.total_jobs),
            elapsed: self.elapsed,
            is_stoppable: self.status == RunStatus::Running,
            config: self.config.clone(),
            last_notice: self.last_notice.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns the dirty flag and clears it; the platform layer renders
    /// only when this reports true.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: RunConfig) {
        self.config = config;
        self.mark_dirty();
    }

    pub(crate) fn can_launch(&self) -> bool {
        self.status != RunStatus::Running && !self.launch_in_flight
    }

    /// Opens the launch window. Counters reset here, not at acceptance:
    /// engine events may be dispatched before the acceptance message is.
    pub(crate) fn begin_launch(&mut self) {
        self.launch_in_flight = true;
        self.total_jobs = 0;
        self.completed_jobs = 0;
        self.elapsed = None;
        self.mark_dirty();
    }

    /// Launch failed or was rejected; whatever arrived during the launch
    /// window belonged to no run.
    pub(crate) fn launch_settled(&mut self) {
        if self.launch_in_flight {
            self.total_jobs = 0;
            self.completed_jobs = 0;
        }
        self.launch_in_flight = false;
        self.mark_dirty();
    }

    /// Launch accepted. Counters are kept: the sizing event and the first
    /// completions may already have been applied during the launch window.
    pub(crate) fn start_run(&mut self, at: DateTime<Utc>) {
        self.launch_in_flight = false;
        self.status = RunStatus::Running;
        self.started_at = Some(at);
        self.elapsed = None;
        self.mark_dirty();
    }

    /// True while engine events count: a live run, or a launch window whose
    /// acceptance message has not been dispatched yet.
    fn counting(&self) -> bool {
        self.status == RunStatus::Running || self.launch_in_flight
    }

    /// Applies the one-shot sizing event. Returns false when the message is
    /// ignored (no run to size, or the run was already sized).
    pub(crate) fn apply_sized(&mut self, total: u64) -> bool {
        if !self.counting() || self.total_jobs != 0 {
            return false;
        }
        self.total_jobs = total;
        self.mark_dirty();
        true
    }

    /// Applies one completion event. Counts only while a run is live or
    /// launching, only once the run is sized, and never past the announced
    /// total.
    pub(crate) fn apply_job_completed(&mut self) -> bool {
        if !self.counting() {
            return false;
        }
        if self.total_jobs == 0 || self.completed_jobs >= self.total_jobs {
            return false;
        }
        self.completed_jobs += 1;
        self.mark_dirty();
        true
    }

    /// Terminal transition; `elapsed` is computed exactly once here.
    pub(crate) fn settle(&mut self, status: RunStatus, at: DateTime<Utc>) {
        self.elapsed = self.started_at.map(|started| at - started);
        self.status = status;
        self.mark_dirty();
    }

    pub(crate) fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.last_notice = Some(Notice {
            level,
            text: text.into(),
        });
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
