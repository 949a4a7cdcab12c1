use std::sync::Once;

use chrono::{DateTime, TimeDelta, Utc};
use panel_core::{update, Effect, Msg, NoticeLevel, PanelState, RunStatus};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(panel_logging::initialize_for_tests);
}

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

/// Click Run and feed back the launch acceptance, as the coordinator would.
fn launch(state: PanelState, at_secs: i64) -> PanelState {
    let (state, effects) = update(state, Msg::RunClicked);
    assert!(matches!(effects.as_slice(), [Effect::StartRun(_)]));
    let (state, effects) = update(state, Msg::RunLaunched { at: ts(at_secs) });
    assert!(effects.is_empty());
    state
}

#[test]
fn run_click_emits_start_effect_with_current_config() {
    init_logging();
    let state = PanelState::new();
    let config = state.config().clone();

    let (state, effects) = update(state, Msg::RunClicked);

    assert_eq!(effects, vec![Effect::StartRun(config)]);
    // Not running yet: the launch has not been accepted.
    assert_eq!(state.status(), RunStatus::Idle);
}

#[test]
fn sized_run_with_five_completions_reads_fifty_percent() {
    init_logging();
    let state = launch(PanelState::new(), 0);
    let (state, _) = update(state, Msg::RunSized { total: 10 });
    let state = (0..5).fold(state, |state, _| update(state, Msg::JobCompleted).0);

    let view = state.view();
    assert_eq!(view.status, RunStatus::Running);
    assert_eq!(view.total_jobs, 10);
    assert_eq!(view.completed_jobs, 5);
    assert_eq!(view.progress_percentage, 50);
    assert!(view.is_stoppable);
    assert!(view.elapsed.is_none());
}

#[test]
fn terminal_event_sets_elapsed_and_freezes_counts() {
    init_logging();
    let state = launch(PanelState::new(), 0);
    let (state, _) = update(state, Msg::RunSized { total: 10 });
    let state = (0..5).fold(state, |state, _| update(state, Msg::JobCompleted).0);

    let (state, effects) = update(state, Msg::RunFinished { at: ts(90) });
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, RunStatus::Completed);
    assert_eq!(view.elapsed, Some(TimeDelta::seconds(90)));
    assert!(!view.is_stoppable);

    // A sixth completion delivered late must not move the counter.
    let (state, _) = update(state, Msg::JobCompleted);
    assert_eq!(state.view().completed_jobs, 5);
    assert_eq!(state.view().status, RunStatus::Completed);
}

#[test]
fn stop_before_sizing_reads_zero_progress() {
    init_logging();
    let state = launch(PanelState::new(), 0);

    let (state, effects) = update(state, Msg::StopClicked);
    assert_eq!(effects, vec![Effect::StopRun]);

    let (state, _) = update(state, Msg::RunStopped { at: ts(3) });
    let view = state.view();
    assert_eq!(view.status, RunStatus::Stopped);
    assert_eq!(view.total_jobs, 0);
    assert_eq!(view.completed_jobs, 0);
    assert_eq!(view.progress_percentage, 0);
    assert_eq!(view.elapsed, Some(TimeDelta::seconds(3)));
}

#[test]
fn stop_failure_leaves_run_live() {
    init_logging();
    let state = launch(PanelState::new(), 0);
    let (state, _) = update(state, Msg::RunSized { total: 4 });

    let (state, _) = update(state, Msg::StopClicked);
    let (state, effects) = update(state, Msg::StopFailed("engine unreachable".into()));
    assert!(effects.is_empty());

    let view = state.view();
    assert_eq!(view.status, RunStatus::Running);
    assert!(view.is_stoppable);
    assert_eq!(view.last_notice.as_ref().unwrap().level, NoticeLevel::Error);

    // The engine never stopped, so progress keeps flowing.
    let (state, _) = update(state, Msg::JobCompleted);
    assert_eq!(state.view().completed_jobs, 1);
}

#[test]
fn stop_clicked_outside_a_run_is_noop() {
    init_logging();
    let state = PanelState::new();
    let (state, effects) = update(state, Msg::StopClicked);
    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Idle);
}

#[test]
fn launch_rejection_reverts_and_allows_retry() {
    init_logging();
    let state = PanelState::new();
    let (state, _) = update(state, Msg::RunClicked);
    let (mut state, _) = update(state, Msg::RunRejected("no browser found".into()));

    assert_eq!(state.status(), RunStatus::Idle);
    let notice = state.view().last_notice.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.text.contains("Failed to start automation"));
    assert!(state.consume_dirty());

    // The failed launch must not wedge the panel.
    let (_, effects) = update(state, Msg::RunClicked);
    assert!(matches!(effects.as_slice(), [Effect::StartRun(_)]));
}

#[test]
fn run_click_while_launch_pending_is_rejected() {
    init_logging();
    let state = PanelState::new();
    let (state, effects) = update(state, Msg::RunClicked);
    assert_eq!(effects.len(), 1);

    // Acceptance has not arrived yet; a second click must not double-launch.
    let (state, effects) = update(state, Msg::RunClicked);
    assert!(effects.is_empty());
    assert_eq!(
        state.view().last_notice.unwrap().text,
        "A run is already active"
    );

    let (state, _) = update(state, Msg::RunLaunched { at: ts(0) });
    let (_, effects) = update(state, Msg::RunClicked);
    assert!(effects.is_empty());
}

#[test]
fn completed_and_stopped_are_resting_states() {
    init_logging();
    let state = launch(PanelState::new(), 0);
    let (state, _) = update(state, Msg::RunSized { total: 2 });
    let (state, _) = update(state, Msg::JobCompleted);
    let (state, _) = update(state, Msg::RunFinished { at: ts(10) });
    assert_eq!(state.status(), RunStatus::Completed);

    // Starting again resets every per-run field.
    let state = launch(state, 20);
    let view = state.view();
    assert_eq!(view.status, RunStatus::Running);
    assert_eq!(view.total_jobs, 0);
    assert_eq!(view.completed_jobs, 0);
    assert!(view.elapsed.is_none());

    let (state, _) = update(state, Msg::RunSized { total: 3 });
    let (state, _) = update(state, Msg::JobCompleted);
    assert_eq!(state.view().completed_jobs, 1);
    assert_eq!(state.view().progress_percentage, 33);
}

#[test]
fn engine_error_is_notification_only() {
    init_logging();
    let state = launch(PanelState::new(), 0);
    let (state, _) = update(state, Msg::RunSized { total: 5 });
    let (state, _) = update(state, Msg::JobCompleted);

    let (state, effects) = update(state, Msg::EngineErrorReported("tab crashed".into()));
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, RunStatus::Running);
    assert_eq!(view.completed_jobs, 1);
    assert_eq!(view.last_notice.unwrap().text, "tab crashed");
}

#[test]
fn save_flow_reports_success_and_failure() {
    init_logging();
    let state = PanelState::new();
    let config = state.config().clone();

    let (state, effects) = update(state, Msg::SaveClicked);
    assert_eq!(effects, vec![Effect::PersistConfig(config)]);

    let (state, _) = update(state, Msg::ConfigSaved);
    assert_eq!(
        state.view().last_notice.unwrap().level,
        NoticeLevel::Success
    );

    // Store rejection: reported, no status change.
    let (state, _) = update(state, Msg::ConfigSaveFailed("disk full".into()));
    let view = state.view();
    assert_eq!(view.status, RunStatus::Idle);
    assert_eq!(view.last_notice.as_ref().unwrap().level, NoticeLevel::Error);
    assert!(view.last_notice.unwrap().text.contains("disk full"));
}
