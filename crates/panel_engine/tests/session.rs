use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use panel_engine::{EngineEvent, EventBus, EventKind, NoticeSink, RunNotice, RunSession};

fn recording_sink() -> (NoticeSink, Arc<Mutex<Vec<RunNotice>>>) {
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink: NoticeSink = {
        let notices = Arc::clone(&notices);
        Arc::new(move |notice| notices.lock().unwrap().push(notice))
    };
    (sink, notices)
}

#[test]
fn full_run_forwards_notices_in_order() {
    let bus = EventBus::new();
    let (sink, notices) = recording_sink();
    let session = RunSession::install(&bus, sink);

    bus.emit(EngineEvent::TotalJobs(10));
    for _ in 0..5 {
        bus.emit(EngineEvent::JobComplete);
    }
    bus.emit(EngineEvent::RunCompleted);

    // Late in-flight completion after the terminal event: no listener left.
    bus.emit(EngineEvent::JobComplete);

    let mut expected = vec![RunNotice::Sized(10)];
    expected.extend(std::iter::repeat_n(RunNotice::Progressed, 5));
    expected.push(RunNotice::Finished);
    assert_eq!(*notices.lock().unwrap(), expected);

    session.teardown();
    assert_eq!(bus.listener_count(EventKind::JobComplete), 0);
    assert_eq!(bus.listener_count(EventKind::RunCompleted), 0);
}

#[test]
fn completions_before_sizing_reach_no_listener() {
    let bus = EventBus::new();
    let (sink, notices) = recording_sink();
    let _session = RunSession::install(&bus, sink);

    // The completion listener is only installed once the run is sized, so
    // nothing can be counted against a stale total of zero.
    bus.emit(EngineEvent::JobComplete);
    bus.emit(EngineEvent::JobComplete);
    assert!(notices.lock().unwrap().is_empty());

    bus.emit(EngineEvent::TotalJobs(2));
    bus.emit(EngineEvent::JobComplete);
    assert_eq!(
        *notices.lock().unwrap(),
        vec![RunNotice::Sized(2), RunNotice::Progressed]
    );
}

#[test]
fn teardown_releases_every_listener() {
    let bus = EventBus::new();
    let (sink, notices) = recording_sink();
    let session = RunSession::install(&bus, sink);

    bus.emit(EngineEvent::TotalJobs(4));
    bus.emit(EngineEvent::JobComplete);
    session.teardown();

    assert_eq!(bus.listener_count(EventKind::TotalJobs), 0);
    assert_eq!(bus.listener_count(EventKind::JobComplete), 0);
    assert_eq!(bus.listener_count(EventKind::RunCompleted), 0);

    // Stopped runs ignore whatever still arrives in flight.
    bus.emit(EngineEvent::JobComplete);
    bus.emit(EngineEvent::RunCompleted);
    assert_eq!(
        *notices.lock().unwrap(),
        vec![RunNotice::Sized(4), RunNotice::Progressed]
    );

    // Teardown is idempotent.
    session.teardown();
}

#[test]
fn teardown_before_sizing_cancels_the_sizing_listener() {
    let bus = EventBus::new();
    let (sink, notices) = recording_sink();
    let session = RunSession::install(&bus, sink);
    assert_eq!(bus.listener_count(EventKind::TotalJobs), 1);

    session.teardown();
    assert_eq!(bus.listener_count(EventKind::TotalJobs), 0);

    bus.emit(EngineEvent::TotalJobs(9));
    assert!(notices.lock().unwrap().is_empty());
    // The chain never grew either.
    assert_eq!(bus.listener_count(EventKind::JobComplete), 0);
}

#[test]
fn sequential_runs_never_overlap_listeners() {
    let bus = EventBus::new();

    for round in 1..=3u64 {
        let (sink, notices) = recording_sink();
        let session = RunSession::install(&bus, sink);
        assert_eq!(bus.listener_count(EventKind::TotalJobs), 1);
        assert_eq!(bus.listener_count(EventKind::JobComplete), 0);

        bus.emit(EngineEvent::TotalJobs(round));
        // Exactly one completion listener per run, installed post-sizing.
        assert_eq!(bus.listener_count(EventKind::JobComplete), 1);

        bus.emit(EngineEvent::JobComplete);
        bus.emit(EngineEvent::RunCompleted);
        // The terminal handler cancelled the completion listener in the
        // same continuation; both one-shots are already spent.
        assert_eq!(bus.listener_count(EventKind::JobComplete), 0);
        assert_eq!(bus.listener_count(EventKind::RunCompleted), 0);

        session.teardown();
        assert_eq!(bus.listener_count(EventKind::TotalJobs), 0);
        assert_eq!(
            *notices.lock().unwrap(),
            vec![
                RunNotice::Sized(round),
                RunNotice::Progressed,
                RunNotice::Finished
            ]
        );
    }
}
