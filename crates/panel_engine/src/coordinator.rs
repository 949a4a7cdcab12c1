//! Operation surface of the run controller: save, start, stop.
//!
//! The coordinator owns the per-run subscription session and sequences the
//! three external interactions; run state itself lives in `panel_core` and
//! is driven by the notices this component forwards through its sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use panel_logging::{panel_info, panel_warn};

use crate::bus::{EventBus, ListenerHandle};
use crate::session::{NoticeSink, RunNotice, RunSession};
use crate::{ConfigStore, Engine, EngineConfig, EngineError, EngineEvent, EventKind, StoreError};

pub struct RunCoordinator<S, E> {
    store: S,
    engine: E,
    bus: Arc<EventBus>,
    sink: NoticeSink,
    session: Option<RunSession>,
    /// Lives for the whole panel, not per run: engine errors may arrive at
    /// any time and only ever surface as notifications.
    _error_listener: ListenerHandle,
}

impl<S: ConfigStore, E: Engine> RunCoordinator<S, E> {
    pub fn new(store: S, engine: E, bus: Arc<EventBus>, sink: NoticeSink) -> Self {
        let error_listener = {
            let sink = Arc::clone(&sink);
            bus.listen(EventKind::EngineError, move |event| {
                if let EngineEvent::EngineError(message) = event {
                    sink(RunNotice::ErrorReported(message.clone()));
                }
            })
        };
        Self {
            store,
            engine,
            bus,
            sink,
            session: None,
            _error_listener: error_listener,
        }
    }

    /// Reads the stored configuration record, `None` when absent.
    pub fn load_configuration(&self) -> Result<Option<EngineConfig>, StoreError> {
        self.store.get()
    }

    /// Persists the record; no run state is touched either way.
    pub fn save_configuration(&self, config: &EngineConfig) -> Result<(), EngineError> {
        self.store
            .set(config)
            .map_err(|err| EngineError::Persistence(err.to_string()))
    }

    /// Persist, subscribe, launch; in that order. Returns the launch
    /// timestamp on acceptance. On any failure nothing stays subscribed and
    /// the caller's status is expected to remain unchanged.
    pub fn start_run(&mut self, config: &EngineConfig) -> Result<DateTime<Utc>, EngineError> {
        // Nominally the previous session was already released at its
        // terminal or stop transition; never let one leak into a new run.
        if let Some(stale) = self.session.take() {
            panel_warn!("releasing stale run session before new launch");
            stale.teardown();
        }

        // A run must never start against an unsaved configuration.
        self.store
            .set(config)
            .map_err(|err| EngineError::Persistence(err.to_string()))?;

        // Subscribe before issuing the command: the sizing event may fire
        // on acceptance and must not be missed.
        let session = RunSession::install(&self.bus, Arc::clone(&self.sink));
        if let Err(err) = self.engine.run(config) {
            session.teardown();
            return Err(err);
        }
        self.session = Some(session);
        panel_info!("run command accepted");
        Ok(Utc::now())
    }

    /// Requests a stop and awaits acknowledgement. Listeners are released
    /// only on success: a failed stop leaves the run live and listening.
    pub fn stop_run(&mut self) -> Result<DateTime<Utc>, EngineError> {
        self.engine.stop()?;
        if let Some(session) = self.session.take() {
            session.teardown();
        }
        panel_info!("stop acknowledged");
        Ok(Utc::now())
    }

    /// Releases the session after the terminal event. The terminal handler
    /// has already cancelled the completion listener synchronously; this
    /// drops the remaining handles and frees whatever the engine still
    /// holds for the finished run, so the next run starts clean.
    pub fn finish_run(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
        self.engine.release();
    }
}
