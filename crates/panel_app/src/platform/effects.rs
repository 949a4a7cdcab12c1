use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use chrono::Utc;
use panel_core::{Effect, Msg, RunConfig};
use panel_engine::{
    EngineConfig, EngineError, EventBus, NoticeSink, ProcessEngine, RunCoordinator, RunNotice,
};
use panel_logging::panel_warn;

use super::persistence::RonConfigStore;

/// Executes core effects against the coordinator and feeds every outcome
/// back into the dispatch channel as a message.
pub(crate) struct EffectRunner {
    coordinator: RunCoordinator<RonConfigStore, ProcessEngine>,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub(crate) fn new(config_dir: PathBuf, engine_bin: PathBuf, msg_tx: mpsc::Sender<Msg>) -> Self {
        let bus = EventBus::new();
        let sink: NoticeSink = {
            let tx = msg_tx.clone();
            Arc::new(move |notice| {
                let _ = tx.send(map_notice(notice));
            })
        };
        let store = RonConfigStore::new(config_dir);
        let engine = ProcessEngine::new(engine_bin, Arc::clone(&bus));
        let coordinator = RunCoordinator::new(store, engine, bus, sink);
        Self {
            coordinator,
            msg_tx,
        }
    }

    /// Reads the stored record for the initial form, defaults when absent.
    pub(crate) fn load_config(&self) -> RunConfig {
        match self.coordinator.load_configuration() {
            Ok(Some(stored)) => panel_config(stored),
            Ok(None) => RunConfig::default(),
            Err(err) => {
                panel_warn!("configuration store unavailable: {err}");
                RunConfig::default()
            }
        }
    }

    /// Called when the terminal event has been dispatched, so the run's
    /// remaining listeners are released before any new launch.
    pub(crate) fn finish_session(&mut self) {
        self.coordinator.finish_run();
    }

    pub(crate) fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let outcome = match effect {
                Effect::PersistConfig(config) => {
                    match self.coordinator.save_configuration(&engine_config(&config)) {
                        Ok(()) => Msg::ConfigSaved,
                        Err(err) => Msg::ConfigSaveFailed(err.to_string()),
                    }
                }
                Effect::StartRun(config) => {
                    match self.coordinator.start_run(&engine_config(&config)) {
                        Ok(at) => Msg::RunLaunched { at },
                        // Aborted before the run command; nothing launched.
                        Err(EngineError::Persistence(reason)) => Msg::ConfigSaveFailed(reason),
                        Err(err) => Msg::RunRejected(err.to_string()),
                    }
                }
                Effect::StopRun => match self.coordinator.stop_run() {
                    Ok(at) => Msg::RunStopped { at },
                    Err(err) => Msg::StopFailed(err.to_string()),
                },
            };
            let _ = self.msg_tx.send(outcome);
        }
    }
}

fn map_notice(notice: RunNotice) -> Msg {
    match notice {
        RunNotice::Sized(total) => Msg::RunSized { total },
        RunNotice::Progressed => Msg::JobCompleted,
        RunNotice::Finished => Msg::RunFinished { at: Utc::now() },
        RunNotice::ErrorReported(message) => Msg::EngineErrorReported(message),
    }
}

fn engine_config(config: &RunConfig) -> EngineConfig {
    EngineConfig {
        browser_path: config.browser_path.clone(),
        user_data_dir: config
            .user_data_dir
            .clone()
            .unwrap_or_else(|| EngineConfig::default().user_data_dir),
        headless: config.headless,
        wait_for_navigation: config.wait_for_navigation_secs,
        max_retries: config.max_retries,
        tab_count: config.tab_count,
    }
}

fn panel_config(config: EngineConfig) -> RunConfig {
    RunConfig {
        browser_path: config.browser_path,
        user_data_dir: Some(config.user_data_dir),
        headless: config.headless,
        wait_for_navigation_secs: config.wait_for_navigation,
        max_retries: config.max_retries,
        tab_count: config.tab_count,
    }
}
