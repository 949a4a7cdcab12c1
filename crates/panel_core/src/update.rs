use crate::{Effect, Msg, NoticeLevel, PanelState, RunStatus};

/// Pure update function: applies a message to state and returns any effects.
///
/// Engine events arrive here already serialized onto the single dispatch
/// thread, so no transition can interleave with another.
pub fn update(mut state: PanelState, msg: Msg) -> (PanelState, Vec<Effect>) {
    let effects = match msg {
        Msg::ConfigLoaded(config) => {
            // A store record that fails the bounds falls back to defaults;
            // the operator can still save a corrected one.
            let config = match config.validate() {
                Ok(()) => config,
                Err(_) => crate::RunConfig::default(),
            };
            state.set_config(config);
            Vec::new()
        }
        Msg::ConfigEdited(config) => {
            match config.validate() {
                Ok(()) => state.set_config(config),
                Err(err) => {
                    state.notify(NoticeLevel::Error, format!("Invalid configuration: {err}"))
                }
            }
            Vec::new()
        }
        Msg::SaveClicked => vec![Effect::PersistConfig(state.config().clone())],
        Msg::RunClicked => {
            if state.can_launch() {
                state.begin_launch();
                vec![Effect::StartRun(state.config().clone())]
            } else {
                // Explicit rejection rather than relying on the front end
                // disabling the button.
                state.notify(NoticeLevel::Error, "A run is already active");
                Vec::new()
            }
        }
        Msg::StopClicked => {
            if state.status() == RunStatus::Running {
                vec![Effect::StopRun]
            } else {
                Vec::new()
            }
        }
        Msg::ConfigSaved => {
            state.notify(NoticeLevel::Success, "Configuration saved successfully");
            Vec::new()
        }
        Msg::ConfigSaveFailed(reason) => {
            state.launch_settled();
            state.notify(
                NoticeLevel::Error,
                format!("Failed to save configuration: {reason}"),
            );
            Vec::new()
        }
        Msg::RunLaunched { at } => {
            state.start_run(at);
            Vec::new()
        }
        Msg::RunRejected(reason) => {
            state.launch_settled();
            state.notify(
                NoticeLevel::Error,
                format!("Failed to start automation: {reason}"),
            );
            Vec::new()
        }
        Msg::RunSized { total } => {
            // May arrive before the launch acceptance message when the
            // engine announces the total during command acceptance; ignored
            // outside a run and on a duplicate sizing event.
            state.apply_sized(total);
            Vec::new()
        }
        Msg::JobCompleted => {
            // Ignored before the sizing event and after a terminal
            // transition; late in-flight completions must not count.
            state.apply_job_completed();
            Vec::new()
        }
        Msg::RunFinished { at } => {
            if state.status() == RunStatus::Running {
                state.settle(RunStatus::Completed, at);
            }
            Vec::new()
        }
        Msg::RunStopped { at } => {
            if state.status() == RunStatus::Running {
                state.settle(RunStatus::Stopped, at);
                state.notify(NoticeLevel::Info, "Automation stopped");
            }
            Vec::new()
        }
        Msg::StopFailed(reason) => {
            // The engine may still be running; status stays Running.
            state.notify(
                NoticeLevel::Error,
                format!("Failed to stop automation: {reason}"),
            );
            Vec::new()
        }
        Msg::EngineErrorReported(message) => {
            // Notification only; an engine error does not end the run.
            state.notify(NoticeLevel::Error, message);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
