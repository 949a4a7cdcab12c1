use chrono::{DateTime, Utc};

use crate::RunConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Configuration record loaded from the store at startup.
    ConfigLoaded(RunConfig),
    /// Operator edited the configuration form.
    ConfigEdited(RunConfig),
    /// Operator clicked Save.
    SaveClicked,
    /// Operator clicked Run.
    RunClicked,
    /// Operator clicked Stop.
    StopClicked,
    /// Store acknowledged a save.
    ConfigSaved,
    /// Store rejected or failed a save.
    ConfigSaveFailed(String),
    /// Engine accepted the run command.
    RunLaunched { at: DateTime<Utc> },
    /// Engine rejected the run command.
    RunRejected(String),
    /// Engine acknowledged the stop command.
    RunStopped { at: DateTime<Utc> },
    /// Engine did not acknowledge the stop command.
    StopFailed(String),
    /// One-shot sizing event announcing the run's total job count.
    RunSized { total: u64 },
    /// Repeating completion event; each occurrence is one unit of progress.
    JobCompleted,
    /// Terminal event: the run finished on its own.
    RunFinished { at: DateTime<Utc> },
    /// Asynchronous error surfaced by the engine; notification only.
    EngineErrorReported(String),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
