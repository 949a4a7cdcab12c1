use crate::RunConfig;

/// Side effects requested by [`crate::update`]; executed by the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist the configuration record to the store.
    PersistConfig(RunConfig),
    /// Persist the configuration, then issue the run command to the engine.
    StartRun(RunConfig),
    /// Issue the stop command to the engine.
    StopRun,
}
