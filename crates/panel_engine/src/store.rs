use thiserror::Error;

use crate::EngineConfig;

/// Failure reported by the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external store owning the durable configuration record.
///
/// `get` returning `Ok(None)` means no record exists yet; callers fall back
/// to defaults. The panel never retries a failed `set`.
pub trait ConfigStore {
    fn get(&self) -> Result<Option<EngineConfig>, StoreError>;
    fn set(&self, config: &EngineConfig) -> Result<(), StoreError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<T> {
    fn get(&self) -> Result<Option<EngineConfig>, StoreError> {
        (**self).get()
    }

    fn set(&self, config: &EngineConfig) -> Result<(), StoreError> {
        (**self).set(config)
    }
}
