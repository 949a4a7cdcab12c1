//! Panel engine boundary: the command surface and event stream of the
//! external automation engine, plus the run-scoped subscription machinery.
mod bus;
mod coordinator;
mod engine;
mod persist;
mod session;
mod store;
mod types;

pub use bus::{EventBus, ListenerHandle};
pub use coordinator::RunCoordinator;
pub use engine::{Engine, ProcessEngine};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use session::{NoticeSink, RunNotice, RunSession};
pub use store::{ConfigStore, StoreError};
pub use types::{EngineConfig, EngineError, EngineEvent, EventKind};
