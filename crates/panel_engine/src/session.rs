//! Per-run subscription set over the event bus.
//!
//! One `RunSession` is installed per run, before the run command is issued,
//! and torn down exactly once when the run reaches a terminal state or a
//! stop is acknowledged. The nested registration mirrors the required
//! ordering: sizing first, then completion counting, with the terminal
//! handler cancelling the completion listener in the same continuation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bus::{EventBus, ListenerHandle};
use crate::{EngineEvent, EventKind};

/// Reconciled engine events, forwarded to the dispatch loop one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunNotice {
    /// The run's total job count, from the one-shot sizing event.
    Sized(u64),
    /// One unit of progress.
    Progressed,
    /// The run finished on its own.
    Finished,
    /// Asynchronous engine error; surfaced, never fatal to the run state.
    ErrorReported(String),
}

/// Called from the emitter thread for every forwarded notice.
pub type NoticeSink = Arc<dyn Fn(RunNotice) + Send + Sync>;

pub struct RunSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    handles: Mutex<Vec<ListenerHandle>>,
    torn_down: AtomicBool,
}

impl SessionInner {
    fn adopt(&self, new: Vec<ListenerHandle>) {
        self.handles
            .lock()
            .expect("session handles poisoned")
            .extend(new);
        // A teardown may have raced the adoption; sweep again so nothing
        // registered after the teardown survives it.
        if self.torn_down.load(Ordering::SeqCst) {
            self.release();
        }
    }

    fn release(&self) {
        let drained: Vec<ListenerHandle> = {
            let mut handles = self.handles.lock().expect("session handles poisoned");
            handles.drain(..).collect()
        };
        for handle in drained {
            handle.cancel();
        }
    }
}

impl RunSession {
    /// Installs the sizing listener. Must run before the run command is
    /// issued so the sizing event cannot fire unheard; the completion and
    /// terminal listeners are only installed once the sizing event arrives.
    pub fn install(bus: &Arc<EventBus>, sink: NoticeSink) -> RunSession {
        let inner = Arc::new(SessionInner {
            handles: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        });

        let sizing = {
            let chain_bus = Arc::clone(bus);
            let inner = Arc::clone(&inner);
            let sink = Arc::clone(&sink);
            bus.once(EventKind::TotalJobs, move |event| {
                let EngineEvent::TotalJobs(total) = event else {
                    return;
                };
                if inner.torn_down.load(Ordering::SeqCst) {
                    return;
                }
                sink(RunNotice::Sized(*total));

                // Counting starts only now that the total is known.
                let progress = {
                    let sink = Arc::clone(&sink);
                    chain_bus.listen(EventKind::JobComplete, move |_| {
                        sink(RunNotice::Progressed);
                    })
                };
                let terminal = {
                    let sink = Arc::clone(&sink);
                    let progress = progress.clone();
                    chain_bus.once(EventKind::RunCompleted, move |_| {
                        // Cancel before forwarding: a completion delivered
                        // after the terminal event must reach no listener.
                        progress.cancel();
                        sink(RunNotice::Finished);
                    })
                };
                inner.adopt(vec![progress, terminal]);
            })
        };
        inner.adopt(vec![sizing]);

        RunSession { inner }
    }

    /// Cancels every listener of this run. Safe to call more than once.
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        self.inner.release();
    }
}
