use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use panel_logging::{panel_debug, panel_info, panel_warn};
use serde_json::{json, Value};

use crate::bus::EventBus;
use crate::{EngineConfig, EngineError, EngineEvent};

/// Command surface of the automation engine.
///
/// `run` returns on acceptance only; run completion is observed through the
/// event stream, never by blocking here. `stop` awaits acknowledgement.
pub trait Engine {
    fn run(&self, config: &EngineConfig) -> Result<(), EngineError>;
    fn stop(&self) -> Result<(), EngineError>;

    /// Releases whatever the engine still holds for a run that ended on its
    /// own. Default no-op for engines without per-run resources.
    fn release(&self) {}
}

impl<T: Engine + ?Sized> Engine for Arc<T> {
    fn run(&self, config: &EngineConfig) -> Result<(), EngineError> {
        (**self).run(config)
    }

    fn stop(&self) -> Result<(), EngineError> {
        (**self).stop()
    }

    fn release(&self) {
        (**self).release()
    }
}

enum WireMessage {
    Event(EngineEvent),
    StopAck,
}

fn parse_line(line: &str) -> Result<WireMessage, EngineError> {
    let value: Value =
        serde_json::from_str(line).map_err(|err| EngineError::Protocol(err.to_string()))?;
    let event = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Protocol(format!("missing event field: {line}")))?;
    let message = match event {
        "total_jobs" => {
            let payload = value
                .get("payload")
                .ok_or_else(|| EngineError::Protocol("total_jobs without payload".into()))?;
            // Older engine builds emit the count as a string.
            let total = payload
                .as_u64()
                .or_else(|| payload.as_str().and_then(|text| text.parse().ok()))
                .ok_or_else(|| {
                    EngineError::Protocol(format!("total_jobs payload not a count: {payload}"))
                })?;
            WireMessage::Event(EngineEvent::TotalJobs(total))
        }
        // Completion payloads are unspecified and ignored.
        "complete" => WireMessage::Event(EngineEvent::JobComplete),
        "completed" => WireMessage::Event(EngineEvent::RunCompleted),
        "error" => {
            let text = value
                .get("payload")
                .and_then(Value::as_str)
                .unwrap_or("engine error")
                .to_string();
            WireMessage::Event(EngineEvent::EngineError(text))
        }
        "stopped" => WireMessage::StopAck,
        other => {
            return Err(EngineError::Protocol(format!("unknown event: {other}")));
        }
    };
    Ok(message)
}

struct ActiveRun {
    child: Child,
    stdin: ChildStdin,
    ack_rx: mpsc::Receiver<()>,
}

/// Engine client over a child process speaking JSON lines: commands go to
/// its stdin, events come back on its stdout and are emitted on the bus.
pub struct ProcessEngine {
    program: PathBuf,
    bus: Arc<EventBus>,
    stop_timeout: Duration,
    active: Mutex<Option<ActiveRun>>,
}

impl ProcessEngine {
    pub fn new(program: PathBuf, bus: Arc<EventBus>) -> Self {
        Self::with_stop_timeout(program, bus, Duration::from_secs(5))
    }

    pub fn with_stop_timeout(program: PathBuf, bus: Arc<EventBus>, stop_timeout: Duration) -> Self {
        Self {
            program,
            bus,
            stop_timeout,
            active: Mutex::new(None),
        }
    }
}

impl Engine for ProcessEngine {
    fn run(&self, config: &EngineConfig) -> Result<(), EngineError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| EngineError::Launch("engine state poisoned".into()))?;
        if let Some(run) = active.as_mut() {
            match run.child.try_wait() {
                // Previous engine process already exited; the slot is free.
                Ok(Some(status)) => {
                    panel_debug!("previous engine process exited with {status}");
                    *active = None;
                }
                Ok(None) => {
                    return Err(EngineError::Launch("a run is already in progress".into()));
                }
                Err(err) => return Err(EngineError::Launch(err.to_string())),
            }
        }

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| EngineError::Launch(err.to_string()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Launch("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Launch("engine stdout unavailable".into()))?;

        let command = json!({ "command": "run", "config": config });
        writeln!(stdin, "{command}").map_err(|err| EngineError::Launch(err.to_string()))?;

        let (ack_tx, ack_rx) = mpsc::channel();
        let bus = Arc::clone(&self.bus);
        thread::spawn(move || pump_events(stdout, bus, ack_tx));

        panel_info!("engine process launched: {}", self.program.display());
        *active = Some(ActiveRun {
            child,
            stdin,
            ack_rx,
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), EngineError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| EngineError::Stop("engine state poisoned".into()))?;
        let Some(run) = active.as_mut() else {
            return Err(EngineError::Stop("no run in progress".into()));
        };

        let command = json!({ "command": "stop" });
        writeln!(run.stdin, "{command}").map_err(|err| EngineError::Stop(err.to_string()))?;

        match run.ack_rx.recv_timeout(self.stop_timeout) {
            Ok(()) => {
                if let Some(run) = active.take() {
                    reap(run.child, self.stop_timeout);
                }
                Ok(())
            }
            // The run stays registered: without an acknowledgement the
            // engine must be assumed live. The next `run` attempt reaps the
            // slot if the process has exited in the meantime.
            Err(mpsc::RecvTimeoutError::Timeout) => Err(EngineError::Stop(
                "timed out waiting for acknowledgement".into(),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Stop(
                "event stream closed before acknowledgement".into(),
            )),
        }
    }

    fn release(&self) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        if let Some(run) = active.take() {
            reap(run.child, self.stop_timeout);
        }
    }
}

/// Bounded reap: poll for exit until `timeout`, then kill and collect. The
/// dispatch thread calls this and must never block on an engine that will
/// not die on its own.
fn reap(mut child: Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                panel_debug!("engine process exited with {status}");
                return;
            }
            Ok(None) if Instant::now() >= deadline => {
                panel_warn!("engine process outlived its deadline, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Ok(None) => thread::sleep(Duration::from_millis(20)),
            Err(err) => {
                panel_warn!("could not reap engine process: {err}");
                return;
            }
        }
    }
}

fn pump_events(stdout: ChildStdout, bus: Arc<EventBus>, ack_tx: mpsc::Sender<()>) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                panel_warn!("engine stream read failed: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(WireMessage::Event(event)) => {
                panel_debug!("engine event: {event:?}");
                bus.emit(event);
            }
            Ok(WireMessage::StopAck) => {
                let _ = ack_tx.send(());
            }
            Err(err) => panel_warn!("{err}"),
        }
    }
    panel_info!("engine event stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_lines() {
        let msg = parse_line(r#"{"event":"total_jobs","payload":12}"#).unwrap();
        assert!(matches!(msg, WireMessage::Event(EngineEvent::TotalJobs(12))));

        // The count may arrive as a string.
        let msg = parse_line(r#"{"event":"total_jobs","payload":"7"}"#).unwrap();
        assert!(matches!(msg, WireMessage::Event(EngineEvent::TotalJobs(7))));

        let msg = parse_line(r#"{"event":"complete","payload":null}"#).unwrap();
        assert!(matches!(msg, WireMessage::Event(EngineEvent::JobComplete)));

        let msg = parse_line(r#"{"event":"complete"}"#).unwrap();
        assert!(matches!(msg, WireMessage::Event(EngineEvent::JobComplete)));

        let msg = parse_line(r#"{"event":"completed"}"#).unwrap();
        assert!(matches!(msg, WireMessage::Event(EngineEvent::RunCompleted)));

        let msg = parse_line(r#"{"event":"error","payload":"tab crashed"}"#).unwrap();
        match msg {
            WireMessage::Event(EngineEvent::EngineError(text)) => {
                assert_eq!(text, "tab crashed");
            }
            _ => panic!("expected error event"),
        }

        let msg = parse_line(r#"{"event":"stopped"}"#).unwrap();
        assert!(matches!(msg, WireMessage::StopAck));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"payload":1}"#).is_err());
        assert!(parse_line(r#"{"event":"total_jobs"}"#).is_err());
        assert!(parse_line(r#"{"event":"total_jobs","payload":"many"}"#).is_err());
        assert!(parse_line(r#"{"event":"unknown_event"}"#).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn reap_is_bounded_for_a_child_that_will_not_exit() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let start = Instant::now();
        reap(child, Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn reap_collects_a_child_that_exits_on_its_own() {
        let child = Command::new("true").spawn().unwrap();
        thread::sleep(Duration::from_millis(50));
        reap(child, Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn release_frees_the_slot_for_the_next_run() {
        // `cat` stands in for an engine that keeps running after its run
        // ended; release must clear the slot without blocking.
        let bus = EventBus::new();
        let engine = ProcessEngine::with_stop_timeout(
            "cat".into(),
            Arc::clone(&bus),
            Duration::from_millis(100),
        );
        engine.run(&EngineConfig::default()).unwrap();
        assert!(engine.run(&EngineConfig::default()).is_err());

        engine.release();
        engine.run(&EngineConfig::default()).unwrap();
        engine.release();
    }
}
