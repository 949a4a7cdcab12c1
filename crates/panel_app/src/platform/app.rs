use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use chrono::TimeDelta;
use panel_core::{update, Msg, NoticeLevel, PanelState, PanelViewModel, RunConfig, RunStatus};
use panel_logging::panel_info;

use super::effects::EffectRunner;
use super::logging::{self, LogDestination};

pub fn run_app() -> anyhow::Result<()> {
    logging::initialize(LogDestination::File);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let shared_state = Arc::new(Mutex::new(PanelState::new()));
    let quit = Arc::new(AtomicBool::new(false));

    let config_dir = std::env::current_dir()?;
    let engine_bin = std::env::var_os("PAGEVIEW_ENGINE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pageview-engine"));
    panel_info!("engine binary: {}", engine_bin.display());

    let mut runner = EffectRunner::new(config_dir, engine_bin, msg_tx.clone());

    // Seed the form with the stored record before the operator acts.
    let _ = msg_tx.send(Msg::ConfigLoaded(runner.load_config()));

    spawn_input_thread(
        msg_tx.clone(),
        Arc::clone(&shared_state),
        Arc::clone(&quit),
    );
    println!("pageview panel ready; commands: run, stop, save, status, set <field> <value>, quit");

    // Single dispatch thread: every mutation of the run state happens here,
    // so engine events and operator intents cannot interleave.
    while let Ok(msg) = msg_rx.recv() {
        if quit.load(Ordering::SeqCst) {
            break;
        }
        // The terminal event ends the subscription session before anything
        // else runs; a new launch always starts clean.
        if matches!(msg, Msg::RunFinished { .. }) {
            runner.finish_session();
        }

        let maybe_view = {
            let mut guard = shared_state.lock().expect("lock panel state");
            let state = std::mem::take(&mut *guard);
            let (state, effects) = update(state, msg);
            *guard = state;
            drop(guard);

            runner.enqueue(effects);

            let mut guard = shared_state.lock().expect("lock panel state");
            if guard.consume_dirty() {
                Some(guard.view())
            } else {
                None
            }
        };

        if let Some(view) = maybe_view {
            render(&view);
        }
    }

    panel_info!("panel shutting down");
    Ok(())
}

fn spawn_input_thread(
    msg_tx: mpsc::Sender<Msg>,
    shared_state: Arc<Mutex<PanelState>>,
    quit: Arc<AtomicBool>,
) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line {
                "quit" | "exit" => {
                    quit.store(true, Ordering::SeqCst);
                    // Wake the dispatch loop so it observes the flag.
                    let _ = msg_tx.send(Msg::Tick);
                    return;
                }
                "status" => {
                    let view = shared_state.lock().expect("lock panel state").view();
                    render(&view);
                }
                other => {
                    let current = shared_state
                        .lock()
                        .expect("lock panel state")
                        .config()
                        .clone();
                    match parse_command(other, &current) {
                        Ok(msg) => {
                            if msg_tx.send(msg).is_err() {
                                return;
                            }
                        }
                        Err(reason) => println!("{reason}"),
                    }
                }
            }
        }
        quit.store(true, Ordering::SeqCst);
        let _ = msg_tx.send(Msg::Tick);
    });
}

fn parse_command(line: &str, current: &RunConfig) -> Result<Msg, String> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("run" | "start") => Ok(Msg::RunClicked),
        Some("stop") => Ok(Msg::StopClicked),
        Some("save") => Ok(Msg::SaveClicked),
        Some("set") => {
            let field = parts.next().ok_or("usage: set <field> <value>")?;
            let value = parts.next().ok_or("usage: set <field> <value>")?;
            let config = apply_field(current.clone(), field, value)?;
            Ok(Msg::ConfigEdited(config))
        }
        _ => Err(format!("unknown command: {line}")),
    }
}

fn apply_field(mut config: RunConfig, field: &str, value: &str) -> Result<RunConfig, String> {
    match field {
        "browser_path" => config.browser_path = Some(value.to_string()),
        "user_data_dir" => config.user_data_dir = Some(value.to_string()),
        "headless" => {
            config.headless = value
                .parse()
                .map_err(|_| format!("headless expects true or false, got {value}"))?;
        }
        "wait" => {
            config.wait_for_navigation_secs = value
                .parse()
                .map_err(|_| format!("wait expects seconds, got {value}"))?;
        }
        "retries" => {
            config.max_retries = value
                .parse()
                .map_err(|_| format!("retries expects a number, got {value}"))?;
        }
        "tabs" => {
            config.tab_count = value
                .parse()
                .map_err(|_| format!("tabs expects a number, got {value}"))?;
        }
        other => return Err(format!("unknown field: {other}")),
    }
    Ok(config)
}

fn render(view: &PanelViewModel) {
    let status = match view.status {
        RunStatus::Idle => "idle",
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Stopped => "stopped",
    };
    match view.status {
        RunStatus::Running => {
            println!(
                "[{status}] {}/{} jobs ({}%)",
                view.completed_jobs, view.total_jobs, view.progress_percentage
            );
        }
        RunStatus::Completed | RunStatus::Stopped => {
            let elapsed = view
                .elapsed
                .map(format_elapsed)
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "[{status}] {}/{} jobs ({}%) in {elapsed}",
                view.completed_jobs, view.total_jobs, view.progress_percentage
            );
        }
        RunStatus::Idle => println!("[{status}]"),
    }
    if let Some(notice) = &view.last_notice {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        println!("  [{tag}] {}", notice.text);
    }
}

fn format_elapsed(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
