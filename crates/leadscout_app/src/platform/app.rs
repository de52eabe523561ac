use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use leadscout_core::{update, AppState, Msg, RunStatus, SessionState, StartForm};
use leadscout_engine::EngineConfig;
use leadscout_logging::scout_info;

use super::effects::EffectRunner;
use super::persistence::AppSettings;
use super::render::{summary_lines, Renderer};

/// Coalesces engine polling and rendering.
const TICK: Duration = Duration::from_millis(75);

/// Runs one scrape to a terminal state, rendering progress to stdout.
pub fn run_scrape(form: StartForm, settings: &AppSettings) -> Result<RunStatus> {
    let config = EngineConfig {
        http: settings.http_settings(),
        ..EngineConfig::default()
    };
    let runner = EffectRunner::new(config, settings.scrape_settings());

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_cancel_listener(msg_tx.clone());
    let _ = msg_tx.send(Msg::StartRequested(form));
    println!("Press Enter to stop after the current request.");

    let mut state = AppState::new();
    let mut renderer = Renderer::new();
    loop {
        let msg = match msg_rx.try_recv() {
            Ok(msg) => msg,
            Err(_) => runner.next_msg(TICK).unwrap_or(Msg::Tick),
        };
        let (next, effects) = update(state, msg);
        state = next;
        runner.enqueue(effects);

        if state.consume_dirty() {
            renderer.render(&state.view());
        }

        let view = state.view();
        match view.session {
            SessionState::Finished(status) => {
                for line in summary_lines(&view) {
                    println!("{line}");
                }
                return match status {
                    RunStatus::Failed => Err(anyhow!(view
                        .last_error
                        .unwrap_or_else(|| "run failed".to_string()))),
                    status => Ok(status),
                };
            }
            SessionState::Idle => {
                if let Some(reason) = view.last_error {
                    return Err(anyhow!("cannot start: {reason}"));
                }
            }
            _ => {}
        }
    }
}

/// Any line on stdin requests cancellation. EOF (piped input) never cancels.
fn spawn_cancel_listener(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        while let Ok(read) = stdin.lock().read_line(&mut line) {
            if read == 0 {
                return;
            }
            scout_info!("Cancel requested from terminal");
            if msg_tx.send(Msg::CancelRequested).is_err() {
                return;
            }
            line.clear();
        }
    });
}
