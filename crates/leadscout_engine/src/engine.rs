use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use leadscout_core::{KeyRotator, ScrapeRequest};
use leadscout_logging::{scout_info, scout_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::ServiceAccountTokenSource;
use crate::settings::build_http_client;
use crate::sink::ChannelProgressSink;
use crate::{
    EngineConfig, EngineEvent, GoogleSheetsClient, ScrapeOrchestrator, ScrapeSettings,
    YouTubeClient,
};

enum EngineCommand {
    Start {
        request: ScrapeRequest,
        settings: ScrapeSettings,
    },
    Cancel,
}

/// Owns the background worker. At most one run is active at a time.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut active: Option<(CancellationToken, JoinHandle<()>)> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Start { request, settings } => {
                        if active.as_ref().is_some_and(|(_, task)| !task.is_finished()) {
                            let _ = event_tx.send(EngineEvent::StartRejected(
                                "a scrape is already running".to_string(),
                            ));
                            continue;
                        }
                        match build_orchestrator(&config, &settings) {
                            Ok(orchestrator) => {
                                let cancel = CancellationToken::new();
                                let token = cancel.clone();
                                let sink = ChannelProgressSink::new(event_tx.clone());
                                let keys = KeyRotator::new(settings.api_keys.clone());
                                let task = runtime.spawn(async move {
                                    orchestrator.run(request, keys, &sink, &token).await;
                                });
                                active = Some((cancel, task));
                            }
                            Err(reason) => {
                                scout_warn!("Refusing to start run: {}", reason);
                                let _ = event_tx.send(EngineEvent::StartRejected(reason));
                            }
                        }
                    }
                    EngineCommand::Cancel => {
                        if let Some((cancel, _)) = active.as_ref() {
                            scout_info!("Cancellation requested");
                            cancel.cancel();
                        }
                    }
                }
            }
            // Handle dropped: let an in-flight run reach its next checkpoint and stop.
            if let Some((cancel, task)) = active.take() {
                cancel.cancel();
                let _ = runtime.block_on(task);
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self, request: ScrapeRequest, settings: ScrapeSettings) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::Start { request, settings });
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks for at most `timeout` waiting on the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn build_orchestrator(
    config: &EngineConfig,
    settings: &ScrapeSettings,
) -> Result<ScrapeOrchestrator, String> {
    settings.validate().map_err(|err| err.to_string())?;
    let youtube = YouTubeClient::new(&config.http, &config.youtube_base_url)
        .map_err(|err| err.to_string())?;
    let http = build_http_client(&config.http).map_err(|err| err.to_string())?;
    let tokens = ServiceAccountTokenSource::new(
        http.clone(),
        settings.service_account_path.clone(),
        config.clock.clone(),
    );
    let sheet = GoogleSheetsClient::new(
        http,
        &config.sheets_base_url,
        settings.sheet.clone(),
        Arc::new(tokens),
    )
    .map_err(|err| err.to_string())?;
    Ok(ScrapeOrchestrator::new(
        Arc::new(youtube),
        Arc::new(sheet),
        settings.options.clone(),
        config.clock.clone(),
    ))
}
