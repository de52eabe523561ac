use std::time::Duration;

use leadscout_core::{Effect, Msg};
use leadscout_engine::{EngineConfig, EngineEvent, EngineHandle, ScrapeSettings};
use leadscout_logging::{scout_info, scout_warn};

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    settings: ScrapeSettings,
}

impl EffectRunner {
    pub fn new(config: EngineConfig, settings: ScrapeSettings) -> Self {
        Self {
            engine: EngineHandle::new(config),
            settings,
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartRun(request) => {
                    scout_info!(
                        "StartRun keywords={} api_keys={}",
                        request.keywords().len(),
                        self.settings.api_keys.len()
                    );
                    self.engine.start(request, self.settings.clone());
                }
                Effect::CancelRun => self.engine.cancel(),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::Progress(progress),
        EngineEvent::StartRejected(reason) => {
            scout_warn!("Engine rejected start: {}", reason);
            Msg::StartRejected(reason)
        }
    }
}
