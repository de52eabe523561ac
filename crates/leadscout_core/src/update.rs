use crate::{AppState, Effect, FilterCriteria, Msg, ScrapeRequest, SessionState, StartForm};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested(form) => {
            if !state.session().accepts_start() {
                return (state, Vec::new());
            }
            match validate(form) {
                Ok(request) => {
                    state.begin_session(request.keywords());
                    state.mark_dirty();
                    vec![Effect::StartRun(request)]
                }
                Err(reason) => {
                    state.reject(reason);
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::CancelRequested => match state.session() {
            SessionState::Starting | SessionState::Running => {
                state.begin_cancel();
                state.mark_dirty();
                vec![Effect::CancelRun]
            }
            _ => Vec::new(),
        },
        Msg::StartRejected(reason) => {
            state.reject(reason);
            state.mark_dirty();
            Vec::new()
        }
        Msg::Progress(event) => {
            state.apply_progress(event);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn validate(form: StartForm) -> Result<ScrapeRequest, String> {
    let criteria = FilterCriteria::new(
        form.min_subscribers,
        form.max_subscribers,
        form.max_inactivity_days,
    )
    .map_err(|err| err.to_string())?
    .with_allowed_countries(&form.allowed_countries)
    .with_require_email(form.require_email);
    ScrapeRequest::new(&form.keywords, criteria).map_err(|err| err.to_string())
}
