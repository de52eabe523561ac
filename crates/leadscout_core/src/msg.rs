use crate::ProgressEvent;

/// Raw scrape form input, validated by `update` before a run may start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartForm {
    pub keywords: Vec<String>,
    pub min_subscribers: u64,
    pub max_subscribers: u64,
    pub max_inactivity_days: Option<u32>,
    pub allowed_countries: Vec<String>,
    pub require_email: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted the scrape form.
    StartRequested(StartForm),
    /// User asked the running scrape to stop.
    CancelRequested,
    /// Engine refused to start a run (bad settings, run already active).
    StartRejected(String),
    /// Engine progress for the active run.
    Progress(ProgressEvent),
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
