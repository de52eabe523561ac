//! LeadScout core: pure data model, filter, key rotation and front-end state machine.
mod effect;
mod email;
mod filter;
mod keys;
mod msg;
mod run;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use email::extract_emails;
pub use filter::{accepts, passes_profile, CriteriaError, FilterCriteria};
pub use keys::{ApiKey, KeyRotator, KeyState, NoKeysAvailable};
pub use msg::{Msg, StartForm};
pub use run::{InvalidTransition, ProgressEvent, RunStatus, RunSummary, ScrapeRequest};
pub use state::{AppState, KeywordOutcome, SessionState, LOG_CAPACITY};
pub use types::{
    channel_url, ChannelCandidate, ChannelId, ChannelRecord, Lead, SubscriberCount, SHEET_HEADER,
};
pub use update::update;
pub use view_model::{AppViewModel, KeywordRowView};
