//! LeadScout engine: API clients, the scrape pipeline and the background worker.
mod auth;
mod details;
mod engine;
mod orchestrator;
mod retry;
mod search;
mod settings;
mod sheets;
mod sink;
mod types;
mod youtube;

pub use auth::{
    AuthError, ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource,
    SHEETS_SCOPE,
};
pub use details::{DetailBatch, DetailFetcher};
pub use engine::EngineHandle;
pub use orchestrator::ScrapeOrchestrator;
pub use search::{SearchDriver, SearchError};
pub use settings::{
    Clock, EngineConfig, HttpSettings, RetryPolicy, RunOptions, ScrapeSettings, SettingsError,
    SheetTarget, SHEETS_API_BASE, YOUTUBE_API_BASE, YOUTUBE_MAX_BATCH,
};
pub use sheets::{GoogleSheetsClient, SheetStore, SheetWriter};
pub use sink::{ChannelProgressSink, ProgressSink};
pub use types::{ApiError, EngineEvent, FailureKind, RunError, SearchPage, SheetError};
pub use youtube::{ChannelInfo, YouTubeApi, YouTubeClient};
