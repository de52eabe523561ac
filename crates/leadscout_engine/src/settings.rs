use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/";

/// Largest `maxResults` / id batch the YouTube Data API accepts.
pub const YOUTUBE_MAX_BATCH: usize = 50;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Per-run tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub results_per_page: usize,
    pub detail_batch_size: usize,
    pub retry: RetryPolicy,
    pub max_pages_per_keyword: Option<usize>,
    pub max_leads_per_keyword: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            results_per_page: YOUTUBE_MAX_BATCH,
            detail_batch_size: YOUTUBE_MAX_BATCH,
            retry: RetryPolicy::default(),
            max_pages_per_keyword: None,
            max_leads_per_keyword: None,
        }
    }
}

impl RunOptions {
    pub(crate) fn page_size(&self) -> usize {
        self.results_per_page.clamp(1, YOUTUBE_MAX_BATCH)
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.detail_batch_size.clamp(1, YOUTUBE_MAX_BATCH)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub worksheet: String,
}

/// Everything a single run reads from persisted settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub api_keys: Vec<String>,
    pub sheet: SheetTarget,
    pub service_account_path: PathBuf,
    pub options: RunOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("no YouTube API keys configured")]
    NoApiKeys,
    #[error("sheet id is not configured")]
    MissingSheetId,
    #[error("worksheet name is not configured")]
    MissingWorksheet,
    #[error("service account file is not configured")]
    MissingServiceAccount,
}

impl ScrapeSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(SettingsError::NoApiKeys);
        }
        if self.sheet.spreadsheet_id.trim().is_empty() {
            return Err(SettingsError::MissingSheetId);
        }
        if self.sheet.worksheet.trim().is_empty() {
            return Err(SettingsError::MissingWorksheet);
        }
        if self.service_account_path.as_os_str().is_empty() {
            return Err(SettingsError::MissingServiceAccount);
        }
        Ok(())
    }
}

/// Handle-level configuration: transport and endpoints.
#[derive(Clone)]
pub struct EngineConfig {
    pub http: HttpSettings,
    pub youtube_base_url: String,
    pub sheets_base_url: String,
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            youtube_base_url: YOUTUBE_API_BASE.to_string(),
            sheets_base_url: SHEETS_API_BASE.to_string(),
            clock: Arc::new(Utc::now),
        }
    }
}

pub(crate) fn build_http_client(settings: &HttpSettings) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
}
