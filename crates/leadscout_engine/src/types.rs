use std::fmt;

use leadscout_core::{ChannelCandidate, NoKeysAvailable, ProgressEvent};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(ProgressEvent),
    /// A start command was refused before the run entered `Running`.
    StartRejected(String),
}

/// One page of channel search results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub candidates: Vec<ChannelCandidate>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The key's request budget is spent.
    QuotaExceeded,
    /// The key itself was refused (invalid, API not enabled).
    KeyRejected,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl FailureKind {
    /// Whether the key that made the call should be retired.
    pub fn retires_key(&self) -> bool {
        matches!(self, FailureKind::QuotaExceeded | FailureKind::KeyRejected)
    }

    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::HttpStatus(code) => *code == 429 || (500..=599).contains(code),
            FailureKind::Timeout | FailureKind::Network => true,
            _ => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::QuotaExceeded => write!(f, "quota exceeded"),
            FailureKind::KeyRejected => write!(f, "api key rejected"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error("sheet authorization failed: {0}")]
    Auth(String),
    #[error("sheet not found: {0}")]
    NotFound(String),
    #[error("sheet request failed: {0}")]
    Api(ApiError),
}

impl SheetError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SheetError::Api(err) if err.kind.is_transient())
    }
}

/// Errors that end a run in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    NoKeysAvailable(#[from] NoKeysAvailable),
    #[error("sheet authorization failed: {0}")]
    SheetAuth(String),
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    #[error("sheet write failed: {0}")]
    SheetWrite(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SheetError> for RunError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Auth(msg) => RunError::SheetAuth(msg),
            SheetError::NotFound(msg) => RunError::SheetNotFound(msg),
            SheetError::Api(api) => RunError::SheetWrite(api.to_string()),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
