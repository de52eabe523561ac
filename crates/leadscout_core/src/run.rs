use std::fmt;

use thiserror::Error;

use crate::{ChannelId, CriteriaError, FilterCriteria};

/// Lifecycle of one scrape run: `Idle -> Running -> {Completed, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid run transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: RunStatus,
    pub to: RunStatus,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    /// Moves to `to` if the transition is legal. Terminal states are final.
    pub fn advance(&mut self, to: RunStatus) -> Result<(), InvalidTransition> {
        let legal = match (*self, to) {
            (RunStatus::Idle, RunStatus::Running) => true,
            (RunStatus::Running, next) => next.is_terminal(),
            _ => false,
        };
        if !legal {
            return Err(InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A validated start request: keywords in input order plus filter bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    keywords: Vec<String>,
    criteria: FilterCriteria,
}

impl ScrapeRequest {
    /// Keywords are trimmed; blank entries and repeats are dropped, first occurrence wins.
    pub fn new<I, S>(keywords: I, criteria: FilterCriteria) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if !keyword.is_empty() && !unique.iter().any(|k| k == keyword) {
                unique.push(keyword.to_string());
            }
        }
        let keywords = unique;
        if keywords.is_empty() {
            return Err(CriteriaError::NoKeywords);
        }
        Ok(Self { keywords, criteria })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }
}

/// Ordered progress stream from a run to its sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    RunStarted {
        keyword_count: usize,
        existing_rows: usize,
    },
    KeywordStarted {
        keyword: String,
    },
    PageFetched {
        keyword: String,
        count: usize,
    },
    LeadAccepted {
        channel_id: ChannelId,
        title: String,
    },
    BatchWritten {
        keyword: String,
        count: usize,
    },
    KeywordSkipped {
        keyword: String,
        reason: String,
    },
    KeywordFinished {
        keyword: String,
        leads: usize,
    },
    RunFinished(RunSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub leads_written: usize,
    /// Fatal error message, present only when `status` is `Failed`.
    pub error: Option<String>,
    /// Recoverable errors absorbed during the run, in order of occurrence.
    pub warnings: Vec<String>,
}
