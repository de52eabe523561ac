use std::collections::VecDeque;

use crate::view_model::{AppViewModel, KeywordRowView};
use crate::{ProgressEvent, RunStatus, RunSummary};

/// Number of log lines retained for the activity view.
pub const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Running,
    Cancelling,
    Finished(RunStatus),
}

impl SessionState {
    pub fn accepts_start(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Finished(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOutcome {
    Pending,
    Active,
    Done,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeywordProgress {
    keyword: String,
    pages: usize,
    candidates: usize,
    leads: usize,
    outcome: KeywordOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    session: SessionState,
    keywords: Vec<KeywordProgress>,
    existing_rows: usize,
    leads_accepted: usize,
    leads_written: usize,
    log: VecDeque<String>,
    log_total: usize,
    last_summary: Option<RunSummary>,
    last_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session,
            keywords: self
                .keywords
                .iter()
                .map(|k| KeywordRowView {
                    keyword: k.keyword.clone(),
                    pages: k.pages,
                    candidates: k.candidates,
                    leads: k.leads,
                    outcome: k.outcome,
                })
                .collect(),
            existing_rows: self.existing_rows,
            leads_accepted: self.leads_accepted,
            leads_written: self.leads_written,
            log: self.log.iter().cloned().collect(),
            log_total: self.log_total,
            last_summary: self.last_summary.clone(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_session(&mut self, keywords: &[String]) {
        self.session = SessionState::Starting;
        self.keywords = keywords
            .iter()
            .map(|keyword| KeywordProgress {
                keyword: keyword.clone(),
                pages: 0,
                candidates: 0,
                leads: 0,
                outcome: KeywordOutcome::Pending,
            })
            .collect();
        self.existing_rows = 0;
        self.leads_accepted = 0;
        self.leads_written = 0;
        self.last_summary = None;
        self.last_error = None;
        self.push_log(format!("Starting scrape for {} keyword(s)", keywords.len()));
    }

    pub(crate) fn begin_cancel(&mut self) {
        self.session = SessionState::Cancelling;
        self.push_log("Stopping after the current request...".to_string());
    }

    pub(crate) fn reject(&mut self, reason: String) {
        if matches!(self.session, SessionState::Starting) {
            self.session = SessionState::Idle;
        }
        self.push_log(format!("Cannot start: {reason}"));
        self.last_error = Some(reason);
    }

    pub(crate) fn apply_progress(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                keyword_count: _,
                existing_rows,
            } => {
                if matches!(self.session, SessionState::Starting) {
                    self.session = SessionState::Running;
                }
                self.existing_rows = existing_rows;
                self.push_log(format!("Found {existing_rows} existing channel(s) in sheet"));
            }
            ProgressEvent::KeywordStarted { keyword } => {
                if let Some(row) = self.keyword_mut(&keyword) {
                    row.outcome = KeywordOutcome::Active;
                }
                self.push_log(format!("=== Processing keyword: {keyword} ==="));
            }
            ProgressEvent::PageFetched { keyword, count } => {
                if let Some(row) = self.keyword_mut(&keyword) {
                    row.pages += 1;
                    row.candidates += count;
                }
                self.push_log(format!("Fetched page with {count} channel(s) for '{keyword}'"));
            }
            ProgressEvent::LeadAccepted { channel_id, title } => {
                self.leads_accepted += 1;
                self.push_log(format!("Accepted: {title} ({channel_id})"));
            }
            ProgressEvent::BatchWritten { keyword, count } => {
                self.leads_written += count;
                if let Some(row) = self.keyword_mut(&keyword) {
                    row.leads += count;
                }
                self.push_log(format!("Wrote {count} row(s) to sheet"));
            }
            ProgressEvent::KeywordSkipped { keyword, reason } => {
                if let Some(row) = self.keyword_mut(&keyword) {
                    row.outcome = KeywordOutcome::Skipped;
                }
                self.push_log(format!("Skipped '{keyword}': {reason}"));
            }
            ProgressEvent::KeywordFinished { keyword, leads } => {
                if let Some(row) = self.keyword_mut(&keyword) {
                    if row.outcome != KeywordOutcome::Skipped {
                        row.outcome = KeywordOutcome::Done;
                    }
                }
                self.push_log(format!("--- Added {leads} new channel(s) for '{keyword}' ---"));
            }
            ProgressEvent::RunFinished(summary) => {
                self.session = SessionState::Finished(summary.status);
                self.leads_written = summary.leads_written;
                match &summary.error {
                    Some(error) => {
                        self.push_log(format!("Run {}: {error}", summary.status));
                        self.last_error = Some(error.clone());
                    }
                    None => self.push_log(format!(
                        "Run {}. Total new channels added: {}",
                        summary.status, summary.leads_written
                    )),
                }
                self.last_summary = Some(summary);
            }
        }
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn keyword_mut(&mut self, keyword: &str) -> Option<&mut KeywordProgress> {
        self.keywords.iter_mut().find(|k| k.keyword == keyword)
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
        self.log_total += 1;
    }
}
