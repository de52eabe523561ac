use crate::{KeywordOutcome, RunSummary, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub keywords: Vec<KeywordRowView>,
    pub existing_rows: usize,
    pub leads_accepted: usize,
    pub leads_written: usize,
    /// Most recent log lines, oldest first.
    pub log: Vec<String>,
    /// Lines ever logged, including those rotated out of `log`.
    pub log_total: usize,
    pub last_summary: Option<RunSummary>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRowView {
    pub keyword: String,
    pub pages: usize,
    pub candidates: usize,
    pub leads: usize,
    pub outcome: KeywordOutcome,
}
