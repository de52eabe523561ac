use leadscout_core::{AppViewModel, KeywordOutcome, SessionState};

/// Prints the activity log incrementally; remembers how much it already showed.
#[derive(Debug, Default)]
pub struct Renderer {
    printed: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log lines added since the previous call.
    pub fn new_lines(&mut self, view: &AppViewModel) -> Vec<String> {
        let fresh = view.log_total.saturating_sub(self.printed).min(view.log.len());
        self.printed = view.log_total;
        view.log[view.log.len() - fresh..].to_vec()
    }

    pub fn render(&mut self, view: &AppViewModel) {
        for line in self.new_lines(view) {
            println!("{line}");
        }
    }
}

pub fn session_label(session: SessionState) -> String {
    match session {
        SessionState::Idle => "Idle".to_string(),
        SessionState::Starting => "Starting".to_string(),
        SessionState::Running => "Running".to_string(),
        SessionState::Cancelling => "Cancelling".to_string(),
        SessionState::Finished(status) => format!("Finished ({status})"),
    }
}

/// Per-keyword table printed once the run ends.
pub fn summary_lines(view: &AppViewModel) -> Vec<String> {
    let width = view
        .keywords
        .iter()
        .map(|k| k.keyword.len())
        .max()
        .unwrap_or(0)
        .max("keyword".len());

    let mut lines = vec![format!(
        "{:<width$}  {:>5}  {:>10}  {:>5}  status",
        "keyword", "pages", "candidates", "leads"
    )];
    for row in &view.keywords {
        let outcome = match row.outcome {
            KeywordOutcome::Pending => "not reached",
            KeywordOutcome::Active => "interrupted",
            KeywordOutcome::Done => "done",
            KeywordOutcome::Skipped => "skipped",
        };
        lines.push(format!(
            "{:<width$}  {:>5}  {:>10}  {:>5}  {}",
            row.keyword, row.pages, row.candidates, row.leads, outcome
        ));
    }
    lines.push(format!(
        "{} | existing rows: {} | accepted: {} | written: {}",
        session_label(view.session),
        view.existing_rows,
        view.leads_accepted,
        view.leads_written
    ));
    if let Some(summary) = &view.last_summary {
        for warning in &summary.warnings {
            lines.push(format!("warning: {warning}"));
        }
    }
    lines
}
