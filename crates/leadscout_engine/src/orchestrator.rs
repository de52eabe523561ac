use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use leadscout_core::{
    accepts, KeyRotator, Lead, ProgressEvent, RunStatus, RunSummary, ScrapeRequest,
};
use leadscout_logging::{scout_error, scout_info, scout_warn};
use tokio_util::sync::CancellationToken;

use crate::settings::Clock;
use crate::{
    DetailFetcher, ProgressSink, RunError, RunOptions, SearchDriver, SearchError, SheetStore,
    SheetWriter, YouTubeApi,
};

/// Mutable bookkeeping for one run. Never outlives its orchestrator.
#[derive(Debug, Default)]
struct RunState {
    keywords_remaining: VecDeque<String>,
    current_page_token: Option<String>,
    seen_channel_ids: HashSet<String>,
    leads_written: usize,
    errors: Vec<String>,
}

enum KeywordEnd {
    Exhausted,
    Interrupted,
}

/// Drives one run from `Idle` to a terminal state. Consumed by [`ScrapeOrchestrator::run`].
pub struct ScrapeOrchestrator {
    youtube: Arc<dyn YouTubeApi>,
    sheet: Arc<dyn SheetStore>,
    options: RunOptions,
    clock: Clock,
    status: RunStatus,
    state: RunState,
}

impl ScrapeOrchestrator {
    pub fn new(
        youtube: Arc<dyn YouTubeApi>,
        sheet: Arc<dyn SheetStore>,
        options: RunOptions,
        clock: Clock,
    ) -> Self {
        Self {
            youtube,
            sheet,
            options,
            clock,
            status: RunStatus::Idle,
            state: RunState::default(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Runs every keyword in order. The sink always receives a final `RunFinished`.
    pub async fn run(
        mut self,
        request: ScrapeRequest,
        mut keys: KeyRotator,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RunSummary {
        if let Err(err) = self.status.advance(RunStatus::Running) {
            let err = RunError::Internal(err.to_string());
            return self.finish(sink, RunStatus::Failed, Some(err.to_string()));
        }
        self.state.keywords_remaining = request.keywords().iter().cloned().collect();
        scout_info!(
            "Run started: {} keyword(s), {} API key(s)",
            request.keywords().len(),
            keys.len()
        );

        let mut writer = SheetWriter::new(self.sheet.clone(), self.options.retry.clone());
        let existing = match writer.load_existing_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                let err = RunError::from(err);
                return self.finish(sink, RunStatus::Failed, Some(err.to_string()));
            }
        };
        sink.emit(ProgressEvent::RunStarted {
            keyword_count: request.keywords().len(),
            existing_rows: existing.len(),
        });

        while let Some(keyword) = self.state.keywords_remaining.pop_front() {
            if cancel.is_cancelled() {
                return self.finish(sink, RunStatus::Cancelled, None);
            }
            sink.emit(ProgressEvent::KeywordStarted {
                keyword: keyword.clone(),
            });
            let written_before = self.state.leads_written;
            let outcome = self
                .process_keyword(&keyword, &request, &mut keys, &mut writer, sink, cancel)
                .await;
            let leads = self.state.leads_written - written_before;

            match outcome {
                Ok(KeywordEnd::Exhausted) => {
                    sink.emit(ProgressEvent::KeywordFinished { keyword, leads });
                }
                Ok(KeywordEnd::Interrupted) => {
                    scout_info!("Cancelled during '{}' after {} lead(s)", keyword, leads);
                    return self.finish(sink, RunStatus::Cancelled, None);
                }
                Err(KeywordFailure::Skip(reason)) => {
                    scout_warn!("Skipping keyword '{}': {}", keyword, reason);
                    self.state.errors.push(reason.clone());
                    sink.emit(ProgressEvent::KeywordSkipped {
                        keyword: keyword.clone(),
                        reason,
                    });
                    sink.emit(ProgressEvent::KeywordFinished { keyword, leads });
                }
                Err(KeywordFailure::Fatal(err)) => {
                    scout_error!("Run failed during keyword '{}': {}", keyword, err);
                    return self.finish(sink, RunStatus::Failed, Some(err.to_string()));
                }
            }
        }

        self.finish(sink, RunStatus::Completed, None)
    }

    async fn process_keyword(
        &mut self,
        keyword: &str,
        request: &ScrapeRequest,
        keys: &mut KeyRotator,
        writer: &mut SheetWriter,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<KeywordEnd, KeywordFailure> {
        let retry = self.options.retry.clone();
        let search = SearchDriver::new(self.youtube.as_ref(), &retry, self.options.page_size());
        let details =
            DetailFetcher::new(self.youtube.as_ref(), &retry, self.options.batch_size());

        self.state.current_page_token = None;
        let mut pages = 0usize;
        let mut keyword_leads = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Ok(KeywordEnd::Interrupted);
            }
            if self
                .options
                .max_pages_per_keyword
                .is_some_and(|max| pages >= max)
            {
                scout_info!("Page limit reached for '{}'", keyword);
                return Ok(KeywordEnd::Exhausted);
            }
            let lead_cap = self.options.max_leads_per_keyword;
            if lead_cap.is_some_and(|max| keyword_leads >= max) {
                scout_info!("Lead limit reached for '{}'", keyword);
                return Ok(KeywordEnd::Exhausted);
            }

            let page = search
                .search(keys, keyword, self.state.current_page_token.as_deref())
                .await
                .map_err(|err| match err {
                    SearchError::NoKeys(no_keys) => KeywordFailure::Fatal(no_keys.into()),
                    other => KeywordFailure::Skip(other.to_string()),
                })?;
            pages += 1;
            sink.emit(ProgressEvent::PageFetched {
                keyword: keyword.to_string(),
                count: page.candidates.len(),
            });

            let fresh: Vec<_> = page
                .candidates
                .into_iter()
                .filter(|c| !writer.is_known(&c.channel_id))
                .filter(|c| self.state.seen_channel_ids.insert(c.channel_id.clone()))
                .collect();

            if !fresh.is_empty() {
                let batch = details
                    .fetch_details(keys, &fresh, request.criteria())
                    .await
                    .map_err(|no_keys| KeywordFailure::Fatal(no_keys.into()))?;
                self.state.errors.extend(batch.dropped);

                let now = (self.clock)();
                let remaining = lead_cap.map_or(usize::MAX, |max| max - keyword_leads);
                let mut accepted = batch
                    .records
                    .into_iter()
                    .filter(|record| accepts(record, request.criteria(), now));
                let leads: Vec<Lead> = accepted
                    .by_ref()
                    .take(remaining)
                    .map(|record| Lead {
                        record,
                        keyword: keyword.to_string(),
                    })
                    .collect();
                // Over the cap: not written, so a later keyword may still take them.
                for record in accepted {
                    self.state.seen_channel_ids.remove(&record.channel_id);
                }

                if !leads.is_empty() {
                    for lead in &leads {
                        scout_info!(
                            "Accepted: {} ({} subs) | keyword: {}",
                            lead.record.title,
                            lead.record.subscribers,
                            keyword
                        );
                        sink.emit(ProgressEvent::LeadAccepted {
                            channel_id: lead.record.channel_id.clone(),
                            title: lead.record.title.clone(),
                        });
                    }
                    let written = writer
                        .append(&leads, now)
                        .await
                        .map_err(|err| KeywordFailure::Fatal(err.into()))?;
                    self.state.leads_written += written;
                    keyword_leads += written;
                    sink.emit(ProgressEvent::BatchWritten {
                        keyword: keyword.to_string(),
                        count: written,
                    });
                }
            }

            match page.next_page_token {
                Some(token) => self.state.current_page_token = Some(token),
                None => {
                    scout_info!("Reached the end of results for '{}'", keyword);
                    return Ok(KeywordEnd::Exhausted);
                }
            }
        }
    }

    fn finish(
        mut self,
        sink: &dyn ProgressSink,
        status: RunStatus,
        error: Option<String>,
    ) -> RunSummary {
        if let Err(err) = self.status.advance(status) {
            scout_error!("{}", err);
        }
        let summary = RunSummary {
            status: self.status,
            leads_written: self.state.leads_written,
            error,
            warnings: std::mem::take(&mut self.state.errors),
        };
        scout_info!(
            "Run {}: {} lead(s) written",
            summary.status,
            summary.leads_written
        );
        sink.emit(ProgressEvent::RunFinished(summary.clone()));
        summary
    }
}

enum KeywordFailure {
    Skip(String),
    Fatal(RunError),
}
