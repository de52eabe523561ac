#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use leadscout_core::{ChannelCandidate, ProgressEvent, SubscriberCount};
use leadscout_engine::{
    ApiError, ChannelInfo, Clock, FailureKind, ProgressSink, RetryPolicy, RunOptions, SearchPage,
    SheetError, SheetStore, YouTubeApi,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(leadscout_logging::initialize_for_tests);
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
}

pub fn fixed_clock() -> Clock {
    Arc::new(fixed_now)
}

pub fn fast_options() -> RunOptions {
    RunOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
        ..RunOptions::default()
    }
}

pub fn channel(id: &str, subscribers: u64) -> ChannelInfo {
    ChannelInfo {
        channel_id: id.to_string(),
        title: format!("Channel {id}"),
        description: String::new(),
        subscribers: SubscriberCount::Visible(subscribers),
        country: None,
        uploads_playlist: Some(format!("UU{id}")),
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<(String, Option<String>), Result<SearchPage, ApiError>>,
    channels: HashMap<String, ChannelInfo>,
    uploads: HashMap<String, DateTime<Utc>>,
    exhausted_keys: HashSet<String>,
    upload_exhausted_keys: HashSet<String>,
    detail_errors: HashMap<String, FailureKind>,
    upload_errors: HashMap<String, FailureKind>,
    searches: Vec<(String, String, Option<String>)>,
    detail_calls: usize,
    upload_keys: Vec<String>,
}

/// Scripted YouTube API: pages per keyword/token, channels by id, uploads by playlist.
#[derive(Default, Clone)]
pub struct FakeYouTube {
    state: Arc<Mutex<FakeState>>,
}

impl FakeYouTube {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, keyword: &str, token: Option<&str>, ids: &[&str], next: Option<&str>) {
        let page = SearchPage {
            candidates: ids.iter().map(|id| ChannelCandidate::new(*id)).collect(),
            next_page_token: next.map(str::to_string),
        };
        self.state
            .lock()
            .unwrap()
            .pages
            .insert((keyword.to_string(), token.map(str::to_string)), Ok(page));
    }

    pub fn page_error(&self, keyword: &str, kind: FailureKind) {
        self.state.lock().unwrap().pages.insert(
            (keyword.to_string(), None),
            Err(ApiError {
                kind,
                message: "scripted failure".into(),
            }),
        );
    }

    pub fn channel(&self, info: ChannelInfo, last_upload: Option<DateTime<Utc>>) {
        let mut state = self.state.lock().unwrap();
        if let (Some(playlist), Some(at)) = (info.uploads_playlist.clone(), last_upload) {
            state.uploads.insert(playlist, at);
        }
        state.channels.insert(info.channel_id.clone(), info);
    }

    pub fn exhaust_key(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .exhausted_keys
            .insert(key.to_string());
    }

    /// Any detail call including one of `ids` fails with `kind`.
    pub fn detail_error(&self, ids: &[&str], kind: FailureKind) {
        let mut state = self.state.lock().unwrap();
        for id in ids {
            state.detail_errors.insert(id.to_string(), kind.clone());
        }
    }

    pub fn upload_error(&self, playlist: &str, kind: FailureKind) {
        self.state
            .lock()
            .unwrap()
            .upload_errors
            .insert(playlist.to_string(), kind);
    }

    /// `key` keeps working for search and details but is out of quota for uploads.
    pub fn exhaust_key_for_uploads(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .upload_exhausted_keys
            .insert(key.to_string());
    }

    /// (api key, keyword, page token) per search call, in order.
    pub fn searches(&self) -> Vec<(String, String, Option<String>)> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn searched_keywords(&self) -> Vec<String> {
        self.searches().into_iter().map(|(_, kw, _)| kw).collect()
    }

    pub fn detail_calls(&self) -> usize {
        self.state.lock().unwrap().detail_calls
    }

    /// Api key used for each upload lookup, in order.
    pub fn upload_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().upload_keys.clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.state.lock().unwrap().upload_keys.len()
    }

    fn check_key(state: &FakeState, key: &str) -> Result<(), ApiError> {
        if state.exhausted_keys.contains(key) {
            return Err(ApiError {
                kind: FailureKind::QuotaExceeded,
                message: "quota".into(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl YouTubeApi for FakeYouTube {
    async fn search_channels(
        &self,
        api_key: &str,
        keyword: &str,
        page_token: Option<&str>,
        _max_results: usize,
    ) -> Result<SearchPage, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push((
            api_key.to_string(),
            keyword.to_string(),
            page_token.map(str::to_string),
        ));
        Self::check_key(&state, api_key)?;
        state
            .pages
            .get(&(keyword.to_string(), page_token.map(str::to_string)))
            .cloned()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn list_channels(
        &self,
        api_key: &str,
        channel_ids: &[String],
    ) -> Result<Vec<ChannelInfo>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.detail_calls += 1;
        Self::check_key(&state, api_key)?;
        if let Some(kind) = channel_ids.iter().find_map(|id| state.detail_errors.get(id)) {
            return Err(ApiError {
                kind: kind.clone(),
                message: "scripted detail failure".into(),
            });
        }
        Ok(channel_ids
            .iter()
            .filter_map(|id| state.channels.get(id).cloned())
            .collect())
    }

    async fn latest_upload(
        &self,
        api_key: &str,
        playlist_id: &str,
    ) -> Result<Option<DateTime<Utc>>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.upload_keys.push(api_key.to_string());
        Self::check_key(&state, api_key)?;
        if state.upload_exhausted_keys.contains(api_key) {
            return Err(ApiError {
                kind: FailureKind::QuotaExceeded,
                message: "quota".into(),
            });
        }
        if let Some(kind) = state.upload_errors.get(playlist_id) {
            return Err(ApiError {
                kind: kind.clone(),
                message: "scripted upload failure".into(),
            });
        }
        Ok(state.uploads.get(playlist_id).copied())
    }
}

/// In-memory sheet: first column plus every appended row.
#[derive(Default, Clone)]
pub struct MemorySheet {
    rows: Arc<Mutex<Vec<Vec<String>>>>,
    failure: Arc<Mutex<Option<SheetError>>>,
    append_calls: Arc<Mutex<usize>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<&str>>) -> Self {
        let sheet = Self::default();
        *sheet.rows.lock().unwrap() = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        sheet
    }

    pub fn fail_with(&self, err: SheetError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    /// Channel ids of every data row, header excluded.
    pub fn ids(&self) -> Vec<String> {
        self.rows()
            .into_iter()
            .skip(1)
            .filter_map(|r| r.into_iter().next())
            .collect()
    }

    pub fn append_calls(&self) -> usize {
        *self.append_calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl SheetStore for MemorySheet {
    async fn first_column(&self) -> Result<Vec<String>, SheetError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.first().cloned().unwrap_or_default())
            .collect())
    }

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        *self.append_calls.lock().unwrap() += 1;
        self.rows.lock().unwrap().extend(rows);
        Ok(())
    }
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    on_event: Option<Box<dyn Fn(&ProgressEvent) + Send + Sync>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` on every event before recording it.
    pub fn with_hook(hook: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            on_event: Some(Box::new(hook)),
        }
    }

    pub fn take(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: ProgressEvent) {
        if let Some(hook) = &self.on_event {
            hook(&event);
        }
        self.events.lock().unwrap().push(event);
    }
}
