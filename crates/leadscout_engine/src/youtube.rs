use chrono::{DateTime, Utc};
use leadscout_core::{extract_emails, ChannelCandidate, ChannelRecord, SubscriberCount};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::settings::build_http_client;
use crate::types::map_reqwest_error;
use crate::{ApiError, FailureKind, HttpSettings, SearchPage};

/// Reasons the API uses for spent budgets.
const QUOTA_REASONS: [&str; 4] = [
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];
/// Reasons meaning the key itself is unusable.
const KEY_REASONS: [&str; 3] = ["keyInvalid", "keyExpired", "accessNotConfigured"];

/// A channel as returned by the detail endpoint, before upload history is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub subscribers: SubscriberCount,
    pub country: Option<String>,
    pub uploads_playlist: Option<String>,
}

impl ChannelInfo {
    pub fn into_record(self, last_upload_at: Option<DateTime<Utc>>) -> ChannelRecord {
        let emails = extract_emails(&self.description);
        ChannelRecord {
            channel_id: self.channel_id,
            title: self.title,
            subscribers: self.subscribers,
            last_upload_at,
            country: self.country,
            emails,
        }
    }
}

/// The three YouTube Data API calls a run needs.
#[async_trait::async_trait]
pub trait YouTubeApi: Send + Sync {
    async fn search_channels(
        &self,
        api_key: &str,
        keyword: &str,
        page_token: Option<&str>,
        max_results: usize,
    ) -> Result<SearchPage, ApiError>;

    async fn list_channels(
        &self,
        api_key: &str,
        channel_ids: &[String],
    ) -> Result<Vec<ChannelInfo>, ApiError>;

    /// Publish time of the newest item in an uploads playlist; `None` when empty.
    async fn latest_upload(
        &self,
        api_key: &str,
        playlist_id: &str,
    ) -> Result<Option<DateTime<Utc>>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: Url,
}

impl YouTubeClient {
    pub fn new(settings: &HttpSettings, base_url: &str) -> Result<Self, ApiError> {
        let client = build_http_client(settings).map_err(map_reqwest_error)?;
        Ok(Self {
            client,
            base_url: parse_base(base_url)?,
        })
    }

    fn endpoint(&self, resource: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(resource)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }
        serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl YouTubeApi for YouTubeClient {
    async fn search_channels(
        &self,
        api_key: &str,
        keyword: &str,
        page_token: Option<&str>,
        max_results: usize,
    ) -> Result<SearchPage, ApiError> {
        let max_results = max_results.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("type", "channel"),
            ("q", keyword),
            ("maxResults", max_results.as_str()),
            ("key", api_key),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let url = self.endpoint("search", &query)?;
        let response: SearchResponse = self.get_json(url).await?;

        let mut candidates: Vec<ChannelCandidate> = Vec::new();
        for item in response.items {
            let id = item
                .snippet
                .and_then(|s| s.channel_id)
                .or_else(|| item.id.and_then(|i| i.channel_id));
            if let Some(id) = id {
                if !candidates.iter().any(|c| c.channel_id == id) {
                    candidates.push(ChannelCandidate::new(id));
                }
            }
        }
        Ok(SearchPage {
            candidates,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn list_channels(
        &self,
        api_key: &str,
        channel_ids: &[String],
    ) -> Result<Vec<ChannelInfo>, ApiError> {
        let ids = channel_ids.join(",");
        let url = self.endpoint(
            "channels",
            &[
                ("part", "snippet,statistics,contentDetails,brandingSettings"),
                ("id", ids.as_str()),
                ("maxResults", "50"),
                ("key", api_key),
            ],
        )?;
        let response: ChannelsResponse = self.get_json(url).await?;
        Ok(response.items.into_iter().map(ChannelItem::into_info).collect())
    }

    async fn latest_upload(
        &self,
        api_key: &str,
        playlist_id: &str,
    ) -> Result<Option<DateTime<Utc>>, ApiError> {
        let url = self.endpoint(
            "playlistItems",
            &[
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", "1"),
                ("key", api_key),
            ],
        )?;
        let response: PlaylistItemsResponse = match self.get_json(url).await {
            Ok(response) => response,
            // Channels that never uploaded have no uploads playlist behind the id.
            Err(ApiError {
                kind: FailureKind::HttpStatus(404),
                ..
            }) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.content_details.and_then(|d| d.video_published_at))
            .max())
    }
}

fn parse_base(base_url: &str) -> Result<Url, ApiError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// Maps a non-success response to a failure kind using the Google error body.
pub(crate) fn classify_error(status: u16, body: &[u8]) -> ApiError {
    let parsed = serde_json::from_slice::<GoogleErrorBody>(body).ok();
    let (message, reasons) = match parsed {
        Some(GoogleErrorBody { error }) => (
            error.message,
            error
                .errors
                .into_iter()
                .filter_map(|e| e.reason)
                .collect::<Vec<_>>(),
        ),
        None => (String::from_utf8_lossy(body).into_owned(), Vec::new()),
    };
    let has = |set: &[&str]| reasons.iter().any(|r| set.contains(&r.as_str()));

    let kind = if status == 429 || (status == 403 && has(&QUOTA_REASONS[..])) {
        FailureKind::QuotaExceeded
    } else if matches!(status, 400 | 403) && has(&KEY_REASONS[..]) {
        FailureKind::KeyRejected
    } else {
        FailureKind::HttpStatus(status)
    };
    ApiError::new(kind, message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    pub(crate) error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: ChannelStatistics,
    #[serde(default)]
    content_details: ChannelContentDetails,
    #[serde(default)]
    branding_settings: BrandingSettings,
}

impl ChannelItem {
    fn into_info(self) -> ChannelInfo {
        let subscribers = match (
            self.statistics.hidden_subscriber_count,
            self.statistics
                .subscriber_count
                .as_deref()
                .and_then(|s| s.parse::<u64>().ok()),
        ) {
            (false, Some(count)) => SubscriberCount::Visible(count),
            _ => SubscriberCount::Hidden,
        };
        let country = self
            .snippet
            .country
            .or(self.branding_settings.channel.country)
            .filter(|c| !c.is_empty());
        ChannelInfo {
            channel_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            subscribers,
            country,
            uploads_playlist: self
                .content_details
                .related_playlists
                .uploads
                .filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
    #[serde(default)]
    hidden_subscriber_count: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    #[serde(default)]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandingSettings {
    #[serde(default)]
    channel: BrandingChannel,
}

#[derive(Debug, Default, Deserialize)]
struct BrandingChannel {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_published_at: Option<DateTime<Utc>>,
}
