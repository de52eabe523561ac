use std::fmt;

use chrono::{DateTime, Utc};

pub type ChannelId = String;

/// A channel identifier yielded by a search page, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelCandidate {
    pub channel_id: ChannelId,
}

impl ChannelCandidate {
    pub fn new(channel_id: impl Into<ChannelId>) -> Self {
        Self {
            channel_id: channel_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberCount {
    Visible(u64),
    Hidden,
}

impl SubscriberCount {
    pub fn visible(self) -> Option<u64> {
        match self {
            SubscriberCount::Visible(count) => Some(count),
            SubscriberCount::Hidden => None,
        }
    }
}

impl fmt::Display for SubscriberCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberCount::Visible(count) => write!(f, "{count}"),
            SubscriberCount::Hidden => write!(f, "hidden"),
        }
    }
}

/// A fully resolved channel. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub channel_id: ChannelId,
    pub title: String,
    pub subscribers: SubscriberCount,
    pub last_upload_at: Option<DateTime<Utc>>,
    /// ISO 3166-1 alpha-2 code from the channel's branding, when set.
    pub country: Option<String>,
    /// Unique addresses found in the channel description, in order of appearance.
    pub emails: Vec<String>,
}

impl ChannelRecord {
    pub fn url(&self) -> String {
        channel_url(&self.channel_id)
    }
}

pub fn channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{channel_id}")
}

/// A record that passed the filter, tagged with the keyword that surfaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub record: ChannelRecord,
    pub keyword: String,
}

impl Lead {
    pub fn channel_id(&self) -> &str {
        &self.record.channel_id
    }

    /// Sheet row in stable column order.
    pub fn to_row(&self, date_added: DateTime<Utc>) -> Vec<String> {
        let record = &self.record;
        vec![
            record.channel_id.clone(),
            record.title.clone(),
            record.subscribers.to_string(),
            record
                .last_upload_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            date_added.to_rfc3339(),
            record.emails.join(", "),
            record.country.clone().unwrap_or_default(),
            self.keyword.clone(),
            record.url(),
        ]
    }
}

/// Header row matching [`Lead::to_row`].
pub const SHEET_HEADER: [&str; 9] = [
    "channelId",
    "title",
    "subscriberCount",
    "lastUploadAt",
    "dateAdded",
    "emails",
    "country",
    "keyword",
    "channelUrl",
];
