use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use leadscout_core::{Lead, SHEET_HEADER};
use leadscout_logging::{scout_debug, scout_info};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::auth::{AuthError, TokenSource};
use crate::retry::retry_sheet_call;
use crate::types::map_reqwest_error;
use crate::youtube::GoogleErrorBody;
use crate::{ApiError, FailureKind, RetryPolicy, SheetError, SheetTarget};

/// Row storage behind the Sheet Writer.
#[async_trait::async_trait]
pub trait SheetStore: Send + Sync {
    /// Every value in the first column, header included, in row order.
    async fn first_column(&self) -> Result<Vec<String>, SheetError>;

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), SheetError>;
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: Url,
    target: SheetTarget,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        target: SheetTarget,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, SheetError> {
        let base_url = Url::parse(base_url).map_err(|err| {
            SheetError::Api(ApiError::new(FailureKind::Decode, err.to_string()))
        })?;
        Ok(Self {
            client,
            base_url,
            target,
            tokens,
        })
    }

    /// A1 range on the target worksheet, quoted so any title is legal.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{}", self.target.worksheet.replace('\'', "''"), cells)
    }

    fn values_url(&self, last_segment: &str) -> Result<Url, SheetError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SheetError::Api(ApiError::new(FailureKind::Decode, "base url cannot be a base"))
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.target.spreadsheet_id.as_str(),
                "values",
                last_segment,
            ]);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, SheetError> {
        self.tokens.access_token().await.map_err(|err| match err {
            AuthError::Transport(message) => {
                SheetError::Api(ApiError::new(FailureKind::Network, message))
            }
            other => SheetError::Auth(other.to_string()),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, SheetError> {
        let response = request
            .send()
            .await
            .map_err(|err| SheetError::Api(map_reqwest_error(err)))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| SheetError::Api(map_reqwest_error(err)))?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        Err(classify_sheet_error(
            status.as_u16(),
            &body,
            &self.target.spreadsheet_id,
            &self.target.worksheet,
        ))
    }
}

#[async_trait::async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn first_column(&self) -> Result<Vec<String>, SheetError> {
        let token = self.bearer().await?;
        let url = self.values_url(&self.range("A:A"))?;
        let body = self
            .send(self.client.get(url).bearer_auth(token))
            .await?;
        let range: ValueRange = serde_json::from_slice(&body).map_err(|err| {
            SheetError::Api(ApiError::new(FailureKind::Decode, err.to_string()))
        })?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().next().map(cell_text).unwrap_or_default())
            .collect())
    }

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let token = self.bearer().await?;
        let mut url = self.values_url(&format!("{}:append", self.range("A1")))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "majorDimension": "ROWS", "values": rows }).to_string();
        self.send(
            self.client
                .post(url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub(crate) fn classify_sheet_error(
    status: u16,
    body: &[u8],
    spreadsheet_id: &str,
    worksheet: &str,
) -> SheetError {
    let message = serde_json::from_slice::<GoogleErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    match status {
        401 | 403 => SheetError::Auth(message),
        404 => SheetError::NotFound(format!("spreadsheet {spreadsheet_id}: {message}")),
        // A missing worksheet shows up as an unparseable range.
        400 if message.contains("Unable to parse range") => {
            SheetError::NotFound(format!("worksheet '{worksheet}': {message}"))
        }
        _ => SheetError::Api(ApiError::new(FailureKind::HttpStatus(status), message)),
    }
}

/// Appends leads, never writing a channel id the sheet already holds.
pub struct SheetWriter {
    store: Arc<dyn SheetStore>,
    retry: RetryPolicy,
    known: HashSet<String>,
}

impl SheetWriter {
    pub fn new(store: Arc<dyn SheetStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            known: HashSet::new(),
        }
    }

    /// Reads the ids already in the sheet; writes the header row when the sheet is empty.
    pub async fn load_existing_ids(&mut self) -> Result<HashSet<String>, SheetError> {
        let store = self.store.clone();
        let column = retry_sheet_call(&self.retry, "read existing rows", || {
            let store = store.clone();
            async move { store.first_column().await }
        })
        .await?;

        if column.is_empty() {
            scout_info!("Worksheet is empty; writing header row");
            let header = vec![SHEET_HEADER.iter().map(|h| h.to_string()).collect()];
            self.append_with_retry(header).await?;
        }

        let ids: HashSet<String> = column
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != SHEET_HEADER[0])
            .collect();
        scout_info!("Found {} existing channel(s) in sheet", ids.len());
        self.known.extend(ids.iter().cloned());
        Ok(ids)
    }

    pub fn is_known(&self, channel_id: &str) -> bool {
        self.known.contains(channel_id)
    }

    /// Returns how many rows were actually written.
    pub async fn append(
        &mut self,
        leads: &[Lead],
        date_added: DateTime<Utc>,
    ) -> Result<usize, SheetError> {
        let mut batch_ids: HashSet<&str> = HashSet::new();
        let fresh: Vec<&Lead> = leads
            .iter()
            .filter(|lead| !self.known.contains(lead.channel_id()))
            .filter(|lead| batch_ids.insert(lead.channel_id()))
            .collect();
        if fresh.is_empty() {
            scout_debug!("Nothing new to append ({} lead(s) already present)", leads.len());
            return Ok(0);
        }

        let rows: Vec<Vec<String>> = fresh.iter().map(|lead| lead.to_row(date_added)).collect();
        self.append_with_retry(rows).await?;
        for lead in &fresh {
            self.known.insert(lead.channel_id().to_string());
        }
        Ok(fresh.len())
    }

    async fn append_with_retry(&self, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let store = self.store.clone();
        retry_sheet_call(&self.retry, "append rows", || {
            let store = store.clone();
            let rows = rows.clone();
            async move { store.append_rows(rows).await }
        })
        .await
    }
}
