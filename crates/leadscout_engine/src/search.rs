use leadscout_core::{KeyRotator, NoKeysAvailable};
use thiserror::Error;

use crate::retry::{call_with_keys, KeyedCallError};
use crate::{ApiError, RetryPolicy, SearchPage, YouTubeApi};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Run-fatal: nothing left to search with.
    #[error(transparent)]
    NoKeys(#[from] NoKeysAvailable),
    /// Recoverable: skip this keyword.
    #[error("search for '{keyword}' failed: {source}")]
    Keyword { keyword: String, source: ApiError },
}

/// Pages through channel search results for one keyword at a time.
pub struct SearchDriver<'a> {
    api: &'a dyn YouTubeApi,
    retry: &'a RetryPolicy,
    page_size: usize,
}

impl<'a> SearchDriver<'a> {
    pub fn new(api: &'a dyn YouTubeApi, retry: &'a RetryPolicy, page_size: usize) -> Self {
        Self {
            api,
            retry,
            page_size,
        }
    }

    pub async fn search(
        &self,
        keys: &mut KeyRotator,
        keyword: &str,
        page_token: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let api = self.api;
        let page_size = self.page_size;
        let what = format!("search '{keyword}'");
        call_with_keys(keys, self.retry, &what, |key| async move {
            api.search_channels(&key, keyword, page_token, page_size)
                .await
        })
        .await
        .map_err(|err| match err {
            KeyedCallError::NoKeys(no_keys) => SearchError::NoKeys(no_keys),
            KeyedCallError::Api(source) => SearchError::Keyword {
                keyword: keyword.to_string(),
                source,
            },
        })
    }
}
