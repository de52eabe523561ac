use leadscout_core::{
    passes_profile, ChannelCandidate, ChannelRecord, FilterCriteria, KeyRotator, NoKeysAvailable,
};
use leadscout_logging::{scout_debug, scout_warn};

use crate::retry::{call_with_keys, KeyedCallError};
use crate::{RetryPolicy, YouTubeApi};

/// Records that passed the profile check, plus why any candidates were lost.
#[derive(Debug, Default)]
pub struct DetailBatch {
    pub records: Vec<ChannelRecord>,
    pub dropped: Vec<String>,
}

/// Resolves candidates into full channel records, batch by batch.
pub struct DetailFetcher<'a> {
    api: &'a dyn YouTubeApi,
    retry: &'a RetryPolicy,
    batch_size: usize,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(api: &'a dyn YouTubeApi, retry: &'a RetryPolicy, batch_size: usize) -> Self {
        Self {
            api,
            retry,
            batch_size: batch_size.max(1),
        }
    }

    /// Channels failing `passes_profile` are discarded before their upload history
    /// is requested. Candidates whose lookup fails are dropped and reported in
    /// [`DetailBatch::dropped`]; only key exhaustion is returned as an error.
    pub async fn fetch_details(
        &self,
        keys: &mut KeyRotator,
        candidates: &[ChannelCandidate],
        criteria: &FilterCriteria,
    ) -> Result<DetailBatch, NoKeysAvailable> {
        let mut out = DetailBatch::default();
        let api = self.api;

        for batch in candidates.chunks(self.batch_size) {
            let ids: Vec<String> = batch.iter().map(|c| c.channel_id.clone()).collect();
            let ids = ids.as_slice();
            let infos = match call_with_keys(keys, self.retry, "channel details", |key| async move {
                api.list_channels(&key, ids).await
            })
            .await
            {
                Ok(infos) => infos,
                Err(KeyedCallError::NoKeys(no_keys)) => return Err(no_keys),
                Err(KeyedCallError::Api(err)) => {
                    let reason = format!(
                        "detail lookup failed for {} channel(s) [{}]: {}",
                        ids.len(),
                        ids.join(","),
                        err
                    );
                    scout_warn!("Dropping candidates: {}", reason);
                    out.dropped.push(reason);
                    continue;
                }
            };

            for missing in ids.iter().filter(|id| !infos.iter().any(|i| &i.channel_id == *id)) {
                scout_debug!("Channel {} not returned by detail lookup", missing);
            }

            for info in infos {
                let playlist = info.uploads_playlist.clone();
                let mut record = info.into_record(None);
                if !passes_profile(&record, criteria) {
                    scout_debug!("Channel {} rejected before upload lookup", record.channel_id);
                    continue;
                }
                if let Some(playlist) = playlist.as_deref() {
                    match call_with_keys(keys, self.retry, "latest upload", |key| async move {
                        api.latest_upload(&key, playlist).await
                    })
                    .await
                    {
                        Ok(at) => record.last_upload_at = at,
                        Err(KeyedCallError::NoKeys(no_keys)) => return Err(no_keys),
                        Err(KeyedCallError::Api(err)) => {
                            let reason = format!(
                                "upload history lookup failed for {}: {}",
                                record.channel_id, err
                            );
                            scout_warn!("Dropping channel: {}", reason);
                            out.dropped.push(reason);
                            continue;
                        }
                    }
                }
                out.records.push(record);
            }
        }

        Ok(out)
    }
}
