use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{ChannelRecord, SubscriberCount};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("minimum subscribers ({min}) exceeds maximum ({max})")]
    InvertedSubscriberBounds { min: u64, max: u64 },
    #[error("keyword list is empty")]
    NoKeywords,
}

/// Bounds a channel must satisfy to become a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    min_subscribers: u64,
    max_subscribers: u64,
    max_inactivity_days: Option<u32>,
    allowed_countries: BTreeSet<String>,
    require_email: bool,
}

impl FilterCriteria {
    /// `max_inactivity_days = None` means inactivity is unbounded.
    pub fn new(
        min_subscribers: u64,
        max_subscribers: u64,
        max_inactivity_days: Option<u32>,
    ) -> Result<Self, CriteriaError> {
        if min_subscribers > max_subscribers {
            return Err(CriteriaError::InvertedSubscriberBounds {
                min: min_subscribers,
                max: max_subscribers,
            });
        }
        Ok(Self {
            min_subscribers,
            max_subscribers,
            max_inactivity_days,
            allowed_countries: BTreeSet::new(),
            require_email: false,
        })
    }

    /// Restrict leads to these country codes. An empty list allows every country.
    pub fn with_allowed_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_countries = countries
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn with_require_email(mut self, require_email: bool) -> Self {
        self.require_email = require_email;
        self
    }

    pub fn min_subscribers(&self) -> u64 {
        self.min_subscribers
    }

    pub fn max_subscribers(&self) -> u64 {
        self.max_subscribers
    }

    pub fn max_inactivity_days(&self) -> Option<u32> {
        self.max_inactivity_days
    }
}

/// Checks everything except upload recency, so it can run before the upload lookup.
pub fn passes_profile(record: &ChannelRecord, criteria: &FilterCriteria) -> bool {
    let subscribers = match record.subscribers {
        SubscriberCount::Visible(count) => count,
        SubscriberCount::Hidden => return false,
    };
    if subscribers < criteria.min_subscribers || subscribers > criteria.max_subscribers {
        return false;
    }

    if !criteria.allowed_countries.is_empty() {
        let allowed = record
            .country
            .as_deref()
            .map(|c| criteria.allowed_countries.contains(&c.to_ascii_uppercase()))
            .unwrap_or(false);
        if !allowed {
            return false;
        }
    }

    !(criteria.require_email && record.emails.is_empty())
}

/// Pure lead predicate. `now` is supplied by the caller.
pub fn accepts(record: &ChannelRecord, criteria: &FilterCriteria, now: DateTime<Utc>) -> bool {
    if !passes_profile(record, criteria) {
        return false;
    }

    if let Some(max_days) = criteria.max_inactivity_days {
        let Some(last_upload) = record.last_upload_at else {
            return false;
        };
        // Whole days, truncated toward zero.
        if now.signed_duration_since(last_upload).num_days() > i64::from(max_days) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn record(subscribers: SubscriberCount, days_ago: Option<i64>) -> ChannelRecord {
        ChannelRecord {
            channel_id: "UC1".into(),
            title: "Test".into(),
            subscribers,
            last_upload_at: days_ago.map(|d| now() - Duration::days(d)),
            country: None,
            emails: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert_eq!(
            FilterCriteria::new(10, 5, None),
            Err(CriteriaError::InvertedSubscriberBounds { min: 10, max: 5 })
        );
        assert!(FilterCriteria::new(5, 5, Some(0)).is_ok());
    }

    #[test]
    fn subscriber_bounds_are_inclusive() {
        let criteria = FilterCriteria::new(1000, 100_000, None).unwrap();
        for (count, expected) in [
            (999, false),
            (1000, true),
            (50_000, true),
            (100_000, true),
            (100_001, false),
        ] {
            let r = record(SubscriberCount::Visible(count), Some(1));
            assert_eq!(accepts(&r, &criteria, now()), expected, "count {count}");
        }
    }

    #[test]
    fn hidden_subscribers_are_rejected() {
        let criteria = FilterCriteria::new(0, u64::MAX, None).unwrap();
        assert!(!accepts(&record(SubscriberCount::Hidden, Some(1)), &criteria, now()));
    }

    #[test]
    fn inactivity_boundary_is_inclusive() {
        let criteria = FilterCriteria::new(0, 10, Some(30)).unwrap();
        let on_edge = record(SubscriberCount::Visible(5), Some(30));
        let past_edge = record(SubscriberCount::Visible(5), Some(31));
        assert!(accepts(&on_edge, &criteria, now()));
        assert!(!accepts(&past_edge, &criteria, now()));
    }

    #[test]
    fn missing_upload_history_depends_on_bound() {
        let bounded = FilterCriteria::new(0, 10, Some(365)).unwrap();
        let unbounded = FilterCriteria::new(0, 10, None).unwrap();
        let never_uploaded = record(SubscriberCount::Visible(5), None);
        assert!(!accepts(&never_uploaded, &bounded, now()));
        assert!(accepts(&never_uploaded, &unbounded, now()));
    }

    #[test]
    fn country_allow_list_is_case_insensitive() {
        let criteria = FilterCriteria::new(0, 10, None)
            .unwrap()
            .with_allowed_countries(["us", " GB "]);
        let mut r = record(SubscriberCount::Visible(5), Some(1));
        assert!(!accepts(&r, &criteria, now()));
        r.country = Some("gb".into());
        assert!(accepts(&r, &criteria, now()));
        r.country = Some("FR".into());
        assert!(!accepts(&r, &criteria, now()));
    }

    #[test]
    fn require_email_rejects_channels_without_contact() {
        let criteria = FilterCriteria::new(0, 10, None)
            .unwrap()
            .with_require_email(true);
        let mut r = record(SubscriberCount::Visible(5), Some(1));
        assert!(!accepts(&r, &criteria, now()));
        r.emails.push("biz@example.com".into());
        assert!(accepts(&r, &criteria, now()));
    }

    #[test]
    fn profile_check_ignores_upload_history() {
        let criteria = FilterCriteria::new(1000, 100_000, Some(30))
            .unwrap()
            .with_allowed_countries(["US"]);
        let mut stale = record(SubscriberCount::Visible(5000), Some(400));
        stale.country = Some("US".into());
        assert!(passes_profile(&stale, &criteria));
        assert!(!accepts(&stale, &criteria, now()));

        let mut too_big = record(SubscriberCount::Visible(9_000_000), None);
        too_big.country = Some("US".into());
        assert!(!passes_profile(&too_big, &criteria));

        let foreign = record(SubscriberCount::Visible(5000), Some(1));
        assert!(!passes_profile(&foreign, &criteria));
        assert!(!passes_profile(&record(SubscriberCount::Hidden, Some(1)), &criteria));
    }
}
