use std::future::Future;

use leadscout_core::{KeyRotator, NoKeysAvailable};
use leadscout_logging::{redact, scout_debug, scout_warn};

use crate::{ApiError, RetryPolicy, SheetError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyedCallError {
    NoKeys(NoKeysAvailable),
    Api(ApiError),
}

/// Runs `call` with the rotator's current key.
///
/// A key-retiring failure marks the key exhausted and retries at once with the
/// next key; that loop ends when the rotator runs dry. Transient failures back
/// off and retry up to `policy.max_attempts` in total.
pub(crate) async fn call_with_keys<T, F, Fut>(
    rotator: &mut KeyRotator,
    policy: &RetryPolicy,
    what: &str,
    mut call: F,
) -> Result<T, KeyedCallError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1;
    loop {
        let key = rotator.next().map_err(KeyedCallError::NoKeys)?;
        match call(key.value().to_string()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind.retires_key() => {
                scout_warn!(
                    "{} on key {} during {}; rotating to next key",
                    err.kind,
                    redact(key.value()),
                    what
                );
                rotator.mark_exhausted(key.value());
            }
            Err(err) if err.kind.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                scout_warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                scout_debug!("{} gave up after {} attempt(s): {}", what, attempt, err);
                return Err(KeyedCallError::Api(err));
            }
        }
    }
}

/// Same transient policy for sheet calls, which have no key to rotate.
pub(crate) async fn retry_sheet_call<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut call: F,
) -> Result<T, SheetError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SheetError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                scout_warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use super::*;
    use crate::FailureKind;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn quota_errors_rotate_without_consuming_attempts() {
        let mut rotator = KeyRotator::new(["k1", "k2", "k3"]);
        let seen = RefCell::new(Vec::new());
        let result = call_with_keys(&mut rotator, &fast_policy(), "test", |key| {
            seen.borrow_mut().push(key.clone());
            async move {
                if key == "k3" {
                    Ok(key)
                } else {
                    Err(ApiError::new(FailureKind::QuotaExceeded, "quota"))
                }
            }
        })
        .await;
        assert_eq!(result, Ok("k3".to_string()));
        assert_eq!(*seen.borrow(), ["k1", "k2", "k3"]);
        assert_eq!(rotator.active_count(), 1);
    }

    #[tokio::test]
    async fn exhausting_every_key_reports_no_keys() {
        let mut rotator = KeyRotator::new(["k1", "k2"]);
        let result: Result<(), _> = call_with_keys(&mut rotator, &fast_policy(), "test", |_| async {
            Err(ApiError::new(FailureKind::QuotaExceeded, "quota"))
        })
        .await;
        assert_eq!(result, Err(KeyedCallError::NoKeys(NoKeysAvailable)));
    }

    #[tokio::test]
    async fn transient_errors_stop_after_max_attempts() {
        let mut rotator = KeyRotator::new(["k1"]);
        let calls = RefCell::new(0);
        let result: Result<(), _> = call_with_keys(&mut rotator, &fast_policy(), "test", |_| {
            *calls.borrow_mut() += 1;
            async { Err(ApiError::new(FailureKind::HttpStatus(503), "busy")) }
        })
        .await;
        assert!(matches!(result, Err(KeyedCallError::Api(ref e)) if e.kind == FailureKind::HttpStatus(503)));
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(rotator.active_count(), 1);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let mut rotator = KeyRotator::new(["k1"]);
        let calls = RefCell::new(0);
        let result: Result<(), _> = call_with_keys(&mut rotator, &fast_policy(), "test", |_| {
            *calls.borrow_mut() += 1;
            async { Err(ApiError::new(FailureKind::HttpStatus(400), "bad request")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(*calls.borrow(), 1);
    }

    #[tokio::test]
    async fn sheet_auth_errors_are_not_retried() {
        let calls = RefCell::new(0);
        let result: Result<(), _> = retry_sheet_call(&fast_policy(), "append", || {
            *calls.borrow_mut() += 1;
            async { Err(SheetError::Auth("denied".into())) }
        })
        .await;
        assert_eq!(result, Err(SheetError::Auth("denied".into())));
        assert_eq!(*calls.borrow(), 1);
    }
}
