use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

pub fn new_backoff() -> ExponentialBuilder {
    ExponentialBuilder::new()
        .with_jitter()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
}

pub fn new_backoff_limited() -> ExponentialBuilder {
    new_backoff().with_max_times(2)
}

pub fn notify<E: std::fmt::Debug>(action: &str) -> impl FnMut(&E, Duration) {
    move |e, d| {
        warn!("Retrying {} due to {:?} after {:?}", action, e, d);
    }
}

pub async fn retry<T, E, F, Fut, P>(
    operation: F,
    action: &str,
    backoff: ExponentialBuilder,
    retryable: P,
) -> Result<T, E>
where
    E: std::fmt::Debug,
    Fut: Future<Output = Result<T, E>>,
    F: FnMut() -> Fut,
    P: FnMut(&E) -> bool,
{
    operation
        .retry(backoff)
        .notify(notify(action))
        .when(retryable)
        .await
}
