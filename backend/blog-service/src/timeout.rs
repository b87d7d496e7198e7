/// Deadline wrapper for backend calls
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Per-backend call budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub store: Duration,
    pub cache: Duration,
    pub index: Duration,
}

impl Default for BackendTimeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            cache: Duration::from_millis(250),
            index: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error(transparent)]
    Failed(E),
}

/// Run a fallible future, failing with `Elapsed` once `duration` passes.
///
/// The inner future is dropped on expiry, which cancels the pending call.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Failed(err)),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    }
}
