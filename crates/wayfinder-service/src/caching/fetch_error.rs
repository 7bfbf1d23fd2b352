use std::time::Duration;

use thiserror::Error;

/// An error produced while fetching map data from the remote backend.
///
/// This error enum is intended for caching: a stored fetch that settled in
/// one of these variants may be replayed to later callers, except for the
/// transient ones which the cache's retry policy drops (see
/// [`is_transient`](Self::is_transient)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The query matched nothing on the backend.
    #[error("not found")]
    NotFound,
    /// The request was rejected as malformed or unroutable.
    ///
    /// The attached string contains the backend's response.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The backend refused to serve the caller.
    ///
    /// The attached string contains the backend's response.
    #[error("request denied: {0}")]
    Denied(String),
    /// The caller ran into the backend's rate limit.
    #[error("query quota exceeded")]
    QuotaExceeded,
    /// The operation did not complete in time.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    /// The backend failed for an unknown or server-side reason, like
    /// connection loss, DNS resolution, or a 5xx response.
    ///
    /// The attached string contains the backend's response.
    #[error("backend error: {0}")]
    Backend(String),
    /// An unexpected error in wayfinder itself.
    ///
    /// This variant is not intended to be replayed from caches.
    #[error("internal error")]
    InternalError,
}

impl FetchError {
    /// Whether an equivalent request is worth re-issuing.
    ///
    /// This is the default retry classification used by the request
    /// caches: transient failures are evicted so the next equivalent
    /// request hits the backend again, everything else is replayed from
    /// the cache as-is.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::Timeout(_) | Self::Backend(_) | Self::InternalError
        )
    }

    #[track_caller]
    pub fn from_std_error<E: std::error::Error + 'static>(e: E) -> Self {
        let dynerr: &dyn std::error::Error = &e; // tracing expects a `&dyn Error`
        tracing::error!(error = dynerr);
        Self::InternalError
    }
}

impl From<serde_json::Error> for FetchError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::from_std_error(err)
    }
}

/// The outcome of a fetch against the remote backend, as stored in and
/// replayed from the request caches.
pub type FetchResult<T> = Result<T, FetchError>;
