use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::fetch_error::{FetchError, FetchResult};
use super::lru::LruMap;
use super::request_key::RequestKey;

/// A pending fetch, shared between every caller interested in the same
/// request.
///
/// Cloning is cheap and all clones poll the same underlying operation;
/// awaiting yields the same [`FetchResult`] to every caller.
pub type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

type RetryPredicate = Arc<dyn Fn(&FetchError) -> bool + Send + Sync>;

/// A bounded in-memory cache of pending fetches, keyed by canonical
/// request.
///
/// Storing the *pending* result rather than the settled value is what
/// deduplicates concurrent lookups: every caller that asks for an
/// equivalent request while a fetch is in flight gets a handle to that
/// same fetch.
///
/// Settled failures stay cached, except those the retry predicate
/// classifies as worth retrying, which are dropped as soon as they settle
/// so that the next equivalent request starts from scratch. The predicate
/// only ever influences eviction, never the result a caller observes.
pub struct RequestCache<T> {
    /// Tag for metrics and diagnostics, e.g. `"routes"`.
    name: &'static str,
    entries: Arc<Mutex<LruMap<RequestKey, SharedFetch<T>>>>,
    should_retry: RetryPredicate,
}

impl<T> std::fmt::Debug for RequestCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().unwrap();
        f.debug_struct("RequestCache")
            .field("name", &self.name)
            .field("entries", &entries.len())
            .field("capacity", &entries.capacity())
            .finish()
    }
}

impl<T> Clone for RequestCache<T> {
    fn clone(&self) -> Self {
        // https://github.com/rust-lang/rust/issues/26925
        RequestCache {
            name: self.name,
            entries: Arc::clone(&self.entries),
            should_retry: Arc::clone(&self.should_retry),
        }
    }
}

impl<T> RequestCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `capacity` pending results.
    ///
    /// `should_retry` classifies settled failures: `true` drops the entry
    /// (the next equivalent request re-fetches), `false` keeps the failure
    /// cached for replay.
    pub fn new<F>(name: &'static str, capacity: usize, should_retry: F) -> Self
    where
        F: Fn(&FetchError) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            entries: Arc::new(Mutex::new(LruMap::new(capacity))),
            should_retry: Arc::new(should_retry),
        }
    }

    /// Looks up the pending result for `key`, marking it as recently used.
    pub fn get(&self, key: &RequestKey) -> Option<SharedFetch<T>> {
        metric!(counter("requests.cache.access") += 1, "cache" => self.name);
        let hit = self.entries.lock().unwrap().get(key).cloned();
        if hit.is_some() {
            metric!(counter("requests.cache.hit") += 1, "cache" => self.name);
        }
        hit
    }

    /// Returns whether a pending result is stored for `key`, marking it as
    /// recently used if so.
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Stores `fetch` as the pending result for `key` and returns the
    /// shared handle.
    ///
    /// A failure observer watches the stored fetch: when it settles in an
    /// error the retry predicate classifies as transient, whatever entry
    /// occupies the key slot at that point is evicted. The observer does
    /// not start, alter or cancel the fetch itself.
    pub fn insert<F>(&self, key: RequestKey, fetch: F) -> SharedFetch<T>
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let pending = fetch.boxed().shared();
        self.entries
            .lock()
            .unwrap()
            .insert(key.clone(), pending.clone());
        self.observe_failure(key, pending.clone());
        pending
    }

    /// Returns the pending result for `key`, creating it via `fetch` on a
    /// miss.
    ///
    /// Lookup and insertion happen under a single lock acquisition, so
    /// concurrent equivalent requests are guaranteed to share one
    /// underlying fetch.
    pub fn fetch_memoized<F, Fut>(&self, key: RequestKey, fetch: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        metric!(counter("requests.cache.access") += 1, "cache" => self.name);
        let pending = {
            let mut entries = self.entries.lock().unwrap();
            if let Some(pending) = entries.get(&key) {
                // A concurrent or earlier equivalent request is reused.
                metric!(counter("requests.cache.hit") += 1, "cache" => self.name);
                return pending.clone();
            }

            metric!(counter("requests.cache.computation") += 1, "cache" => self.name);
            tracing::trace!(cache = self.name, key = %key, "Starting deduplicated fetch");
            let pending = fetch().boxed().shared();
            entries.insert(key.clone(), pending.clone());
            pending
        };
        self.observe_failure(key, pending.clone());
        pending
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Watches `pending` and applies the retry policy once it settles.
    ///
    /// The task holds only a clone of the shared handle and the entry map;
    /// both are released when the fetch settles, so a settled entry is
    /// kept alive by the cache slot alone.
    fn observe_failure(&self, key: RequestKey, pending: SharedFetch<T>) {
        let entries = Arc::clone(&self.entries);
        let should_retry = Arc::clone(&self.should_retry);
        let name = self.name;

        tokio::spawn(async move {
            if let Err(error) = pending.await {
                if should_retry(&error) {
                    tracing::trace!(cache = name, key = %key, %error, "Evicting failed fetch");
                    metric!(counter("requests.cache.eviction") += 1, "cache" => name);
                    // Evict whatever occupies the slot now. If the entry was
                    // overwritten in the interim, the overwriting fetch is
                    // dropped along with the failed one.
                    entries.lock().unwrap().remove(&key);
                }
            }
        });
    }
}
