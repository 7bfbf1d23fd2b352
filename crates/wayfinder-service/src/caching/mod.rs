//! # Wayfinder request caching infrastructure
//!
//! Every query a map embedder issues (routes, distance matrices, place
//! lookups) goes to a metered remote backend, so the service deduplicates
//! and replays them aggressively. This module contains the caching layer,
//! our central [`FetchError`] type, and an explanation of how the pieces
//! fit together.
//!
//! ## Cache layer
//!
//! There is a single in-memory caching layer which doubles as request
//! coalescing (deduplicating concurrent accesses): the cache stores
//! *pending results* ([`SharedFetch`]), not just settled values. A lookup
//! that hits an in-flight fetch returns a handle to that same fetch, so
//! concurrent equivalent requests share one backend invocation.
//!
//! The layer is bounded by a strict LRU ([`LruMap`]): `get`/`contains`/
//! `insert` touch an entry's recency, and inserting beyond capacity evicts
//! exactly the entry that has gone longest without a touch.
//!
//! ## [`RequestKey`]
//!
//! Cache keys are canonical serializations of the request: object keys are
//! emitted in lexicographic order at every nesting level, so requests that
//! are structurally equal but differ in property insertion order map to
//! the same entry. The canonical text is kept around for debugging, and a
//! SHA-256 digest of it is what is actually hashed and compared.
//!
//! ## [`FetchResult`] / [`FetchError`]
//!
//! The caching layer deals in [`FetchResult`]s, an alias for a [`Result`]
//! around a [`FetchError`]. The error variants mirror the status codes of
//! the remote mapping backend. The cache never wraps or rewrites errors;
//! it only *observes* them: when a stored fetch settles in an error the
//! cache's retry predicate classifies as transient (quota, timeout,
//! backend failure), the entry is dropped so the next equivalent request
//! re-issues the fetch. Permanent failures (invalid request, denied, not
//! found) stay cached and replay to every caller without hammering a
//! backend that is consistently rejecting the input.
//!
//! ## Metrics
//!
//! Each metric is tagged with a `cache` field naming the request type:
//!
//! - `requests.cache.access`: all lookups.
//! - `requests.cache.hit`: lookups served by an existing entry.
//! - `requests.cache.computation`: fetches actually started.
//! - `requests.cache.eviction`: entries dropped by the retry policy.

mod fetch_error;
mod lru;
mod request_cache;
mod request_key;

pub use fetch_error::{FetchError, FetchResult};
pub use lru::LruMap;
pub use request_cache::{RequestCache, SharedFetch};
pub use request_key::RequestKey;
