use std::sync::Arc;

use futures::future::BoxFuture;

use crate::caching::{FetchError, FetchResult, RequestCache, RequestKey};
use crate::config::Config;

use super::{DirectionsRequest, DistanceMatrix, DistanceMatrixRequest, Route};

/// The remote routing backend.
///
/// Implementations perform the actual network calls; the resolver never
/// talks to the network itself. May reject with any [`FetchError`]; the
/// transient variants cause the resolver to retry on the next equivalent
/// request instead of replaying the failure.
pub trait Transport: Send + Sync {
    fn route(&self, request: &DirectionsRequest) -> BoxFuture<'static, FetchResult<Route>>;

    fn distance_matrix(
        &self,
        request: &DistanceMatrixRequest,
    ) -> BoxFuture<'static, FetchResult<DistanceMatrix>>;
}

/// Provides cached, deduplicated access to the routing backend.
///
/// One request cache per request type; equivalent requests issued
/// concurrently share a single backend call, and settled results replay
/// according to the retry policy (see
/// [`FetchError::is_transient`]).
#[derive(Clone)]
pub struct RouteResolver {
    transport: Arc<dyn Transport>,
    routes: RequestCache<Route>,
    matrices: RequestCache<DistanceMatrix>,
}

impl RouteResolver {
    /// Creates a new [`RouteResolver`] on top of `transport`.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let in_memory = &config.caches.in_memory;
        Self {
            transport,
            routes: RequestCache::new(
                "routes",
                in_memory.routes_capacity,
                FetchError::is_transient,
            ),
            matrices: RequestCache::new(
                "distance_matrix",
                in_memory.distance_matrix_capacity,
                FetchError::is_transient,
            ),
        }
    }

    /// Resolves `request` to a route, from cache or from the backend.
    pub async fn fetch_route(&self, request: &DirectionsRequest) -> FetchResult<Route> {
        let key = RequestKey::for_request(request)?;
        let transport = Arc::clone(&self.transport);
        let request = request.clone();
        self.routes
            .fetch_memoized(key, move || transport.route(&request))
            .await
    }

    /// Resolves `request` to a distance matrix, from cache or from the
    /// backend.
    pub async fn fetch_distance_matrix(
        &self,
        request: &DistanceMatrixRequest,
    ) -> FetchResult<DistanceMatrix> {
        let key = RequestKey::for_request(request)?;
        let transport = Arc::clone(&self.transport);
        let request = request.clone();
        self.matrices
            .fetch_memoized(key, move || transport.distance_matrix(&request))
            .await
    }
}
