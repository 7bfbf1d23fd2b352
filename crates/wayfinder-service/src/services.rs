//! Provides the internal shared wayfinder services and a way to initialize
//! them.
//!
//! [`SharedServices`] is the context object everything hangs off of: the
//! configuration, the per-map viewport registry, and the cached route
//! resolver. Embedders construct one per process (or per test) and share
//! it; nothing in this crate keeps module-level global state.

use std::sync::Arc;

use crate::config::Config;
use crate::routes::{RouteResolver, Transport};
use crate::viewport::ViewportRegistry;

pub struct SharedServices {
    pub config: Config,
    pub viewports: ViewportRegistry,
    pub routes: RouteResolver,
}

impl SharedServices {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let routes = RouteResolver::new(&config, transport);

        Self {
            config,
            viewports: ViewportRegistry::new(),
            routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::FutureExt;
    use futures::future::BoxFuture;

    use crate::caching::FetchResult;
    use crate::routes::{
        DirectionsRequest, DistanceMatrix, DistanceMatrixRequest, Route, RouteOverlay, TravelMode,
        Waypoint,
    };
    use crate::test;
    use crate::viewport::{LatLng, LatLngBounds, MapViewport};

    use super::*;

    struct StaticTransport;

    impl Transport for StaticTransport {
        fn route(&self, _request: &DirectionsRequest) -> BoxFuture<'static, FetchResult<Route>> {
            let route = Route {
                summary: "B221".into(),
                bounds: Some(LatLngBounds::new(
                    LatLng::new(48.1, 16.2),
                    LatLng::new(48.3, 16.5),
                )),
                path: Vec::new(),
                legs: Vec::new(),
            };
            async move { Ok(route) }.boxed()
        }

        fn distance_matrix(
            &self,
            _request: &DistanceMatrixRequest,
        ) -> BoxFuture<'static, FetchResult<DistanceMatrix>> {
            async move { Ok(DistanceMatrix { rows: Vec::new() }) }.boxed()
        }
    }

    #[derive(Default)]
    struct FakeMap {
        fitted: Mutex<Option<LatLngBounds>>,
    }

    impl MapViewport for FakeMap {
        fn fit_bounds(&self, bounds: LatLngBounds) {
            *self.fitted.lock().unwrap() = Some(bounds);
        }
    }

    /// A resolved route flows from the resolver through an overlay into
    /// the map's viewport.
    #[tokio::test]
    async fn test_route_to_viewport_roundtrip() {
        test::setup();
        let services = SharedServices::new(Config::default(), Arc::new(StaticTransport));

        let route = services
            .routes
            .fetch_route(&DirectionsRequest {
                origin: Waypoint::place_id("start"),
                destination: Waypoint::place_id("end"),
                waypoints: Vec::new(),
                travel_mode: TravelMode::Transit,
            })
            .await
            .unwrap();
        let route_bounds = route.bounds.unwrap();

        let overlay = Arc::new(RouteOverlay::new());
        overlay.set_route(Some(route));

        let map = Arc::new(FakeMap::default());
        let handle: Arc<dyn MapViewport> = map.clone();
        let aggregator = services.viewports.aggregator_for(&handle);
        aggregator.register(overlay);
        aggregator.update_viewport().await;

        assert_eq!(*map.fitted.lock().unwrap(), Some(route_bounds));
    }
}
