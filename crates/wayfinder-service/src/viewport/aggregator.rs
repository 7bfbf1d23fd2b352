use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, join_all};

use super::bounds::LatLngBounds;

/// Anything occupying map area that can report the region it occupies.
///
/// The query is asynchronous because a contributor may have to lazily
/// resolve its geometry first. Returning `None` means "nothing to
/// contribute right now" and excludes the contributor from the union.
pub trait BoundsContributor: Send + Sync {
    fn bounds(&self) -> BoxFuture<'_, Option<LatLngBounds>>;
}

/// The map-like target whose viewport gets fitted to the aggregated
/// bounds. Opaque to the aggregator beyond this single operation.
pub trait MapViewport: Send + Sync {
    fn fit_bounds(&self, bounds: LatLngBounds);
}

fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Coordinates viewport fitting for a single map.
///
/// Many independent UI elements may occupy area on the same map; exactly
/// one aggregator per map collects their bounds and keeps the viewport
/// fitted to the union. Instances are handed out by
/// [`ViewportRegistry::aggregator_for`]; clones share the same state.
///
/// Overlapping [`update_viewport`](Self::update_viewport) calls are not
/// serialized; instead, the last *issued* call wins: every call claims an
/// epoch before querying contributors, and a call that finds a newer epoch
/// claimed by the time its queries complete applies nothing.
#[derive(Clone)]
pub struct ViewportAggregator {
    map: Arc<dyn MapViewport>,
    contributors: Arc<Mutex<Vec<Arc<dyn BoundsContributor>>>>,
    epoch: Arc<AtomicU64>,
}

impl ViewportAggregator {
    fn new(map: Arc<dyn MapViewport>) -> Self {
        Self {
            map,
            contributors: Default::default(),
            epoch: Default::default(),
        }
    }

    /// Adds `contributor` to the managed set and refreshes the viewport.
    ///
    /// Registering an already-registered contributor (same allocation) is
    /// a no-op and triggers no recomputation.
    pub fn register(&self, contributor: Arc<dyn BoundsContributor>) {
        {
            let mut contributors = self.contributors.lock().unwrap();
            if contributors.iter().any(|c| same_object(c, &contributor)) {
                return;
            }
            contributors.push(contributor);
        }
        self.spawn_update();
    }

    /// Removes `contributor` from the managed set and refreshes the
    /// viewport. No-op if it was not registered.
    pub fn unregister(&self, contributor: &Arc<dyn BoundsContributor>) {
        {
            let mut contributors = self.contributors.lock().unwrap();
            let before = contributors.len();
            contributors.retain(|c| !same_object(c, contributor));
            if contributors.len() == before {
                return;
            }
        }
        self.spawn_update();
    }

    fn spawn_update(&self) {
        let this = self.clone();
        tokio::spawn(async move { this.update_viewport().await });
    }

    /// Queries every registered contributor and fits the map's viewport to
    /// the union of the reported bounds.
    ///
    /// Contributors reporting `None` are excluded. If nothing reports
    /// bounds, the viewport is left untouched rather than reset. A call
    /// superseded by a later one (see the type docs) applies nothing.
    pub async fn update_viewport(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let contributors: Vec<_> = self.contributors.lock().unwrap().clone();

        let queried_at = Instant::now();
        let regions = join_all(contributors.iter().map(|c| c.bounds())).await;
        metric!(timer("viewport.query") = queried_at.elapsed());
        let union = regions
            .into_iter()
            .flatten()
            .reduce(|acc, bounds| acc.union(&bounds));

        let Some(bounds) = union else {
            tracing::trace!("No contributor reported bounds, leaving viewport untouched");
            return;
        };
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::trace!("Discarding superseded viewport update");
            return;
        }

        metric!(counter("viewport.fit") += 1);
        self.map.fit_bounds(bounds);
    }
}

/// Hands out the single [`ViewportAggregator`] responsible for each map.
///
/// Maps are identified by handle identity (the `Arc` allocation), not by
/// any derived value. The registry is owned by the service context rather
/// than being process-global, which keeps lifecycle and test isolation
/// explicit.
#[derive(Default)]
pub struct ViewportRegistry {
    aggregators: Mutex<Vec<(Arc<dyn MapViewport>, ViewportAggregator)>>,
}

impl ViewportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregator for `map`, creating it on first lookup.
    pub fn aggregator_for(&self, map: &Arc<dyn MapViewport>) -> ViewportAggregator {
        let mut aggregators = self.aggregators.lock().unwrap();
        if let Some((_, aggregator)) = aggregators.iter().find(|(m, _)| same_object(m, map)) {
            return aggregator.clone();
        }

        tracing::debug!("Creating viewport aggregator for new map");
        let aggregator = ViewportAggregator::new(Arc::clone(map));
        aggregators.push((Arc::clone(map), aggregator.clone()));
        aggregator
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;

    use crate::test;
    use crate::viewport::LatLng;

    use super::*;

    /// Records every `fit_bounds` call.
    #[derive(Default)]
    struct FakeMap {
        fitted: Mutex<Vec<LatLngBounds>>,
    }

    impl FakeMap {
        fn last_fitted(&self) -> Option<LatLngBounds> {
            self.fitted.lock().unwrap().last().copied()
        }

        fn fit_count(&self) -> usize {
            self.fitted.lock().unwrap().len()
        }
    }

    impl MapViewport for FakeMap {
        fn fit_bounds(&self, bounds: LatLngBounds) {
            self.fitted.lock().unwrap().push(bounds);
        }
    }

    /// Reports a fixed region, or nothing, with an optional delay.
    struct FakeOverlay {
        bounds: Option<LatLngBounds>,
        delay: Duration,
    }

    impl FakeOverlay {
        fn with_bounds(bounds: LatLngBounds) -> Arc<dyn BoundsContributor> {
            Arc::new(Self {
                bounds: Some(bounds),
                delay: Duration::ZERO,
            })
        }

        fn empty() -> Arc<dyn BoundsContributor> {
            Arc::new(Self {
                bounds: None,
                delay: Duration::ZERO,
            })
        }
    }

    impl BoundsContributor for FakeOverlay {
        fn bounds(&self) -> BoxFuture<'_, Option<LatLngBounds>> {
            async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.bounds
            }
            .boxed()
        }
    }

    fn region(south: f64, west: f64, north: f64, east: f64) -> LatLngBounds {
        LatLngBounds::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    fn setup_map() -> (Arc<FakeMap>, Arc<dyn MapViewport>) {
        let map = Arc::new(FakeMap::default());
        let handle: Arc<dyn MapViewport> = map.clone();
        (map, handle)
    }

    #[tokio::test]
    async fn test_one_aggregator_per_map() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (_, first_map) = setup_map();
        let (_, second_map) = setup_map();

        let a = registry.aggregator_for(&first_map);
        let b = registry.aggregator_for(&first_map);
        let c = registry.aggregator_for(&second_map);

        // Repeated lookups share state, distinct maps do not.
        assert!(Arc::ptr_eq(&a.contributors, &b.contributors));
        assert!(!Arc::ptr_eq(&a.contributors, &c.contributors));
    }

    #[tokio::test]
    async fn test_empty_registry_never_fits() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();

        let aggregator = registry.aggregator_for(&handle);
        aggregator.update_viewport().await;

        assert_eq!(map.fit_count(), 0);
    }

    #[tokio::test]
    async fn test_single_contributor_fits_its_region() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let r = region(0.0, 0.0, 10.0, 10.0);
        aggregator.register(FakeOverlay::with_bounds(r));
        aggregator.update_viewport().await;

        assert_eq!(map.last_fitted(), Some(r));
    }

    #[tokio::test]
    async fn test_register_triggers_update() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let r = region(0.0, 0.0, 10.0, 10.0);
        aggregator.register(FakeOverlay::with_bounds(r));

        // The refresh runs as a spawned task.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(map.last_fitted(), Some(r));
    }

    #[tokio::test]
    async fn test_empty_contributor_is_excluded() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let r = region(0.0, 0.0, 10.0, 10.0);
        aggregator.register(FakeOverlay::with_bounds(r));
        aggregator.register(FakeOverlay::empty());
        aggregator.update_viewport().await;

        assert_eq!(map.last_fitted(), Some(r));
    }

    #[tokio::test]
    async fn test_union_of_two_contributors() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        aggregator.register(FakeOverlay::with_bounds(region(0.0, 0.0, 10.0, 10.0)));
        aggregator.register(FakeOverlay::with_bounds(region(20.0, 20.0, 30.0, 30.0)));
        aggregator.update_viewport().await;

        assert_eq!(map.last_fitted(), Some(region(0.0, 0.0, 30.0, 30.0)));
    }

    #[tokio::test]
    async fn test_unregister_refits_remaining() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let r1 = region(0.0, 0.0, 10.0, 10.0);
        let keep = FakeOverlay::with_bounds(r1);
        let extra = FakeOverlay::with_bounds(region(20.0, 20.0, 30.0, 30.0));

        aggregator.register(Arc::clone(&keep));
        aggregator.register(Arc::clone(&extra));
        aggregator.update_viewport().await;
        assert_eq!(map.last_fitted(), Some(region(0.0, 0.0, 30.0, 30.0)));

        aggregator.unregister(&extra);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(map.last_fitted(), Some(r1));
    }

    #[tokio::test]
    async fn test_reregistering_is_a_noop() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let overlay = FakeOverlay::with_bounds(region(0.0, 0.0, 10.0, 10.0));
        aggregator.register(Arc::clone(&overlay));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fits = map.fit_count();

        aggregator.register(overlay);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(map.fit_count(), fits);
    }

    #[tokio::test]
    async fn test_unregister_to_empty_leaves_viewport() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let r = region(0.0, 0.0, 10.0, 10.0);
        let overlay = FakeOverlay::with_bounds(r);
        {
            let mut contributors = aggregator.contributors.lock().unwrap();
            contributors.push(Arc::clone(&overlay));
        }
        aggregator.update_viewport().await;

        aggregator.unregister(&overlay);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The viewport stays where the last union put it.
        assert_eq!(map.last_fitted(), Some(r));
        assert_eq!(map.fit_count(), 1);
    }

    #[tokio::test]
    async fn test_superseded_update_is_discarded() {
        test::setup();
        let registry = ViewportRegistry::new();
        let (map, handle) = setup_map();
        let aggregator = registry.aggregator_for(&handle);

        let slow = Arc::new(FakeOverlay {
            bounds: Some(region(0.0, 0.0, 10.0, 10.0)),
            delay: Duration::from_millis(100),
        });
        let slow: Arc<dyn BoundsContributor> = slow;

        {
            let mut contributors = aggregator.contributors.lock().unwrap();
            contributors.push(Arc::clone(&slow));
        }

        // Issue a slow update, then swap the contributor set and issue a
        // fast one. The slow update resolves last but must not win.
        let first = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.update_viewport().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fast = region(50.0, 50.0, 60.0, 60.0);
        {
            let mut contributors = aggregator.contributors.lock().unwrap();
            contributors.clear();
            contributors.push(FakeOverlay::with_bounds(fast));
        }
        aggregator.update_viewport().await;
        first.await.unwrap();

        assert_eq!(map.last_fitted(), Some(fast));
        assert_eq!(map.fit_count(), 1);
    }
}
