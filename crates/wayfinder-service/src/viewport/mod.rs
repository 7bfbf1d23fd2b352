//! Viewport aggregation.
//!
//! Many independent UI elements can occupy area on the same map: route
//! polylines, markers, store listings. Each of them registers with the
//! per-map [`ViewportAggregator`], which keeps the map's viewport fitted
//! to the union of everything currently registered. Aggregators are
//! handed out by the [`ViewportRegistry`], which guarantees exactly one
//! aggregator per map handle.

mod aggregator;
mod bounds;

pub use aggregator::{BoundsContributor, MapViewport, ViewportAggregator, ViewportRegistry};
pub use bounds::{LatLng, LatLngBounds};
