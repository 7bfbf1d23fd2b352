//! Typed requests and results for the remote routing backend.
//!
//! These are the request shapes UI embedders build up and hand to the
//! [`RouteResolver`], which canonicalizes them and deduplicates the
//! backend calls through the request caches. The wire casing follows the
//! upstream mapping API (`SCREAMING_SNAKE_CASE` enums).

mod resolver;

use std::sync::Mutex;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::viewport::{BoundsContributor, LatLng, LatLngBounds};

pub use resolver::{RouteResolver, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// A route endpoint: either an opaque place identifier issued by the
/// backend, or a raw coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Waypoint {
    PlaceId { place_id: String },
    Location(LatLng),
}

impl Waypoint {
    pub fn place_id(id: impl Into<String>) -> Self {
        Self::PlaceId {
            place_id: id.into(),
        }
    }
}

impl From<LatLng> for Waypoint {
    fn from(location: LatLng) -> Self {
        Self::Location(location)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: Waypoint,
    pub destination: Waypoint,
    /// Intermediate stops, in visiting order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub travel_mode: TravelMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrixRequest {
    pub origins: Vec<Waypoint>,
    pub destinations: Vec<Waypoint>,
    #[serde(default)]
    pub travel_mode: TravelMode,
    #[serde(default)]
    pub unit_system: UnitSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration: Duration,
    pub start: LatLng,
    pub end: LatLng,
}

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Human-readable route description, e.g. the main road used.
    pub summary: String,
    /// The box containing the whole route geometry, if the backend
    /// reported one.
    pub bounds: Option<LatLngBounds>,
    #[serde(default)]
    pub path: Vec<LatLng>,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceElement {
    pub distance_meters: f64,
    pub duration: Duration,
}

/// One row per origin, one element per destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    pub rows: Vec<Vec<DistanceElement>>,
}

/// Adapts a resolved route into a viewport bounds contributor.
///
/// The held route can be swapped as the embedder re-plans; the aggregator
/// picks up the new bounds on its next update.
#[derive(Default)]
pub struct RouteOverlay {
    route: Mutex<Option<Route>>,
}

impl RouteOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_route(&self, route: Option<Route>) {
        *self.route.lock().unwrap() = route;
    }
}

impl BoundsContributor for RouteOverlay {
    fn bounds(&self) -> BoxFuture<'_, Option<LatLngBounds>> {
        let bounds = self.route.lock().unwrap().as_ref().and_then(|r| r.bounds);
        async move { bounds }.boxed()
    }
}
