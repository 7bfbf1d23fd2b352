use serde::{Deserialize, Serialize};

/// A geographic point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a point, clamping the latitude to `[-90, 90]` and wrapping
    /// the longitude into `[-180, 180]`.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lng: normalize_lng(lng),
        }
    }
}

fn normalize_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Eastward angular distance from `from` to `to`, in `[0, 360)`.
fn lng_offset(from: f64, to: f64) -> f64 {
    (to - from).rem_euclid(360.0)
}

/// An axis-aligned lat/lng box.
///
/// Longitudes are circular: `west > east` encodes a box crossing the
/// antimeridian, whose interior runs eastward from `west` through ±180° to
/// `east`. The full longitude range is represented as `west == -180`,
/// `east == 180`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south: south_west.lat,
            west: south_west.lng,
            north: north_east.lat,
            east: north_east.lng,
        }
    }

    /// A degenerate box containing exactly `point`.
    pub fn from_point(point: LatLng) -> Self {
        Self::new(point, point)
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// The eastward extent of the box, in degrees of longitude.
    pub fn lng_span(&self) -> f64 {
        if self.west == -180.0 && self.east == 180.0 {
            360.0
        } else {
            lng_offset(self.west, self.east)
        }
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat) && self.contains_lng(point.lng)
    }

    fn contains_lng(&self, lng: f64) -> bool {
        lng_offset(self.west, lng) <= self.lng_span()
    }

    /// Whether `other`'s longitude interval lies entirely within ours.
    fn contains_lng_interval(&self, other: &Self) -> bool {
        lng_offset(self.west, other.west) + other.lng_span() <= self.lng_span()
    }

    /// Grows the box by the minimum amount needed to contain `point`.
    ///
    /// A point outside the longitude interval is absorbed by extending
    /// whichever edge yields the smaller resulting span.
    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);

        if self.contains_lng(point.lng) {
            return;
        }
        let toward_east = lng_offset(self.west, point.lng);
        let toward_west = lng_offset(point.lng, self.east);
        if toward_east <= toward_west {
            self.east = point.lng;
        } else {
            self.west = point.lng;
        }
    }

    /// The smallest axis-aligned box containing both operands.
    ///
    /// Latitudes union trivially. Longitude intervals are merged as arcs
    /// on a circle: if neither interval contains the other, the merge
    /// direction with the smaller resulting span wins (ties keep `self`'s
    /// west edge), and a union that would have to cover the whole circle
    /// collapses to the full `[-180, 180]` range.
    pub fn union(&self, other: &Self) -> Self {
        let (west, east) = self.union_lng(other);
        Self {
            south: self.south.min(other.south),
            west,
            north: self.north.max(other.north),
            east,
        }
    }

    fn union_lng(&self, other: &Self) -> (f64, f64) {
        if self.contains_lng_interval(other) {
            return (self.west, self.east);
        }
        if other.contains_lng_interval(self) {
            return (other.west, other.east);
        }

        // The smallest containing interval starts at one of the operands'
        // west edges; try both directions and keep the tighter one.
        let forward = merge_candidate(self, other);
        let backward = merge_candidate(other, self);
        match (forward, backward) {
            (Some(f), Some(b)) => {
                if lng_offset(f.0, f.1) <= lng_offset(b.0, b.1) {
                    f
                } else {
                    b
                }
            }
            (Some(f), None) => f,
            (None, Some(b)) => b,
            // The operands jointly wrap the circle.
            (None, None) => (-180.0, 180.0),
        }
    }
}

/// The interval `[first.west, second.east]`, if it covers both operands.
fn merge_candidate(first: &LatLngBounds, second: &LatLngBounds) -> Option<(f64, f64)> {
    let (west, east) = (first.west, second.east);
    let span = lng_offset(west, east);
    let covers = |b: &LatLngBounds| lng_offset(west, b.west) + b.lng_span() <= span;
    (covers(first) && covers(second)).then_some((west, east))
}
