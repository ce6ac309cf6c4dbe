//! Geographic locations and the `DistanceOracle` abstraction.
//!
//! Distance/time estimation is pulled out behind a trait so that alternative
//! implementations (precomputed tables, a remote routing service) can be
//! swapped in without touching the simulator. The default implementation uses
//! a flat-earth approximation, which is adequate at city scale and keeps the
//! simulator free of any mapping-service dependency.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// Miles per degree of latitude/longitude, used by the default distance formula.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// A geographic point, optionally annotated with zone metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub zone_id: Option<u32>,
    pub zone_name: Option<String>,
    pub address: Option<String>,
    pub poi_name: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            zone_id: None,
            zone_name: None,
            address: None,
            poi_name: None,
        }
    }

    pub fn with_zone(mut self, zone_id: u32, zone_name: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id);
        self.zone_name = Some(zone_name.into());
        self
    }

    /// Cache key for distance lookups: raw bit patterns of lat/lon, order-stable.
    fn cache_key(&self, other: &Location) -> (u64, u64, u64, u64) {
        let a = (self.latitude.to_bits(), self.longitude.to_bits());
        let b = (other.latitude.to_bits(), other.longitude.to_bits());
        if a <= b {
            (a.0, a.1, b.0, b.1)
        } else {
            (b.0, b.1, a.0, a.1)
        }
    }
}

/// Distance and travel time between two locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub miles: f64,
    pub minutes: f64,
}

/// A source of travel distance/time estimates between two locations.
///
/// Implementations must be deterministic and symmetric: the same pair of
/// locations always yields the same `Leg`, regardless of argument order.
pub trait DistanceOracle: Send + Sync {
    fn query(&self, from: &Location, to: &Location) -> Leg;
}

/// Default oracle: flat-earth approximation scaled by `MILES_PER_DEGREE`,
/// with travel time derived from a configurable average speed.
#[derive(Debug, Clone, Copy)]
pub struct FlatEarthDistanceOracle {
    avg_speed_mph: f64,
}

impl FlatEarthDistanceOracle {
    pub fn new(avg_speed_mph: f64) -> Self {
        Self { avg_speed_mph }
    }
}

impl Default for FlatEarthDistanceOracle {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl DistanceOracle for FlatEarthDistanceOracle {
    fn query(&self, from: &Location, to: &Location) -> Leg {
        let dlat = from.latitude - to.latitude;
        let dlon = from.longitude - to.longitude;
        let miles = (dlat * dlat + dlon * dlon).sqrt() * MILES_PER_DEGREE;
        let minutes = if self.avg_speed_mph > 0.0 {
            (miles / self.avg_speed_mph) * 60.0
        } else {
            0.0
        };
        Leg { miles, minutes }
    }
}

/// LRU-caching decorator around any `DistanceOracle`.
///
/// Mirrors the wrap-and-cache idiom used for route lookups elsewhere in this
/// codebase: the inner oracle is only consulted on a cache miss.
pub struct CachedDistanceOracle<O: DistanceOracle> {
    inner: O,
    cache: Mutex<LruCache<(u64, u64, u64, u64), Leg>>,
}

impl<O: DistanceOracle> CachedDistanceOracle<O> {
    pub fn new(inner: O, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero");
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<O: DistanceOracle> DistanceOracle for CachedDistanceOracle<O> {
    fn query(&self, from: &Location, to: &Location) -> Leg {
        let key = from.cache_key(to);
        if let Some(leg) = self.cache.lock().expect("distance cache poisoned").get(&key) {
            return *leg;
        }
        let leg = self.inner.query(from, to);
        self.cache
            .lock()
            .expect("distance cache poisoned")
            .put(key, leg);
        leg
    }
}
