//! Configuration surface: fleet/scenario parameters and dispatch constants.
//!
//! These are plain data, constructed directly by callers (or deserialized by
//! a host application) rather than loaded from a file by this crate — file
//! and CLI loading are out of scope here.

use serde::{Deserialize, Serialize};

use crate::fleet::ZoneBounds;
use crate::geo::Location;
use crate::pricing::PricingConfig;

/// Parameters controlling initial fleet composition for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub num_vehicles: u32,
    pub wheelchair_accessible_ratio: f64,
    pub initial_locations: Vec<Location>,
    /// Bounding box random initial placement is sampled from, when
    /// `initial_locations` is empty. Defaults to a rough NYC bounding box.
    pub zone_bounds: ZoneBounds,
    pub seed: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            num_vehicles: 10,
            wheelchair_accessible_ratio: 0.10,
            initial_locations: Vec::new(),
            zone_bounds: ZoneBounds::default(),
            seed: 0,
        }
    }
}

impl ScenarioParams {
    pub fn zone_bounds(&self) -> ZoneBounds {
        self.zone_bounds
    }
}

/// Constants governing distance estimation, fares, and horizon defaults,
/// independent of fleet composition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub avg_speed_mph: f64,
    pub pricing: PricingConfig,
    pub inter_request_delay_ms: u64,
    pub default_sim_end_padding_minutes: u64,
    pub distance_cache_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            avg_speed_mph: 30.0,
            pricing: PricingConfig::default(),
            inter_request_delay_ms: 0,
            default_sim_end_padding_minutes: 120,
            distance_cache_capacity: 4096,
        }
    }
}
