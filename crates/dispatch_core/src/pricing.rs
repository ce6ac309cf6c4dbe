//! Fare computation and deadhead-cost accounting.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

pub const BASE_FARE: f64 = 2.50;
pub const PER_MILE_RATE: f64 = 2.50;
pub const PER_MINUTE_RATE: f64 = 0.50;
pub const DEADHEAD_COST_PER_MILE: f64 = 0.50;

/// Fare formula constants, configurable per evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Resource, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub per_mile_rate: f64,
    pub per_minute_rate: f64,
    pub deadhead_cost_per_mile: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fare: BASE_FARE,
            per_mile_rate: PER_MILE_RATE,
            per_minute_rate: PER_MINUTE_RATE,
            deadhead_cost_per_mile: DEADHEAD_COST_PER_MILE,
        }
    }
}

/// Computes the fare for a completed trip, rounded to two decimal places.
pub fn calculate_trip_fare(trip_distance_miles: f64, trip_minutes: f64) -> f64 {
    calculate_trip_fare_with_config(trip_distance_miles, trip_minutes, &PricingConfig::default())
}

pub fn calculate_trip_fare_with_config(
    trip_distance_miles: f64,
    trip_minutes: f64,
    config: &PricingConfig,
) -> f64 {
    let raw = config.base_fare
        + config.per_mile_rate * trip_distance_miles
        + config.per_minute_rate * trip_minutes;
    (raw * 100.0).round() / 100.0
}

/// Dollar cost attributed to empty (deadhead) driving.
pub fn calculate_idle_cost(deadhead_miles: f64, config: &PricingConfig) -> f64 {
    deadhead_miles * config.deadhead_cost_per_mile
}
