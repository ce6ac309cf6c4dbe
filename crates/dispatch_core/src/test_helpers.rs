//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures to reduce duplication across test
//! files and benchmarks. Gated behind the `test-helpers` feature so that
//! production builds never pull it in.

use crate::fleet::{FleetState, ZoneBounds};
use crate::geo::{FlatEarthDistanceOracle, Location};
use crate::scenario::ScenarioParams;

/// A fixed Manhattan point used as the seeded origin across tests.
pub fn test_origin() -> Location {
    Location::new(40.75, -73.98)
}

/// A point a few blocks north of `test_origin`, for short trips.
pub fn test_nearby() -> Location {
    Location::new(40.76, -73.98)
}

/// A point far enough from `test_origin` that a trip between them will not
/// complete within a short simulation horizon.
pub fn test_distant() -> Location {
    Location::new(40.90, -73.98)
}

/// A default oracle matching the crate's default average speed.
pub fn test_oracle() -> FlatEarthDistanceOracle {
    FlatEarthDistanceOracle::default()
}

/// A scenario with `count` vehicles all parked at `test_origin`, none
/// wheelchair accessible.
pub fn test_scenario(count: u32) -> ScenarioParams {
    ScenarioParams {
        num_vehicles: count,
        wheelchair_accessible_ratio: 0.0,
        initial_locations: vec![test_origin()],
        zone_bounds: ZoneBounds::default(),
        seed: 1,
    }
}

/// A fleet built directly from `test_scenario`, for tests that only need
/// fleet-level state without a full orchestrator run.
pub fn test_fleet(count: u32) -> FleetState {
    let scenario = test_scenario(count);
    let mut fleet = FleetState::new();
    fleet.initialize(
        scenario.num_vehicles,
        scenario.wheelchair_accessible_ratio,
        &scenario.zone_bounds(),
        &scenario.initial_locations,
        scenario.seed,
    );
    fleet
}
