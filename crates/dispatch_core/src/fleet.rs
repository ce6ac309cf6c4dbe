//! Vehicle fleet: storage, availability queries, and status transitions.
//!
//! Vehicles are stored as ECS components attached to entities in a
//! `bevy_ecs::World`, with a `HashMap<String, Entity>` index kept alongside
//! for O(1) lookup by `vehicle_id`. Only `VehicleSimulator` is expected to
//! call `update_status`; everything else is read-only.

use std::collections::HashMap;

use bevy_ecs::prelude::{Component, Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::geo::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Idle,
    EnRouteToPickup,
    OnTrip,
    Offline,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Idle => "idle",
            VehicleStatus::EnRouteToPickup => "en_route_to_pickup",
            VehicleStatus::OnTrip => "on_trip",
            VehicleStatus::Offline => "offline",
        }
    }
}

/// Cumulative statistics tracked per vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleStats {
    pub trips_completed: u32,
    pub revenue_earned: f64,
    pub miles_driven: f64,
    pub deadhead_miles: f64,
}

/// Vehicle identity, never mutated after spawn.
#[derive(Debug, Clone, Component)]
pub struct VehicleId(pub String);

/// Vehicle live state, mutated only via `FleetState::update_status`.
#[derive(Debug, Clone, Component)]
pub struct VehicleState {
    pub location: Location,
    pub status: VehicleStatus,
    pub wheelchair_accessible: bool,
    pub capacity: u32,
    pub current_trip_id: Option<String>,
    pub stats: VehicleStats,
}

/// A read-only snapshot of a vehicle, returned from fleet queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub current_location: Location,
    pub status: VehicleStatus,
    pub wheelchair_accessible: bool,
    pub capacity: u32,
    pub current_trip_id: Option<String>,
    pub stats: VehicleStats,
}

/// Aggregate statistics across the whole fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_vehicles: u32,
    pub idle: u32,
    pub en_route_to_pickup: u32,
    pub on_trip: u32,
    pub offline: u32,
    pub total_revenue: f64,
    pub total_miles_driven: f64,
    pub total_deadhead_miles: f64,
}

/// How initial vehicle positions are sampled when explicit locations aren't supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for ZoneBounds {
    fn default() -> Self {
        // A rough NYC bounding box; callers running other geographies should
        // supply their own bounds.
        Self {
            min_lat: 40.50,
            max_lat: 40.92,
            min_lon: -74.25,
            max_lon: -73.70,
        }
    }
}

/// In-memory catalog of vehicles.
pub struct FleetState {
    world: World,
    index: HashMap<String, Entity>,
    /// Insertion order, preserved for the "stable order when no center given" rule.
    order: Vec<String>,
}

impl FleetState {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Populate the fleet with `count` vehicles.
    ///
    /// If `initial_locations` is non-empty it is cycled to place vehicles;
    /// otherwise locations are sampled uniformly at random from `bounds`
    /// using `seed` for reproducibility. Exactly `round(count * wheelchair_ratio)`
    /// vehicles are marked wheelchair accessible.
    pub fn initialize(
        &mut self,
        count: u32,
        wheelchair_ratio: f64,
        bounds: &ZoneBounds,
        initial_locations: &[Location],
        seed: u64,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let wheelchair_count = (count as f64 * wheelchair_ratio).round() as u32;
        for i in 0..count {
            let vehicle_id = format!("veh-{i}");
            let location = if !initial_locations.is_empty() {
                initial_locations[i as usize % initial_locations.len()].clone()
            } else {
                Location::new(
                    rng.gen_range(bounds.min_lat..=bounds.max_lat),
                    rng.gen_range(bounds.min_lon..=bounds.max_lon),
                )
            };
            let entity = self
                .world
                .spawn((
                    VehicleId(vehicle_id.clone()),
                    VehicleState {
                        location,
                        status: VehicleStatus::Idle,
                        wheelchair_accessible: i < wheelchair_count,
                        capacity: 4,
                        current_trip_id: None,
                        stats: VehicleStats::default(),
                    },
                ))
                .id();
            self.index.insert(vehicle_id.clone(), entity);
            self.order.push(vehicle_id);
        }
    }

    fn snapshot(&self, entity: Entity) -> Vehicle {
        let id = self.world.get::<VehicleId>(entity).expect("vehicle id");
        let state = self.world.get::<VehicleState>(entity).expect("vehicle state");
        Vehicle {
            vehicle_id: id.0.clone(),
            current_location: state.location.clone(),
            status: state.status,
            wheelchair_accessible: state.wheelchair_accessible,
            capacity: state.capacity,
            current_trip_id: state.current_trip_id.clone(),
            stats: state.stats,
        }
    }

    pub fn get(&self, vehicle_id: &str) -> Option<Vehicle> {
        let entity = *self.index.get(vehicle_id)?;
        Some(self.snapshot(entity))
    }

    pub fn all(&self) -> Vec<Vehicle> {
        self.order
            .iter()
            .map(|id| self.snapshot(self.index[id]))
            .collect()
    }

    /// Vehicles whose status is `idle` or `en_route_to_pickup`, optionally
    /// filtered by proximity and wheelchair accessibility.
    ///
    /// Ordered by ascending distance from `center` when provided, otherwise
    /// by stable insertion order.
    pub fn available(
        &self,
        center: Option<&Location>,
        radius_miles: Option<f64>,
        max_count: Option<usize>,
        wheelchair_required: bool,
    ) -> Vec<Vehicle> {
        let mut candidates: Vec<Vehicle> = self
            .all()
            .into_iter()
            .filter(|v| matches!(v.status, VehicleStatus::Idle | VehicleStatus::EnRouteToPickup))
            .filter(|v| !wheelchair_required || v.wheelchair_accessible)
            .collect();

        if let Some(center) = center {
            candidates.sort_by(|a, b| {
                euclidean_distance(center, &a.current_location)
                    .partial_cmp(&euclidean_distance(center, &b.current_location))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if let Some(radius) = radius_miles {
                candidates.retain(|v| {
                    euclidean_distance(center, &v.current_location) * crate::geo::MILES_PER_DEGREE
                        <= radius
                });
            }
        }

        if let Some(max_count) = max_count {
            candidates.truncate(max_count);
        }
        candidates
    }

    /// The only mutator. Atomically updates status, location, and trip id.
    pub fn update_status(
        &mut self,
        vehicle_id: &str,
        status: VehicleStatus,
        location: Option<Location>,
        trip_id: Option<String>,
    ) {
        let entity = match self.index.get(vehicle_id) {
            Some(e) => *e,
            None => return,
        };
        let mut state = self
            .world
            .get_mut::<VehicleState>(entity)
            .expect("vehicle state");
        state.status = status;
        if let Some(location) = location {
            state.location = location;
        }
        state.current_trip_id = trip_id;
    }

    /// Accumulate trip-completion bookkeeping onto a vehicle's running stats.
    pub fn record_trip_completion(
        &mut self,
        vehicle_id: &str,
        fare: f64,
        trip_distance_miles: f64,
    ) {
        let entity = match self.index.get(vehicle_id) {
            Some(e) => *e,
            None => return,
        };
        let mut state = self
            .world
            .get_mut::<VehicleState>(entity)
            .expect("vehicle state");
        state.stats.trips_completed += 1;
        state.stats.revenue_earned += fare;
        state.stats.miles_driven += trip_distance_miles;
    }

    /// Accumulate deadhead (pickup-leg) mileage onto a vehicle's running stats.
    pub fn record_deadhead(&mut self, vehicle_id: &str, deadhead_miles: f64) {
        let entity = match self.index.get(vehicle_id) {
            Some(e) => *e,
            None => return,
        };
        let mut state = self
            .world
            .get_mut::<VehicleState>(entity)
            .expect("vehicle state");
        state.stats.deadhead_miles += deadhead_miles;
    }

    pub fn statistics(&self) -> FleetStats {
        let mut stats = FleetStats::default();
        for vehicle in self.all() {
            stats.total_vehicles += 1;
            match vehicle.status {
                VehicleStatus::Idle => stats.idle += 1,
                VehicleStatus::EnRouteToPickup => stats.en_route_to_pickup += 1,
                VehicleStatus::OnTrip => stats.on_trip += 1,
                VehicleStatus::Offline => stats.offline += 1,
            }
            stats.total_revenue += vehicle.stats.revenue_earned;
            stats.total_miles_driven += vehicle.stats.miles_driven;
            stats.total_deadhead_miles += vehicle.stats.deadhead_miles;
        }
        stats
    }
}

impl Default for FleetState {
    fn default() -> Self {
        Self::new()
    }
}

fn euclidean_distance(a: &Location, b: &Location) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    (dlat * dlat + dlon * dlon).sqrt()
}
