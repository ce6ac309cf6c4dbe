//! Vehicle simulator: owns active trips, executes routing decisions, and
//! advances simulation time, producing trip completions as it goes.

use std::collections::HashMap;

use bevy_ecs::prelude::{Component, Entity, World};
use chrono::{DateTime, Utc};

use crate::clock::{EventKind, SimulationClock};
use crate::errors::DispatchError;
use crate::fleet::{FleetState, VehicleStatus};
use crate::geo::{DistanceOracle, Location};
use crate::request::{RoutingDecision, TripResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTripStatus {
    EnRouteToPickup,
    OnTrip,
}

/// A trip in progress, tracked from assignment through completion.
#[derive(Debug, Clone, Component)]
pub struct ActiveTrip {
    pub request_id: String,
    pub vehicle_id: String,
    pub pickup_location: Location,
    pub dropoff_location: Location,
    pub assignment_time_ms: u64,
    pub pickup_distance_miles: f64,
    pub trip_distance_miles: f64,
    pub estimated_pickup_time_ms: u64,
    pub estimated_dropoff_time_ms: u64,
    pub status: ActiveTripStatus,
}

/// Result of a successful `execute_routing_decision` call.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionResult {
    pub estimated_pickup_time_ms: u64,
    pub estimated_dropoff_time_ms: u64,
    pub pickup_distance_miles: f64,
    pub trip_distance_miles: f64,
}

/// Owns all active trips and the event queue that drives pickup/dropoff
/// transitions. Mutates `FleetState` as trips progress.
pub struct VehicleSimulator {
    world: World,
    index: HashMap<String, Entity>,
    events: SimulationClock,
    epoch_ms: i64,
}

impl VehicleSimulator {
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            events: SimulationClock::with_epoch(epoch_ms),
            epoch_ms,
        }
    }

    fn to_datetime(&self, sim_ms: u64) -> DateTime<Utc> {
        let real_ms = self.epoch_ms.saturating_add(sim_ms as i64);
        DateTime::from_timestamp_millis(real_ms).unwrap_or_else(Utc::now)
    }

    /// Assign `decision`'s vehicle to the request, scheduling its pickup and
    /// dropoff events. Fails if the vehicle is not `idle` or `en_route_to_pickup`.
    pub fn execute_routing_decision(
        &mut self,
        decision: &RoutingDecision,
        pickup: Location,
        dropoff: Location,
        now_ms: u64,
        fleet: &mut FleetState,
        oracle: &dyn DistanceOracle,
    ) -> Result<ExecutionResult, DispatchError> {
        let vehicle = fleet
            .get(&decision.vehicle_id)
            .ok_or_else(|| DispatchError::VehicleUnavailable {
                request_id: decision.request_id.clone(),
                vehicle_id: decision.vehicle_id.clone(),
                status: "unknown".to_string(),
            })?;

        if !matches!(
            vehicle.status,
            VehicleStatus::Idle | VehicleStatus::EnRouteToPickup
        ) {
            return Err(DispatchError::VehicleUnavailable {
                request_id: decision.request_id.clone(),
                vehicle_id: decision.vehicle_id.clone(),
                status: vehicle.status.as_str().to_string(),
            });
        }

        let pickup_leg = oracle.query(&vehicle.current_location, &pickup);
        let trip_leg = oracle.query(&pickup, &dropoff);

        let estimated_pickup_time_ms = now_ms + pickup_leg.minutes.round() as u64;
        let estimated_dropoff_time_ms = estimated_pickup_time_ms + trip_leg.minutes.round() as u64;

        let active_trip = ActiveTrip {
            request_id: decision.request_id.clone(),
            vehicle_id: decision.vehicle_id.clone(),
            pickup_location: pickup,
            dropoff_location: dropoff,
            assignment_time_ms: now_ms,
            pickup_distance_miles: pickup_leg.miles,
            trip_distance_miles: trip_leg.miles,
            estimated_pickup_time_ms,
            estimated_dropoff_time_ms,
            status: ActiveTripStatus::EnRouteToPickup,
        };

        self.events.set_now(now_ms);
        self.events.schedule_at(
            estimated_pickup_time_ms,
            EventKind::Pickup,
            decision.request_id.clone(),
        );
        self.events.schedule_at(
            estimated_dropoff_time_ms,
            EventKind::Dropoff,
            decision.request_id.clone(),
        );

        let entity = self.world.spawn(active_trip).id();
        self.index.insert(decision.request_id.clone(), entity);

        fleet.update_status(
            &decision.vehicle_id,
            VehicleStatus::EnRouteToPickup,
            None,
            Some(decision.request_id.clone()),
        );

        Ok(ExecutionResult {
            estimated_pickup_time_ms,
            estimated_dropoff_time_ms,
            pickup_distance_miles: pickup_leg.miles,
            trip_distance_miles: trip_leg.miles,
        })
    }

    /// Timestamp of the earliest pending pickup/dropoff event, if any.
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.next_event_time()
    }

    /// Timestamp and request id of the earliest pending event, without
    /// consuming it.
    pub fn peek_next_event(&self) -> Option<(u64, String)> {
        self.events
            .peek_next()
            .map(|event| (event.timestamp, event.request_id.clone()))
    }

    fn trip_mut(&mut self, request_id: &str) -> Option<&mut ActiveTrip> {
        let entity = *self.index.get(request_id)?;
        self.world.get_mut::<ActiveTrip>(entity)
    }

    /// Process every pickup/dropoff event scheduled in `(current_time, current_time + delta]`,
    /// in ascending timestamp order (ties broken by request_id). Returns completed trips.
    pub fn advance_time(
        &mut self,
        current_time_ms: u64,
        delta_ms: u64,
        fleet: &mut FleetState,
        config: &crate::pricing::PricingConfig,
    ) -> Vec<TripResult> {
        let target = current_time_ms + delta_ms;
        let mut results = Vec::new();

        // The heap already orders by (timestamp, request_id), so popping one
        // event at a time yields the correct processing order directly.
        while matches!(self.events.next_event_time(), Some(t) if t <= target) {
            let event = self.events.pop_next().expect("checked non-empty above");
            if let Some(result) = self.apply_event(&event.request_id, event.kind, fleet, config) {
                results.push(result);
            }
        }
        self.events.set_now(target.max(self.events.now()));
        results
    }

    fn apply_event(
        &mut self,
        request_id: &str,
        kind: EventKind,
        fleet: &mut FleetState,
        config: &crate::pricing::PricingConfig,
    ) -> Option<TripResult> {
        match kind {
            EventKind::Pickup => {
                let (vehicle_id, pickup_location, pickup_distance, event_time) = {
                    let trip = self.trip_mut(request_id)?;
                    if trip.status != ActiveTripStatus::EnRouteToPickup {
                        return None;
                    }
                    trip.status = ActiveTripStatus::OnTrip;
                    (
                        trip.vehicle_id.clone(),
                        trip.pickup_location.clone(),
                        trip.pickup_distance_miles,
                        trip.estimated_pickup_time_ms,
                    )
                };
                let _ = event_time;
                fleet.record_deadhead(&vehicle_id, pickup_distance);
                fleet.update_status(
                    &vehicle_id,
                    VehicleStatus::OnTrip,
                    Some(pickup_location),
                    Some(request_id.to_string()),
                );
                None
            }
            EventKind::Dropoff => {
                let entity = *self.index.get(request_id)?;
                let trip = self.world.get::<ActiveTrip>(entity)?.clone();
                if trip.status != ActiveTripStatus::OnTrip {
                    return None;
                }
                self.world.despawn(entity);
                self.index.remove(request_id);

                let fare = crate::pricing::calculate_trip_fare_with_config(
                    trip.trip_distance_miles,
                    (trip.estimated_dropoff_time_ms - trip.estimated_pickup_time_ms) as f64,
                    config,
                );

                fleet.record_trip_completion(&trip.vehicle_id, fare, trip.trip_distance_miles);
                fleet.update_status(
                    &trip.vehicle_id,
                    VehicleStatus::Idle,
                    Some(trip.dropoff_location.clone()),
                    None,
                );

                Some(TripResult {
                    request_id: trip.request_id.clone(),
                    vehicle_id: trip.vehicle_id.clone(),
                    actual_pickup_time: self.to_datetime(trip.estimated_pickup_time_ms),
                    completion_time: self.to_datetime(trip.estimated_dropoff_time_ms),
                    trip_distance_miles: trip.trip_distance_miles,
                    deadhead_miles: trip.pickup_distance_miles,
                    trip_time_minutes: (trip.estimated_dropoff_time_ms
                        - trip.estimated_pickup_time_ms) as f64,
                    fare,
                })
            }
        }
    }

    /// Finalize every remaining active trip as if it completed at `horizon_ms`,
    /// billing full fare regardless of how far the real estimate exceeded the horizon.
    pub fn force_complete_all(
        &mut self,
        horizon_ms: u64,
        fleet: &mut FleetState,
        config: &crate::pricing::PricingConfig,
    ) -> Vec<TripResult> {
        let request_ids: Vec<String> = self.index.keys().cloned().collect();
        let mut results = Vec::new();
        for request_id in request_ids {
            let entity = match self.index.get(&request_id) {
                Some(e) => *e,
                None => continue,
            };
            let trip = match self.world.get::<ActiveTrip>(entity) {
                Some(t) => t.clone(),
                None => continue,
            };

            if trip.status == ActiveTripStatus::EnRouteToPickup {
                fleet.record_deadhead(&trip.vehicle_id, trip.pickup_distance_miles);
            }

            self.world.despawn(entity);
            self.index.remove(&request_id);

            // Bill full fare from the trip's original, uncapped timing, as if
            // it had actually completed; only the *reported* completion time
            // is clamped to the horizon.
            let trip_time_minutes = (trip.estimated_dropoff_time_ms
                - trip.estimated_pickup_time_ms) as f64;
            let fare = crate::pricing::calculate_trip_fare_with_config(
                trip.trip_distance_miles,
                trip_time_minutes,
                config,
            );

            fleet.record_trip_completion(&trip.vehicle_id, fare, trip.trip_distance_miles);
            fleet.update_status(
                &trip.vehicle_id,
                VehicleStatus::Idle,
                Some(trip.dropoff_location.clone()),
                None,
            );

            results.push(TripResult {
                request_id: trip.request_id.clone(),
                vehicle_id: trip.vehicle_id.clone(),
                actual_pickup_time: self.to_datetime(trip.estimated_pickup_time_ms),
                completion_time: self.to_datetime(horizon_ms),
                trip_distance_miles: trip.trip_distance_miles,
                deadhead_miles: trip.pickup_distance_miles,
                trip_time_minutes,
                fare,
            });
        }
        results
    }

    pub fn active_trip_count(&self) -> usize {
        self.index.len()
    }
}
