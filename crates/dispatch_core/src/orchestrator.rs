//! Drives one evaluation run: advances the clock, invokes the agent, and
//! weaves the fleet, simulator, evaluator, and event log together.
//!
//! `advance_to_with_events` is the hardest piece of this crate: it must
//! process every intermediate pickup/dropoff event at its exact scheduled
//! timestamp rather than collapsing them onto the target time, or trajectory
//! analytics downstream would be corrupted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::agent::RoutingAgent;
use crate::errors::DispatchError;
use crate::evaluator::{EvaluationSummary, Evaluator};
use crate::event_log::{EventPayload, EventRecorder};
use crate::fleet::{FleetState, ZoneBounds};
use crate::geo::DistanceOracle;
use crate::request::{
    validate_natural_language_request, validate_structured_request, NaturalLanguageRequest,
    RoutingDecision, StructuredRequest, TripResult,
};
use crate::scenario::{DispatchConfig, ScenarioParams};
use crate::trip::VehicleSimulator;

fn to_ms(timestamp: DateTime<Utc>) -> u64 {
    timestamp.timestamp_millis().max(0) as u64
}

fn from_ms(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}

struct PendingAssignment {
    nl_request: NaturalLanguageRequest,
    parsed: StructuredRequest,
    decision: RoutingDecision,
}

/// Orchestrates a full evaluation run over a pluggable `RoutingAgent`.
pub struct Orchestrator {
    fleet: FleetState,
    simulator: VehicleSimulator,
    evaluator: Evaluator,
    log: EventRecorder,
    oracle: Box<dyn DistanceOracle>,
    config: DispatchConfig,
    now_ms: Option<u64>,
    pending: HashMap<String, PendingAssignment>,
}

impl Orchestrator {
    pub fn new(
        scenario: &ScenarioParams,
        config: DispatchConfig,
        oracle: Box<dyn DistanceOracle>,
    ) -> Self {
        let mut fleet = FleetState::new();
        fleet.initialize(
            scenario.num_vehicles,
            scenario.wheelchair_accessible_ratio,
            &scenario.zone_bounds(),
            &scenario.initial_locations,
            scenario.seed,
        );
        Self {
            fleet,
            simulator: VehicleSimulator::new(0),
            evaluator: Evaluator::new(),
            log: EventRecorder::new(),
            oracle,
            config,
            now_ms: None,
            pending: HashMap::new(),
        }
    }

    pub fn fleet(&self) -> &FleetState {
        &self.fleet
    }

    pub fn event_log(&self) -> &EventRecorder {
        &self.log
    }

    pub fn evaluation_summary(&self) -> EvaluationSummary {
        self.evaluator.summary()
    }

    /// Run a full evaluation over a sorted-by-arrival set of requests.
    pub fn run_evaluation(
        &mut self,
        agent: &dyn RoutingAgent,
        mut requests: Vec<NaturalLanguageRequest>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> EvaluationSummary {
        requests.sort_by_key(|r| r.request_time);

        let start = start_time
            .or_else(|| requests.first().map(|r| r.request_time))
            .unwrap_or_else(Utc::now);
        let end = end_time.unwrap_or_else(|| {
            requests
                .last()
                .map(|r| {
                    r.request_time
                        + chrono::Duration::minutes(
                            self.config.default_sim_end_padding_minutes as i64,
                        )
                })
                .unwrap_or(start)
        });

        self.evaluator.reset();
        self.pending.clear();
        self.now_ms = Some(to_ms(start));

        self.log.record(
            start,
            EventPayload::EvaluationStart {
                total_requests: requests.len() as u32,
                fleet_size: self.fleet.all().len() as u32,
            },
        );
        for vehicle in self.fleet.all() {
            self.log
                .record(start, EventPayload::VehicleInitialized { vehicle });
        }

        for request in requests {
            self.advance_to_with_events(request.request_time);
            self.process_request(agent, request);
        }

        self.advance_to_with_events(end);

        let remaining_ids: Vec<String> = self.pending.keys().cloned().collect();
        if !remaining_ids.is_empty() {
            let horizon_ms = to_ms(end);
            let results = self.simulator.force_complete_all(
                horizon_ms,
                &mut self.fleet,
                &self.config.pricing,
            );
            for result in results {
                self.finalize_trip(result);
            }
        }

        let summary = self.evaluator.summary();
        self.log
            .record(end, EventPayload::EvaluationEnd { summary: summary.clone() });
        summary
    }

    fn process_request(&mut self, agent: &dyn RoutingAgent, request: NaturalLanguageRequest) {
        self.log.record(
            request.request_time,
            EventPayload::RequestArrived {
                request_id: request.request_id.clone(),
                natural_language_text: request.natural_language_text.clone(),
                has_ground_truth: request.ground_truth.is_some(),
            },
        );

        if let Err(reason) = validate_natural_language_request(&request) {
            warn!(request_id = %request.request_id, %reason, "request failed validation");
            self.record_error(
                &DispatchError::RequestValidationError {
                    request_id: request.request_id.clone(),
                    reason,
                },
                request.request_time,
            );
            return;
        }

        let parse_start = std::time::Instant::now();
        let parsed = agent.parse(&request, &self.fleet);
        let parsing_time_ms = parse_start.elapsed().as_millis() as u64;

        if let Err(reason) = validate_structured_request(&parsed) {
            warn!(request_id = %request.request_id, %reason, "agent parse produced unusable output");
            self.record_error(
                &DispatchError::AgentParseError {
                    request_id: request.request_id.clone(),
                    reason,
                },
                request.request_time,
            );
            return;
        }

        self.log.record(
            request.request_time,
            EventPayload::ParsingResult {
                request_id: request.request_id.clone(),
                parsed: parsed.clone(),
                parsing_time_ms,
            },
        );

        let route_start = std::time::Instant::now();
        let decision = agent.route(&parsed, &self.fleet);
        let decision_time_ms = route_start.elapsed().as_millis() as u64;
        let available_count = self.fleet.available(None, None, None, false).len();

        let decision = match decision {
            Some(decision) => decision,
            None => {
                warn!(request_id = %request.request_id, "agent produced no routing decision");
                self.record_error(
                    &DispatchError::AgentRouteError {
                        request_id: request.request_id.clone(),
                        reason: "agent returned no decision".to_string(),
                    },
                    request.request_time,
                );
                return;
            }
        };
        self.log.record(
            request.request_time,
            EventPayload::RoutingDecisionMade {
                decision: decision.clone(),
                decision_time_ms,
                available_vehicles_count: available_count,
            },
        );

        let now_ms = to_ms(request.request_time);
        let result = self.simulator.execute_routing_decision(
            &decision,
            parsed.origin.clone(),
            parsed.destination.clone(),
            now_ms,
            &mut self.fleet,
            self.oracle.as_ref(),
        );

        match result {
            Ok(exec) => {
                let vehicle_location = self
                    .fleet
                    .get(&decision.vehicle_id)
                    .map(|v| v.current_location)
                    .unwrap_or_else(|| parsed.origin.clone());
                self.log.record(
                    request.request_time,
                    EventPayload::VehicleAssigned {
                        vehicle_id: decision.vehicle_id.clone(),
                        request_id: request.request_id.clone(),
                        vehicle_location,
                        pickup_location: parsed.origin.clone(),
                        estimated_pickup_distance_miles: exec.pickup_distance_miles,
                        estimated_pickup_minutes: (exec.estimated_pickup_time_ms - now_ms) as f64,
                    },
                );
                self.pending.insert(
                    decision.request_id.clone(),
                    PendingAssignment {
                        nl_request: request,
                        parsed,
                        decision,
                    },
                );
            }
            Err(err) => {
                debug!(error = %err, "routing decision execution failed");
                self.record_error(&err, request.request_time);
            }
        }
    }

    /// Record a request-level failure: counts against the evaluator's
    /// failed-request tally and writes an `ERROR` log entry.
    fn record_error(&mut self, error: &DispatchError, timestamp: DateTime<Utc>) {
        self.evaluator.record_failure();
        self.log_error_event(error, timestamp);
    }

    /// Write an `ERROR` log entry for an internal anomaly that does not by
    /// itself fail a request (e.g. a clock event scheduled in the past,
    /// which is still processed — just out of order).
    fn log_error_event(&mut self, error: &DispatchError, timestamp: DateTime<Utc>) {
        self.log.record(
            timestamp,
            EventPayload::Error {
                kind: error.kind().to_string(),
                message: error.to_string(),
                request_id: Some(error.request_id().to_string()),
            },
        );
    }

    fn finalize_trip(&mut self, trip: TripResult) {
        let assignment = match self.pending.remove(&trip.request_id) {
            Some(a) => a,
            None => return,
        };
        self.log.record(
            trip.completion_time,
            EventPayload::TripCompleted { trip: trip.clone() },
        );
        let score = self.evaluator.evaluate_request(
            assignment.nl_request.ground_truth.as_ref(),
            &assignment.parsed,
            &assignment.decision,
            &trip,
            &self.config.pricing,
        );
        self.log
            .record(trip.completion_time, EventPayload::RequestScored { score });
    }

    /// Advance the clock to `target`, processing every intermediate
    /// pickup/dropoff event at its exact scheduled timestamp.
    fn advance_to_with_events(&mut self, target: DateTime<Utc>) {
        let target_ms = to_ms(target);
        let current = match self.now_ms {
            Some(t) => t,
            None => {
                self.now_ms = Some(target_ms);
                return;
            }
        };
        if target_ms < current {
            // Causality violation: never move backward.
            return;
        }

        let mut t = current;
        while t < target_ms {
            match self.simulator.next_event_time() {
                None => {
                    let results = self.simulator.advance_time(
                        t,
                        target_ms - t,
                        &mut self.fleet,
                        &self.config.pricing,
                    );
                    t = target_ms;
                    for result in results {
                        self.finalize_trip(result);
                    }
                    break;
                }
                Some(next_evt) if next_evt >= target_ms => {
                    let results = self.simulator.advance_time(
                        t,
                        target_ms - t,
                        &mut self.fleet,
                        &self.config.pricing,
                    );
                    t = target_ms;
                    for result in results {
                        self.finalize_trip(result);
                    }
                    break;
                }
                Some(next_evt) if next_evt < t => {
                    warn!(scheduled_ms = next_evt, clock_ms = t, "event scheduled in the past");
                    let request_id = self
                        .simulator
                        .peek_next_event()
                        .map(|(_, id)| id)
                        .unwrap_or_default();
                    self.log_error_event(
                        &DispatchError::InvalidEventTime {
                            request_id,
                            scheduled_ms: next_evt,
                            clock_ms: t,
                        },
                        from_ms(t),
                    );
                    let results = self.simulator.advance_time(
                        t,
                        target_ms - t,
                        &mut self.fleet,
                        &self.config.pricing,
                    );
                    t = target_ms;
                    for result in results {
                        self.finalize_trip(result);
                    }
                    break;
                }
                Some(next_evt) if next_evt == t => {
                    let results =
                        self.simulator
                            .advance_time(t, 0, &mut self.fleet, &self.config.pricing);
                    for result in results {
                        self.finalize_trip(result);
                    }
                }
                Some(next_evt) => {
                    let results = self.simulator.advance_time(
                        t,
                        next_evt - t,
                        &mut self.fleet,
                        &self.config.pricing,
                    );
                    t = next_evt;
                    for result in results {
                        self.finalize_trip(result);
                    }
                }
            }
        }
        self.now_ms = Some(target_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NearestVehicleAgent;
    use crate::geo::{FlatEarthDistanceOracle, Location};
    use crate::request::StructuredRequest;
    use chrono::TimeZone;

    fn epoch(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    fn scenario_with_one_vehicle() -> ScenarioParams {
        ScenarioParams {
            num_vehicles: 1,
            wheelchair_accessible_ratio: 0.0,
            initial_locations: vec![Location::new(40.75, -73.98)],
            zone_bounds: crate::fleet::ZoneBounds::default(),
            seed: 1,
        }
    }

    #[test]
    fn s1_single_request_single_vehicle_happy_path() {
        let scenario = scenario_with_one_vehicle();
        let config = DispatchConfig::default();
        let oracle = Box::new(FlatEarthDistanceOracle::new(config.avg_speed_mph));
        let agent = NearestVehicleAgent::new(Box::new(FlatEarthDistanceOracle::new(
            config.avg_speed_mph,
        )));
        let mut orchestrator = Orchestrator::new(&scenario, config, oracle);

        let t0 = epoch(12 * 3_600_000);
        let ground_truth = StructuredRequest::minimal(
            "req-1",
            t0,
            Location::new(40.76, -73.98),
            Location::new(40.78, -73.98),
        );
        let request = NaturalLanguageRequest {
            request_id: "req-1".into(),
            request_time: t0,
            natural_language_text: "pick me up".into(),
            ground_truth: Some(ground_truth),
        };

        let summary = orchestrator.run_evaluation(&agent, vec![request], None, None);
        assert_eq!(summary.completed_trips, 1);
        assert_eq!(summary.failed_requests, 0);
        assert!((summary.total_revenue - 7.33).abs() < 0.05);
    }

    #[test]
    fn s5_horizon_cutoff_forces_completion_at_end_time() {
        let scenario = scenario_with_one_vehicle();
        let config = DispatchConfig::default();
        let oracle = Box::new(FlatEarthDistanceOracle::new(config.avg_speed_mph));
        let agent = NearestVehicleAgent::new(Box::new(FlatEarthDistanceOracle::new(
            config.avg_speed_mph,
        )));
        let mut orchestrator = Orchestrator::new(&scenario, config, oracle);

        let t0 = epoch(0);
        // A trip far enough away that the default 120-minute padding would
        // not be enough, forcing completion well after the true ETA.
        let ground_truth = StructuredRequest::minimal(
            "req-1",
            t0,
            Location::new(40.75, -73.98),
            Location::new(41.50, -73.98),
        );
        let request = NaturalLanguageRequest {
            request_id: "req-1".into(),
            request_time: t0,
            natural_language_text: "long trip".into(),
            ground_truth: Some(ground_truth),
        };

        let end_time = epoch(10 * 60_000); // cut off after 10 minutes
        let summary = orchestrator.run_evaluation(&agent, vec![request], Some(t0), Some(end_time));
        assert_eq!(summary.completed_trips, 1);

        let completions: Vec<_> = orchestrator
            .event_log()
            .records()
            .iter()
            .filter(|r| matches!(r.payload, EventPayload::TripCompleted { .. }))
            .collect();
        assert_eq!(completions.len(), 1);
        if let EventPayload::TripCompleted { trip } = &completions[0].payload {
            assert_eq!(trip.completion_time, end_time);
        }
    }

    #[test]
    fn zero_requests_is_a_valid_empty_run() {
        let scenario = scenario_with_one_vehicle();
        let config = DispatchConfig::default();
        let oracle = Box::new(FlatEarthDistanceOracle::new(config.avg_speed_mph));
        let agent = NearestVehicleAgent::new(Box::new(FlatEarthDistanceOracle::new(
            config.avg_speed_mph,
        )));
        let mut orchestrator = Orchestrator::new(&scenario, config, oracle);
        let summary = orchestrator.run_evaluation(&agent, vec![], Some(epoch(0)), Some(epoch(1000)));
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.completed_trips, 0);
    }
}
