//! Per-request scoring and running aggregates across an evaluation run.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::geo::MILES_PER_DEGREE;
use crate::pricing::{calculate_idle_cost, PricingConfig};
use crate::request::{RoutingDecision, StructuredRequest, TripResult};

/// Per-request scoring breakdown, computed once a trip either completes or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestScore {
    pub request_id: String,
    pub parsing_correct: Option<bool>,
    pub origin_distance_error_miles: Option<f64>,
    pub destination_distance_error_miles: Option<f64>,
    pub time_constraint_correct: Option<bool>,
    pub special_requirements_correct: Option<bool>,
    pub fare: f64,
    pub deadhead_miles: f64,
    pub pickup_wait_minutes: f64,
    pub trip_share: f64,
    pub per_request_score: f64,
    pub failed: bool,
}

/// Aggregate summary across every request processed in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_requests: u32,
    pub failed_requests: u32,
    pub completed_trips: u32,
    pub parsing_accuracy: f64,
    pub mean_origin_distance_error_miles: f64,
    pub mean_destination_distance_error_miles: f64,
    pub time_constraint_accuracy: f64,
    pub special_requirements_accuracy: f64,
    pub total_revenue: f64,
    pub total_idle_cost: f64,
    pub net_revenue: f64,
    pub deadhead_ratio: f64,
    pub mean_pickup_wait_minutes: f64,
    pub revenue_per_mile: f64,
    pub overall_score: f64,
}

/// Running accumulator behind `EvaluationSummary`. Reset at the start of
/// every run via `reset`.
#[derive(Debug, Clone, Default, Resource)]
pub struct Evaluator {
    total_requests: u32,
    failed_requests: u32,
    scored_parsing: u32,
    parsing_correct_count: u32,
    origin_distance_errors: Vec<f64>,
    destination_distance_errors: Vec<f64>,
    time_constraint_matches: u32,
    special_requirements_matches: u32,
    total_revenue: f64,
    total_idle_cost: f64,
    total_trip_miles: f64,
    total_deadhead_miles: f64,
    pickup_waits: Vec<f64>,
    completed_trips: u32,
    per_request_scores: Vec<f64>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.per_request_scores.push(0.0);
    }

    /// Score one completed request. `ground_truth` is `None` when the source
    /// request carried no ground truth to compare against.
    pub fn evaluate_request(
        &mut self,
        ground_truth: Option<&StructuredRequest>,
        parsed: &StructuredRequest,
        decision: &RoutingDecision,
        trip: &TripResult,
        pricing: &PricingConfig,
    ) -> RequestScore {
        self.total_requests += 1;
        self.completed_trips += 1;

        let parsing_correct = ground_truth.map(|gt| {
            gt.origin.zone_id.is_some()
                && gt.origin.zone_id == parsed.origin.zone_id
                && gt.destination.zone_id == parsed.destination.zone_id
        });
        if let Some(correct) = parsing_correct {
            self.scored_parsing += 1;
            if correct {
                self.parsing_correct_count += 1;
            }
        }

        let origin_err = ground_truth.map(|gt| haversine_like_miles(&gt.origin, &parsed.origin));
        let dest_err =
            ground_truth.map(|gt| haversine_like_miles(&gt.destination, &parsed.destination));
        if let Some(e) = origin_err {
            self.origin_distance_errors.push(e);
        }
        if let Some(e) = dest_err {
            self.destination_distance_errors.push(e);
        }

        let time_constraint_correct = ground_truth.map(|gt| gt.has_arrival_constraint == parsed.has_arrival_constraint);
        if time_constraint_correct == Some(true) {
            self.time_constraint_matches += 1;
        }

        let special_requirements_correct = ground_truth.map(|gt| {
            gt.wheelchair_accessible == parsed.wheelchair_accessible
                && gt.shared_ride_ok == parsed.shared_ride_ok
        });
        if special_requirements_correct == Some(true) {
            self.special_requirements_matches += 1;
        }

        let pickup_wait_minutes = (trip.actual_pickup_time - parsed.request_time)
            .num_milliseconds()
            .max(0) as f64
            / 60_000.0;
        self.pickup_waits.push(pickup_wait_minutes);

        let idle_cost = calculate_idle_cost(trip.deadhead_miles, pricing);
        self.total_revenue += trip.fare;
        self.total_idle_cost += idle_cost;
        self.total_trip_miles += trip.trip_distance_miles;
        self.total_deadhead_miles += trip.deadhead_miles;

        let trip_share = if trip.trip_distance_miles + trip.deadhead_miles > 0.0 {
            trip.trip_distance_miles / (trip.trip_distance_miles + trip.deadhead_miles)
        } else {
            0.0
        };
        let per_request_score = if parsing_correct.unwrap_or(true) {
            trip_share
        } else {
            0.0
        };
        self.per_request_scores.push(per_request_score);

        let _ = decision;

        RequestScore {
            request_id: trip.request_id.clone(),
            parsing_correct,
            origin_distance_error_miles: origin_err,
            destination_distance_error_miles: dest_err,
            time_constraint_correct,
            special_requirements_correct,
            fare: trip.fare,
            deadhead_miles: trip.deadhead_miles,
            pickup_wait_minutes,
            trip_share,
            per_request_score,
            failed: false,
        }
    }

    pub fn summary(&self) -> EvaluationSummary {
        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let parsing_accuracy = if self.scored_parsing > 0 {
            self.parsing_correct_count as f64 / self.scored_parsing as f64
        } else {
            0.0
        };
        let time_constraint_accuracy = if self.scored_parsing > 0 {
            self.time_constraint_matches as f64 / self.scored_parsing as f64
        } else {
            0.0
        };
        let special_requirements_accuracy = if self.scored_parsing > 0 {
            self.special_requirements_matches as f64 / self.scored_parsing as f64
        } else {
            0.0
        };

        let net_revenue = self.total_revenue - self.total_idle_cost;
        let deadhead_ratio = if self.total_trip_miles + self.total_deadhead_miles > 0.0 {
            self.total_deadhead_miles / (self.total_trip_miles + self.total_deadhead_miles)
        } else {
            0.0
        };
        let revenue_per_mile = if self.total_trip_miles > 0.0 {
            self.total_revenue / self.total_trip_miles
        } else {
            0.0
        };

        let normalized_net_revenue = if net_revenue + self.total_idle_cost > 0.0 {
            (net_revenue / (net_revenue + self.total_idle_cost)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let overall_score = 100.0 * (0.5 * parsing_accuracy + 0.5 * normalized_net_revenue);

        EvaluationSummary {
            total_requests: self.total_requests,
            failed_requests: self.failed_requests,
            completed_trips: self.completed_trips,
            parsing_accuracy,
            mean_origin_distance_error_miles: mean(&self.origin_distance_errors),
            mean_destination_distance_error_miles: mean(&self.destination_distance_errors),
            time_constraint_accuracy,
            special_requirements_accuracy,
            total_revenue: self.total_revenue,
            total_idle_cost: self.total_idle_cost,
            net_revenue,
            deadhead_ratio,
            mean_pickup_wait_minutes: mean(&self.pickup_waits),
            revenue_per_mile,
            overall_score,
        }
    }
}

/// Flat-earth distance in miles between two locations, used only for scoring
/// (not routing); intentionally the same formula as the default oracle so
/// that parsing error is measured on a comparable scale to trip distances.
fn haversine_like_miles(a: &crate::geo::Location, b: &crate::geo::Location) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    (dlat * dlat + dlon * dlon).sqrt() * MILES_PER_DEGREE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use chrono::Utc;

    fn sample_trip(request_id: &str, fare: f64, deadhead: f64, trip_miles: f64) -> TripResult {
        TripResult {
            request_id: request_id.into(),
            vehicle_id: "veh-0".into(),
            actual_pickup_time: Utc::now(),
            completion_time: Utc::now(),
            trip_distance_miles: trip_miles,
            deadhead_miles: deadhead,
            trip_time_minutes: 10.0,
            fare,
        }
    }

    #[test]
    fn reset_clears_all_accumulators() {
        let mut evaluator = Evaluator::new();
        evaluator.record_failure();
        evaluator.reset();
        assert_eq!(evaluator.summary().total_requests, 0);
    }

    #[test]
    fn evaluate_request_without_ground_truth_skips_parsing_metrics() {
        let mut evaluator = Evaluator::new();
        let parsed = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(0.0, 0.0),
            Location::new(1.0, 1.0),
        );
        let decision = RoutingDecision {
            request_id: "r1".into(),
            vehicle_id: "veh-0".into(),
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            estimated_pickup_distance_miles: 0.0,
            estimated_trip_distance_miles: 0.0,
            decision_rationale: None,
        };
        let trip = sample_trip("r1", 7.33, 0.69, 1.38);
        let score = evaluator.evaluate_request(
            None,
            &parsed,
            &decision,
            &trip,
            &PricingConfig::default(),
        );
        assert!(score.parsing_correct.is_none());
        assert_eq!(score.fare, 7.33);
        assert!(score.trip_share > 0.6);
    }

    #[test]
    fn failed_requests_contribute_zero_but_count_toward_denominator() {
        let mut evaluator = Evaluator::new();
        evaluator.record_failure();
        let summary = evaluator.summary();
        assert_eq!(summary.total_requests, 1);
        assert_eq!(summary.failed_requests, 1);
        assert_eq!(summary.completed_trips, 0);
    }

    #[test]
    fn overall_score_is_monotone_in_parsing_and_revenue() {
        let mut good = Evaluator::new();
        let mut bad = Evaluator::new();
        let pricing = PricingConfig::default();

        let gt = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(0.0, 0.0).with_zone(1, "z1"),
            Location::new(1.0, 1.0).with_zone(2, "z2"),
        );
        let parsed_correct = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(0.0, 0.0).with_zone(1, "z1"),
            Location::new(1.0, 1.0).with_zone(2, "z2"),
        );
        let parsed_wrong = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(5.0, 5.0).with_zone(9, "z9"),
            Location::new(1.0, 1.0).with_zone(2, "z2"),
        );
        let decision = RoutingDecision {
            request_id: "r1".into(),
            vehicle_id: "veh-0".into(),
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            estimated_pickup_distance_miles: 0.0,
            estimated_trip_distance_miles: 0.0,
            decision_rationale: None,
        };
        let trip = sample_trip("r1", 7.33, 0.0, 1.38);

        good.evaluate_request(Some(&gt), &parsed_correct, &decision, &trip, &pricing);
        bad.evaluate_request(Some(&gt), &parsed_wrong, &decision, &trip, &pricing);

        assert!(good.summary().overall_score >= bad.summary().overall_score);
    }
}
