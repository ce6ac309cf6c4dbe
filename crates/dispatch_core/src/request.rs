//! Request, decision, and outcome data types that flow through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Location;

/// Priority hint carried on a request, supplemental to the core fields below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPriority {
    Low,
    Normal,
    High,
}

impl Default for RequestPriority {
    fn default() -> Self {
        RequestPriority::Normal
    }
}

/// A raw natural-language ride request as it arrives at the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaturalLanguageRequest {
    pub request_id: String,
    pub request_time: DateTime<Utc>,
    pub natural_language_text: String,
    /// Never shown to the agent during `parse`; used only for scoring.
    pub ground_truth: Option<StructuredRequest>,
}

/// The agent's structured interpretation of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub request_id: String,
    pub request_time: DateTime<Utc>,
    pub origin: Location,
    pub destination: Location,
    pub requested_pickup_time: Option<DateTime<Utc>>,
    pub requested_dropoff_time: Option<DateTime<Utc>>,
    pub pickup_time_window_minutes: Option<u32>,
    pub dropoff_time_window_minutes: Option<u32>,
    pub has_arrival_constraint: bool,
    pub passenger_count: u32,
    pub wheelchair_accessible: bool,
    pub shared_ride_ok: bool,
    pub luggage_count: u32,
    pub customer_id: Option<String>,
    pub priority: RequestPriority,
    pub additional_notes: Option<String>,
}

impl StructuredRequest {
    /// A minimal structured request with sensible defaults, for agents that
    /// only have origin/destination to work with.
    pub fn minimal(request_id: impl Into<String>, request_time: DateTime<Utc>, origin: Location, destination: Location) -> Self {
        Self {
            request_id: request_id.into(),
            request_time,
            origin,
            destination,
            requested_pickup_time: None,
            requested_dropoff_time: None,
            pickup_time_window_minutes: None,
            dropoff_time_window_minutes: None,
            has_arrival_constraint: false,
            passenger_count: 1,
            wheelchair_accessible: false,
            shared_ride_ok: false,
            luggage_count: 0,
            customer_id: None,
            priority: RequestPriority::Normal,
            additional_notes: None,
        }
    }
}

/// The agent's assignment of a vehicle to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: String,
    pub vehicle_id: String,
    pub estimated_pickup_time: Option<DateTime<Utc>>,
    pub estimated_dropoff_time: Option<DateTime<Utc>>,
    pub estimated_pickup_distance_miles: f64,
    pub estimated_trip_distance_miles: f64,
    pub decision_rationale: Option<String>,
}

/// Reject requests with no usable text before handing them to an agent.
/// Returns the reason the request is invalid, if any.
pub fn validate_natural_language_request(request: &NaturalLanguageRequest) -> Result<(), String> {
    if request.request_id.trim().is_empty() {
        return Err("request_id is empty".to_string());
    }
    if request.natural_language_text.trim().is_empty() {
        return Err("natural_language_text is empty".to_string());
    }
    Ok(())
}

/// Sanity-check an agent's parsed output before acting on it. Returns the
/// reason the parse is unusable, if any.
pub fn validate_structured_request(parsed: &StructuredRequest) -> Result<(), String> {
    for (label, location) in [("origin", &parsed.origin), ("destination", &parsed.destination)] {
        if !(-90.0..=90.0).contains(&location.latitude) {
            return Err(format!("{label} latitude {} out of range", location.latitude));
        }
        if !(-180.0..=180.0).contains(&location.longitude) {
            return Err(format!("{label} longitude {} out of range", location.longitude));
        }
    }
    if parsed.passenger_count == 0 {
        return Err("passenger_count must be at least 1".to_string());
    }
    Ok(())
}

/// Outcome of a completed trip, produced by the vehicle simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub request_id: String,
    pub vehicle_id: String,
    pub actual_pickup_time: DateTime<Utc>,
    pub completion_time: DateTime<Utc>,
    pub trip_distance_miles: f64,
    pub deadhead_miles: f64,
    pub trip_time_minutes: f64,
    pub fare: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Location;
    use chrono::Utc;

    #[test]
    fn blank_text_fails_validation() {
        let request = NaturalLanguageRequest {
            request_id: "r1".into(),
            request_time: Utc::now(),
            natural_language_text: "   ".into(),
            ground_truth: None,
        };
        assert!(validate_natural_language_request(&request).is_err());
    }

    #[test]
    fn out_of_range_coordinates_fail_validation() {
        let parsed = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(200.0, -73.98),
            Location::new(40.78, -73.98),
        );
        assert!(validate_structured_request(&parsed).is_err());
    }

    #[test]
    fn minimal_request_passes_validation() {
        let parsed = StructuredRequest::minimal(
            "r1",
            Utc::now(),
            Location::new(40.75, -73.98),
            Location::new(40.78, -73.98),
        );
        assert!(validate_structured_request(&parsed).is_ok());
    }
}
