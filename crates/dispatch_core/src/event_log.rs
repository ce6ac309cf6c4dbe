//! Structured, ordered event log, exportable to JSON for replay or visualization.

use std::io::Write;

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::RequestScore;
use crate::fleet::Vehicle;
use crate::geo::Location;
use crate::request::{RoutingDecision, StructuredRequest, TripResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    EvaluationStart {
        total_requests: u32,
        fleet_size: u32,
    },
    EvaluationEnd {
        summary: crate::evaluator::EvaluationSummary,
    },
    VehicleInitialized {
        vehicle: Vehicle,
    },
    RequestArrived {
        request_id: String,
        natural_language_text: String,
        has_ground_truth: bool,
    },
    ParsingResult {
        request_id: String,
        parsed: StructuredRequest,
        parsing_time_ms: u64,
    },
    #[serde(rename = "ROUTING_DECISION")]
    RoutingDecisionMade {
        decision: RoutingDecision,
        decision_time_ms: u64,
        available_vehicles_count: usize,
    },
    VehicleAssigned {
        vehicle_id: String,
        request_id: String,
        vehicle_location: Location,
        pickup_location: Location,
        estimated_pickup_distance_miles: f64,
        estimated_pickup_minutes: f64,
    },
    TripCompleted {
        trip: TripResult,
    },
    #[serde(rename = "REQUEST_SCORE")]
    RequestScored {
        score: RequestScore,
    },
    Error {
        kind: String,
        message: String,
        request_id: Option<String>,
    },
}

/// One entry in the event log: a sequence number, a timestamp, and a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Append-only, ordered event log.
#[derive(Debug, Clone, Default, Resource)]
pub struct EventRecorder {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timestamp: DateTime<Utc>, payload: EventPayload) {
        self.records.push(EventRecord {
            seq: self.next_seq,
            timestamp,
            payload,
        });
        self.next_seq += 1;
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the full event log as a pretty-printed JSON array.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Write the full event log as JSON to any writer (e.g. a file).
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, &self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let mut recorder = EventRecorder::new();
        recorder.record(
            Utc::now(),
            EventPayload::RequestArrived {
                request_id: "r1".into(),
                natural_language_text: "hi".into(),
                has_ground_truth: false,
            },
        );
        recorder.record(
            Utc::now(),
            EventPayload::RequestArrived {
                request_id: "r2".into(),
                natural_language_text: "hi".into(),
                has_ground_truth: false,
            },
        );
        assert_eq!(recorder.records()[0].seq, 0);
        assert_eq!(recorder.records()[1].seq, 1);
    }

    #[test]
    fn json_round_trips() {
        let mut recorder = EventRecorder::new();
        recorder.record(
            Utc::now(),
            EventPayload::Error {
                kind: "VEHICLE_UNAVAILABLE".into(),
                message: "no vehicle".into(),
                request_id: Some("r1".into()),
            },
        );
        let json = recorder.to_json_string().unwrap();
        let parsed: Vec<EventRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].seq, 0);
    }
}
