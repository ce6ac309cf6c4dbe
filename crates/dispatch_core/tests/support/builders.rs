#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

/// Initialize a test-scoped `tracing` subscriber so `warn!`/`debug!` output
/// from the orchestrator shows up under `cargo test -- --nocapture`.
/// Safe to call from every test; only the first call in a process wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

use dispatch_core::fleet::ZoneBounds;
use dispatch_core::geo::Location;
use dispatch_core::request::{NaturalLanguageRequest, RequestPriority, StructuredRequest};
use dispatch_core::scenario::ScenarioParams;

/// A fixed point used as the seeded origin across tests.
pub fn seeded_origin() -> Location {
    Location::new(40.75, -73.98)
}

/// A nearby point a few blocks north of `seeded_origin`.
pub fn seeded_nearby() -> Location {
    Location::new(40.76, -73.98)
}

/// A more distant point for longer trips.
pub fn seeded_distant() -> Location {
    Location::new(40.90, -73.98)
}

pub fn epoch_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
}

/// Builder for `StructuredRequest` fixtures.
#[derive(Clone)]
pub struct RequestBuilder {
    request_id: String,
    request_time: DateTime<Utc>,
    origin: Location,
    destination: Location,
    wheelchair_accessible: bool,
    shared_ride_ok: bool,
    has_arrival_constraint: bool,
    priority: RequestPriority,
}

impl RequestBuilder {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            request_time: epoch_ms(0),
            origin: seeded_origin(),
            destination: seeded_nearby(),
            wheelchair_accessible: false,
            shared_ride_ok: false,
            has_arrival_constraint: false,
            priority: RequestPriority::Normal,
        }
    }

    pub fn at(mut self, ms: i64) -> Self {
        self.request_time = epoch_ms(ms);
        self
    }

    pub fn with_origin(mut self, location: Location) -> Self {
        self.origin = location;
        self
    }

    pub fn with_destination(mut self, location: Location) -> Self {
        self.destination = location;
        self
    }

    pub fn wheelchair_required(mut self) -> Self {
        self.wheelchair_accessible = true;
        self
    }

    pub fn build_structured(&self) -> StructuredRequest {
        let mut req = StructuredRequest::minimal(
            self.request_id.clone(),
            self.request_time,
            self.origin.clone(),
            self.destination.clone(),
        );
        req.wheelchair_accessible = self.wheelchair_accessible;
        req.shared_ride_ok = self.shared_ride_ok;
        req.has_arrival_constraint = self.has_arrival_constraint;
        req.priority = self.priority;
        req
    }

    pub fn build_natural_language(&self, text: impl Into<String>) -> NaturalLanguageRequest {
        NaturalLanguageRequest {
            request_id: self.request_id.clone(),
            request_time: self.request_time,
            natural_language_text: text.into(),
            ground_truth: Some(self.build_structured()),
        }
    }
}

pub fn scenario_with_vehicles(locations: Vec<Location>, wheelchair_ratio: f64) -> ScenarioParams {
    ScenarioParams {
        num_vehicles: locations.len() as u32,
        wheelchair_accessible_ratio: wheelchair_ratio,
        initial_locations: locations,
        zone_bounds: ZoneBounds::default(),
        seed: 7,
    }
}
