//! `RoutingAgent` contract and reference implementations.
//!
//! The simulator is agnostic to how a request gets parsed and routed; it only
//! requires something implementing `RoutingAgent`. The reference
//! implementations here exist for testing the simulator itself and for
//! baseline comparisons, not as the "real" agent under evaluation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fleet::FleetState;
use crate::geo::{DistanceOracle, Leg, Location};
use crate::request::{NaturalLanguageRequest, RoutingDecision, StructuredRequest};

/// Placeholder location used when an agent cannot resolve an origin or
/// destination from free text. Mirrors the fallback used by minimal
/// reference agents: a fixed point near the center of the service area.
pub const FALLBACK_LOCATION: Location = Location {
    latitude: 40.7580,
    longitude: -73.9855,
    zone_id: None,
    zone_name: None,
    address: None,
    poi_name: None,
};

/// Contract consumed by the orchestrator to parse and route each request.
///
/// `parse` and `route` must not mutate `fleet`; they receive it only for
/// read-only context (e.g. to factor vehicle availability into routing).
/// Implementations are expected to be infallible at the trait boundary —
/// an agent that cannot confidently parse a request should fall back to a
/// placeholder rather than abort the simulation.
pub trait RoutingAgent: Send + Sync {
    fn parse(&self, request: &NaturalLanguageRequest, fleet: &FleetState) -> StructuredRequest;

    fn route(&self, parsed: &StructuredRequest, fleet: &FleetState) -> Option<RoutingDecision>;

    fn query_distance_and_time(&self, from: &Location, to: &Location) -> Leg;
}

/// Reference "nearest vehicle" agent.
///
/// `parse` returns ground truth when present (test-only mode); otherwise it
/// falls back to a fixed placeholder location for both origin and
/// destination. `route` picks the closest available vehicle to the parsed
/// origin, honoring the wheelchair-accessibility requirement.
pub struct NearestVehicleAgent {
    oracle: Box<dyn DistanceOracle>,
}

impl NearestVehicleAgent {
    pub fn new(oracle: Box<dyn DistanceOracle>) -> Self {
        Self { oracle }
    }
}

impl RoutingAgent for NearestVehicleAgent {
    fn parse(&self, request: &NaturalLanguageRequest, _fleet: &FleetState) -> StructuredRequest {
        if let Some(ground_truth) = &request.ground_truth {
            return ground_truth.clone();
        }
        StructuredRequest::minimal(
            request.request_id.clone(),
            request.request_time,
            FALLBACK_LOCATION.clone(),
            FALLBACK_LOCATION.clone(),
        )
    }

    fn route(&self, parsed: &StructuredRequest, fleet: &FleetState) -> Option<RoutingDecision> {
        let available = fleet.available(
            Some(&parsed.origin),
            Some(10.0),
            Some(10),
            parsed.wheelchair_accessible,
        );
        let candidate = available.first().or_else(|| {
            fleet
                .all()
                .iter()
                .find(|v| !parsed.wheelchair_accessible || v.wheelchair_accessible)
        });
        let vehicle = candidate?;

        let pickup_leg = self.oracle.query(&vehicle.current_location, &parsed.origin);
        let trip_leg = self.oracle.query(&parsed.origin, &parsed.destination);

        Some(RoutingDecision {
            request_id: parsed.request_id.clone(),
            vehicle_id: vehicle.vehicle_id.clone(),
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            estimated_pickup_distance_miles: pickup_leg.miles,
            estimated_trip_distance_miles: trip_leg.miles,
            decision_rationale: Some("nearest available vehicle to origin".to_string()),
        })
    }

    fn query_distance_and_time(&self, from: &Location, to: &Location) -> Leg {
        self.oracle.query(from, to)
    }
}

/// Reference agent that routes to a uniformly random available vehicle,
/// falling back to any vehicle in the fleet if none are available.
pub struct RandomAgent {
    oracle: Box<dyn DistanceOracle>,
    seed: u64,
}

impl RandomAgent {
    pub fn new(oracle: Box<dyn DistanceOracle>, seed: u64) -> Self {
        Self { oracle, seed }
    }
}

impl RoutingAgent for RandomAgent {
    fn parse(&self, request: &NaturalLanguageRequest, _fleet: &FleetState) -> StructuredRequest {
        request.ground_truth.clone().unwrap_or_else(|| {
            StructuredRequest::minimal(
                request.request_id.clone(),
                request.request_time,
                FALLBACK_LOCATION.clone(),
                FALLBACK_LOCATION.clone(),
            )
        })
    }

    fn route(&self, parsed: &StructuredRequest, fleet: &FleetState) -> Option<RoutingDecision> {
        let all_vehicles = fleet.all();
        if all_vehicles.is_empty() {
            return None;
        }
        let available = fleet.available(None, None, None, parsed.wheelchair_accessible);
        let pool = if available.is_empty() {
            &all_vehicles
        } else {
            &available
        };

        // Deterministic per-request randomness: seed mixed with request_id.
        let mix = self
            .seed
            .wrapping_add(parsed.request_id.bytes().fold(0u64, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u64)
            }));
        let mut rng = StdRng::seed_from_u64(mix);
        let vehicle = &pool[rng.gen_range(0..pool.len())];

        let pickup_leg = self.oracle.query(&vehicle.current_location, &parsed.origin);
        let trip_leg = self.oracle.query(&parsed.origin, &parsed.destination);

        Some(RoutingDecision {
            request_id: parsed.request_id.clone(),
            vehicle_id: vehicle.vehicle_id.clone(),
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            estimated_pickup_distance_miles: pickup_leg.miles,
            estimated_trip_distance_miles: trip_leg.miles,
            decision_rationale: Some("random available vehicle".to_string()),
        })
    }

    fn query_distance_and_time(&self, from: &Location, to: &Location) -> Leg {
        self.oracle.query(from, to)
    }
}

/// A named borough/zone centroid, used by `KeywordZoneAgent` to resolve
/// place names mentioned in free text when no ground truth is available.
pub struct ZoneCentroid {
    pub keyword: &'static str,
    pub location: Location,
}

fn default_zone_centroids() -> Vec<ZoneCentroid> {
    vec![
        ZoneCentroid {
            keyword: "manhattan",
            location: Location::new(40.75, -73.98),
        },
        ZoneCentroid {
            keyword: "brooklyn",
            location: Location::new(40.65, -73.95),
        },
        ZoneCentroid {
            keyword: "queens",
            location: Location::new(40.72, -73.80),
        },
        ZoneCentroid {
            keyword: "bronx",
            location: Location::new(40.85, -73.88),
        },
        ZoneCentroid {
            keyword: "staten island",
            location: Location::new(40.58, -74.15),
        },
        ZoneCentroid {
            keyword: "newark",
            location: Location::new(40.69, -74.17),
        },
    ]
}

/// Reference agent that extracts an "X to Y" keyword pattern from free text
/// and resolves each side against a small table of known zone centroids,
/// falling back to the fixed placeholder location when nothing matches.
pub struct KeywordZoneAgent {
    oracle: Box<dyn DistanceOracle>,
    centroids: Vec<ZoneCentroid>,
}

impl KeywordZoneAgent {
    pub fn new(oracle: Box<dyn DistanceOracle>) -> Self {
        Self {
            oracle,
            centroids: default_zone_centroids(),
        }
    }

    fn resolve(&self, text: &str) -> Location {
        let lower = text.to_lowercase();
        self.centroids
            .iter()
            .find(|c| lower.contains(c.keyword))
            .map(|c| c.location.clone())
            .unwrap_or_else(|| FALLBACK_LOCATION.clone())
    }
}

impl RoutingAgent for KeywordZoneAgent {
    fn parse(&self, request: &NaturalLanguageRequest, _fleet: &FleetState) -> StructuredRequest {
        if let Some(ground_truth) = &request.ground_truth {
            return ground_truth.clone();
        }
        let parts: Vec<&str> = request.natural_language_text.splitn(2, " to ").collect();
        let (origin_text, dest_text) = match parts.as_slice() {
            [origin, dest] => (*origin, *dest),
            _ => (request.natural_language_text.as_str(), ""),
        };
        StructuredRequest::minimal(
            request.request_id.clone(),
            request.request_time,
            self.resolve(origin_text),
            self.resolve(dest_text),
        )
    }

    fn route(&self, parsed: &StructuredRequest, fleet: &FleetState) -> Option<RoutingDecision> {
        let available = fleet.available(Some(&parsed.origin), None, Some(1), parsed.wheelchair_accessible);
        let vehicle = available.first().or_else(|| fleet.all().first())?;

        let pickup_leg = self.oracle.query(&vehicle.current_location, &parsed.origin);
        let trip_leg = self.oracle.query(&parsed.origin, &parsed.destination);

        Some(RoutingDecision {
            request_id: parsed.request_id.clone(),
            vehicle_id: vehicle.vehicle_id.clone(),
            estimated_pickup_time: None,
            estimated_dropoff_time: None,
            estimated_pickup_distance_miles: pickup_leg.miles,
            estimated_trip_distance_miles: trip_leg.miles,
            decision_rationale: Some("keyword zone match".to_string()),
        })
    }

    fn query_distance_and_time(&self, from: &Location, to: &Location) -> Leg {
        self.oracle.query(from, to)
    }
}

#[cfg(feature = "remote-agent")]
pub use remote::HttpRoutingAgent;

#[cfg(feature = "remote-agent")]
mod remote {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize)]
    struct ParseRequestBody<'a> {
        request_id: &'a str,
        natural_language_text: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct ParseResponseBody {
        origin: Location,
        destination: Location,
        wheelchair_accessible: Option<bool>,
    }

    /// Agent that delegates `parse` to a remote HTTP service and performs
    /// routing locally (nearest available vehicle), so that a flaky remote
    /// parser cannot corrupt the dispatch decision itself.
    ///
    /// Falls back to the fixed placeholder location if the remote call
    /// fails or times out, matching the local-fallback pattern used by
    /// precomputed-table providers elsewhere in this crate.
    pub struct HttpRoutingAgent {
        client: reqwest::blocking::Client,
        endpoint: String,
        oracle: Box<dyn DistanceOracle>,
    }

    impl HttpRoutingAgent {
        pub fn new(endpoint: impl Into<String>, oracle: Box<dyn DistanceOracle>) -> Self {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build http client");
            Self {
                client,
                endpoint: endpoint.into(),
                oracle,
            }
        }

        fn remote_parse(&self, request: &NaturalLanguageRequest) -> Option<ParseResponseBody> {
            let body = ParseRequestBody {
                request_id: &request.request_id,
                natural_language_text: &request.natural_language_text,
            };
            self.client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .ok()?
                .json::<ParseResponseBody>()
                .ok()
        }
    }

    impl RoutingAgent for HttpRoutingAgent {
        fn parse(&self, request: &NaturalLanguageRequest, _fleet: &FleetState) -> StructuredRequest {
            if let Some(ground_truth) = &request.ground_truth {
                return ground_truth.clone();
            }
            match self.remote_parse(request) {
                Some(parsed) => {
                    let mut structured = StructuredRequest::minimal(
                        request.request_id.clone(),
                        request.request_time,
                        parsed.origin,
                        parsed.destination,
                    );
                    structured.wheelchair_accessible = parsed.wheelchair_accessible.unwrap_or(false);
                    structured
                }
                None => StructuredRequest::minimal(
                    request.request_id.clone(),
                    request.request_time,
                    FALLBACK_LOCATION.clone(),
                    FALLBACK_LOCATION.clone(),
                ),
            }
        }

        fn route(&self, parsed: &StructuredRequest, fleet: &FleetState) -> Option<RoutingDecision> {
            let available = fleet.available(
                Some(&parsed.origin),
                Some(10.0),
                Some(1),
                parsed.wheelchair_accessible,
            );
            let vehicle = available.first().or_else(|| fleet.all().first())?;

            let pickup_leg = self.oracle.query(&vehicle.current_location, &parsed.origin);
            let trip_leg = self.oracle.query(&parsed.origin, &parsed.destination);

            Some(RoutingDecision {
                request_id: parsed.request_id.clone(),
                vehicle_id: vehicle.vehicle_id.clone(),
                estimated_pickup_time: None,
                estimated_dropoff_time: None,
                estimated_pickup_distance_miles: pickup_leg.miles,
                estimated_trip_distance_miles: trip_leg.miles,
                decision_rationale: Some("remote parse, local nearest-vehicle routing".to_string()),
            })
        }

        fn query_distance_and_time(&self, from: &Location, to: &Location) -> Leg {
            self.oracle.query(from, to)
        }
    }
}
