//! Event-driven vehicle dispatch simulator for evaluating routing agents.
//!
//! This crate evaluates how well a pluggable "routing agent" can interpret
//! natural-language ride requests and assign vehicles to them, while
//! maximizing fleet-level revenue and minimizing empty (deadhead) driving.
//!
//! # Modules
//!
//! - [`clock`] — millisecond-resolution event queue shared by the simulator.
//! - [`geo`] — `Location` and the `DistanceOracle` abstraction.
//! - [`fleet`] — vehicle storage and availability queries.
//! - [`trip`] — active-trip lifecycle and time advancement.
//! - [`pricing`] — fare and idle-cost formulas.
//! - [`request`] — request/decision/result data types.
//! - [`agent`] — the `RoutingAgent` contract and reference implementations.
//! - [`evaluator`] — per-request scoring and run-level aggregates.
//! - [`event_log`] — ordered, JSON-exportable event log.
//! - [`orchestrator`] — drives a full evaluation run end to end.
//! - [`scenario`] — fleet/dispatch configuration structs.
//! - [`errors`] — recoverable domain error kinds.
//! - `test_helpers` — fixture builders for tests and benchmarks
//!   (behind the `test-helpers` feature, on by default).
//!
//! # Example
//!
//! ```rust
//! use dispatch_core::agent::NearestVehicleAgent;
//! use dispatch_core::geo::FlatEarthDistanceOracle;
//! use dispatch_core::orchestrator::Orchestrator;
//! use dispatch_core::scenario::{DispatchConfig, ScenarioParams};
//!
//! let scenario = ScenarioParams::default();
//! let config = DispatchConfig::default();
//! let oracle = Box::new(FlatEarthDistanceOracle::new(config.avg_speed_mph));
//! let agent = NearestVehicleAgent::new(Box::new(FlatEarthDistanceOracle::new(config.avg_speed_mph)));
//! let mut orchestrator = Orchestrator::new(&scenario, config, oracle);
//! let summary = orchestrator.run_evaluation(&agent, vec![], None, None);
//! assert_eq!(summary.total_requests, 0);
//! ```

pub mod agent;
pub mod clock;
pub mod errors;
pub mod evaluator;
pub mod event_log;
pub mod fleet;
pub mod geo;
pub mod orchestrator;
pub mod pricing;
pub mod request;
pub mod scenario;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
pub mod trip;
