//! Domain error kinds for the dispatch pipeline.
//!
//! Every error here is recovered locally by the orchestrator: it is converted
//! into an `Error` event-log entry and the offending request is skipped. None
//! of these propagate out of `run_evaluation`.

use thiserror::Error;

/// A failure encountered while routing a single request through the pipeline.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("agent failed to parse request {request_id}: {reason}")]
    AgentParseError { request_id: String, reason: String },

    #[error("agent failed to route request {request_id}: {reason}")]
    AgentRouteError { request_id: String, reason: String },

    #[error("vehicle {vehicle_id} is not available for request {request_id} (status: {status})")]
    VehicleUnavailable {
        request_id: String,
        vehicle_id: String,
        status: String,
    },

    #[error("invalid event time for request {request_id}: scheduled {scheduled_ms}, clock at {clock_ms}")]
    InvalidEventTime {
        request_id: String,
        scheduled_ms: u64,
        clock_ms: u64,
    },

    #[error("request {request_id} failed validation: {reason}")]
    RequestValidationError { request_id: String, reason: String },
}

impl DispatchError {
    /// Stable machine-readable kind string, used as the `type` field on `Error` events.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::AgentParseError { .. } => "AGENT_PARSE_ERROR",
            DispatchError::AgentRouteError { .. } => "AGENT_ROUTE_ERROR",
            DispatchError::VehicleUnavailable { .. } => "VEHICLE_UNAVAILABLE",
            DispatchError::InvalidEventTime { .. } => "INVALID_EVENT_TIME",
            DispatchError::RequestValidationError { .. } => "REQUEST_VALIDATION_ERROR",
        }
    }

    /// The request id this error pertains to, if any.
    pub fn request_id(&self) -> &str {
        match self {
            DispatchError::AgentParseError { request_id, .. }
            | DispatchError::AgentRouteError { request_id, .. }
            | DispatchError::VehicleUnavailable { request_id, .. }
            | DispatchError::InvalidEventTime { request_id, .. }
            | DispatchError::RequestValidationError { request_id, .. } => request_id,
        }
    }
}
