//! Error types for the coordination client and services.

use snafu::Snafu;
use swapbench_wire::WireError;

/// Errors from coordination operations.
///
/// Every variant is fatal to the workflow that observes it; the protocol has
/// no recovery path without fleet-wide agreement.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    /// Topic or state name failed validation.
    #[snafu(display("invalid name '{name}': {reason}"))]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Payload exceeds the maximum publishable size.
    #[snafu(display("payload for topic '{topic}' is {size} bytes (max {max})"))]
    PayloadTooLarge {
        /// Target topic.
        topic: String,
        /// Payload size in bytes.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Topic log reached its retention limit.
    #[snafu(display("topic '{topic}' is full ({max} entries)"))]
    TopicFull {
        /// The full topic.
        topic: String,
        /// Retention limit.
        max: usize,
    },

    /// A signal pushed a barrier counter past its target.
    #[snafu(display("state '{state}' overflowed: count {count} exceeds target {target}"))]
    BarrierOverflow {
        /// The overflowing state.
        state: String,
        /// Counter value after the signal.
        count: u64,
        /// Expected number of participants.
        target: u64,
    },

    /// Barrier target of zero can never be reached by a signalling participant.
    #[snafu(display("state '{state}' has an invalid barrier target {target}"))]
    InvalidTarget {
        /// The state.
        state: String,
        /// The rejected target.
        target: u64,
    },

    /// Could not reach the coordination service.
    #[snafu(display("failed to connect to sync service at {addr}: {source}"))]
    Connect {
        /// Service address.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Framing failure talking to the coordination service.
    #[snafu(display("sync wire error: {source}"))]
    Wire {
        /// The underlying wire error.
        source: WireError,
    },

    /// The service closed the connection before answering.
    #[snafu(display("sync service closed the connection during {operation}"))]
    ConnectionClosed {
        /// The pending operation.
        operation: &'static str,
    },

    /// The service answered with something other than what the request expects.
    #[snafu(display("unexpected response to {operation}: {response}"))]
    UnexpectedResponse {
        /// The pending operation.
        operation: &'static str,
        /// Debug rendering of the response.
        response: String,
    },

    /// The service reported an error.
    #[snafu(display("sync service error: {message}"))]
    Remote {
        /// Error message from the service.
        message: String,
    },

    /// Typed payload could not be encoded.
    #[snafu(display("failed to encode payload for topic '{topic}': {source}"))]
    Encode {
        /// Target topic.
        topic: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Typed payload could not be decoded.
    #[snafu(display("failed to decode payload from topic '{topic}': {source}"))]
    Decode {
        /// Source topic.
        topic: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl From<WireError> for SyncError {
    fn from(source: WireError) -> Self {
        SyncError::Wire { source }
    }
}

/// Result alias for coordination operations.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
