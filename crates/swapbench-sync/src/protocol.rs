//! Request and response frames of the TCP sync protocol.
//!
//! One request per frame. `Subscribe` turns the connection into a one-way
//! stream of `Message` frames; `Barrier` blocks the connection until the
//! barrier is released, so clients dedicate a connection to each of them.

use serde::Deserialize;
use serde::Serialize;

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRequest {
    /// Append a payload to a topic.
    Publish {
        /// Topic name.
        topic: String,
        /// Encoded value.
        payload: Vec<u8>,
    },
    /// Stream every entry of a topic, history first.
    Subscribe {
        /// Topic name.
        topic: String,
    },
    /// Increment a state counter.
    SignalEntry {
        /// State name.
        state: String,
    },
    /// Wait until a state counter reaches `target`.
    Barrier {
        /// State name.
        state: String,
        /// Number of participants to wait for.
        target: u64,
    },
}

impl SyncRequest {
    /// Short operation name for logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            SyncRequest::Publish { .. } => "publish",
            SyncRequest::Subscribe { .. } => "subscribe",
            SyncRequest::SignalEntry { .. } => "signal",
            SyncRequest::Barrier { .. } => "barrier",
        }
    }
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncResponse {
    /// Payload appended at position `seq`.
    Published {
        /// 1-based position in the topic log.
        seq: u64,
    },
    /// One topic entry on a subscription stream.
    Message {
        /// Encoded value.
        payload: Vec<u8>,
    },
    /// Counter value after a signal.
    Signalled {
        /// Counter value.
        seq: u64,
    },
    /// Barrier released.
    BarrierReached,
    /// Request failed on the server.
    Error {
        /// Human-readable failure.
        message: String,
    },
}
