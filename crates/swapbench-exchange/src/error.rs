//! Exchange and transport error types.

use snafu::Snafu;
use swapbench_wire::WireError;

/// Errors from block exchange and transport operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExchangeError {
    /// Block is not available locally or from the peer.
    #[snafu(display("block not found: {id}"))]
    NotFound {
        /// Identifier of the missing block.
        id: String,
    },

    /// Block exceeds the maximum size.
    #[snafu(display("block size {size} exceeds maximum {max}"))]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// String is not a valid content identifier.
    #[snafu(display("invalid content id '{input}': {reason}"))]
    InvalidContentId {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// String is not a valid peer identity.
    #[snafu(display("invalid peer id '{input}': {reason}"))]
    InvalidPeerId {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// None of the advertised addresses accepted a connection.
    #[snafu(display("no reachable address for peer {peer} ({attempts} tried)"))]
    NoReachableAddress {
        /// Peer being dialled.
        peer: String,
        /// Number of addresses tried.
        attempts: usize,
    },

    /// The dialled address answered with a different identity.
    #[snafu(display("peer mismatch: expected {expected}, got {actual}"))]
    PeerMismatch {
        /// Identity from the address record.
        expected: String,
        /// Identity the remote presented.
        actual: String,
    },

    /// A fetch referenced a peer with no open connection.
    #[snafu(display("not connected to peer {peer}"))]
    NotConnected {
        /// Peer identity.
        peer: String,
    },

    /// The remote peer reported an error.
    #[snafu(display("remote error: {message}"))]
    Remote {
        /// Error message from the peer.
        message: String,
    },

    /// The remote peer answered with an unexpected frame.
    #[snafu(display("unexpected response to {operation}"))]
    UnexpectedResponse {
        /// The pending operation.
        operation: &'static str,
    },

    /// Framing failure talking to a peer.
    #[snafu(display("exchange wire error: {source}"))]
    Wire {
        /// The underlying wire error.
        source: WireError,
    },

    /// Underlying I/O failure.
    #[snafu(display("{operation} failed: {source}"))]
    Io {
        /// What was being attempted.
        operation: &'static str,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failure injected by an in-memory network.
    #[snafu(display("injected fault fetching {id}"))]
    InjectedFault {
        /// Identifier being fetched.
        id: String,
    },
}

impl From<WireError> for ExchangeError {
    fn from(source: WireError) -> Self {
        ExchangeError::Wire { source }
    }
}

/// Result alias for exchange operations.
pub type Result<T, E = ExchangeError> = std::result::Result<T, E>;
