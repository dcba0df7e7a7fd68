//! Benchmark plan error types.

use std::time::Duration;

use snafu::Snafu;
use swapbench_exchange::ContentId;
use swapbench_exchange::ExchangeError;
use swapbench_sync::SyncError;

use crate::phases::Phase;
use crate::role::Role;

/// Errors that end an instance's run.
///
/// Nothing here is retried: an instance that hits one of these stops and
/// reports it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PlanError {
    /// Group label maps to no role.
    #[snafu(display("unknown test group '{label}'"))]
    UnknownRole {
        /// The rejected label.
        label: String,
    },

    /// No test case registered under this name.
    #[snafu(display("unknown test case '{name}'"))]
    UnknownTestCase {
        /// The rejected name.
        name: String,
    },

    /// A run parameter is out of range or malformed.
    #[snafu(display("invalid parameter {name}: {reason}"))]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The coordination service failed.
    #[snafu(display("coordination failed during {phase}: {source}"))]
    Coordination {
        /// Phase in progress.
        phase: Phase,
        /// The underlying coordination error.
        source: SyncError,
    },

    /// The provider topic closed before any address record arrived.
    #[snafu(display("provider topic closed before an address record was published"))]
    ProviderNotAdvertised,

    /// Dialling the provider failed.
    #[snafu(display("failed to connect to provider {provider}: {source}"))]
    Connect {
        /// The provider's address record.
        provider: String,
        /// The underlying exchange error.
        source: ExchangeError,
    },

    /// Payload generation kept producing identifiers already published.
    #[snafu(display("no unique payload for block {index} after {attempts} attempts"))]
    DuplicatePayload {
        /// Block index.
        index: u64,
        /// Payloads generated for this index.
        attempts: u32,
    },

    /// Storing a generated block failed.
    #[snafu(display("failed to store block {index}: {source}"))]
    Store {
        /// Block index.
        index: u64,
        /// The underlying exchange error.
        source: ExchangeError,
    },

    /// Announcing a stored block failed.
    #[snafu(display("failed to announce block {index}: {source}"))]
    Announce {
        /// Block index.
        index: u64,
        /// The underlying exchange error.
        source: ExchangeError,
    },

    /// Publishing a block identifier failed.
    #[snafu(display("failed to publish block {index}: {source}"))]
    Publish {
        /// Block index.
        index: u64,
        /// The underlying coordination error.
        source: SyncError,
    },

    /// Fetching a block failed.
    #[snafu(display("failed to fetch block {index} ({id}): {source}"))]
    Fetch {
        /// Block index.
        index: u64,
        /// Requested identifier.
        id: ContentId,
        /// The underlying exchange error.
        source: ExchangeError,
    },

    /// Fetching a block exceeded the fetch timeout.
    #[snafu(display("fetch of block {index} ({id}) timed out after {after:?}"))]
    FetchTimeout {
        /// Block index.
        index: u64,
        /// Requested identifier.
        id: ContentId,
        /// The configured timeout.
        after: Duration,
    },

    /// A fetched block's identifier differs from the requested one.
    #[snafu(display("block {index} is corrupt: requested {id}, received {actual}"))]
    CorruptBlock {
        /// Block index.
        index: u64,
        /// Requested identifier.
        id: ContentId,
        /// Identifier of the bytes actually received.
        actual: ContentId,
    },

    /// Fewer identifiers arrived than the run expects.
    #[snafu(display("provider never published block {received} of {expected}"))]
    NotPublished {
        /// Identifiers the run expects.
        expected: u64,
        /// Identifiers actually received.
        received: u64,
    },

    /// One instance of a local fleet failed.
    #[snafu(display("instance {ordinal} ({role}) failed: {source}"))]
    Instance {
        /// Instance ordinal.
        ordinal: u64,
        /// Instance role.
        role: Role,
        /// What went wrong.
        source: Box<PlanError>,
    },

    /// An instance task panicked or was cancelled.
    #[snafu(display("instance {ordinal} task did not complete: {message}"))]
    Task {
        /// Instance ordinal.
        ordinal: u64,
        /// Join failure description.
        message: String,
    },
}

/// Result alias for plan operations.
pub type Result<T, E = PlanError> = std::result::Result<T, E>;
