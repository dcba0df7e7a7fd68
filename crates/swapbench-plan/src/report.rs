//! Measurements and per-instance results.
//!
//! Everything here serializes to JSON for the CLI's `--json` output. Wall
//! clock instants are kept for in-process ordering checks but are not
//! serialized; durations are written as fractional milliseconds.

use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde::Serializer;
use swapbench_exchange::AddressRecord;
use swapbench_exchange::ContentId;

use crate::pure;
use crate::role::Role;

fn millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The block arrived and matched its identifier.
    Fetched {
        #[serde(rename = "latency_ms", serialize_with = "millis")]
        latency: Duration,
        size_bytes: u64,
    },
    /// The exchange returned an error.
    Failed {
        #[serde(rename = "latency_ms", serialize_with = "millis")]
        latency: Duration,
        reason: String,
    },
    /// The fetch did not complete within the fetch timeout.
    TimedOut {
        #[serde(rename = "after_ms", serialize_with = "millis")]
        after: Duration,
    },
    /// Bytes arrived but hash to a different identifier.
    Corrupt {
        #[serde(rename = "latency_ms", serialize_with = "millis")]
        latency: Duration,
        actual: ContentId,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    /// Time spent on the attempt; the timeout itself for timed out fetches.
    pub fn latency(&self) -> Duration {
        match self {
            Self::Fetched { latency, .. } | Self::Failed { latency, .. } | Self::Corrupt { latency, .. } => *latency,
            Self::TimedOut { after } => *after,
        }
    }
}

/// One published identifier paired with its download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRecord {
    /// Position in publication order.
    pub index: u64,
    pub id: ContentId,
    #[serde(flatten)]
    pub outcome: FetchOutcome,
}

/// What a provider did.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    /// The advertised address record.
    pub address: AddressRecord,
    /// Identifiers in publication order.
    pub published: Vec<ContentId>,
    /// When the done barrier released this provider.
    #[serde(skip)]
    pub done_released_at: Instant,
}

/// What a requestor measured.
#[derive(Debug, Clone, Serialize)]
pub struct RequestorReport {
    /// The provider that was dialled.
    pub provider: AddressRecord,
    /// One record per received identifier, in publication order.
    pub records: Vec<FetchRecord>,
    /// Wall time spent draining, from the ready barrier to the last fetch.
    #[serde(rename = "total_ms", serialize_with = "millis")]
    pub total: Duration,
    /// Identifiers that were never published (lenient runs only).
    pub missing: u64,
    /// When this requestor signalled done.
    #[serde(skip)]
    pub done_signalled_at: Instant,
}

impl RequestorReport {
    /// Number of successful fetches.
    pub fn fetched(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Bytes received by successful fetches.
    pub fn bytes_fetched(&self) -> u64 {
        self.records
            .iter()
            .map(|r| match r.outcome {
                FetchOutcome::Fetched { size_bytes, .. } => size_bytes,
                _ => 0,
            })
            .sum()
    }

    /// Sum of per-fetch latencies. Never exceeds `total`.
    pub fn latency_sum(&self) -> Duration {
        self.records.iter().map(|r| r.outcome.latency()).sum()
    }

    /// Aggregate throughput over the draining window.
    pub fn throughput_bytes_per_sec(&self) -> Option<f64> {
        pure::throughput_bytes_per_sec(self.bytes_fetched(), self.total)
    }
}

/// What an instance did in the `rendezvous` case.
#[derive(Debug, Clone, Serialize)]
pub struct RendezvousReport {
    pub role: Role,
    /// Arrival position at the ready barrier.
    pub ready_position: u64,
}

/// Result of one instance's run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceOutcome {
    Provider(ProviderReport),
    Requestor(RequestorReport),
    Rendezvous(RendezvousReport),
}

impl InstanceOutcome {
    pub fn as_provider(&self) -> Option<&ProviderReport> {
        match self {
            Self::Provider(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_requestor(&self) -> Option<&RequestorReport> {
        match self {
            Self::Requestor(report) => Some(report),
            _ => None,
        }
    }
}

/// One instance's outcome within a fleet.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub ordinal: u64,
    pub role: Role,
    pub outcome: InstanceOutcome,
}

/// Outcomes of every instance of a local fleet, ordered by ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub case: String,
    pub instances: Vec<InstanceReport>,
}

impl FleetReport {
    /// The provider's report, if the case produced one.
    pub fn provider(&self) -> Option<&ProviderReport> {
        self.instances.iter().find_map(|i| i.outcome.as_provider())
    }

    /// Every requestor's report, in ordinal order.
    pub fn requestors(&self) -> Vec<&RequestorReport> {
        self.instances.iter().filter_map(|i| i.outcome.as_requestor()).collect()
    }
}
