//! Run parameters shared by every instance of a fleet.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::constants::DEFAULT_BLOCK_COUNT;
use crate::constants::DEFAULT_BLOCK_SIZE;
use crate::constants::MAX_BLOCK_COUNT;
use crate::constants::MAX_BLOCK_SIZE;
use crate::error::InvalidParameterSnafu;
use crate::error::PlanError;
use crate::error::Result;
use crate::pure;

/// How `count` maps to the number of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountMode {
    /// Exactly `count` blocks.
    #[default]
    Exact,
    /// Blocks `0..=count`, i.e. `count + 1`.
    Inclusive,
}

impl FromStr for CountMode {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(Self::Exact),
            "inclusive" => Ok(Self::Inclusive),
            other => InvalidParameterSnafu {
                name: "count_mode",
                reason: format!("expected 'exact' or 'inclusive', got '{other}'"),
            }
            .fail(),
        }
    }
}

impl fmt::Display for CountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Inclusive => "inclusive",
        })
    }
}

/// What a requestor does when a fetch does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Abort the run on the first failed, timed out or corrupt fetch.
    #[default]
    Strict,
    /// Record the outcome and continue with the next identifier.
    Lenient,
}

impl FromStr for FetchPolicy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => InvalidParameterSnafu {
                name: "fetch_policy",
                reason: format!("expected 'strict' or 'lenient', got '{other}'"),
            }
            .fail(),
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        })
    }
}

/// Parameters of one benchmark run.
///
/// Every instance of a fleet must be started with the same values; provider
/// and requestors derive [`RunParams::block_count`] independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParams {
    /// Payload size of each block in bytes.
    pub size: u64,
    /// Requested block count, interpreted by `count_mode`.
    pub count: u64,
    pub count_mode: CountMode,
    pub fetch_policy: FetchPolicy,
    /// Bound on each block fetch.
    pub fetch_timeout: Option<Duration>,
    /// Bound on waiting for the next block identifier to be announced.
    pub announce_timeout: Option<Duration>,
    /// Seed for payload generation; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_BLOCK_SIZE,
            count: DEFAULT_BLOCK_COUNT,
            count_mode: CountMode::default(),
            fetch_policy: FetchPolicy::default(),
            fetch_timeout: None,
            announce_timeout: None,
            seed: None,
        }
    }
}

impl RunParams {
    /// Number of blocks produced by the provider and drained by each requestor.
    pub fn block_count(&self) -> u64 {
        pure::block_count(self.count, self.count_mode)
    }

    /// Check every parameter against its bounds.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return InvalidParameterSnafu {
                name: "size",
                reason: "must be at least one byte",
            }
            .fail();
        }
        if self.size > MAX_BLOCK_SIZE {
            return InvalidParameterSnafu {
                name: "size",
                reason: format!("{} exceeds maximum {}", self.size, MAX_BLOCK_SIZE),
            }
            .fail();
        }
        if self.block_count() > MAX_BLOCK_COUNT {
            return InvalidParameterSnafu {
                name: "count",
                reason: format!("{} blocks exceeds maximum {}", self.block_count(), MAX_BLOCK_COUNT),
            }
            .fail();
        }
        if self.block_count() > pure::distinct_payloads(self.size) {
            return InvalidParameterSnafu {
                name: "count",
                reason: format!(
                    "{} unique blocks cannot be built from {}-byte payloads",
                    self.block_count(),
                    self.size
                ),
            }
            .fail();
        }
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return InvalidParameterSnafu {
                name: "fetch_timeout",
                reason: "must be non-zero",
            }
            .fail();
        }
        if self.announce_timeout.is_some_and(|t| t.is_zero()) {
            return InvalidParameterSnafu {
                name: "announce_timeout",
                reason: "must be non-zero",
            }
            .fail();
        }
        Ok(())
    }
}

/// Parse a human-readable size such as `1024`, `1KiB`, `4MB` or `2 mib`.
pub fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let split = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits.parse().map_err(|_| PlanError::InvalidParameter {
        name: "size",
        reason: format!("'{input}' does not start with a number"),
    })?;
    let multiplier = pure::unit_multiplier(unit.trim()).ok_or_else(|| PlanError::InvalidParameter {
        name: "size",
        reason: format!("unknown unit '{}' in '{input}'", unit.trim()),
    })?;

    value.checked_mul(multiplier).ok_or_else(|| PlanError::InvalidParameter {
        name: "size",
        reason: format!("'{input}' overflows"),
    })
}
