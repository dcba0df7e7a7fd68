//! Pure run arithmetic.
//!
//! Block counting, size units and throughput, free of I/O so provider and
//! requestor provably agree on the same numbers.

use std::time::Duration;

use crate::params::CountMode;

/// Number of blocks a run produces and drains.
///
/// `Inclusive` counts `0..=count`, one more than `count`.
#[inline]
pub fn block_count(count: u64, mode: CountMode) -> u64 {
    match mode {
        CountMode::Exact => count,
        CountMode::Inclusive => count.saturating_add(1),
    }
}

/// Identifiers still owed after `received` of `expected` arrived.
#[inline]
pub fn shortfall(expected: u64, received: u64) -> u64 {
    expected.saturating_sub(received)
}

/// Number of distinct payloads of `size` bytes, saturating at `u64::MAX`.
///
/// A run cannot publish more unique identifiers than this.
#[inline]
pub fn distinct_payloads(size: u64) -> u64 {
    if size >= 8 { u64::MAX } else { 1u64 << (8 * size) }
}

/// Multiplier for a size unit suffix, case-insensitive.
///
/// Decimal units (`k`, `kb`, `m`, ...) are powers of 1000, binary units
/// (`kib`, `mib`, ...) are powers of 1024. An empty suffix means bytes.
pub fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        _ => return None,
    };
    Some(multiplier)
}

/// Bytes per second over `elapsed`, or `None` for a zero duration.
pub fn throughput_bytes_per_sec(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { Some(bytes as f64 / secs) } else { None }
}
