//! Limits and defaults for benchmark runs.

/// Default block size in bytes (1 MiB).
pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024;

/// Default number of blocks.
pub const DEFAULT_BLOCK_COUNT: u64 = 10;

/// Maximum number of blocks a single run may produce.
pub const MAX_BLOCK_COUNT: u64 = 1_000_000;

/// Payloads generated for one block before giving up on a fresh identifier.
pub const MAX_PAYLOAD_ATTEMPTS: u32 = 10_000;

/// Maximum fleet size.
pub const MAX_INSTANCE_COUNT: u64 = 10_000;

/// Maximum block size, shared with the exchange.
pub const MAX_BLOCK_SIZE: u64 = swapbench_exchange::constants::MAX_BLOCK_SIZE;

// ============================================================================
// Compile-Time Constant Assertions
// ============================================================================

const _: () = assert!(DEFAULT_BLOCK_SIZE > 0);
const _: () = assert!(DEFAULT_BLOCK_SIZE <= MAX_BLOCK_SIZE);
const _: () = assert!(DEFAULT_BLOCK_COUNT <= MAX_BLOCK_COUNT);
const _: () = assert!(MAX_INSTANCE_COUNT >= 2);
const _: () = assert!(MAX_PAYLOAD_ATTEMPTS > 0);
// A topic log holds at most MAX_TOPIC_ENTRIES identifiers.
const _: () = assert!(MAX_BLOCK_COUNT <= swapbench_sync::constants::MAX_TOPIC_ENTRIES as u64);
