//! Constants for the block exchange.

use std::time::Duration;

/// Maximum block size (64 MiB).
///
/// Bounded so a misconfigured `size` cannot exhaust memory on every instance.
pub const MAX_BLOCK_SIZE: u64 = 64 * 1024 * 1024;

/// Timeout for establishing a TCP connection to a peer.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Address scheme prefix used by in-memory nodes.
pub const MEMORY_ADDR_PREFIX: &str = "mem/";

// ============================================================================
// Compile-Time Constant Assertions
// ============================================================================

const _: () = assert!(MAX_BLOCK_SIZE > 0);
const _: () = assert!((MAX_BLOCK_SIZE as usize) < swapbench_wire::MAX_BLOCK_FRAME_SIZE);
const _: () = assert!(CONNECT_TIMEOUT.as_secs() > 0);
