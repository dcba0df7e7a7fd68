//! Constants for the coordination service.
//!
//! All limits are explicit so a misbehaving instance cannot grow topic
//! logs or subscription buffers without bound.

/// Maximum length of a topic or state name in bytes.
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum size of a single published payload (256 KiB).
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Maximum number of entries retained in one topic log.
pub const MAX_TOPIC_ENTRIES: usize = 1_000_000;

/// Capacity of the channel between a subscription's forwarding task and its reader.
pub const SUBSCRIPTION_BUFFER: usize = 1024;

/// Default address of the TCP sync server.
pub const DEFAULT_SYNC_ADDR: &str = "127.0.0.1:5050";

// ============================================================================
// Compile-Time Constant Assertions
// ============================================================================

const _: () = assert!(MAX_NAME_LENGTH > 0);
const _: () = assert!(MAX_PAYLOAD_SIZE > 0);
const _: () = assert!(MAX_PAYLOAD_SIZE < swapbench_wire::MAX_CONTROL_FRAME_SIZE);
const _: () = assert!(MAX_TOPIC_ENTRIES > 0);
const _: () = assert!(SUBSCRIPTION_BUFFER > 0);
