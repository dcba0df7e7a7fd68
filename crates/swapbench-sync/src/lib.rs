//! Coordination client for a swapbench fleet.
//!
//! Instances coordinate through two primitives hosted by a shared service:
//!
//! - **Topics** - named, typed broadcast channels. Every subscriber observes
//!   every value in publication order; the service keeps full history and
//!   replays it to late subscribers.
//! - **States** - named counters. `signal_entry` increments, and
//!   `signal_and_wait` releases all participants together once the counter
//!   reaches the fleet size.
//!
//! Workflows receive a [`SyncHandle`]. Two services back it:
//!
//! - [`InMemorySyncService`] for in-process fleets and tests
//! - [`RemoteSyncClient`] talking to a [`SyncServer`] over TCP
//!
//! ## Example
//!
//! ```ignore
//! use swapbench_sync::{InMemorySyncService, State, SyncHandle, Topic};
//!
//! const GREETINGS: Topic<String> = Topic::new("greetings");
//! const READY: State = State::new("ready");
//!
//! let sync = SyncHandle::new(Arc::new(InMemorySyncService::new()));
//! sync.publish(&GREETINGS, &"hello".to_string()).await?;
//! let mut sub = sync.subscribe(&GREETINGS).await?;
//! assert_eq!(sub.next().await?.as_deref(), Some("hello"));
//! sync.signal_and_wait(&READY, 1).await?;
//! ```

mod client;
pub mod constants;
mod error;
mod memory;
mod names;
pub mod protocol;
pub mod pure;
mod remote;
mod server;

pub use client::RawSubscription;
pub use client::Subscription;
pub use client::SyncClient;
pub use client::SyncHandle;
pub use error::Result;
pub use error::SyncError;
pub use memory::InMemorySyncService;
pub use names::State;
pub use names::Topic;
pub use names::validate_name;
pub use remote::RemoteSyncClient;
pub use server::SyncServer;
pub use server::SyncServerHandle;
