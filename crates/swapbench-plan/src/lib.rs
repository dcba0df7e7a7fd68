//! Benchmark plans for swapbench.
//!
//! A run is a fleet of independently started instances. One is the
//! **provider**, which generates random blocks and serves them; the rest are
//! **requestors**, which fetch every block and time each fetch. They agree on
//! roles and pacing only through the coordination service:
//!
//! ```text
//! provider:   advertise -> ready -> generate + publish ids -> done (wait)
//! requestor:  discover -> connect -> subscribe -> ready -> drain -> done (signal)
//! ```
//!
//! [`run_instance`] runs one instance of a [`TestCase`] given its
//! [`InstanceContext`] and an exchange node. [`LocalFleet`] runs a whole fleet
//! in one process over the in-memory services.

mod cases;
pub mod constants;
mod context;
mod error;
mod fleet;
mod params;
pub mod phases;
mod provider;
pub mod pure;
mod report;
mod requestor;
mod role;
mod runenv;

pub use cases::TestCase;
pub use cases::run_instance;
pub use context::InstanceContext;
pub use error::PlanError;
pub use error::Result;
pub use fleet::LocalFleet;
pub use params::CountMode;
pub use params::FetchPolicy;
pub use params::RunParams;
pub use params::parse_size;
pub use provider::run_provider;
pub use report::FetchOutcome;
pub use report::FetchRecord;
pub use report::FleetReport;
pub use report::InstanceOutcome;
pub use report::InstanceReport;
pub use report::ProviderReport;
pub use report::RendezvousReport;
pub use report::RequestorReport;
pub use requestor::run_requestor;
pub use role::InstanceInfo;
pub use role::Role;
pub use runenv::EventLog;
pub use runenv::LoggedEvent;
pub use runenv::RunEnv;
pub use runenv::RunEvent;
