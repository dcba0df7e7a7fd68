//! Content-addressed block exchange for swapbench.
//!
//! Benchmark workflows talk to two seams:
//!
//! - [`Exchange`]: store, announce and fetch [`Block`]s by [`ContentId`]
//! - [`Transport`]: identity, advertised addresses and dialling
//!
//! Two implementations are provided. [`MemoryNode`] runs every node in one
//! process over a shared [`MemoryNetwork`] with deterministic fault
//! injection. [`TcpNode`] serves blocks over plain TCP with length-prefixed
//! postcard frames, for benchmarks spanning several processes or hosts.

mod block;
mod cid;
pub mod constants;
mod error;
mod memory;
mod payload;
mod peer;
mod tcp;
mod traits;

pub use block::Block;
pub use block::BlockStore;
pub use cid::ContentId;
pub use error::ExchangeError;
pub use error::Result;
pub use memory::FetchFault;
pub use memory::MemoryNetwork;
pub use memory::MemoryNode;
pub use payload::PayloadSource;
pub use payload::RandomPayload;
pub use peer::AddressRecord;
pub use peer::Connection;
pub use peer::PeerId;
pub use tcp::TcpNode;
pub use traits::Exchange;
pub use traits::Transport;
