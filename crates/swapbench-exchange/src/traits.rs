//! Seams to the exchange service and the transport.
//!
//! Both are external collaborators from the benchmark's point of view:
//! workflows only see these traits, never a concrete node type.

use async_trait::async_trait;

use crate::block::Block;
use crate::cid::ContentId;
use crate::error::Result;
use crate::peer::AddressRecord;
use crate::peer::Connection;
use crate::peer::PeerId;

/// Block storage and retrieval.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Store a block locally.
    async fn put(&self, block: &Block) -> Result<()>;

    /// Make a locally stored block servable to peers.
    async fn announce(&self, block: &Block) -> Result<()>;

    /// Whether the block is stored locally.
    async fn has(&self, id: &ContentId) -> Result<bool>;

    /// Fetch a block, from the local store if present, otherwise from the
    /// peer behind `connection`.
    async fn get(&self, id: &ContentId, connection: &Connection) -> Result<Block>;
}

/// Host-level addressing and dialling.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This node's identity.
    fn peer_id(&self) -> PeerId;

    /// Addresses this node can be dialled on.
    fn listen_addrs(&self) -> Vec<String>;

    /// The record other nodes need to dial this one.
    fn local_record(&self) -> AddressRecord {
        AddressRecord {
            peer_id: self.peer_id(),
            addrs: self.listen_addrs(),
        }
    }

    /// Dial the node described by `record`, verifying its identity.
    async fn connect(&self, record: &AddressRecord) -> Result<Connection>;
}
