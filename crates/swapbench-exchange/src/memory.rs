//! In-process exchange network for tests and local fleets.
//!
//! Every [`MemoryNode`] registers itself on a shared [`MemoryNetwork`] under a
//! `mem/<peer-id>` address. Remote fetches read the serving node's store
//! directly. The network numbers every remote fetch it serves, and faults can
//! be injected by that number, which keeps failure scenarios deterministic
//! without knowing the (random) block identifiers in advance.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tracing::debug;

use crate::block::Block;
use crate::block::BlockStore;
use crate::cid::ContentId;
use crate::constants::MEMORY_ADDR_PREFIX;
use crate::error::ExchangeError;
use crate::error::InjectedFaultSnafu;
use crate::error::NoReachableAddressSnafu;
use crate::error::NotConnectedSnafu;
use crate::error::PeerMismatchSnafu;
use crate::error::Result;
use crate::peer::AddressRecord;
use crate::peer::Connection;
use crate::peer::PeerId;
use crate::traits::Exchange;
use crate::traits::Transport;

/// Fault applied to one numbered remote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFault {
    /// The fetch returns an error.
    Fail,
    /// The fetch never completes.
    Stall,
    /// The fetch returns bytes that do not match the requested identifier.
    Corrupt,
}

struct Registered {
    peer_id: PeerId,
    store: BlockStore,
}

#[derive(Default)]
struct NetworkInner {
    nodes: RwLock<HashMap<String, Registered>>,
    faults: Mutex<HashMap<u64, FetchFault>>,
    fetches: AtomicU64,
}

/// Shared registry connecting in-memory nodes.
///
/// This type is Clone-able - clones share the same registry.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `fault` to the remote fetch numbered `ordinal` (0-based, network-wide).
    pub fn inject_fault(&self, ordinal: u64, fault: FetchFault) {
        self.inner.faults.lock().insert(ordinal, fault);
    }

    /// Number of remote fetches served so far.
    pub fn fetches_served(&self) -> u64 {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    fn register(&self, addr: String, peer_id: PeerId, store: BlockStore) {
        self.inner.nodes.write().insert(addr, Registered { peer_id, store });
    }

    fn lookup(&self, addr: &str) -> Option<(PeerId, BlockStore)> {
        self.inner.nodes.read().get(addr).map(|node| (node.peer_id, node.store.clone()))
    }

    async fn fetch(&self, id: &ContentId, connection: &Connection) -> Result<Block> {
        let ordinal = self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        let fault = self.inner.faults.lock().get(&ordinal).copied();

        match fault {
            Some(FetchFault::Fail) => {
                debug!(ordinal, id = %id.short(), "injecting fetch failure");
                return InjectedFaultSnafu { id: id.to_string() }.fail();
            }
            Some(FetchFault::Stall) => {
                debug!(ordinal, id = %id.short(), "injecting fetch stall");
                std::future::pending::<()>().await;
            }
            Some(FetchFault::Corrupt) | None => {}
        }

        let Some((peer_id, store)) = self.lookup(&connection.addr) else {
            return NotConnectedSnafu {
                peer: connection.peer_id.to_string(),
            }
            .fail();
        };
        if peer_id != connection.peer_id {
            return NotConnectedSnafu {
                peer: connection.peer_id.to_string(),
            }
            .fail();
        }

        let data = store.serve(id).ok_or_else(|| ExchangeError::NotFound { id: id.to_string() })?;
        if fault == Some(FetchFault::Corrupt) {
            debug!(ordinal, id = %id.short(), "injecting corrupt payload");
            let mut bad = data.to_vec();
            bad.push(0xff);
            return Ok(Block::new(Bytes::from(bad)));
        }

        Ok(Block::new(data))
    }
}

/// A node on a [`MemoryNetwork`], implementing both [`Transport`] and [`Exchange`].
pub struct MemoryNode {
    peer_id: PeerId,
    addr: String,
    store: BlockStore,
    network: MemoryNetwork,
}

impl MemoryNode {
    /// Create a node with a fresh identity and register it on `network`.
    pub fn new(network: &MemoryNetwork) -> Self {
        let peer_id = PeerId::random();
        let addr = format!("{}{}", MEMORY_ADDR_PREFIX, peer_id);
        let store = BlockStore::new();
        network.register(addr.clone(), peer_id, store.clone());
        Self {
            peer_id,
            addr,
            store,
            network: network.clone(),
        }
    }

    /// This node's local store.
    pub fn store(&self) -> &BlockStore {
        &self.store
    }
}

#[async_trait]
impl Transport for MemoryNode {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        vec![self.addr.clone()]
    }

    async fn connect(&self, record: &AddressRecord) -> Result<Connection> {
        for addr in &record.addrs {
            let Some((peer_id, _)) = self.network.lookup(addr) else {
                continue;
            };
            if peer_id != record.peer_id {
                return PeerMismatchSnafu {
                    expected: record.peer_id.to_string(),
                    actual: peer_id.to_string(),
                }
                .fail();
            }
            debug!(peer = %peer_id.fmt_short(), %addr, "connected");
            return Ok(Connection {
                peer_id,
                addr: addr.clone(),
            });
        }

        NoReachableAddressSnafu {
            peer: record.peer_id.to_string(),
            attempts: record.addrs.len(),
        }
        .fail()
    }
}

#[async_trait]
impl Exchange for MemoryNode {
    async fn put(&self, block: &Block) -> Result<()> {
        self.store.put(block)?;
        Ok(())
    }

    async fn announce(&self, block: &Block) -> Result<()> {
        self.store.announce(block.id())
    }

    async fn has(&self, id: &ContentId) -> Result<bool> {
        Ok(self.store.has(id))
    }

    async fn get(&self, id: &ContentId, connection: &Connection) -> Result<Block> {
        if let Some(block) = self.store.get(id) {
            return Ok(block);
        }

        let block = self.network.fetch(id, connection).await?;
        if block.id() == id {
            self.store.put(&block)?;
        }
        Ok(block)
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode").field("peer_id", &self.peer_id).field("addr", &self.addr).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider_with_block(network: &MemoryNetwork, data: &'static [u8]) -> (MemoryNode, Block) {
        let provider = MemoryNode::new(network);
        let block = Block::new(Bytes::from_static(data));
        provider.put(&block).await.unwrap();
        provider.announce(&block).await.unwrap();
        (provider, block)
    }

    #[tokio::test]
    async fn test_fetch_from_connected_peer() {
        let network = MemoryNetwork::new();
        let (provider, block) = provider_with_block(&network, b"payload").await;
        let requestor = MemoryNode::new(&network);

        let conn = requestor.connect(&provider.local_record()).await.unwrap();
        assert_eq!(conn.peer_id, provider.peer_id());

        let fetched = requestor.get(block.id(), &conn).await.unwrap();
        assert_eq!(fetched, block);
        assert!(requestor.has(block.id()).await.unwrap());
        // The provider keeps its copy.
        assert!(provider.has(block.id()).await.unwrap());
        assert_eq!(network.fetches_served(), 1);
    }

    #[tokio::test]
    async fn test_unannounced_block_not_served() {
        let network = MemoryNetwork::new();
        let provider = MemoryNode::new(&network);
        let block = Block::new(Bytes::from_static(b"private"));
        provider.put(&block).await.unwrap();

        let requestor = MemoryNode::new(&network);
        let conn = requestor.connect(&provider.local_record()).await.unwrap();
        let err = requestor.get(block.id(), &conn).await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_and_mismatched_records() {
        let network = MemoryNetwork::new();
        let provider = MemoryNode::new(&network);
        let requestor = MemoryNode::new(&network);

        let unknown = AddressRecord {
            peer_id: PeerId::random(),
            addrs: vec!["mem/nowhere".into()],
        };
        assert!(matches!(requestor.connect(&unknown).await, Err(ExchangeError::NoReachableAddress { .. })));

        let spoofed = AddressRecord {
            peer_id: PeerId::random(),
            addrs: provider.listen_addrs(),
        };
        assert!(matches!(requestor.connect(&spoofed).await, Err(ExchangeError::PeerMismatch { .. })));
    }

    #[tokio::test]
    async fn test_injected_faults_by_ordinal() {
        let network = MemoryNetwork::new();
        let (provider, block) = provider_with_block(&network, b"faulty").await;
        network.inject_fault(0, FetchFault::Fail);
        network.inject_fault(1, FetchFault::Corrupt);

        let requestor = MemoryNode::new(&network);
        let conn = requestor.connect(&provider.local_record()).await.unwrap();

        assert!(matches!(requestor.get(block.id(), &conn).await, Err(ExchangeError::InjectedFault { .. })));

        let corrupt = requestor.get(block.id(), &conn).await.unwrap();
        assert_ne!(corrupt.id(), block.id());
        assert!(!requestor.has(block.id()).await.unwrap());

        assert_eq!(requestor.get(block.id(), &conn).await.unwrap(), block);
    }
}
