//! Plain TCP block exchange.
//!
//! A [`TcpNode`] serves announced blocks from its store and fetches blocks
//! from peers it has dialled. The protocol is deliberately minimal: a
//! `Hello` handshake proving the remote identity, then `Get` requests
//! answered one at a time on the same connection.
//!
//! A pooled stream is taken out of its slot for the duration of one request
//! and only returned after the full response was read. A fetch that errors
//! or is cancelled midway leaves the slot empty, and the next fetch redials.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use swapbench_wire::MAX_BLOCK_FRAME_SIZE;
use swapbench_wire::MAX_CONTROL_FRAME_SIZE;
use swapbench_wire::read_message;
use swapbench_wire::write_message;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::block::Block;
use crate::block::BlockStore;
use crate::cid::ContentId;
use crate::constants::CONNECT_TIMEOUT;
use crate::error::ExchangeError;
use crate::error::IoSnafu;
use crate::error::NoReachableAddressSnafu;
use crate::error::NotConnectedSnafu;
use crate::error::PeerMismatchSnafu;
use crate::error::Result;
use crate::peer::AddressRecord;
use crate::peer::Connection;
use crate::peer::PeerId;
use crate::traits::Exchange;
use crate::traits::Transport;

#[derive(Debug, Serialize, Deserialize)]
enum ExchangeRequest {
    Hello,
    Get { id: ContentId },
}

#[derive(Debug, Serialize, Deserialize)]
enum ExchangeResponse {
    Hello { peer_id: PeerId },
    Block { data: Vec<u8> },
    NotFound,
}

/// Outgoing connection to one peer.
struct PeerLink {
    /// Address the handshake succeeded on; used to redial.
    addr: String,
    /// Idle stream, or `None` while a request is in flight or after one failed.
    stream: Mutex<Option<TcpStream>>,
}

/// Block exchange node listening on TCP.
pub struct TcpNode {
    peer_id: PeerId,
    listen_addrs: Vec<String>,
    store: BlockStore,
    connections: parking_lot::Mutex<HashMap<PeerId, Arc<PeerLink>>>,
    cancel: CancellationToken,
}

impl TcpNode {
    /// Bind to `listen` and start serving.
    ///
    /// `advertise_host` replaces the bound IP in the advertised address;
    /// required when binding to an unspecified address such as `0.0.0.0`.
    pub async fn bind(listen: &str, advertise_host: Option<&str>) -> Result<Self> {
        let listener = TcpListener::bind(listen).await.context(IoSnafu { operation: "bind" })?;
        let local = listener.local_addr().context(IoSnafu {
            operation: "read local address",
        })?;
        let advertised = advertised_addr(local, advertise_host);

        let peer_id = PeerId::random();
        let store = BlockStore::new();
        let cancel = CancellationToken::new();

        info!(peer = %peer_id.fmt_short(), %local, %advertised, "exchange listening");
        tokio::spawn(accept_loop(listener, peer_id, store.clone(), cancel.clone()));

        Ok(Self {
            peer_id,
            listen_addrs: vec![advertised],
            store,
            connections: parking_lot::Mutex::new(HashMap::new()),
            cancel,
        })
    }

    /// This node's local store.
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Stop serving and drop every outgoing connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.connections.lock().clear();
    }

    async fn dial(&self, addr: &str, expected: PeerId) -> Result<TcpStream> {
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ExchangeError::Io {
                operation: "connect",
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .context(IoSnafu { operation: "connect" })?;
        let _ = stream.set_nodelay(true);

        write_message(&mut stream, &ExchangeRequest::Hello, MAX_CONTROL_FRAME_SIZE).await?;
        match read_message::<ExchangeResponse, _>(&mut stream, MAX_CONTROL_FRAME_SIZE).await? {
            Some(ExchangeResponse::Hello { peer_id }) if peer_id == expected => Ok(stream),
            Some(ExchangeResponse::Hello { peer_id }) => PeerMismatchSnafu {
                expected: expected.to_string(),
                actual: peer_id.to_string(),
            }
            .fail(),
            _ => Err(ExchangeError::UnexpectedResponse { operation: "hello" }),
        }
    }
}

impl Drop for TcpNode {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn advertised_addr(local: SocketAddr, advertise_host: Option<&str>) -> String {
    match advertise_host {
        Some(host) => format!("{}:{}", host, local.port()),
        None => local.to_string(),
    }
}

async fn accept_loop(listener: TcpListener, peer_id: PeerId, store: BlockStore, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    let store = store.clone();
                    let cancel = cancel.child_token();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            result = serve_peer(stream, peer_id, store) => {
                                if let Err(e) = result {
                                    warn!(%remote, error = %e, "exchange connection failed");
                                }
                            }
                        }
                    });
                }
                Err(e) => warn!(error = %e, "exchange accept failed"),
            }
        }
    }
}

async fn serve_peer(mut stream: TcpStream, peer_id: PeerId, store: BlockStore) -> Result<()> {
    let _ = stream.set_nodelay(true);
    while let Some(request) = read_message::<ExchangeRequest, _>(&mut stream, MAX_CONTROL_FRAME_SIZE).await? {
        let response = match request {
            ExchangeRequest::Hello => ExchangeResponse::Hello { peer_id },
            ExchangeRequest::Get { id } => match store.serve(&id) {
                Some(data) => {
                    debug!(id = %id.short(), size = data.len(), "serving block");
                    ExchangeResponse::Block { data: data.to_vec() }
                }
                None => ExchangeResponse::NotFound,
            },
        };
        write_message(&mut stream, &response, MAX_BLOCK_FRAME_SIZE).await?;
    }
    Ok(())
}

#[async_trait]
impl Transport for TcpNode {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        self.listen_addrs.clone()
    }

    async fn connect(&self, record: &AddressRecord) -> Result<Connection> {
        for addr in &record.addrs {
            match self.dial(addr, record.peer_id).await {
                Ok(stream) => {
                    let link = PeerLink {
                        addr: addr.clone(),
                        stream: Mutex::new(Some(stream)),
                    };
                    self.connections.lock().insert(record.peer_id, Arc::new(link));
                    info!(peer = %record.peer_id.fmt_short(), %addr, "connected");
                    return Ok(Connection {
                        peer_id: record.peer_id,
                        addr: addr.clone(),
                    });
                }
                Err(e @ ExchangeError::PeerMismatch { .. }) => return Err(e),
                Err(e) => warn!(%addr, error = %e, "dial failed"),
            }
        }

        NoReachableAddressSnafu {
            peer: record.peer_id.to_string(),
            attempts: record.addrs.len(),
        }
        .fail()
    }
}

#[async_trait]
impl Exchange for TcpNode {
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

        let link = self.connections.lock().get(&connection.peer_id).cloned();
        let Some(link) = link else {
            return NotConnectedSnafu {
                peer: connection.peer_id.to_string(),
            }
            .fail();
        };

        let response = {
            let mut slot = link.stream.lock().await;
            let mut stream = match slot.take() {
                Some(stream) => stream,
                None => {
                    debug!(peer = %connection.peer_id.fmt_short(), addr = %link.addr, "redialling");
                    self.dial(&link.addr, connection.peer_id).await?
                }
            };
            write_message(&mut stream, &ExchangeRequest::Get { id: *id }, MAX_CONTROL_FRAME_SIZE).await?;
            let response = read_message::<ExchangeResponse, _>(&mut stream, MAX_BLOCK_FRAME_SIZE).await?;
            if response.is_some() {
                *slot = Some(stream);
            }
            response
        };

        match response {
            Some(ExchangeResponse::Block { data }) => {
                let block = Block::new(Bytes::from(data));
                if block.id() == id {
                    self.store.put(&block)?;
                }
                Ok(block)
            }
            Some(ExchangeResponse::NotFound) => Err(ExchangeError::NotFound { id: id.to_string() }),
            Some(ExchangeResponse::Hello { .. }) => Err(ExchangeError::UnexpectedResponse { operation: "get" }),
            None => Err(ExchangeError::Remote {
                message: format!("peer {} closed the connection", connection.peer_id.fmt_short()),
            }),
        }
    }
}
