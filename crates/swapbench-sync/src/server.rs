//! TCP front-end for an [`InMemorySyncService`].
//!
//! Lets independently launched instances share topics and barrier states.
//! Each accepted connection is served by its own task.

use std::net::SocketAddr;

use bytes::Bytes;
use snafu::ResultExt;
use swapbench_wire::MAX_CONTROL_FRAME_SIZE;
use swapbench_wire::read_message;
use swapbench_wire::write_message;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::SyncClient;
use crate::error::ConnectSnafu;
use crate::error::Result;
use crate::memory::InMemorySyncService;
use crate::protocol::SyncRequest;
use crate::protocol::SyncResponse;

/// A bound, not yet running, sync server.
pub struct SyncServer {
    listener: TcpListener,
    service: InMemorySyncService,
}

impl SyncServer {
    /// Bind a new server backed by a fresh service.
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with(addr, InMemorySyncService::new()).await
    }

    /// Bind a server exposing an existing service.
    pub async fn bind_with(addr: &str, service: InMemorySyncService) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.context(ConnectSnafu { addr })?;
        Ok(Self { listener, service })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context(ConnectSnafu { addr: "listener" })
    }

    /// The service behind this server.
    pub fn service(&self) -> &InMemorySyncService {
        &self.service
    }

    /// Accept connections until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let addr = self.listener.local_addr().map(|a| a.to_string()).unwrap_or_default();
        info!(%addr, "sync server listening");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(%addr, "sync server stopping");
                    return;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let service = self.service.clone();
                            let cancel = cancel.child_token();
                            tokio::spawn(async move {
                                tokio::select! {
                                    _ = cancel.cancelled() => {}
                                    result = serve_connection(service, stream) => {
                                        if let Err(e) = result {
                                            warn!(%peer, error = %e, "sync connection failed");
                                        }
                                    }
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "sync server accept failed"),
                    }
                }
            }
        }
    }

    /// Run the server in a background task.
    pub fn spawn(self) -> Result<SyncServerHandle> {
        let addr = self.local_addr()?;
        let service = self.service.clone();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        Ok(SyncServerHandle {
            addr,
            service,
            cancel,
            task,
        })
    }
}

/// Handle to a server running in the background.
pub struct SyncServerHandle {
    addr: SocketAddr,
    service: InMemorySyncService,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncServerHandle {
    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The service behind the server.
    pub fn service(&self) -> &InMemorySyncService {
        &self.service
    }

    /// Stop accepting and close every open connection.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

async fn serve_connection(service: InMemorySyncService, stream: TcpStream) -> Result<()> {
    let _ = stream.set_nodelay(true);
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let Some(request) = read_message::<SyncRequest, _>(&mut reader, MAX_CONTROL_FRAME_SIZE).await? else {
            return Ok(());
        };
        debug!(operation = request.operation(), "sync request");

        let response = match request {
            SyncRequest::Publish { topic, payload } => match service.publish_bytes(&topic, Bytes::from(payload)).await {
                Ok(seq) => SyncResponse::Published { seq },
                Err(e) => SyncResponse::Error { message: e.to_string() },
            },
            SyncRequest::SignalEntry { state } => match service.signal_entry(&state).await {
                Ok(seq) => SyncResponse::Signalled { seq },
                Err(e) => SyncResponse::Error { message: e.to_string() },
            },
            SyncRequest::Barrier { state, target } => {
                tokio::select! {
                    result = service.barrier(&state, target) => match result {
                        Ok(()) => SyncResponse::BarrierReached,
                        Err(e) => SyncResponse::Error { message: e.to_string() },
                    },
                    _ = wait_closed(&mut reader) => return Ok(()),
                }
            }
            SyncRequest::Subscribe { topic } => {
                return stream_topic(&service, &topic, reader, writer).await;
            }
        };

        write_message(&mut writer, &response, MAX_CONTROL_FRAME_SIZE).await?;
    }
}

/// Forward every entry of `topic` until the client goes away.
async fn stream_topic(
    service: &InMemorySyncService,
    topic: &str,
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
) -> Result<()> {
    let mut sub = match service.subscribe_bytes(topic).await {
        Ok(sub) => sub,
        Err(e) => {
            write_message(&mut writer, &SyncResponse::Error { message: e.to_string() }, MAX_CONTROL_FRAME_SIZE)
                .await?;
            return Ok(());
        }
    };

    loop {
        tokio::select! {
            next = sub.next() => match next? {
                Some(payload) => {
                    let frame = SyncResponse::Message { payload: payload.to_vec() };
                    write_message(&mut writer, &frame, MAX_CONTROL_FRAME_SIZE).await?;
                }
                None => return Ok(()),
            },
            _ = wait_closed(&mut reader) => {
                debug!(topic, "subscriber disconnected");
                return Ok(());
            }
        }
    }
}

/// Resolve once the client half-closes or drops the connection.
///
/// Clients send nothing after a streaming or blocking request, so any read
/// completing means the connection is finished.
async fn wait_closed(reader: &mut OwnedReadHalf) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}
