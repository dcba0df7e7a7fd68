//! [`SyncClient`] speaking to a [`SyncServer`](crate::server::SyncServer) over TCP.
//!
//! Publish and signal share one control connection. Subscriptions and
//! barrier waits each open a dedicated connection, since the server holds
//! those connections open until the stream ends or the barrier releases.

use async_trait::async_trait;
use bytes::Bytes;
use snafu::ResultExt;
use swapbench_wire::MAX_CONTROL_FRAME_SIZE;
use swapbench_wire::read_message;
use swapbench_wire::write_message;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::RawSubscription;
use crate::client::SyncClient;
use crate::constants::SUBSCRIPTION_BUFFER;
use crate::error::ConnectSnafu;
use crate::error::ConnectionClosedSnafu;
use crate::error::Result;
use crate::error::SyncError;
use crate::names::validate_name;
use crate::protocol::SyncRequest;
use crate::protocol::SyncResponse;

/// TCP coordination client.
pub struct RemoteSyncClient {
    addr: String,
    control: Mutex<TcpStream>,
}

impl RemoteSyncClient {
    /// Connect to the sync server at `addr`.
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let control = open(&addr).await?;
        debug!(%addr, "connected to sync service");
        Ok(Self {
            addr,
            control: Mutex::new(control),
        })
    }

    /// Address of the sync server.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, request: SyncRequest) -> Result<SyncResponse> {
        let operation = request.operation();
        let mut stream = self.control.lock().await;
        write_message(&mut *stream, &request, MAX_CONTROL_FRAME_SIZE).await?;
        read_message::<SyncResponse, _>(&mut *stream, MAX_CONTROL_FRAME_SIZE)
            .await?
            .ok_or(SyncError::ConnectionClosed { operation })
    }
}

async fn open(addr: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).await.context(ConnectSnafu { addr })?;
    let _ = stream.set_nodelay(true);
    Ok(stream)
}

fn unexpected(operation: &'static str, response: SyncResponse) -> SyncError {
    match response {
        SyncResponse::Error { message } => SyncError::Remote { message },
        other => SyncError::UnexpectedResponse {
            operation,
            response: format!("{:?}", other),
        },
    }
}

#[async_trait]
impl SyncClient for RemoteSyncClient {
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<u64> {
        validate_name(topic)?;
        let request = SyncRequest::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        match self.call(request).await? {
            SyncResponse::Published { seq } => Ok(seq),
            other => Err(unexpected("publish", other)),
        }
    }

    async fn subscribe_bytes(&self, topic: &str) -> Result<RawSubscription> {
        validate_name(topic)?;

        let mut stream = open(&self.addr).await?;
        let request = SyncRequest::Subscribe {
            topic: topic.to_string(),
        };
        write_message(&mut stream, &request, MAX_CONTROL_FRAME_SIZE).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let task = tokio::spawn(async move {
            loop {
                let item = match read_message::<SyncResponse, _>(&mut stream, MAX_CONTROL_FRAME_SIZE).await {
                    Ok(Some(SyncResponse::Message { payload })) => Ok(Bytes::from(payload)),
                    Ok(Some(other)) => Err(unexpected("subscribe", other)),
                    Ok(None) => return,
                    Err(e) => Err(e.into()),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
        });

        Ok(RawSubscription::new(topic, rx, task))
    }

    async fn signal_entry(&self, state: &str) -> Result<u64> {
        validate_name(state)?;
        let request = SyncRequest::SignalEntry {
            state: state.to_string(),
        };
        match self.call(request).await? {
            SyncResponse::Signalled { seq } => Ok(seq),
            other => Err(unexpected("signal", other)),
        }
    }

    async fn barrier(&self, state: &str, target: u64) -> Result<()> {
        validate_name(state)?;

        let mut stream = open(&self.addr).await?;
        let request = SyncRequest::Barrier {
            state: state.to_string(),
            target,
        };
        write_message(&mut stream, &request, MAX_CONTROL_FRAME_SIZE).await?;

        match read_message::<SyncResponse, _>(&mut stream, MAX_CONTROL_FRAME_SIZE).await? {
            Some(SyncResponse::BarrierReached) => Ok(()),
            Some(other) => Err(unexpected("barrier", other)),
            None => ConnectionClosedSnafu { operation: "barrier" }.fail(),
        }
    }
}
