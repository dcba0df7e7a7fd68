//! Coordination client contract and the typed handle built on it.
//!
//! [`SyncClient`] is the object-safe byte-level seam implemented by the
//! in-memory service and the TCP client. Workflows never use it directly;
//! they receive a [`SyncHandle`], which adds typed topics, JSON payloads and
//! the signal-and-wait rendezvous.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::BarrierOverflowSnafu;
use crate::error::DecodeSnafu;
use crate::error::EncodeSnafu;
use crate::error::InvalidTargetSnafu;
use crate::error::Result;
use crate::names::State;
use crate::names::Topic;
use crate::pure::is_within_target;
use crate::pure::remaining_participants;

/// Byte-level coordination service operations.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Append `payload` to `topic`'s log. Returns the 1-based position of the entry.
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<u64>;

    /// Open a subscription replaying the topic's history, then following it live.
    async fn subscribe_bytes(&self, topic: &str) -> Result<RawSubscription>;

    /// Increment `state`'s counter. Returns the counter value after the increment.
    async fn signal_entry(&self, state: &str) -> Result<u64>;

    /// Block until `state`'s counter reaches `target`.
    async fn barrier(&self, state: &str, target: u64) -> Result<()>;
}

/// An open subscription delivering raw payloads in publication order.
///
/// Values are produced by a background forwarding task. Closing (or dropping)
/// the subscription aborts that task.
pub struct RawSubscription {
    topic: String,
    rx: mpsc::Receiver<Result<Bytes>>,
    task: Option<JoinHandle<()>>,
}

impl RawSubscription {
    /// Wrap a forwarding task and the receiving end of its channel.
    pub fn new(topic: impl Into<String>, rx: mpsc::Receiver<Result<Bytes>>, task: JoinHandle<()>) -> Self {
        Self {
            topic: topic.into(),
            rx,
            task: Some(task),
        }
    }

    /// Topic this subscription follows.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next payload.
    ///
    /// Returns `Ok(None)` once the subscription can no longer produce values.
    pub async fn next(&mut self) -> Result<Option<Bytes>> {
        match self.rx.recv().await {
            Some(Ok(payload)) => Ok(Some(payload)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Stop following the topic.
    pub fn close(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }
}

impl Drop for RawSubscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// A typed subscription decoding JSON payloads into `T`.
pub struct Subscription<T> {
    raw: RawSubscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Wait for the next value, in publication order.
    pub async fn next(&mut self) -> Result<Option<T>> {
        match self.raw.next().await? {
            Some(payload) => {
                let value = serde_json::from_slice(&payload).context(DecodeSnafu {
                    topic: self.raw.topic(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Topic this subscription follows.
    pub fn topic(&self) -> &str {
        self.raw.topic()
    }

    /// Stop following the topic.
    pub fn close(self) {
        self.raw.close();
    }
}

/// Injected handle to the coordination service.
///
/// Cheap to clone; every workflow receives one explicitly.
#[derive(Clone)]
pub struct SyncHandle {
    client: Arc<dyn SyncClient>,
}

impl SyncHandle {
    /// Wrap a coordination client.
    pub fn new(client: Arc<dyn SyncClient>) -> Self {
        Self { client }
    }

    /// Publish `value` on `topic`. Returns the entry's position in the topic log.
    pub async fn publish<T: Serialize + Sync>(&self, topic: &Topic<T>, value: &T) -> Result<u64> {
        let payload = serde_json::to_vec(value).context(EncodeSnafu { topic: topic.name() })?;
        let seq = self.client.publish_bytes(topic.name(), Bytes::from(payload)).await?;
        debug!(topic = %topic, seq, "published");
        Ok(seq)
    }

    /// Subscribe to `topic`, replaying everything already published on it.
    pub async fn subscribe<T: DeserializeOwned>(&self, topic: &Topic<T>) -> Result<Subscription<T>> {
        let raw = self.client.subscribe_bytes(topic.name()).await?;
        debug!(topic = %topic, "subscribed");
        Ok(Subscription {
            raw,
            _marker: PhantomData,
        })
    }

    /// Signal `state` without waiting. Returns the counter value after the signal.
    pub async fn signal_entry(&self, state: &State) -> Result<u64> {
        let seq = self.client.signal_entry(state.name()).await?;
        debug!(state = %state, seq, "signalled");
        Ok(seq)
    }

    /// Signal `state`, then wait until `target` participants have signalled it.
    ///
    /// Every participant calling this with the same state and target is
    /// released once the last of them arrives. Returns this participant's
    /// arrival position.
    pub async fn signal_and_wait(&self, state: &State, target: u64) -> Result<u64> {
        if target == 0 {
            return InvalidTargetSnafu {
                state: state.name(),
                target,
            }
            .fail();
        }

        let seq = self.client.signal_entry(state.name()).await?;
        if !is_within_target(seq, target) {
            return BarrierOverflowSnafu {
                state: state.name(),
                count: seq,
                target,
            }
            .fail();
        }

        debug!(state = %state, seq, target, remaining = remaining_participants(seq, target), "waiting on barrier");
        self.client.barrier(state.name(), target).await?;
        debug!(state = %state, target, "barrier released");
        Ok(seq)
    }
}
