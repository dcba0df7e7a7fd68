//! In-process coordination service.
//!
//! Topic logs retain their full history; every subscription replays the log
//! from the first entry before following it live. State counters are
//! `watch` channels, so any number of waiters observe the same increments.
//!
//! This type is Clone-able - clones share the same topics and states.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::trace;

use crate::client::RawSubscription;
use crate::client::SyncClient;
use crate::constants::MAX_PAYLOAD_SIZE;
use crate::constants::MAX_TOPIC_ENTRIES;
use crate::constants::SUBSCRIPTION_BUFFER;
use crate::error::PayloadTooLargeSnafu;
use crate::error::Result;
use crate::error::TopicFullSnafu;
use crate::names::validate_name;
use crate::pure::is_barrier_reached;

/// Append-only log for one topic.
struct TopicLog {
    entries: Mutex<Vec<Bytes>>,
    /// Bumped after every append to wake subscribers.
    appended: watch::Sender<u64>,
}

impl TopicLog {
    fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            entries: Mutex::new(Vec::new()),
            appended,
        }
    }
}

#[derive(Default)]
struct Inner {
    topics: Mutex<HashMap<String, Arc<TopicLog>>>,
    states: Mutex<HashMap<String, watch::Sender<u64>>>,
}

/// Coordination service held entirely in memory.
#[derive(Clone, Default)]
pub struct InMemorySyncService {
    inner: Arc<Inner>,
}

impl InMemorySyncService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value of `state` (0 if never signalled).
    pub fn state_count(&self, state: &str) -> u64 {
        self.inner.states.lock().get(state).map(|tx| *tx.borrow()).unwrap_or(0)
    }

    /// Number of entries published to `topic` so far.
    pub fn topic_len(&self, topic: &str) -> usize {
        self.inner.topics.lock().get(topic).map(|log| log.entries.lock().len()).unwrap_or(0)
    }

    fn topic(&self, name: &str) -> Arc<TopicLog> {
        self.inner.topics.lock().entry(name.to_string()).or_insert_with(|| Arc::new(TopicLog::new())).clone()
    }

    fn state(&self, name: &str) -> watch::Receiver<u64> {
        self.inner
            .states
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }
}

#[async_trait]
impl SyncClient for InMemorySyncService {
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<u64> {
        validate_name(topic)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return PayloadTooLargeSnafu {
                topic,
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            }
            .fail();
        }

        let log = self.topic(topic);
        let seq = {
            let mut entries = log.entries.lock();
            if entries.len() >= MAX_TOPIC_ENTRIES {
                return TopicFullSnafu {
                    topic,
                    max: MAX_TOPIC_ENTRIES,
                }
                .fail();
            }
            entries.push(payload);
            entries.len() as u64
        };
        log.appended.send_modify(|n| *n = n.saturating_add(1));

        trace!(topic, seq, "topic entry appended");
        Ok(seq)
    }

    async fn subscribe_bytes(&self, topic: &str) -> Result<RawSubscription> {
        validate_name(topic)?;

        let log = self.topic(topic);
        // Subscribe to the change counter before the first read so no append
        // between the read and the wait can be missed.
        let mut appended = log.appended.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let task = tokio::spawn(async move {
            let mut cursor = 0usize;
            loop {
                // At most one channel's worth is copied per lock.
                let batch: Vec<Bytes> = {
                    let entries = log.entries.lock();
                    let end = entries.len().min(cursor + SUBSCRIPTION_BUFFER);
                    entries[cursor..end].to_vec()
                };
                if batch.is_empty() {
                    if appended.changed().await.is_err() {
                        return;
                    }
                    continue;
                }
                for payload in batch {
                    if tx.send(Ok(payload)).await.is_err() {
                        return;
                    }
                    cursor += 1;
                }
            }
        });

        Ok(RawSubscription::new(topic, rx, task))
    }

    async fn signal_entry(&self, state: &str) -> Result<u64> {
        validate_name(state)?;

        let mut states = self.inner.states.lock();
        let counter = states.entry(state.to_string()).or_insert_with(|| watch::channel(0).0);
        let mut seq = 0;
        counter.send_modify(|n| {
            *n = n.saturating_add(1);
            seq = *n;
        });

        trace!(state, seq, "state signalled");
        Ok(seq)
    }

    async fn barrier(&self, state: &str, target: u64) -> Result<()> {
        validate_name(state)?;

        let mut rx = self.state(state);
        // The sender lives in the service map, so the channel never closes
        // while the service exists.
        let _ = rx.wait_for(|count| is_barrier_reached(*count, target)).await;
        Ok(())
    }
}
