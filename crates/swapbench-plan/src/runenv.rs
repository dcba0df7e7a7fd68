//! Diagnostic sink for a running instance.
//!
//! Every record becomes a `tracing` event tagged with the instance's role and
//! ordinal. Attaching an [`EventLog`] additionally captures the records with
//! timestamps, which in-process fleets use to check cross-instance ordering.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use swapbench_exchange::ContentId;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::phases::Phase;
use crate::report::FetchRecord;
use crate::role::InstanceInfo;
use crate::role::Role;

/// A captured diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Message(String),
    Phase(Phase),
    Published { index: u64, id: ContentId },
    Fetch(FetchRecord),
}

/// A [`RunEvent`] with its origin and capture time.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub at: Instant,
    pub ordinal: u64,
    pub role: Role,
    pub event: RunEvent,
}

/// Shared capture buffer for [`RunEvent`]s.
///
/// This type is Clone-able - clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event captured so far, in capture order.
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn push(&self, event: LoggedEvent) {
        self.events.lock().push(event);
    }
}

/// Per-instance diagnostic sink.
#[derive(Debug, Clone)]
pub struct RunEnv {
    ordinal: u64,
    role: Role,
    log: Option<EventLog>,
}

impl RunEnv {
    pub fn new(instance: &InstanceInfo) -> Self {
        Self {
            ordinal: instance.ordinal,
            role: instance.role,
            log: None,
        }
    }

    /// Also capture every record into `log`.
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn record_message(&self, message: impl Into<String>) {
        let message = message.into();
        info!(ordinal = self.ordinal, role = %self.role, "{}", message);
        self.capture(RunEvent::Message(message));
    }

    pub fn record_phase(&self, phase: Phase) {
        debug!(ordinal = self.ordinal, role = %self.role, %phase, "entering phase");
        self.capture(RunEvent::Phase(phase));
    }

    pub fn record_published(&self, index: u64, id: &ContentId) {
        info!(ordinal = self.ordinal, index, id = %id, "published block");
        self.capture(RunEvent::Published { index, id: *id });
    }

    pub fn record_fetch(&self, record: &FetchRecord) {
        let latency_ms = record.outcome.latency().as_secs_f64() * 1000.0;
        if record.outcome.is_success() {
            info!(ordinal = self.ordinal, index = record.index, id = %record.id, latency_ms, "fetched block");
        } else {
            warn!(
                ordinal = self.ordinal,
                index = record.index,
                id = %record.id,
                latency_ms,
                outcome = ?record.outcome,
                "fetch did not succeed"
            );
        }
        self.capture(RunEvent::Fetch(record.clone()));
    }

    fn capture(&self, event: RunEvent) {
        if let Some(log) = &self.log {
            log.push(LoggedEvent {
                at: Instant::now(),
                ordinal: self.ordinal,
                role: self.role,
                event,
            });
        }
    }
}
