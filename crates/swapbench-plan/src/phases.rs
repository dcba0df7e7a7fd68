//! The ready/done barrier protocol shared by both workflows.
//!
//! Every instance of a run meets twice:
//!
//! - `ready`: after discovery and connection setup, before any block is
//!   generated or fetched. Requestors subscribe to [`BLOCKS_TOPIC`] before
//!   signalling, so no identifier can be missed.
//! - `done`: requestors signal without waiting once they have drained; the
//!   provider waits for the full fleet so it keeps serving until the last
//!   requestor finishes.

use std::fmt;

use snafu::ResultExt;
use swapbench_exchange::AddressRecord;
use swapbench_exchange::ContentId;
use swapbench_sync::State;
use swapbench_sync::SyncHandle;
use swapbench_sync::Topic;

use crate::error::CoordinationSnafu;
use crate::error::Result;
use crate::role::InstanceInfo;
use crate::runenv::RunEnv;

/// Topic carrying the provider's address record.
pub const PROVIDER_TOPIC: Topic<AddressRecord> = Topic::new("provider");

/// Topic carrying block identifiers in generation order.
pub const BLOCKS_TOPIC: Topic<ContentId> = Topic::new("blocks");

/// Reached once every instance is set up.
pub const READY_STATE: State = State::new("ready");

/// Reached once every requestor has drained.
pub const DONE_STATE: State = State::new("done");

/// Workflow phases, used for diagnostics and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Advertise,
    Discover,
    Connect,
    ReadyBarrier,
    Generate,
    Drain,
    DoneBarrier,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advertise => "advertise",
            Self::Discover => "discover",
            Self::Connect => "connect",
            Self::ReadyBarrier => "ready-barrier",
            Self::Generate => "generate",
            Self::Drain => "drain",
            Self::DoneBarrier => "done-barrier",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal `ready` and wait for the whole fleet. Returns this instance's arrival position.
pub async fn await_ready(sync: &SyncHandle, env: &RunEnv, instance: &InstanceInfo) -> Result<u64> {
    env.record_phase(Phase::ReadyBarrier);
    let position = sync
        .signal_and_wait(&READY_STATE, instance.instance_count)
        .await
        .context(CoordinationSnafu {
            phase: Phase::ReadyBarrier,
        })?;
    env.record_message(format!("passed ready barrier ({} of {})", position, instance.instance_count));
    Ok(position)
}

/// Signal `done` and wait for the whole fleet.
pub async fn await_done(sync: &SyncHandle, env: &RunEnv, instance: &InstanceInfo) -> Result<u64> {
    env.record_phase(Phase::DoneBarrier);
    sync.signal_and_wait(&DONE_STATE, instance.instance_count)
        .await
        .context(CoordinationSnafu {
            phase: Phase::DoneBarrier,
        })
}

/// Signal `done` without waiting for anyone else.
pub async fn signal_done(sync: &SyncHandle, env: &RunEnv) -> Result<u64> {
    env.record_phase(Phase::DoneBarrier);
    sync.signal_entry(&DONE_STATE).await.context(CoordinationSnafu {
        phase: Phase::DoneBarrier,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use swapbench_sync::InMemorySyncService;

    use super::*;
    use crate::role::Role;

    #[test]
    fn test_names_are_valid() {
        for name in [PROVIDER_TOPIC.name(), BLOCKS_TOPIC.name(), READY_STATE.name(), DONE_STATE.name()] {
            swapbench_sync::validate_name(name).unwrap();
        }
    }

    #[tokio::test]
    async fn test_requestor_signal_releases_waiting_provider() {
        let service = InMemorySyncService::new();
        let sync = SyncHandle::new(Arc::new(service.clone()));
        let provider = InstanceInfo::with_role(Role::Provider, 2, 0).unwrap();
        let requestor = InstanceInfo::with_role(Role::Requestor, 2, 1).unwrap();

        let waiter = {
            let sync = sync.clone();
            let env = RunEnv::new(&provider);
            tokio::spawn(async move { await_done(&sync, &env, &provider).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        signal_done(&sync, &RunEnv::new(&requestor)).await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
        assert_eq!(service.state_count(DONE_STATE.name()), 2);
    }
}
