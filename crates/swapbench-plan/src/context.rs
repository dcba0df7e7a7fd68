//! Everything an instance needs to run, bundled for the workflows.

use swapbench_sync::SyncHandle;

use crate::params::RunParams;
use crate::role::InstanceInfo;
use crate::runenv::EventLog;
use crate::runenv::RunEnv;

/// Injected dependencies and parameters of one instance.
#[derive(Clone)]
pub struct InstanceContext {
    pub instance: InstanceInfo,
    pub params: RunParams,
    /// Coordination handle shared with the rest of the fleet.
    pub sync: SyncHandle,
    pub env: RunEnv,
}

impl InstanceContext {
    pub fn new(instance: InstanceInfo, params: RunParams, sync: SyncHandle) -> Self {
        Self {
            env: RunEnv::new(&instance),
            instance,
            params,
            sync,
        }
    }

    /// Capture this instance's diagnostics into `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.env = self.env.with_log(log);
        self
    }
}
