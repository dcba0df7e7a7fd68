//! In-process fleet: one provider and N requestors over in-memory services.
//!
//! Each instance runs in its own task against a shared
//! [`InMemorySyncService`] and [`MemoryNetwork`], exactly as separate
//! processes would against the TCP services. When one instance fails the
//! rest are cancelled, since the barriers can no longer complete.

use std::sync::Arc;

use swapbench_exchange::MemoryNetwork;
use swapbench_exchange::MemoryNode;
use swapbench_sync::InMemorySyncService;
use swapbench_sync::SyncHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::cases::TestCase;
use crate::cases::run_instance;
use crate::context::InstanceContext;
use crate::error::PlanError;
use crate::error::Result;
use crate::params::RunParams;
use crate::report::FleetReport;
use crate::report::InstanceOutcome;
use crate::report::InstanceReport;
use crate::role::InstanceInfo;
use crate::role::Role;
use crate::runenv::EventLog;

/// A provider plus `requestors` requestors, run in one process.
pub struct LocalFleet {
    case: TestCase,
    params: RunParams,
    requestors: u64,
    sync: InMemorySyncService,
    network: MemoryNetwork,
    log: Option<EventLog>,
}

impl LocalFleet {
    pub fn new(case: TestCase, params: RunParams, requestors: u64) -> Self {
        Self {
            case,
            params,
            requestors,
            sync: InMemorySyncService::new(),
            network: MemoryNetwork::new(),
            log: None,
        }
    }

    /// Capture every instance's diagnostics into `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// The exchange network, for fault injection before [`LocalFleet::run`].
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    /// The coordination service shared by every instance.
    pub fn sync_service(&self) -> &InMemorySyncService {
        &self.sync
    }

    /// Run every instance to completion.
    ///
    /// Fails with the first failing instance's error, in ordinal order.
    pub async fn run(self) -> Result<FleetReport> {
        self.params.validate()?;
        let instance_count = self.requestors.saturating_add(1);
        let cancel = CancellationToken::new();
        let sync = SyncHandle::new(Arc::new(self.sync.clone()));

        info!(case = %self.case, instance_count, size = self.params.size, count = self.params.block_count(), "starting local fleet");

        let mut tasks: Vec<(u64, Role, JoinHandle<Option<Result<InstanceOutcome>>>)> = Vec::new();
        for ordinal in 0..instance_count {
            let role = if ordinal == 0 { Role::Provider } else { Role::Requestor };
            let instance = InstanceInfo::with_role(role, instance_count, ordinal)?;
            let mut ctx = InstanceContext::new(instance, self.params.clone(), sync.clone());
            if let Some(log) = &self.log {
                ctx = ctx.with_event_log(log.clone());
            }
            let node = MemoryNode::new(&self.network);
            let case = self.case;
            let cancel = cancel.clone();

            let task = tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = run_instance(case, &ctx, &node) => {
                        if let Err(e) = &result {
                            warn!(ordinal, %role, error = %e, "instance failed, cancelling fleet");
                            cancel.cancel();
                        }
                        Some(result)
                    }
                }
            });
            tasks.push((ordinal, role, task));
        }

        let mut instances = Vec::new();
        let mut first_error = None;
        for (ordinal, role, task) in tasks {
            match task.await {
                Ok(Some(Ok(outcome))) => instances.push(InstanceReport { ordinal, role, outcome }),
                Ok(Some(Err(source))) => {
                    first_error.get_or_insert(PlanError::Instance {
                        ordinal,
                        role,
                        source: Box::new(source),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(PlanError::Task {
                        ordinal,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        info!(case = %self.case, instances = instances.len(), "local fleet finished");
        Ok(FleetReport {
            case: self.case.to_string(),
            instances,
        })
    }
}
