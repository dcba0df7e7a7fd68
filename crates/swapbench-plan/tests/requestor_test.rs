//! Requestor behaviour when the provider under-delivers, driven directly
//! against an in-memory coordination service.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use swapbench_exchange::Block;
use swapbench_exchange::Exchange;
use swapbench_exchange::MemoryNetwork;
use swapbench_exchange::MemoryNode;
use swapbench_exchange::Transport;
use swapbench_plan::FetchPolicy;
use swapbench_plan::InstanceContext;
use swapbench_plan::InstanceInfo;
use swapbench_plan::PlanError;
use swapbench_plan::Role;
use swapbench_plan::RunParams;
use swapbench_plan::phases::BLOCKS_TOPIC;
use swapbench_plan::phases::PROVIDER_TOPIC;
use swapbench_plan::run_requestor;
use swapbench_sync::InMemorySyncService;
use swapbench_sync::SyncHandle;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider node that advertised itself and published one of three blocks.
async fn short_provider(network: &MemoryNetwork, sync: &SyncHandle) -> MemoryNode {
    let provider = MemoryNode::new(network);
    let block = Block::new(Bytes::from_static(b"only block"));
    provider.put(&block).await.unwrap();
    provider.announce(&block).await.unwrap();
    sync.publish(&PROVIDER_TOPIC, &provider.local_record()).await.unwrap();
    sync.publish(&BLOCKS_TOPIC, block.id()).await.unwrap();
    provider
}

fn lone_requestor(sync: &SyncHandle, policy: FetchPolicy) -> InstanceContext {
    // A fleet of one: the requestor passes the ready barrier alone.
    let instance = InstanceInfo::with_role(Role::Requestor, 1, 0).unwrap();
    let params = RunParams {
        size: 10,
        count: 3,
        fetch_policy: policy,
        announce_timeout: Some(Duration::from_millis(50)),
        ..RunParams::default()
    };
    InstanceContext::new(instance, params, sync.clone())
}

#[tokio::test]
async fn test_lenient_requestor_records_missing_blocks() {
    let network = MemoryNetwork::new();
    let service = InMemorySyncService::new();
    let sync = SyncHandle::new(Arc::new(service.clone()));
    let _provider = short_provider(&network, &sync).await;

    let requestor = MemoryNode::new(&network);
    let ctx = lone_requestor(&sync, FetchPolicy::Lenient);
    let report = tokio::time::timeout(TEST_TIMEOUT, run_requestor(&ctx, &requestor)).await.unwrap().unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].outcome.is_success());
    assert_eq!(report.missing, 2);
    assert_eq!(service.state_count("done"), 1);
}

#[tokio::test]
async fn test_strict_requestor_reports_not_published() {
    let network = MemoryNetwork::new();
    let sync = SyncHandle::new(Arc::new(InMemorySyncService::new()));
    let _provider = short_provider(&network, &sync).await;

    let requestor = MemoryNode::new(&network);
    let ctx = lone_requestor(&sync, FetchPolicy::Strict);
    let err = tokio::time::timeout(TEST_TIMEOUT, run_requestor(&ctx, &requestor)).await.unwrap().unwrap_err();

    assert!(
        matches!(err, PlanError::NotPublished {
            expected: 3,
            received: 1
        }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_fatal() {
    let network = MemoryNetwork::new();
    let sync = SyncHandle::new(Arc::new(InMemorySyncService::new()));
    let stranger = MemoryNode::new(&MemoryNetwork::new());
    sync.publish(&PROVIDER_TOPIC, &stranger.local_record()).await.unwrap();

    let requestor = MemoryNode::new(&network);
    let ctx = lone_requestor(&sync, FetchPolicy::Strict);
    let err = tokio::time::timeout(TEST_TIMEOUT, run_requestor(&ctx, &requestor)).await.unwrap().unwrap_err();
    assert!(matches!(err, PlanError::Connect { .. }), "{err:?}");
}
