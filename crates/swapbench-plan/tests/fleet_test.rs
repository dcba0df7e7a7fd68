//! Speed test and rendezvous scenarios on an in-process fleet.

use std::time::Duration;

use swapbench_exchange::FetchFault;
use swapbench_plan::CountMode;
use swapbench_plan::EventLog;
use swapbench_plan::FetchOutcome;
use swapbench_plan::FetchPolicy;
use swapbench_plan::FleetReport;
use swapbench_plan::LocalFleet;
use swapbench_plan::PlanError;
use swapbench_plan::Role;
use swapbench_plan::RunEvent;
use swapbench_plan::RunParams;
use swapbench_plan::TestCase;
use swapbench_plan::phases::Phase;

/// Bound on a whole fleet run so a barrier regression fails instead of hanging.
const FLEET_TIMEOUT: Duration = Duration::from_secs(10);

fn params(size: u64, count: u64) -> RunParams {
    RunParams {
        size,
        count,
        seed: Some(42),
        ..RunParams::default()
    }
}

async fn run(fleet: LocalFleet) -> Result<FleetReport, PlanError> {
    tokio::time::timeout(FLEET_TIMEOUT, fleet.run()).await.expect("fleet timed out")
}

fn assert_drained_in_order(report: &FleetReport) {
    let provider = report.provider().expect("provider report");
    for requestor in report.requestors() {
        let ids: Vec<_> = requestor.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, provider.published);
        let indices: Vec<_> = requestor.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..provider.published.len() as u64).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_single_requestor_fetches_every_block() {
    let report = run(LocalFleet::new(TestCase::SpeedTest, params(1024, 3), 1)).await.unwrap();

    let provider = report.provider().unwrap();
    assert_eq!(provider.published.len(), 3);

    let requestors = report.requestors();
    assert_eq!(requestors.len(), 1);
    let requestor = requestors[0];
    assert_eq!(requestor.records.len(), 3);
    assert_eq!(requestor.missing, 0);
    for record in &requestor.records {
        assert!(matches!(record.outcome, FetchOutcome::Fetched { size_bytes: 1024, .. }), "{record:?}");
    }
    assert!(requestor.total >= requestor.latency_sum());
    assert_eq!(requestor.provider, provider.address);
    assert_drained_in_order(&report);
}

#[tokio::test]
async fn test_every_requestor_sees_the_same_sequence() {
    let report = run(LocalFleet::new(TestCase::SpeedTest, params(512, 5), 3)).await.unwrap();
    assert_eq!(report.requestors().len(), 3);
    assert_drained_in_order(&report);
    assert!(report.requestors().iter().all(|r| r.fetched() == 5 && r.bytes_fetched() == 5 * 512));
}

#[tokio::test]
async fn test_single_byte_blocks_publish_unique_identifiers() {
    let params = RunParams {
        seed: Some(1),
        ..params(1, 40)
    };
    let report = run(LocalFleet::new(TestCase::SpeedTest, params, 2)).await.unwrap();

    let published = &report.provider().unwrap().published;
    let unique: std::collections::HashSet<_> = published.iter().collect();
    assert_eq!(published.len(), 40);
    assert_eq!(unique.len(), 40);
    assert_drained_in_order(&report);
    assert!(report.requestors().iter().all(|r| r.fetched() == 40 && r.bytes_fetched() == 40));
}

#[tokio::test]
async fn test_zero_count_passes_both_barriers() {
    let fleet = LocalFleet::new(TestCase::SpeedTest, params(1024, 0), 2);
    let sync = fleet.sync_service().clone();
    let report = run(fleet).await.unwrap();

    assert!(report.provider().unwrap().published.is_empty());
    assert!(report.requestors().iter().all(|r| r.records.is_empty()));
    assert_eq!(sync.topic_len("blocks"), 0);
    assert_eq!(sync.state_count("ready"), 3);
    assert_eq!(sync.state_count("done"), 3);
}

#[tokio::test]
async fn test_inclusive_count_produces_one_extra_block() {
    let params = RunParams {
        count_mode: CountMode::Inclusive,
        ..params(256, 2)
    };
    let report = run(LocalFleet::new(TestCase::SpeedTest, params, 1)).await.unwrap();
    assert_eq!(report.provider().unwrap().published.len(), 3);
    assert_eq!(report.requestors()[0].records.len(), 3);
}

#[tokio::test]
async fn test_no_fetch_before_ready_and_provider_outlives_requestors() {
    let log = EventLog::new();
    let fleet = LocalFleet::new(TestCase::SpeedTest, params(2048, 4), 2).with_event_log(log.clone());
    let report = run(fleet).await.unwrap();
    let events = log.snapshot();

    let last_ready_entry = events
        .iter()
        .filter(|e| e.event == RunEvent::Phase(Phase::ReadyBarrier))
        .map(|e| e.at)
        .max()
        .unwrap();
    let ready_entries = events.iter().filter(|e| e.event == RunEvent::Phase(Phase::ReadyBarrier)).count();
    assert_eq!(ready_entries, 3);

    let fetches: Vec<_> = events.iter().filter(|e| matches!(e.event, RunEvent::Fetch(_))).collect();
    assert_eq!(fetches.len(), 8);
    assert!(fetches.iter().all(|e| e.at >= last_ready_entry && e.role == Role::Requestor));

    let published = events.iter().filter(|e| matches!(e.event, RunEvent::Published { .. })).count();
    assert_eq!(published, 4);

    let released = report.provider().unwrap().done_released_at;
    for requestor in report.requestors() {
        assert!(released >= requestor.done_signalled_at);
    }
}

#[tokio::test]
async fn test_failed_fetch_recorded_when_lenient() {
    let params = RunParams {
        fetch_policy: FetchPolicy::Lenient,
        ..params(1024, 3)
    };
    let fleet = LocalFleet::new(TestCase::SpeedTest, params, 1);
    fleet.network().inject_fault(1, FetchFault::Fail);
    let report = run(fleet).await.unwrap();

    let records = &report.requestors()[0].records;
    assert_eq!(records.len(), 3);
    assert!(records[0].outcome.is_success());
    assert!(matches!(records[1].outcome, FetchOutcome::Failed { .. }));
    assert!(records[2].outcome.is_success());
    assert_eq!(report.requestors()[0].fetched(), 2);
    assert_drained_in_order(&report);
}

#[tokio::test]
async fn test_failed_fetch_aborts_strict_run() {
    let fleet = LocalFleet::new(TestCase::SpeedTest, params(1024, 3), 1);
    fleet.network().inject_fault(1, FetchFault::Fail);

    let err = run(fleet).await.unwrap_err();
    match err {
        PlanError::Instance { ordinal, role, source } => {
            assert_eq!(ordinal, 1);
            assert_eq!(role, Role::Requestor);
            assert!(matches!(*source, PlanError::Fetch { index: 1, .. }), "{source:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stalled_fetch_times_out() {
    let params = RunParams {
        fetch_policy: FetchPolicy::Lenient,
        fetch_timeout: Some(Duration::from_millis(50)),
        ..params(1024, 2)
    };
    let fleet = LocalFleet::new(TestCase::SpeedTest, params, 1);
    fleet.network().inject_fault(0, FetchFault::Stall);
    let report = run(fleet).await.unwrap();

    let records = &report.requestors()[0].records;
    assert_eq!(records[0].outcome, FetchOutcome::TimedOut {
        after: Duration::from_millis(50)
    });
    assert!(records[1].outcome.is_success());
}

#[tokio::test]
async fn test_stalled_fetch_aborts_strict_run() {
    let params = RunParams {
        fetch_timeout: Some(Duration::from_millis(50)),
        ..params(1024, 2)
    };
    let fleet = LocalFleet::new(TestCase::SpeedTest, params, 1);
    fleet.network().inject_fault(0, FetchFault::Stall);

    let err = run(fleet).await.unwrap_err();
    assert!(
        matches!(&err, PlanError::Instance { source, .. } if matches!(**source, PlanError::FetchTimeout { index: 0, .. })),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_corrupt_block_never_counts_as_fetched() {
    let lenient = RunParams {
        fetch_policy: FetchPolicy::Lenient,
        ..params(128, 2)
    };
    let fleet = LocalFleet::new(TestCase::SpeedTest, lenient, 1);
    fleet.network().inject_fault(0, FetchFault::Corrupt);
    let report = run(fleet).await.unwrap();
    let record = &report.requestors()[0].records[0];
    match &record.outcome {
        FetchOutcome::Corrupt { actual, .. } => assert_ne!(*actual, record.id),
        other => panic!("expected corrupt outcome, got {other:?}"),
    }

    let fleet = LocalFleet::new(TestCase::SpeedTest, params(128, 2), 1);
    fleet.network().inject_fault(0, FetchFault::Corrupt);
    let err = run(fleet).await.unwrap_err();
    assert!(
        matches!(&err, PlanError::Instance { source, .. } if matches!(**source, PlanError::CorruptBlock { index: 0, .. })),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_rendezvous_meets_every_instance() {
    let report = run(LocalFleet::new(TestCase::Rendezvous, params(4096, 1), 2)).await.unwrap();
    assert_eq!(report.case, "rendezvous");

    let mut positions: Vec<_> = report
        .instances
        .iter()
        .map(|i| match &i.outcome {
            swapbench_plan::InstanceOutcome::Rendezvous(r) => {
                assert_eq!(r.role, i.role);
                r.ready_position
            }
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_invalid_params_rejected_before_start() {
    let err = LocalFleet::new(TestCase::SpeedTest, params(0, 1), 1).run().await.unwrap_err();
    assert!(matches!(err, PlanError::InvalidParameter { name: "size", .. }));
}

#[tokio::test]
async fn test_report_serializes() {
    let report = run(LocalFleet::new(TestCase::SpeedTest, params(64, 1), 1)).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["case"], "speed-test");
    assert_eq!(json["instances"][0]["role"], "provider");
    assert_eq!(json["instances"][0]["outcome"]["kind"], "provider");
    assert_eq!(json["instances"][1]["outcome"]["records"][0]["outcome"], "fetched");
}
