//! Block exchange between TCP nodes on loopback.

use std::time::Duration;

use bytes::Bytes;
use swapbench_exchange::AddressRecord;
use swapbench_exchange::Block;
use swapbench_exchange::Exchange;
use swapbench_exchange::ExchangeError;
use swapbench_exchange::PeerId;
use swapbench_exchange::TcpNode;
use swapbench_exchange::Transport;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn node() -> TcpNode {
    TcpNode::bind("127.0.0.1:0", None).await.expect("bind loopback")
}

#[tokio::test]
async fn test_fetch_announced_blocks() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let provider = node().await;
        let requestor = node().await;

        let blocks: Vec<Block> =
            (0u8..4).map(|i| Block::new(Bytes::from(vec![i; 1024 * (i as usize + 1)]))).collect();
        for block in &blocks {
            provider.put(block).await.unwrap();
            provider.announce(block).await.unwrap();
        }

        let conn = requestor.connect(&provider.local_record()).await.unwrap();
        assert_eq!(conn.peer_id, provider.peer_id());

        for block in &blocks {
            let fetched = requestor.get(block.id(), &conn).await.unwrap();
            assert_eq!(&fetched, block);
            assert!(requestor.has(block.id()).await.unwrap());
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_unknown_block_is_not_found() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let provider = node().await;
        let requestor = node().await;
        let conn = requestor.connect(&provider.local_record()).await.unwrap();

        let missing = Block::new(Bytes::from_static(b"never stored"));
        let err = requestor.get(missing.id(), &conn).await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound { .. }), "got {err:?}");

        // The connection stays usable after a miss.
        let block = Block::new(Bytes::from_static(b"stored later"));
        provider.put(&block).await.unwrap();
        provider.announce(&block).await.unwrap();
        assert_eq!(requestor.get(block.id(), &conn).await.unwrap(), block);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_after_timed_out_fetch_succeeds() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let provider = node().await;
        let requestor = node().await;

        let big = Block::new(Bytes::from(vec![7u8; 32 * 1024 * 1024]));
        let small = Block::new(Bytes::from_static(b"small block"));
        for block in [&big, &small] {
            provider.put(block).await.unwrap();
            provider.announce(block).await.unwrap();
        }
        let conn = requestor.connect(&provider.local_record()).await.unwrap();

        // Whether or not the deadline hits mid-response, later fetches must
        // not see the abandoned bytes.
        let _ = tokio::time::timeout(Duration::from_millis(1), requestor.get(big.id(), &conn)).await;

        assert_eq!(requestor.get(small.id(), &conn).await.unwrap(), small);
        assert_eq!(requestor.get(big.id(), &conn).await.unwrap(), big);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_connect_verifies_identity() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let provider = node().await;
        let requestor = node().await;

        let spoofed = AddressRecord {
            peer_id: PeerId::random(),
            addrs: provider.listen_addrs(),
        };
        let err = requestor.connect(&spoofed).await.unwrap_err();
        assert!(matches!(err, ExchangeError::PeerMismatch { .. }), "got {err:?}");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_connect_falls_through_dead_addresses() {
    tokio::time::timeout(TEST_TIMEOUT, async {
        let provider = node().await;
        let requestor = node().await;

        // Reserve a port, then release it so nothing listens there.
        let dead = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let mut addrs = vec![dead.clone()];
        addrs.extend(provider.listen_addrs());
        let record = AddressRecord {
            peer_id: provider.peer_id(),
            addrs,
        };
        let conn = requestor.connect(&record).await.unwrap();
        assert_ne!(conn.addr, dead);

        let unreachable = AddressRecord {
            peer_id: provider.peer_id(),
            addrs: vec![dead],
        };
        let err = requestor.connect(&unreachable).await.unwrap_err();
        assert!(matches!(err, ExchangeError::NoReachableAddress { attempts: 1, .. }), "got {err:?}");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_without_connection_fails() {
    let provider = node().await;
    let requestor = node().await;
    let block = Block::new(Bytes::from_static(b"x"));
    provider.put(&block).await.unwrap();
    provider.announce(&block).await.unwrap();

    let conn = swapbench_exchange::Connection {
        peer_id: provider.peer_id(),
        addr: provider.listen_addrs()[0].clone(),
    };
    let err = requestor.get(block.id(), &conn).await.unwrap_err();
    assert!(matches!(err, ExchangeError::NotConnected { .. }));
}
