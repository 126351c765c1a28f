use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;

use crate::registry::Target;

/// Probe outcome for one target, in registry display shape.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub id: u32,
    pub user: String,
    pub host: String,
    pub port: u16,
    pub online: bool,
}

/// Single reachability attempt: one TCP connect, bounded by `timeout`.
/// Every failure mode (refused, timed out, unresolvable, unreachable) reads as
/// offline; only a completed handshake within the deadline reads as online.
/// The socket is dropped before returning on every path. No retries: a
/// transient blip is recorded as down for this sample and averages out over
/// the series.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    let addr = format!("{host}:{port}");
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}

/// Probes every target with at most `max_workers` attempts in flight; excess
/// targets wait for a free slot. Completion order depends on network timing,
/// so results are collected as they arrive and then sorted by `id`; output
/// order is deterministic and the length always equals the input length.
pub async fn probe_all(
    targets: &[Target],
    timeout: Duration,
    max_workers: usize,
) -> Vec<TargetStatus> {
    let mut results: Vec<TargetStatus> = stream::iter(targets.iter().cloned())
        .map(|t| async move {
            let online = probe(&t.host, t.port, timeout).await;
            TargetStatus {
                id: t.id,
                user: t.user,
                host: t.host,
                port: t.port,
                online,
            }
        })
        .buffer_unordered(max_workers.max(1))
        .collect()
        .await;

    results.sort_by_key(|s| s.id);
    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    fn target(id: u32, host: &str, port: u16) -> Target {
        Target {
            id,
            user: "-".to_string(),
            host: host.to_string(),
            port,
        }
    }

    /// Binds a listener on an ephemeral port and returns it with its port.
    /// The OS backlog accepts the handshake, no accept loop needed.
    async fn listening_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Finds a port that is almost certainly closed by binding and releasing it.
    async fn closed_port() -> u16 {
        let (listener, port) = listening_port().await;
        drop(listener);
        port
    }

    #[tokio::test]
    async fn probe_open_port_is_online() {
        let (_listener, port) = listening_port().await;
        assert!(probe("127.0.0.1", port, TEST_TIMEOUT).await);
    }

    #[tokio::test]
    async fn probe_closed_port_is_offline() {
        let port = closed_port().await;
        assert!(!probe("127.0.0.1", port, TEST_TIMEOUT).await);
    }

    #[tokio::test]
    async fn probe_unresolvable_host_is_offline() {
        assert!(!probe("host.invalid", 80, TEST_TIMEOUT).await);
    }

    #[tokio::test]
    async fn probe_all_sorts_by_id_and_keeps_every_target() {
        let (_l1, open_a) = listening_port().await;
        let (_l2, open_b) = listening_port().await;
        let closed = closed_port().await;

        // Input deliberately out of ID order; completion order is up to the
        // network, output must not depend on either.
        let targets = vec![
            target(3, "127.0.0.1", open_a),
            target(1, "127.0.0.1", closed),
            target(2, "127.0.0.1", open_b),
        ];

        let statuses = probe_all(&targets, TEST_TIMEOUT, 60).await;

        assert_eq!(statuses.len(), targets.len());
        let ids: Vec<u32> = statuses.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!statuses[0].online);
        assert!(statuses[1].online);
        assert!(statuses[2].online);
    }

    #[tokio::test]
    async fn slowest_target_still_sorts_first() {
        let (_l1, open_a) = listening_port().await;
        let (_l2, open_b) = listening_port().await;

        // 192.0.2.1 (TEST-NET-1) is not routed; that probe runs out the full
        // timeout and completes last, yet must come back first by id.
        let targets = vec![
            target(1, "192.0.2.1", 9),
            target(2, "127.0.0.1", open_a),
            target(3, "127.0.0.1", open_b),
        ];

        let statuses = probe_all(&targets, TEST_TIMEOUT, 60).await;

        let ids: Vec<u32> = statuses.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!statuses[0].online);
        assert!(statuses[1].online);
        assert!(statuses[2].online);
    }

    #[tokio::test]
    async fn probe_all_queues_targets_beyond_the_worker_budget() {
        let (_l1, open_a) = listening_port().await;
        let (_l2, open_b) = listening_port().await;
        let (_l3, open_c) = listening_port().await;

        let targets = vec![
            target(10, "127.0.0.1", open_a),
            target(11, "127.0.0.1", open_b),
            target(12, "127.0.0.1", open_c),
        ];

        // One worker: targets run strictly one at a time, all still complete.
        let statuses = probe_all(&targets, TEST_TIMEOUT, 1).await;

        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|s| s.online));
    }

    #[tokio::test]
    async fn probe_all_on_empty_registry_is_empty() {
        let statuses = probe_all(&[], TEST_TIMEOUT, 60).await;
        assert!(statuses.is_empty());
    }
}
